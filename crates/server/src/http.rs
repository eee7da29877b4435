//! HTTP Endpoints
//!
//! REST API for dispatch check calls.

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use dispatch_voice_agent::{EventOutcome, UtteranceOutcome};
use dispatch_voice_core::{
    CallContext, CallEvent, CallSnapshot, ConversationPhase, EndReason, ScenarioVariant,
    StructuredData,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::WebSocketHandler;
use crate::ServerError;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    drop(config);

    Router::new()
        .route("/api/calls", post(create_call).get(list_calls))
        .route("/api/calls/history", get(call_history))
        .route("/api/calls/:id", get(get_call))
        .route("/api/calls/:id/utterances", post(post_utterance))
        .route("/api/calls/:id/events", post(post_event))
        .route("/api/calls/:id/end", post(end_call))
        .route("/ws/calls/:id", get(WebSocketHandler::handle))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer),
        )
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - Disabled, or no origins configured: permissive (development)
/// - Origins that fail to parse are skipped
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled || origins.is_empty() {
        tracing::warn!("CORS is not restricted - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return base.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    base.allow_origin(parsed_origins)
}

#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    pub driver_name: String,
    pub load_number: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Scenario name; the configured default when absent
    #[serde(default)]
    pub scenario: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub call_id: String,
    pub scenario: ScenarioVariant,
    pub phase: ConversationPhase,
    pub opening_line: String,
}

async fn create_call(
    State(state): State<AppState>,
    Json(request): Json<CreateCallRequest>,
) -> Result<(StatusCode, Json<CreateCallResponse>), ServerError> {
    let driver_name = request.driver_name.trim();
    let load_number = request.load_number.trim();
    if driver_name.is_empty() || load_number.is_empty() {
        return Err(ServerError::InvalidRequest(
            "driver_name and load_number are required".to_string(),
        ));
    }

    let scenario = match request.scenario.as_deref() {
        Some(name) => name.parse::<ScenarioVariant>()?,
        None => state.get_config().agent.default_scenario,
    };

    let mut call = CallContext::new(driver_name, load_number, scenario);
    if let Some(phone) = request.phone_number {
        call = call.with_phone_number(phone);
    }

    let (session, opening_line) = state.start_call(call)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCallResponse {
            call_id: session.id.clone(),
            scenario,
            phase: ConversationPhase::Greeting,
            opening_line,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UtteranceRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UtteranceResponse {
    pub call_id: String,
    pub response_text: String,
    pub end_call: bool,
    pub phase: ConversationPhase,
    pub emergency_detected: bool,
    pub degraded: bool,
    pub structured_data: StructuredData,
}

impl From<UtteranceOutcome> for UtteranceResponse {
    fn from(outcome: UtteranceOutcome) -> Self {
        let snapshot = outcome.snapshot;
        Self {
            call_id: snapshot.call_id().to_string(),
            response_text: outcome.response_text,
            end_call: outcome.end_call,
            phase: snapshot.state.phase,
            emergency_detected: snapshot.state.emergency_detected(),
            degraded: outcome.degraded,
            structured_data: snapshot.structured_data,
        }
    }
}

async fn post_utterance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UtteranceRequest>,
) -> Result<Json<UtteranceResponse>, ServerError> {
    let session = state.session(&id)?;
    let outcome = state.handle_utterance(&session, &request.text);
    Ok(Json(outcome.into()))
}

/// Result of posting a call event
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventReply {
    Responded(UtteranceResponse),
    Recorded,
    Ended { snapshot: Box<CallSnapshot> },
    Ignored,
}

impl From<EventOutcome> for EventReply {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Responded(outcome) => EventReply::Responded(outcome.into()),
            EventOutcome::Recorded => EventReply::Recorded,
            EventOutcome::Ended(snapshot) => EventReply::Ended {
                snapshot: Box::new(snapshot),
            },
            EventOutcome::Ignored => EventReply::Ignored,
        }
    }
}

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<CallEvent>,
) -> Result<Json<EventReply>, ServerError> {
    let session = state.session(&id)?;
    tracing::debug!(call_id = %id, kind = event.kind(), "Call event received");
    Ok(Json(state.handle_event(&session, event).into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct EndCallRequest {
    #[serde(default)]
    pub reason: Option<EndReason>,
}

async fn end_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<EndCallRequest>>,
) -> Result<Json<CallSnapshot>, ServerError> {
    let reason = request
        .and_then(|Json(r)| r.reason)
        .unwrap_or_default();
    Ok(Json(state.end_call(&id, reason)?))
}

async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CallSnapshot>, ServerError> {
    Ok(Json(state.find_snapshot(&id).await?))
}

async fn list_calls(State(state): State<AppState>) -> Json<serde_json::Value> {
    let calls = state.calls.list();
    Json(serde_json::json!({
        "calls": calls,
        "count": calls.len(),
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn call_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CallSnapshot>>, ServerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(state.snapshots.list_recent(limit).await?))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "active_calls": state.calls.count(),
        "snapshot_store": state.snapshots.name(),
    }))
}
