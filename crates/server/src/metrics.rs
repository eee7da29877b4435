//! Observability Metrics
//!
//! Prometheus metrics for call volume, emergencies and processing latency.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use dispatch_voice_core::{CallOutcome, EndReason, ScenarioVariant};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::state::AppState;
use crate::ServerError;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Safe to call more than once; later calls return the installed handle.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    register_default_metrics();

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

fn register_default_metrics() {
    gauge!("dispatch_voice_calls_active").set(0.0);
    for scenario in ScenarioVariant::all() {
        counter!("dispatch_voice_calls_started_total", "scenario" => scenario.as_str()).absolute(0);
    }

    counter!("dispatch_voice_utterances_total").absolute(0);
    counter!("dispatch_voice_emergencies_total").absolute(0);
    counter!("dispatch_voice_fallbacks_total").absolute(0);
    counter!("dispatch_voice_persistence_failures_total").absolute(0);

    histogram!("dispatch_voice_utterance_duration_seconds").record(0.0);
}

pub fn record_call_started(scenario: ScenarioVariant) {
    counter!("dispatch_voice_calls_started_total", "scenario" => scenario.as_str()).increment(1);
}

pub fn record_call_ended(reason: EndReason, outcome: CallOutcome) {
    counter!(
        "dispatch_voice_calls_ended_total",
        "reason" => reason.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_active_calls(count: usize) {
    gauge!("dispatch_voice_calls_active").set(count as f64);
}

pub fn record_utterance(duration_secs: f64) {
    counter!("dispatch_voice_utterances_total").increment(1);
    histogram!("dispatch_voice_utterance_duration_seconds").record(duration_secs);
}

pub fn record_emergency() {
    counter!("dispatch_voice_emergencies_total").increment(1);
}

pub fn record_fallback() {
    counter!("dispatch_voice_fallbacks_total").increment(1);
}

pub fn record_persistence_failure() {
    counter!("dispatch_voice_persistence_failures_total").increment(1);
}

/// Metrics endpoint handler
///
/// Returns Prometheus-formatted metrics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    record_active_calls(state.calls.count());

    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}
