//! Dispatch Voice Server
//!
//! Provides HTTP and WebSocket endpoints that drive dispatch check calls.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::init_metrics;
pub use session::{CallRegistry, CallSession};
pub use state::AppState;
pub use websocket::WebSocketHandler;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Max calls reached ({0})")]
    CapacityReached(usize),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::CallNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::CapacityReached(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::WebSocket(_) => StatusCode::BAD_REQUEST,
            ServerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<dispatch_voice_core::Error> for ServerError {
    fn from(err: dispatch_voice_core::Error) -> Self {
        match err {
            dispatch_voice_core::Error::CallNotFound(id) => ServerError::CallNotFound(id),
            dispatch_voice_core::Error::UnknownScenario(s) => {
                ServerError::InvalidRequest(format!("unknown scenario: {}", s))
            },
            other => ServerError::Persistence(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status: StatusCode = self.into();
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
