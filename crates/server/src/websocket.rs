//! WebSocket Handler
//!
//! Carries call events from the voice platform and agent replies back.
//! Inbound text frames are `CallEvent` JSON; binary frames are raw audio.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use dispatch_voice_agent::EventOutcome;
use dispatch_voice_core::{CallEvent, CallSnapshot, ConversationPhase};

use crate::session::CallSession;
use crate::state::AppState;
use crate::ServerError;

/// Outbound WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Sent once after the socket opens
    CallInfo {
        call_id: String,
        phase: ConversationPhase,
    },
    /// Agent reply to a transcription
    Response {
        text: String,
        end_call: bool,
        phase: ConversationPhase,
        emergency_detected: bool,
    },
    /// Event stored in the transcript
    Recorded,
    /// Call is over; the socket closes after this
    Ended {
        snapshot: Box<CallSnapshot>,
    },
    Error {
        message: String,
    },
}

impl WsMessage {
    fn from_outcome(outcome: EventOutcome) -> Option<Self> {
        match outcome {
            EventOutcome::Responded(outcome) => Some(WsMessage::Response {
                text: outcome.response_text,
                end_call: outcome.end_call,
                phase: outcome.snapshot.state.phase,
                emergency_detected: outcome.snapshot.state.emergency_detected(),
            }),
            EventOutcome::Recorded => Some(WsMessage::Recorded),
            EventOutcome::Ended(snapshot) => Some(WsMessage::Ended {
                snapshot: Box::new(snapshot),
            }),
            EventOutcome::Ignored => None,
        }
    }
}

type WsSender = SplitSink<WebSocket, Message>;

/// WebSocket handler
pub struct WebSocketHandler;

impl WebSocketHandler {
    /// Handle WebSocket upgrade for a live call
    pub async fn handle(
        ws: WebSocketUpgrade,
        State(state): State<AppState>,
        Path(call_id): Path<String>,
    ) -> Result<Response, StatusCode> {
        let session = state.calls.get(&call_id).ok_or(StatusCode::NOT_FOUND)?;

        Ok(ws.on_upgrade(move |socket| Self::handle_socket(socket, session, state)))
    }

    async fn handle_socket(socket: WebSocket, session: Arc<CallSession>, state: AppState) {
        let (mut sender, mut receiver) = socket.split();

        let info = WsMessage::CallInfo {
            call_id: session.id.clone(),
            phase: session.snapshot().state.phase,
        };
        if let Err(e) = send(&mut sender, &info).await {
            tracing::warn!(call_id = %session.id, error = %e, "Failed to send call info");
            return;
        }

        tracing::info!(call_id = %session.id, "WebSocket connected");

        while let Some(msg) = receiver.next().await {
            let event = match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<CallEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(call_id = %session.id, error = %e, "Unparseable frame");
                        let err = WsMessage::Error {
                            message: format!("Invalid call event: {}", e),
                        };
                        if send(&mut sender, &err).await.is_err() {
                            break;
                        }
                        continue;
                    },
                },
                Ok(Message::Binary(bytes)) => CallEvent::Audio { bytes },
                Ok(Message::Ping(data)) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                    continue;
                },
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::error!(call_id = %session.id, "WebSocket error: {}", e);
                    break;
                },
                _ => continue,
            };

            let outcome = state.handle_event(&session, event);
            let ended = matches!(outcome, EventOutcome::Ended(_));

            if let Some(reply) = WsMessage::from_outcome(outcome) {
                if let Err(e) = send(&mut sender, &reply).await {
                    tracing::warn!(call_id = %session.id, error = %e, "Failed to send reply");
                    break;
                }
            }

            if ended {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }

        tracing::info!(call_id = %session.id, "WebSocket closed");
    }
}

async fn send(sender: &mut WsSender, msg: &WsMessage) -> Result<(), ServerError> {
    let json = serde_json::to_string(msg).map_err(|e| ServerError::Internal(e.to_string()))?;
    sender
        .send(Message::Text(json))
        .await
        .map_err(|e| ServerError::WebSocket(e.to_string()))
}
