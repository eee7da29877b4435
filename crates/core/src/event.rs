//! Inbound call events
//!
//! Transports deliver these to a call. Each variant is handled by an
//! exhaustive match in the conversation layer.

use serde::{Deserialize, Serialize};

/// An event arriving on a live call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    /// Final transcription of a driver utterance
    Transcription { text: String },
    /// Text the voice platform spoke on the agent's behalf
    AgentMessage { text: String },
    /// Platform status or metadata
    System {
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Raw audio. Not interpreted by the conversation core.
    Audio {
        #[serde(default)]
        bytes: Vec<u8>,
    },
    /// The call is over
    End {
        #[serde(default)]
        reason: Option<EndReason>,
    },
}

impl CallEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CallEvent::Transcription { .. } => "transcription",
            CallEvent::AgentMessage { .. } => "agent_message",
            CallEvent::System { .. } => "system",
            CallEvent::Audio { .. } => "audio",
            CallEvent::End { .. } => "end",
        }
    }
}

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The agent's response closed the call
    AgentClosed,
    /// The driver hung up
    #[default]
    CallerHangup,
    /// No activity within the idle timeout
    IdleTimeout,
    /// The platform spoke a closing line
    AgentMessage,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::AgentClosed => "agent_closed",
            EndReason::CallerHangup => "caller_hangup",
            EndReason::IdleTimeout => "idle_timeout",
            EndReason::AgentMessage => "agent_message",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_deserialization() {
        let event: CallEvent =
            serde_json::from_str(r#"{"type":"transcription","text":"I'm driving"}"#).unwrap();
        assert_eq!(
            event,
            CallEvent::Transcription {
                text: "I'm driving".to_string()
            }
        );

        let event: CallEvent = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert_eq!(event, CallEvent::End { reason: None });

        let event: CallEvent =
            serde_json::from_str(r#"{"type":"end","reason":"idle_timeout"}"#).unwrap();
        assert_eq!(event.kind(), "end");
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let result = serde_json::from_str::<CallEvent>(r#"{"type":"video","text":"x"}"#);
        assert!(result.is_err());
    }
}
