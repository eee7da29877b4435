//! Agent error types

use dispatch_voice_core::ConversationPhase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to compile pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid utterance: {0}")]
    InvalidUtterance(String),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition {
        from: ConversationPhase,
        to: ConversationPhase,
    },

    #[error("Call already ended: {0}")]
    CallEnded(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
