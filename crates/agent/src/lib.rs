//! Dispatch check-call conversation engine
//!
//! Turns driver utterances into the next dispatcher line:
//! - Emergency keyword detection (sticky per call)
//! - Rule-based field extraction from the driver transcript
//! - A keyword-driven phase state machine
//! - Scripted responses per scenario, with difficult-driver overlays
//! - A per-call orchestrator that never fails mid-call
//!
//! Everything here is synchronous and performs no I/O.

pub mod conversation;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod keywords;
pub mod phase;
pub mod response;

pub use conversation::{DispatchConversation, EventOutcome, UtteranceOutcome};
pub use emergency::{EmergencyDetector, EMERGENCY_KEYWORDS};
pub use engine::DispatchEngine;
pub use error::{AgentError, Result};
pub use extractor::FieldExtractor;
pub use keywords::KeywordSet;
pub use phase::{PhaseMachine, PhaseTransition, TransitionReason};
pub use response::{
    emergency_response, is_short_acknowledgement, AgentResponse, Overlay, OverlayDetector,
    ResponseContext, ResponseGenerator, FALLBACK_RESPONSE,
};
