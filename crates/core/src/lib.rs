//! Core types for the dispatch voice agent
//!
//! This crate provides the data model shared by every other crate:
//! - Call context and scenario variants
//! - Conversation phases and per-call state
//! - The append-only call transcript
//! - Structured status data extracted from a call
//! - Inbound call events and persisted call snapshots
//! - The `SnapshotSink` trait implemented by storage backends

pub mod call;
pub mod conversation;
pub mod error;
pub mod event;
pub mod snapshot;
pub mod structured;
pub mod traits;
pub mod transcript;

pub use call::{CallContext, ScenarioVariant};
pub use conversation::{
    ConversationPhase, ConversationState, EmergencyFlag, MAX_CLARIFICATION_ATTEMPTS,
};
pub use error::{Error, Result};
pub use event::{CallEvent, EndReason};
pub use snapshot::CallSnapshot;
pub use structured::{
    CallOutcome, DelayReason, DriverStatus, EmergencyType, InjuryStatus, SafetyStatus,
    StructuredData,
};
pub use traits::SnapshotSink;
pub use transcript::{Speaker, Transcript, Turn};
