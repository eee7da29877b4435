//! Conversation phases and per-call state

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Clarification retries allowed before the call is wrapped up
pub const MAX_CLARIFICATION_ATTEMPTS: u8 = 2;

/// Phase of a dispatch check call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    /// Opening line, before the driver has spoken
    #[default]
    Greeting,
    /// Asking whether the driver is driving, arrived or delayed
    StatusInquiry,
    /// Driver is on the road
    LocationEta,
    /// Driver is at the receiver
    ArrivalDetails,
    /// Driver reported a delay
    DelayDetails,
    /// Status was not understood
    Clarification,
    /// Closing the call
    WrapUp,
    /// Emergency collection and escalation
    Emergency,
}

static PHASE_TRANSITIONS: Lazy<HashMap<ConversationPhase, &'static [ConversationPhase]>> =
    Lazy::new(|| {
        use ConversationPhase::*;
        let mut map = HashMap::new();
        map.insert(Greeting, &[StatusInquiry, Emergency] as &[_]);
        map.insert(
            StatusInquiry,
            &[LocationEta, ArrivalDetails, DelayDetails, Clarification, Emergency] as &[_],
        );
        map.insert(LocationEta, &[DelayDetails, WrapUp, Emergency] as &[_]);
        map.insert(ArrivalDetails, &[WrapUp, Emergency] as &[_]);
        map.insert(DelayDetails, &[WrapUp, Emergency] as &[_]);
        map.insert(Clarification, &[StatusInquiry, WrapUp, Emergency] as &[_]);
        map.insert(WrapUp, &[Emergency] as &[_]);
        map.insert(Emergency, &[] as &[_]);
        map
    });

impl ConversationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationPhase::Greeting => "greeting",
            ConversationPhase::StatusInquiry => "status_inquiry",
            ConversationPhase::LocationEta => "location_eta",
            ConversationPhase::ArrivalDetails => "arrival_details",
            ConversationPhase::DelayDetails => "delay_details",
            ConversationPhase::Clarification => "clarification",
            ConversationPhase::WrapUp => "wrap_up",
            ConversationPhase::Emergency => "emergency",
        }
    }

    /// Phases reachable in one step
    pub fn allowed_transitions(&self) -> &'static [ConversationPhase] {
        PHASE_TRANSITIONS.get(self).copied().unwrap_or(&[])
    }

    pub fn can_transition_to(&self, target: ConversationPhase) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Phases from which the response may end the call
    pub fn is_call_ending(&self) -> bool {
        matches!(self, ConversationPhase::WrapUp | ConversationPhase::Emergency)
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emergency flag that can be raised but never lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmergencyFlag(bool);

impl EmergencyFlag {
    /// Raise the flag. Returns true if it was not raised before.
    pub fn raise(&mut self) -> bool {
        let newly_raised = !self.0;
        self.0 = true;
        newly_raised
    }

    pub fn is_raised(&self) -> bool {
        self.0
    }
}

/// Mutable per-call conversation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationState {
    pub phase: ConversationPhase,
    #[serde(rename = "emergency_detected")]
    pub emergency: EmergencyFlag,
    pub clarification_attempts: u8,
    pub last_utterance: String,
    /// General-script wrap-up has already asked its confirming question
    #[serde(default)]
    pub wrap_up_prompted: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emergency_detected(&self) -> bool {
        self.emergency.is_raised()
    }

    /// Count a clarification retry, saturating at the maximum
    pub fn record_clarification(&mut self) -> u8 {
        if self.clarification_attempts < MAX_CLARIFICATION_ATTEMPTS {
            self.clarification_attempts += 1;
        }
        self.clarification_attempts
    }

    pub fn clarification_exhausted(&self) -> bool {
        self.clarification_attempts >= MAX_CLARIFICATION_ATTEMPTS
    }
}
