//! Phase state machine for dispatch check calls
//!
//! One rule is evaluated per driver utterance, from the phase the call
//! was in before the utterance. Emergency preempts every other rule and is
//! absorbing. WRAP_UP only leaves for EMERGENCY.

use dispatch_voice_core::{ConversationPhase, ConversationState, DelayReason};

use crate::keywords::KeywordSet;
use crate::{AgentError, Result};

/// Why a phase changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Driver answered the greeting
    FirstUtterance,
    DrivingReported,
    ArrivalReported,
    DelayReported,
    /// No status category recognized
    StatusUnclear,
    /// Delay reason present after location/ETA
    DelayConfirmed,
    /// Phase questions answered
    DetailsCollected,
    ClarificationRetry,
    ClarificationExhausted,
    EmergencyDetected,
}

impl TransitionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionReason::FirstUtterance => "first_utterance",
            TransitionReason::DrivingReported => "driving_reported",
            TransitionReason::ArrivalReported => "arrival_reported",
            TransitionReason::DelayReported => "delay_reported",
            TransitionReason::StatusUnclear => "status_unclear",
            TransitionReason::DelayConfirmed => "delay_confirmed",
            TransitionReason::DetailsCollected => "details_collected",
            TransitionReason::ClarificationRetry => "clarification_retry",
            TransitionReason::ClarificationExhausted => "clarification_exhausted",
            TransitionReason::EmergencyDetected => "emergency_detected",
        }
    }
}

/// A completed phase change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: ConversationPhase,
    pub to: ConversationPhase,
    pub reason: TransitionReason,
}

/// Keyword-driven phase transitions
pub struct PhaseMachine {
    driving_terms: KeywordSet,
    arrival_terms: KeywordSet,
    delay_terms: KeywordSet,
}

impl PhaseMachine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            driving_terms: KeywordSet::new(
                "driving",
                &[
                    "driving",
                    "on the road",
                    "en route",
                    "heading",
                    "i'm on",
                    "i am on",
                ],
            )?,
            arrival_terms: KeywordSet::new(
                "arrival",
                &[
                    "arrived",
                    "here",
                    "at dock",
                    "at the dock",
                    "unloading",
                    "destination",
                ],
            )?,
            delay_terms: KeywordSet::new(
                "delay",
                &[
                    "delayed",
                    "delay",
                    "late",
                    "behind",
                    "stuck",
                    "running late",
                ],
            )?,
        })
    }

    /// Move `state` to the phase that follows `utterance`.
    ///
    /// `delay_reason` is the delay reason extracted from the transcript
    /// including this utterance. Returns the last transition taken, or
    /// `None` when the phase does not change (WRAP_UP and EMERGENCY).
    ///
    /// The greeting already asks for a status, so a first utterance that
    /// states one passes through STATUS_INQUIRY to the matching phase.
    pub fn advance(
        &self,
        state: &mut ConversationState,
        utterance: &str,
        delay_reason: DelayReason,
    ) -> Result<Option<PhaseTransition>> {
        use ConversationPhase::*;

        let (to, reason) = match state.phase {
            Greeting => {
                let entered = self.apply(state, StatusInquiry, TransitionReason::FirstUtterance)?;
                match self.classify_status(utterance) {
                    (Clarification, _) => return Ok(Some(entered)),
                    status => status,
                }
            },
            StatusInquiry => self.classify_status(utterance),
            LocationEta if delay_reason.is_delayed() => {
                (DelayDetails, TransitionReason::DelayConfirmed)
            },
            LocationEta | ArrivalDetails | DelayDetails => {
                (WrapUp, TransitionReason::DetailsCollected)
            },
            Clarification => {
                state.record_clarification();
                if state.clarification_exhausted() {
                    (WrapUp, TransitionReason::ClarificationExhausted)
                } else {
                    (StatusInquiry, TransitionReason::ClarificationRetry)
                }
            },
            WrapUp | Emergency => return Ok(None),
        };

        self.apply(state, to, reason).map(Some)
    }

    /// Force the call into EMERGENCY
    pub fn enter_emergency(&self, state: &mut ConversationState) -> Result<PhaseTransition> {
        self.apply(
            state,
            ConversationPhase::Emergency,
            TransitionReason::EmergencyDetected,
        )
    }

    fn classify_status(&self, utterance: &str) -> (ConversationPhase, TransitionReason) {
        if self.driving_terms.matches(utterance) {
            (ConversationPhase::LocationEta, TransitionReason::DrivingReported)
        } else if self.arrival_terms.matches(utterance) {
            (ConversationPhase::ArrivalDetails, TransitionReason::ArrivalReported)
        } else if self.delay_terms.matches(utterance) {
            (ConversationPhase::DelayDetails, TransitionReason::DelayReported)
        } else {
            (ConversationPhase::Clarification, TransitionReason::StatusUnclear)
        }
    }

    fn apply(
        &self,
        state: &mut ConversationState,
        to: ConversationPhase,
        reason: TransitionReason,
    ) -> Result<PhaseTransition> {
        let from = state.phase;
        if !from.can_transition_to(to) {
            return Err(AgentError::InvalidTransition { from, to });
        }

        state.phase = to;
        tracing::debug!(
            from = %from,
            to = %to,
            reason = reason.as_str(),
            "Phase transition"
        );

        Ok(PhaseTransition { from, to, reason })
    }
}
