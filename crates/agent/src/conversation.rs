//! Per-call conversation orchestration
//!
//! `DispatchConversation` owns one call's context, state, structured data
//! and transcript. Utterances must be fed in arrival order; the type takes
//! `&mut self` so a call can never be mutated concurrently.

use chrono::{DateTime, Utc};
use dispatch_voice_core::{
    CallContext, CallEvent, CallSnapshot, ConversationPhase, ConversationState, EndReason,
    StructuredData, Transcript,
};
use std::sync::Arc;

use crate::engine::DispatchEngine;
use crate::phase::PhaseTransition;
use crate::response::{AgentResponse, ResponseContext};
use crate::Result;

/// Result of one driver utterance
#[derive(Debug, Clone)]
pub struct UtteranceOutcome {
    pub response_text: String,
    pub end_call: bool,
    pub snapshot: CallSnapshot,
    /// Phase change caused by this utterance
    pub transition: Option<PhaseTransition>,
    /// The emergency flag was raised by this utterance
    pub emergency_raised: bool,
    /// Processing failed and the fallback line was returned
    pub degraded: bool,
}

/// Result of a non-utterance call event
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Responded(UtteranceOutcome),
    /// Added to the transcript; the call continues
    Recorded,
    Ended(CallSnapshot),
    Ignored,
}

/// State committed after a successful utterance
struct Step {
    state: ConversationState,
    data: StructuredData,
    response: AgentResponse,
    transition: Option<PhaseTransition>,
    emergency_raised: bool,
}

pub struct DispatchConversation {
    engine: Arc<DispatchEngine>,
    call: CallContext,
    state: ConversationState,
    data: StructuredData,
    transcript: Transcript,
    end_reason: Option<EndReason>,
    /// Line that closed the call, repeated if the driver keeps talking
    closing: Option<AgentResponse>,
    updated_at: DateTime<Utc>,
}

impl DispatchConversation {
    pub fn new(engine: Arc<DispatchEngine>, call: CallContext) -> Self {
        tracing::info!(
            call_id = %call.call_id(),
            scenario = %call.scenario(),
            "Call started"
        );

        Self {
            engine,
            call,
            state: ConversationState::new(),
            data: StructuredData::default(),
            transcript: Transcript::new(),
            end_reason: None,
            closing: None,
            updated_at: Utc::now(),
        }
    }

    pub fn call(&self) -> &CallContext {
        &self.call
    }

    pub fn call_id(&self) -> &str {
        self.call.call_id()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn structured_data(&self) -> &StructuredData {
        &self.data
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_ended(&self) -> bool {
        self.end_reason.is_some()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Speak the opening line. Only the first call adds it to the transcript.
    pub fn open(&mut self) -> AgentResponse {
        let greeting = self.engine.responses.greeting(&self.call);
        if self.transcript.is_empty() {
            self.transcript.push_agent(&greeting.text);
            self.touch();
        }
        greeting
    }

    /// Process one driver utterance and produce the next dispatcher line.
    ///
    /// Never fails: internal errors are logged and answered with the
    /// fallback line, leaving state and structured data untouched.
    pub fn handle_utterance(&mut self, text: &str) -> UtteranceOutcome {
        if self.is_ended() {
            let closing = self
                .closing
                .clone()
                .unwrap_or_else(|| AgentResponse::new(self.last_agent_line(), true));
            tracing::debug!(call_id = %self.call_id(), "Utterance after call ended");
            return UtteranceOutcome {
                response_text: closing.text,
                end_call: true,
                snapshot: self.snapshot(),
                transition: None,
                emergency_raised: false,
                degraded: false,
            };
        }

        self.transcript.push_driver(text);

        let (response, transition, emergency_raised, degraded) = match self.step(text) {
            Ok(step) => {
                self.state = step.state;
                self.data = step.data;
                (step.response, step.transition, step.emergency_raised, false)
            },
            Err(e) => {
                tracing::warn!(
                    call_id = %self.call_id(),
                    phase = %self.state.phase,
                    error = %e,
                    "Utterance processing failed, using fallback response"
                );
                (AgentResponse::fallback(), None, false, true)
            },
        };

        self.transcript.push_agent(&response.text);
        if response.end_call {
            self.closing = Some(response.clone());
            self.mark_ended(EndReason::AgentClosed);
        }
        self.touch();

        UtteranceOutcome {
            response_text: response.text,
            end_call: response.end_call,
            snapshot: self.snapshot(),
            transition,
            emergency_raised,
            degraded,
        }
    }

    fn step(&self, utterance: &str) -> Result<Step> {
        let engine = &self.engine;
        engine.validate_utterance(utterance)?;

        let mut state = self.state.clone();
        state.last_utterance = utterance.to_string();

        // Driver turns only, already including this utterance
        let driver_text = self.transcript.driver_text();

        let mut transition = None;
        let mut emergency_raised = false;
        let detection_text = format!("{} {}", utterance, driver_text);
        if let Some(keyword) = engine.detector.matched_keyword(&detection_text) {
            if state.emergency.raise() {
                tracing::warn!(
                    call_id = %self.call_id(),
                    keyword,
                    from = %state.phase,
                    "Emergency detected"
                );
                transition = Some(engine.phases.enter_emergency(&mut state)?);
                emergency_raised = true;
            }
        }

        if !state.emergency_detected() {
            let delay_reason = engine.extractor.extract_delay_reason(&driver_text);
            transition = engine.phases.advance(&mut state, utterance, delay_reason)?;
        }

        let data = engine.extractor.extract(&driver_text, &state);

        let response = engine.responses.respond(&ResponseContext {
            call: &self.call,
            phase: state.phase,
            data: &data,
            clarification_attempts: state.clarification_attempts,
            utterance,
            wrap_up_prompted: state.wrap_up_prompted,
        });

        if state.phase == ConversationPhase::WrapUp && !response.end_call {
            state.wrap_up_prompted = true;
        }

        Ok(Step {
            state,
            data,
            response,
            transition,
            emergency_raised,
        })
    }

    /// Dispatch an inbound event
    pub fn handle_event(&mut self, event: CallEvent) -> EventOutcome {
        match event {
            CallEvent::Transcription { text } => {
                EventOutcome::Responded(self.handle_utterance(&text))
            },
            CallEvent::AgentMessage { text } => {
                if self.is_ended() {
                    return EventOutcome::Ignored;
                }
                let ending = self.engine.is_call_ending_line(&text);
                self.transcript.push_agent(text);
                self.touch();
                if ending {
                    EventOutcome::Ended(self.end(EndReason::AgentMessage))
                } else {
                    EventOutcome::Recorded
                }
            },
            CallEvent::System { data } => {
                tracing::debug!(call_id = %self.call_id(), %data, "System event");
                EventOutcome::Ignored
            },
            CallEvent::Audio { bytes } => {
                tracing::trace!(call_id = %self.call_id(), len = bytes.len(), "Audio event");
                EventOutcome::Ignored
            },
            CallEvent::End { reason } => {
                EventOutcome::Ended(self.end(reason.unwrap_or_default()))
            },
        }
    }

    /// End the call and return its final snapshot. The first reason sticks.
    pub fn end(&mut self, reason: EndReason) -> CallSnapshot {
        self.mark_ended(reason);
        self.snapshot()
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call: self.call.clone(),
            transcript: self.transcript.clone(),
            structured_data: self.data.clone(),
            state: self.state.clone(),
            ended: self.is_ended(),
            end_reason: self.end_reason,
            updated_at: self.updated_at,
        }
    }

    fn mark_ended(&mut self, reason: EndReason) {
        if self.end_reason.is_none() {
            self.end_reason = Some(reason);
            self.touch();
            tracing::info!(
                call_id = %self.call_id(),
                reason = reason.as_str(),
                phase = %self.state.phase,
                outcome = self.data.call_outcome.as_str(),
                "Call ended"
            );
        }
    }

    fn last_agent_line(&self) -> String {
        self.transcript
            .last_agent_text()
            .unwrap_or_default()
            .to_string()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
