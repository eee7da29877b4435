//! Dispatcher response generation
//!
//! Responses are canned lines looked up by scenario and phase, sub-branching
//! on extracted fields. Emergency calls follow a fixed collection sequence
//! that ignores the scenario until the final escalation line. Difficult
//! driver overlays are layered on top of the scripted line.

mod overlay;
mod scenarios;

pub use overlay::{Overlay, OverlayDetector};

use dispatch_voice_core::{
    CallContext, ConversationPhase, ScenarioVariant, StructuredData,
};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Spoken when processing an utterance fails
pub const FALLBACK_RESPONSE: &str = "I apologize for the technical difficulty. This is Dispatch calling for a status update. Can you please tell me your current location?";

const EMERGENCY_SAFETY_QUESTION: &str = "I understand there may be an emergency situation. First and most importantly - is everyone safe? Are there any injuries that need immediate medical attention?";
const EMERGENCY_LOCATION_QUESTION: &str = "Thank you for confirming safety. Now I need your exact location. Please give me the highway, mile marker, or nearest exit where you are.";
const EMERGENCY_INCIDENT_QUESTION: &str = "Got your location. What exactly happened? Was it an accident, breakdown, or medical emergency?";
const EMERGENCY_ESCALATION: &str = "I have all the emergency details. I'm connecting you to a human dispatcher right now. Stay on the line and they'll be with you immediately.";
const EMERGENCY_PROTOCOL_ESCALATION: &str = "Emergency protocol activated. I have your safety confirmation, location, and incident details. Connecting you to emergency dispatch immediately.";

/// Next dispatcher line and whether the call should end after it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub text: String,
    pub end_call: bool,
}

impl AgentResponse {
    pub fn new(text: impl Into<String>, end_call: bool) -> Self {
        Self {
            text: text.into(),
            end_call,
        }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_RESPONSE, false)
    }
}

/// Inputs to a response lookup
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub call: &'a CallContext,
    pub phase: ConversationPhase,
    pub data: &'a StructuredData,
    pub clarification_attempts: u8,
    /// Latest driver utterance, as spoken
    pub utterance: &'a str,
    /// General-script wrap-up confirming question already asked
    pub wrap_up_prompted: bool,
}

impl<'a> ResponseContext<'a> {
    pub fn scenario(&self) -> ScenarioVariant {
        self.call.scenario()
    }
}

pub struct ResponseGenerator {
    overlays: OverlayDetector,
}

impl ResponseGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            overlays: OverlayDetector::new()?,
        })
    }

    /// Opening line spoken before the driver says anything
    pub fn greeting(&self, call: &CallContext) -> AgentResponse {
        scenarios::greeting(call)
    }

    pub fn respond(&self, ctx: &ResponseContext<'_>) -> AgentResponse {
        if ctx.phase == ConversationPhase::Emergency {
            return emergency_response(ctx.data, ctx.scenario());
        }

        let scripted = scenarios::scripted(ctx);
        self.overlays.apply(ctx, scripted)
    }
}

/// Emergency collection sequence.
///
/// Safety, then location, then incident type, then escalation. Each step
/// is gated only on which fields are present, so a later step is never
/// skipped to.
pub fn emergency_response(data: &StructuredData, scenario: ScenarioVariant) -> AgentResponse {
    if !data.safety_recorded() {
        AgentResponse::new(EMERGENCY_SAFETY_QUESTION, false)
    } else if data.emergency_location.is_none() {
        AgentResponse::new(EMERGENCY_LOCATION_QUESTION, false)
    } else if data.emergency_type.is_none() {
        AgentResponse::new(EMERGENCY_INCIDENT_QUESTION, false)
    } else {
        let text = match scenario {
            ScenarioVariant::EmergencyProtocol => EMERGENCY_PROTOCOL_ESCALATION,
            ScenarioVariant::General | ScenarioVariant::DriverCheckin => EMERGENCY_ESCALATION,
        };
        AgentResponse::new(text, true)
    }
}

/// The whole reply is one of a few bare acknowledgements
pub fn is_short_acknowledgement(utterance: &str) -> bool {
    const ACKS: [&str; 6] = ["yeah", "ok", "sure", "no", "yes", "fine"];

    let reply = utterance.trim().to_lowercase();
    ACKS.contains(&reply.as_str())
}
