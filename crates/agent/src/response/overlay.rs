//! Difficult-driver overlays
//!
//! Advisory text layered onto the scripted line. Overlays are not phases
//! and never apply during an emergency.

use dispatch_voice_core::ConversationPhase;

use super::{AgentResponse, ResponseContext};
use crate::keywords::KeywordSet;
use crate::Result;

const UNCOOPERATIVE_TEXT: &str = "I understand you're busy, but this is a required status check from dispatch. I just need 30 seconds to confirm your location and ETA. This helps us serve our customers better.";
const NOISY_TEXT: &str = "I can hear there's background noise. If possible, could you move somewhere quieter for just a moment? I need to get a quick status update from you.";
const CONFLICTING_TEXT: &str = "I want to make sure I understand correctly. Let me ask specifically - are you currently driving on the road, or have you arrived at your destination?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    /// Appends a firm request for 30 seconds
    Uncooperative,
    /// Appends a request to move somewhere quieter
    NoisyEnvironment,
    /// Replaces the line with a pointed status question
    ConflictingInformation,
}

pub struct OverlayDetector {
    uncooperative: KeywordSet,
    noisy: KeywordSet,
}

impl OverlayDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            uncooperative: KeywordSet::new(
                "uncooperative",
                &["don't have time", "busy", "can't talk", "leave me alone"],
            )?,
            noisy: KeywordSet::new(
                "noisy",
                &["can't hear", "too loud", "what", "speak up", "noisy"],
            )?,
        })
    }

    /// First overlay that applies to this turn
    pub fn detect(&self, ctx: &ResponseContext<'_>, scripted: &AgentResponse) -> Option<Overlay> {
        if ctx.phase == ConversationPhase::Emergency {
            return None;
        }

        if self.uncooperative.matches(ctx.utterance) {
            Some(Overlay::Uncooperative)
        } else if self.noisy.matches(ctx.utterance) {
            Some(Overlay::NoisyEnvironment)
        } else if ctx.clarification_attempts > 0
            && !scripted.end_call
            && matches!(
                ctx.phase,
                ConversationPhase::StatusInquiry | ConversationPhase::Clarification
            )
        {
            Some(Overlay::ConflictingInformation)
        } else {
            None
        }
    }

    pub fn apply(&self, ctx: &ResponseContext<'_>, scripted: AgentResponse) -> AgentResponse {
        match self.detect(ctx, &scripted) {
            Some(Overlay::Uncooperative) => append(scripted, UNCOOPERATIVE_TEXT),
            Some(Overlay::NoisyEnvironment) => append(scripted, NOISY_TEXT),
            Some(Overlay::ConflictingInformation) => {
                AgentResponse::new(CONFLICTING_TEXT, scripted.end_call)
            },
            None => scripted,
        }
    }
}

fn append(mut response: AgentResponse, text: &str) -> AgentResponse {
    response.text.push(' ');
    response.text.push_str(text);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_voice_core::{CallContext, ScenarioVariant, StructuredData};

    fn detector() -> OverlayDetector {
        OverlayDetector::new().unwrap()
    }

    fn ctx<'a>(
        call: &'a CallContext,
        data: &'a StructuredData,
        phase: ConversationPhase,
        attempts: u8,
        utterance: &'a str,
    ) -> ResponseContext<'a> {
        ResponseContext {
            call,
            phase,
            data,
            clarification_attempts: attempts,
            utterance,
            wrap_up_prompted: false,
        }
    }

    #[test]
    fn test_uncooperative_appends() {
        let call = CallContext::new("Ana", "9", ScenarioVariant::General);
        let data = StructuredData::default();
        let c = ctx(&call, &data, ConversationPhase::StatusInquiry, 0, "I'm busy, driving");

        let r = detector().apply(&c, AgentResponse::new("Base line.", false));
        assert!(r.text.starts_with("Base line. I understand you're busy"));
        assert!(!r.end_call);
    }

    #[test]
    fn test_uncooperative_wins_over_noisy() {
        let call = CallContext::new("Ana", "9", ScenarioVariant::General);
        let data = StructuredData::default();
        let c = ctx(&call, &data, ConversationPhase::StatusInquiry, 1, "what? I can't talk");
        let scripted = AgentResponse::new("x", false);
        assert_eq!(detector().detect(&c, &scripted), Some(Overlay::Uncooperative));
    }

    #[test]
    fn test_noisy_appends() {
        let call = CallContext::new("Ana", "9", ScenarioVariant::General);
        let data = StructuredData::default();
        let c = ctx(&call, &data, ConversationPhase::LocationEta, 0, "Speak up, it's too loud");

        let r = detector().apply(&c, AgentResponse::new("Base.", false));
        assert!(r.text.ends_with(NOISY_TEXT));
    }

    #[test]
    fn test_conflicting_substitutes_only_while_status_unresolved() {
        let call = CallContext::new("Ana", "9", ScenarioVariant::General);
        let data = StructuredData::default();
        let d = detector();

        let c = ctx(&call, &data, ConversationPhase::StatusInquiry, 1, "hmm");
        let r = d.apply(&c, AgentResponse::new("Base.", false));
        assert_eq!(r.text, CONFLICTING_TEXT);

        let c = ctx(&call, &data, ConversationPhase::LocationEta, 1, "hmm");
        let r = d.apply(&c, AgentResponse::new("Base.", false));
        assert_eq!(r.text, "Base.");

        let c = ctx(&call, &data, ConversationPhase::Clarification, 2, "hmm");
        let r = d.apply(&c, AgentResponse::new("Closing.", true));
        assert_eq!(r.text, "Closing.");
    }

    #[test]
    fn test_no_overlay_in_emergency() {
        let call = CallContext::new("Ana", "9", ScenarioVariant::General);
        let data = StructuredData::default();
        let c = ctx(&call, &data, ConversationPhase::Emergency, 1, "what? I'm busy");
        let scripted = AgentResponse::new("x", false);
        assert_eq!(detector().detect(&c, &scripted), None);
    }
}
