//! Shared conversation engine
//!
//! Holds the compiled detectors, extractors and scripts. Built once per
//! process and shared by reference between calls; it carries no per-call
//! state.

use dispatch_voice_config::AgentSettings;
use dispatch_voice_core::CallContext;
use std::sync::Arc;

use crate::conversation::DispatchConversation;
use crate::emergency::EmergencyDetector;
use crate::extractor::FieldExtractor;
use crate::phase::PhaseMachine;
use crate::response::ResponseGenerator;
use crate::{AgentError, Result};

/// Lines from the voice platform that mean the call is closing
const CALL_ENDING_PHRASES: &[&str] = &[
    "drive safely",
    "thank you for",
    "contact us if",
    "connecting you to",
    "human dispatcher",
    "end of call",
    "goodbye",
    "have a good day",
];

pub struct DispatchEngine {
    pub(crate) detector: EmergencyDetector,
    pub(crate) extractor: FieldExtractor,
    pub(crate) phases: PhaseMachine,
    pub(crate) responses: ResponseGenerator,
    max_utterance_chars: usize,
}

impl DispatchEngine {
    pub fn new() -> Result<Self> {
        Self::from_settings(&AgentSettings::default())
    }

    pub fn from_settings(settings: &AgentSettings) -> Result<Self> {
        Ok(Self {
            detector: EmergencyDetector::new(),
            extractor: FieldExtractor::new()?,
            phases: PhaseMachine::new()?,
            responses: ResponseGenerator::new()?,
            max_utterance_chars: settings.max_utterance_chars,
        })
    }

    pub fn max_utterance_chars(&self) -> usize {
        self.max_utterance_chars
    }

    /// Begin a conversation for `call`
    pub fn start_call(self: &Arc<Self>, call: CallContext) -> DispatchConversation {
        DispatchConversation::new(Arc::clone(self), call)
    }

    pub(crate) fn validate_utterance(&self, utterance: &str) -> Result<()> {
        if utterance.trim().is_empty() {
            return Err(AgentError::InvalidUtterance("empty utterance".to_string()));
        }

        let chars = utterance.chars().count();
        if chars > self.max_utterance_chars {
            return Err(AgentError::InvalidUtterance(format!(
                "{} characters exceeds limit of {}",
                chars, self.max_utterance_chars
            )));
        }

        if utterance.chars().any(|c| c == '\0') {
            return Err(AgentError::InvalidUtterance(
                "utterance contains NUL characters".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn is_call_ending_line(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        CALL_ENDING_PHRASES.iter().any(|p| lower.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_validation() {
        let engine = DispatchEngine::from_settings(&AgentSettings {
            max_utterance_chars: 10,
            ..AgentSettings::default()
        })
        .unwrap();

        assert!(engine.validate_utterance("driving").is_ok());
        assert!(engine.validate_utterance("   ").is_err());
        assert!(engine.validate_utterance("this is far too long").is_err());
        assert!(engine.validate_utterance("bad\0byte").is_err());
    }

    #[test]
    fn test_call_ending_lines() {
        let engine = DispatchEngine::new().unwrap();
        assert!(engine.is_call_ending_line("Okay, drive safely!"));
        assert!(engine.is_call_ending_line("Goodbye"));
        assert!(!engine.is_call_ending_line("What's your ETA?"));
    }
}
