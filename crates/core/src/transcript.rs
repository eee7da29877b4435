//! Append-only call transcript

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who spoke a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Driver,
}

/// One utterance in the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered log of turns. Turns can be appended but never removed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.turns.push(Turn::new(speaker, text));
    }

    pub fn push_driver(&mut self, text: impl Into<String>) {
        self.push(Speaker::Driver, text);
    }

    pub fn push_agent(&mut self, text: impl Into<String>) {
        self.push(Speaker::Agent, text);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Driver turns joined by newlines and lower-cased.
    ///
    /// This is the text the detectors and extractors read. Agent turns are
    /// excluded so scripted lines never match driver keywords.
    pub fn driver_text(&self) -> String {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::Driver)
            .map(|t| t.text.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn last_agent_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.speaker == Speaker::Agent)
            .map(|t| t.text.as_str())
    }
}
