//! Emergency keyword detection
//!
//! Plain substring membership over lower-cased text. There is no negation
//! handling: "no problem" fires on "problem".

/// Terms that flag a call as an emergency
pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "emergencies",
    "accident",
    "breakdown",
    "medical",
    "help",
    "urgent",
    "blowout",
    "crash",
    "collision",
    "injury",
    "hurt",
    "stuck",
    "disabled",
    "broke down",
    "can't move",
    "need help",
    "pulled over",
    "on fire",
    "unconscious",
    "chest pain",
    "breathing",
    "bleeding",
    "trouble",
    "problem",
];

/// Stateless emergency predicate. The caller keeps the result sticky.
#[derive(Debug, Clone)]
pub struct EmergencyDetector {
    keywords: &'static [&'static str],
}

impl Default for EmergencyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencyDetector {
    pub fn new() -> Self {
        Self {
            keywords: EMERGENCY_KEYWORDS,
        }
    }

    pub fn with_keywords(keywords: &'static [&'static str]) -> Self {
        Self { keywords }
    }

    /// True if any emergency keyword occurs in `text`
    pub fn detect(&self, text: &str) -> bool {
        self.matched_keyword(text).is_some()
    }

    /// First keyword (in list order) found in `text`
    pub fn matched_keyword(&self, text: &str) -> Option<&'static str> {
        let lower = text.to_lowercase();
        self.keywords.iter().copied().find(|k| lower.contains(k))
    }
}
