//! Whole-word keyword matching

use regex::Regex;

/// A named list of terms matched on word boundaries.
///
/// `"late"` matches "running late" but not "chocolate". Multi-word terms
/// such as `"on the road"` match as phrases.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    name: &'static str,
    terms: &'static [&'static str],
    pattern: Regex,
}

impl KeywordSet {
    pub fn new(name: &'static str, terms: &'static [&'static str]) -> Result<Self, regex::Error> {
        let alternatives = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))?;

        Ok(Self {
            name,
            terms,
            pattern,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn terms(&self) -> &'static [&'static str] {
        self.terms
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Leftmost matching term as it appears in `text`
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern.find(text).map(|m| m.as_str())
    }
}
