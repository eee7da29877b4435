//! Field extraction for dispatch check calls
//!
//! Rule-based extraction over the lower-cased driver transcript. Every rule
//! is a priority-ordered pattern list where the first match wins, and every
//! rule has a neutral default when nothing matches. `extract` rebuilds the
//! whole `StructuredData` from scratch, so calling it twice on the same
//! transcript yields the same result.

use dispatch_voice_core::structured::{ESCALATION_CONNECTED, UNLOADING_NOT_APPLICABLE};
use dispatch_voice_core::{
    CallOutcome, ConversationState, DelayReason, DriverStatus, EmergencyType, InjuryStatus,
    SafetyStatus, StructuredData,
};
use regex::Regex;

use crate::keywords::KeywordSet;
use crate::Result;

/// How a location capture is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocationFormat {
    /// Already a full reference, e.g. "i-80 westbound"
    Verbatim,
    Interstate,
    MileMarker,
    Exit,
    Highway,
    Route,
    UsHighway,
    City,
    County,
}

impl LocationFormat {
    fn render(&self, capture: &str) -> String {
        let capture = capture.trim().trim_end_matches(['.', '!', '?', ';', ':']);
        match self {
            LocationFormat::Verbatim => title_case(capture),
            LocationFormat::Interstate => format!("I-{}", capture),
            LocationFormat::MileMarker => format!("Mile Marker {}", capture),
            LocationFormat::Exit => format!("Exit {}", capture.to_uppercase()),
            LocationFormat::Highway => format!("Highway {}", capture),
            LocationFormat::Route => format!("Route {}", capture),
            LocationFormat::UsHighway => format!("US-{}", capture),
            LocationFormat::City => format!("{} City", title_case(capture)),
            LocationFormat::County => format!("{} County", title_case(capture)),
        }
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words after "near/at/in" that do not start a place name
const PLACE_STOPWORDS: &[&str] = &[
    "the", "a", "an", "all", "least", "this", "that", "my", "our", "your", "about", "around",
    "time", "some", "it", "once", "door", "no", "any", "what", "night", "morning", "afternoon",
    "evening", "traffic", "dock", "moment", "minute", "minutes", "hour", "hours", "front",
    "line", "here", "there",
];

/// Words that end a place name
const PLACE_CONNECTORS: &[&str] = &[
    "and", "but", "so", "eta", "with", "for", "about", "right", "now", "because", "should",
    "will", "probably", "maybe", "by",
];

/// Extractor for dispatch status fields
pub struct FieldExtractor {
    /// Road references, in priority order
    road_patterns: Vec<(Regex, LocationFormat)>,
    /// "near/at/in" preceding a place name
    place_prefix: Regex,
    /// Up to three words following a place prefix
    place_words: Regex,
    /// "<word> city" / "<word> county"
    locality_patterns: Vec<(Regex, LocationFormat)>,
    eta_patterns: Vec<Regex>,
    door_pattern: Regex,
    delay_categories: Vec<(KeywordSet, DelayReason)>,
    arrival_terms: KeywordSet,
    delayed_terms: KeywordSet,
    unloading_terms: KeywordSet,
    waiting_terms: KeywordSet,
    detention_terms: KeywordSet,
    pod_terms: KeywordSet,
    emergency_types: Vec<(KeywordSet, EmergencyType)>,
    safe_terms: KeywordSet,
    safety_concern_terms: KeywordSet,
    no_injury_terms: KeywordSet,
    injury_terms: KeywordSet,
    load_secure_terms: KeywordSet,
    load_insecure_terms: KeywordSet,
}

impl FieldExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            road_patterns: Self::build_road_patterns()?,
            place_prefix: Regex::new(r"\b(?:near|at|in)[ \t]+(?:the[ \t]+)?")?,
            place_words: Regex::new(r"^[a-z]+(?:[ \t]+[a-z]+){0,2}")?,
            locality_patterns: vec![
                (Regex::new(r"\b([a-z]+)[ \t]+city\b")?, LocationFormat::City),
                (Regex::new(r"\b([a-z]+)[ \t]+county\b")?, LocationFormat::County),
            ],
            eta_patterns: Self::build_eta_patterns()?,
            door_pattern: Regex::new(r"door\s*(\d+)")?,
            delay_categories: Self::build_delay_categories()?,
            arrival_terms: KeywordSet::new(
                "arrival",
                &["arrived", "here", "at the dock", "destination"],
            )?,
            delayed_terms: KeywordSet::new(
                "delayed",
                &["delayed", "late", "behind schedule", "running late"],
            )?,
            unloading_terms: KeywordSet::new("unloading", &["unloading", "door"])?,
            waiting_terms: KeywordSet::new("waiting", &["waiting", "lumper"])?,
            detention_terms: KeywordSet::new("detention", &["detention"])?,
            pod_terms: KeywordSet::new(
                "pod",
                &[
                    "pod",
                    "proof of delivery",
                    "paperwork",
                    "receipt",
                    "delivery confirmation",
                ],
            )?,
            emergency_types: Self::build_emergency_types()?,
            safe_terms: KeywordSet::new(
                "safe",
                &[
                    "everyone is safe",
                    "everyone's safe",
                    "we're safe",
                    "we are safe",
                    "i'm safe",
                    "i am safe",
                    "i'm okay",
                    "i am okay",
                    "all safe",
                    "no one hurt",
                    "nobody hurt",
                    "nobody is hurt",
                ],
            )?,
            safety_concern_terms: KeywordSet::new(
                "safety_concern",
                &["not safe", "unsafe", "danger", "dangerous"],
            )?,
            no_injury_terms: KeywordSet::new(
                "no_injury",
                &[
                    "no injuries",
                    "no injury",
                    "no one hurt",
                    "nobody hurt",
                    "nobody is hurt",
                    "not injured",
                    "not hurt",
                ],
            )?,
            injury_terms: KeywordSet::new(
                "injury",
                &["injury", "injuries", "hurt", "injured", "bleeding", "unconscious"],
            )?,
            load_secure_terms: KeywordSet::new(
                "load_secure",
                &[
                    "load is secure",
                    "load's secure",
                    "load is safe",
                    "load safe",
                    "cargo secure",
                    "cargo is secure",
                ],
            )?,
            load_insecure_terms: KeywordSet::new(
                "load_insecure",
                &[
                    "load shifted",
                    "load is not secure",
                    "cargo damaged",
                    "spilled",
                ],
            )?,
        })
    }

    fn build_road_patterns() -> Result<Vec<(Regex, LocationFormat)>> {
        Ok(vec![
            (
                Regex::new(
                    r"\b(i-\d+[^,\s]*(?:[ \t]+(?:north|south|east|west)(?:bound)?)?)",
                )?,
                LocationFormat::Verbatim,
            ),
            (
                Regex::new(r"\binterstate[ \t]+(\d+)")?,
                LocationFormat::Interstate,
            ),
            (
                Regex::new(r"\bmile[ \t]*marker[ \t]+(\d+)")?,
                LocationFormat::MileMarker,
            ),
            (Regex::new(r"\bexit[ \t]+(\d+[a-z]?)\b")?, LocationFormat::Exit),
            (
                Regex::new(r"\b(?:highway|hwy)[ \t]+(\d+)")?,
                LocationFormat::Highway,
            ),
            (Regex::new(r"\broute[ \t]+(\d+)")?, LocationFormat::Route),
            (
                Regex::new(r"\bus(?:-|[ \t]+(?:highway|hwy|route)[ \t]+)(\d+)")?,
                LocationFormat::UsHighway,
            ),
        ])
    }

    fn build_eta_patterns() -> Result<Vec<Regex>> {
        Ok(vec![
            // Clock time: "3:30", "3:30 pm"
            Regex::new(r"\b(\d{1,2}:\d{2}(?:[ \t]*(?:am|pm))?)")?,
            // Hour with meridiem: "3pm", "11 am"
            Regex::new(r"\b(\d{1,2}[ \t]*(?:am|pm))\b")?,
            Regex::new(r"\b(tomorrow(?:[ \t]+(?:morning|afternoon|evening|night))?)\b")?,
            Regex::new(r"\b(today(?:[ \t]+(?:morning|afternoon|evening))?)\b")?,
            Regex::new(r"\b(tonight)\b")?,
            // Relative: "in 2 hours", "in about 45 minutes"
            Regex::new(
                r"\b(in[ \t]+(?:about[ \t]+|around[ \t]+)?\d+(?:\.\d+)?[ \t]*(?:hours?|hrs?|minutes?|mins?))\b",
            )?,
            Regex::new(r"\b(\d+(?:\.\d+)?[ \t]*(?:hours?|hrs?|minutes?|mins?))\b")?,
            Regex::new(r"\baround[ \t]+(\d{1,2}(?::\d{2})?)\b")?,
        ])
    }

    fn build_delay_categories() -> Result<Vec<(KeywordSet, DelayReason)>> {
        Ok(vec![
            (
                KeywordSet::new("traffic", &["traffic", "congestion", "jam"])?,
                DelayReason::HeavyTraffic,
            ),
            (
                KeywordSet::new("weather", &["weather", "rain", "snow", "storm", "fog"])?,
                DelayReason::Weather,
            ),
            (
                KeywordSet::new(
                    "mechanical",
                    &["mechanical", "breakdown", "engine", "tire", "maintenance"],
                )?,
                DelayReason::Mechanical,
            ),
            (
                KeywordSet::new(
                    "loading",
                    &["loading", "unloading", "shipper", "receiver", "warehouse"],
                )?,
                DelayReason::LoadingUnloading,
            ),
            (
                KeywordSet::new("generic_delay", &["delayed", "delay", "late", "behind"])?,
                DelayReason::Other,
            ),
        ])
    }

    fn build_emergency_types() -> Result<Vec<(KeywordSet, EmergencyType)>> {
        Ok(vec![
            (
                KeywordSet::new("accident", &["accident", "crash", "collision", "hit"])?,
                EmergencyType::Accident,
            ),
            (
                KeywordSet::new(
                    "breakdown",
                    &[
                        "breakdown",
                        "broke down",
                        "mechanical",
                        "engine",
                        "tire",
                        "blowout",
                    ],
                )?,
                EmergencyType::Breakdown,
            ),
            (
                KeywordSet::new(
                    "medical",
                    &[
                        "medical",
                        "injury",
                        "hurt",
                        "sick",
                        "chest pain",
                        "dizzy",
                    ],
                )?,
                EmergencyType::Medical,
            ),
        ])
    }

    /// Rebuild structured data from the full driver transcript
    pub fn extract(&self, transcript: &str, state: &ConversationState) -> StructuredData {
        let text = transcript.to_lowercase();
        let location = self.extract_location(&text);

        let mut data = StructuredData {
            current_location: location.clone(),
            eta: self.extract_eta(&text),
            delay_reason: self.extract_delay_reason(&text),
            unloading_status: self.extract_unloading_status(&text),
            pod_reminder_acknowledged: self.extract_pod_acknowledged(&text),
            ..StructuredData::default()
        };

        if state.emergency_detected() {
            // The emergency branch is authoritative once the flag is raised
            data.call_outcome = CallOutcome::EmergencyEscalation;
            data.driver_status = None;
            data.emergency_location = location;
            data.emergency_type = Some(self.classify_emergency_type(&text));
            data.safety_status = Some(self.classify_safety(&text));
            data.injury_status = Some(self.classify_injury(&text));
            data.load_secure = self.classify_load_secure(&text);
            if data.emergency_details_complete() {
                data.escalation_status = Some(ESCALATION_CONNECTED.to_string());
            }
        } else {
            let (outcome, status) = self.classify_outcome(&text);
            data.call_outcome = outcome;
            data.driver_status = Some(status);
        }

        data
    }

    /// Road reference first, then "near/at/in <place>", then city/county
    pub fn extract_location(&self, text: &str) -> Option<String> {
        for (pattern, format) in &self.road_patterns {
            if let Some(caps) = pattern.captures(text) {
                if let Some(m) = caps.get(1) {
                    return Some(format.render(m.as_str()));
                }
            }
        }

        if let Some(place) = self.extract_place(text) {
            return Some(place);
        }

        for (pattern, format) in &self.locality_patterns {
            if let Some(caps) = pattern.captures(text) {
                if let Some(m) = caps.get(1) {
                    return Some(format.render(m.as_str()));
                }
            }
        }

        None
    }

    fn extract_place(&self, text: &str) -> Option<String> {
        for prefix in self.place_prefix.find_iter(text) {
            let Some(m) = self.place_words.find(&text[prefix.end()..]) else {
                continue;
            };
            let mut words = m.as_str().split_whitespace().peekable();

            match words.peek() {
                Some(first) if !PLACE_STOPWORDS.contains(first) => {},
                _ => continue,
            }

            let name: Vec<&str> = words
                .take_while(|w| !PLACE_CONNECTORS.contains(w))
                .collect();
            if !name.is_empty() {
                return Some(title_case(&name.join(" ")));
            }
        }
        None
    }

    pub fn extract_eta(&self, text: &str) -> Option<String> {
        self.eta_patterns.iter().find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        })
    }

    pub fn extract_delay_reason(&self, text: &str) -> DelayReason {
        self.delay_categories
            .iter()
            .find(|(terms, _)| terms.matches(text))
            .map(|(_, reason)| *reason)
            .unwrap_or(DelayReason::NoDelay)
    }

    pub fn extract_unloading_status(&self, text: &str) -> String {
        if !self.unloading_terms.matches(text) {
            return UNLOADING_NOT_APPLICABLE.to_string();
        }

        if let Some(door) = self
            .door_pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
        {
            format!("In Door {}", door.as_str())
        } else if self.waiting_terms.matches(text) {
            "Waiting for Lumper".to_string()
        } else if self.detention_terms.matches(text) {
            "Detention".to_string()
        } else {
            "In Door".to_string()
        }
    }

    pub fn extract_pod_acknowledged(&self, text: &str) -> bool {
        self.pod_terms.matches(text)
    }

    /// Outcome and status for the non-emergency path
    pub fn classify_outcome(&self, text: &str) -> (CallOutcome, DriverStatus) {
        if self.arrival_terms.matches(text) {
            (CallOutcome::ArrivalConfirmation, DriverStatus::Arrived)
        } else if self.delayed_terms.matches(text) {
            (CallOutcome::InTransitUpdate, DriverStatus::Delayed)
        } else {
            (CallOutcome::InTransitUpdate, DriverStatus::Driving)
        }
    }

    pub fn classify_emergency_type(&self, text: &str) -> EmergencyType {
        self.emergency_types
            .iter()
            .find(|(terms, _)| terms.matches(text))
            .map(|(_, kind)| *kind)
            .unwrap_or(EmergencyType::Other)
    }

    /// Reassurance is checked before concern
    pub fn classify_safety(&self, text: &str) -> SafetyStatus {
        if self.safe_terms.matches(text) {
            SafetyStatus::ConfirmedSafe
        } else if self.safety_concern_terms.matches(text) {
            SafetyStatus::ConcernReported
        } else {
            SafetyStatus::Unknown
        }
    }

    /// "No injuries" phrases are checked first so "no one hurt" is not an injury
    pub fn classify_injury(&self, text: &str) -> InjuryStatus {
        if self.no_injury_terms.matches(text) {
            InjuryStatus::NoneReported
        } else if self.injury_terms.matches(text) {
            InjuryStatus::Reported
        } else {
            InjuryStatus::Unknown
        }
    }

    pub fn classify_load_secure(&self, text: &str) -> Option<bool> {
        if self.load_secure_terms.matches(text) {
            Some(true)
        } else if self.load_insecure_terms.matches(text) {
            Some(false)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new().unwrap()
    }

    fn emergency_state() -> ConversationState {
        let mut state = ConversationState::new();
        state.emergency.raise();
        state
    }

    #[test]
    fn test_interstate_location() {
        let e = extractor();
        assert_eq!(
            e.extract_location("i'm on i-80 near lincoln, eta is 3pm"),
            Some("I-80".to_string())
        );
        assert_eq!(
            e.extract_location("heading down i-35 northbound now"),
            Some("I-35 Northbound".to_string())
        );
        assert_eq!(
            e.extract_location("on interstate 70 going west"),
            Some("I-70".to_string())
        );
    }

    #[test]
    fn test_road_pattern_priority() {
        let e = extractor();
        assert_eq!(
            e.extract_location("near exit 12 at mile marker 140"),
            Some("Mile Marker 140".to_string())
        );
        assert_eq!(
            e.extract_location("just past exit 45b"),
            Some("Exit 45B".to_string())
        );
        assert_eq!(
            e.extract_location("on highway 30 by the river"),
            Some("Highway 30".to_string())
        );
        assert_eq!(
            e.extract_location("taking us-6 into town"),
            Some("US-6".to_string())
        );
    }

    #[test]
    fn test_generic_place_location() {
        let e = extractor();
        assert_eq!(
            e.extract_location("i'm near lincoln and should be there soon"),
            Some("Lincoln".to_string())
        );
        assert_eq!(
            e.extract_location("stopped in north platte for fuel"),
            Some("North Platte".to_string())
        );
        // Stopwords after the preposition are skipped
        assert_eq!(
            e.extract_location("at the dock in omaha"),
            Some("Omaha".to_string())
        );
        assert_eq!(e.extract_location("in 2 hours"), None);
    }

    #[test]
    fn test_city_and_county_location() {
        let e = extractor();
        assert_eq!(
            e.extract_location("we're outside dodge city"),
            Some("Dodge City".to_string())
        );
        assert_eq!(
            e.extract_location("somewhere, douglas county"),
            Some("Douglas County".to_string())
        );
    }

    #[test]
    fn test_no_location() {
        assert_eq!(extractor().extract_location("yeah all good"), None);
    }

    #[test]
    fn test_eta_patterns() {
        let e = extractor();
        assert_eq!(e.extract_eta("eta is 3pm"), Some("3pm".to_string()));
        assert_eq!(e.extract_eta("should be 10:45 am"), Some("10:45 am".to_string()));
        assert_eq!(
            e.extract_eta("tomorrow   morning probably"),
            Some("tomorrow morning".to_string())
        );
        assert_eq!(e.extract_eta("there tonight"), Some("tonight".to_string()));
        assert_eq!(
            e.extract_eta("in about 45 minutes"),
            Some("in about 45 minutes".to_string())
        );
        assert_eq!(e.extract_eta("2 hours out"), Some("2 hours".to_string()));
        assert_eq!(e.extract_eta("around 4"), Some("4".to_string()));
        assert_eq!(e.extract_eta("no idea"), None);
    }

    #[test]
    fn test_delay_reason_categories() {
        let e = extractor();
        assert_eq!(
            e.extract_delay_reason("stuck in traffic"),
            DelayReason::HeavyTraffic
        );
        assert_eq!(e.extract_delay_reason("heavy snow"), DelayReason::Weather);
        assert_eq!(
            e.extract_delay_reason("engine light came on"),
            DelayReason::Mechanical
        );
        assert_eq!(
            e.extract_delay_reason("shipper was slow"),
            DelayReason::LoadingUnloading
        );
        assert_eq!(e.extract_delay_reason("running late"), DelayReason::Other);
        assert_eq!(e.extract_delay_reason("all good"), DelayReason::NoDelay);
        // Category order decides when several match
        assert_eq!(
            e.extract_delay_reason("late because of traffic"),
            DelayReason::HeavyTraffic
        );
    }

    #[test]
    fn test_unloading_status() {
        let e = extractor();
        assert_eq!(e.extract_unloading_status("in door 42 now"), "In Door 42");
        assert_eq!(
            e.extract_unloading_status("unloading, waiting on the lumper"),
            "Waiting for Lumper"
        );
        assert_eq!(
            e.extract_unloading_status("unloading but we're on detention"),
            "Detention"
        );
        assert_eq!(e.extract_unloading_status("they're unloading"), "In Door");
        assert_eq!(e.extract_unloading_status("just driving"), "N/A");
    }

    #[test]
    fn test_pod_acknowledged() {
        let e = extractor();
        assert!(e.extract_pod_acknowledged("i'll send the pod"));
        assert!(e.extract_pod_acknowledged("paperwork is done"));
        assert!(!e.extract_pod_acknowledged("podcast is on"));
    }

    #[test]
    fn test_outcome_classification() {
        let e = extractor();
        assert_eq!(
            e.classify_outcome("just arrived at the receiver"),
            (CallOutcome::ArrivalConfirmation, DriverStatus::Arrived)
        );
        assert_eq!(
            e.classify_outcome("running late"),
            (CallOutcome::InTransitUpdate, DriverStatus::Delayed)
        );
        assert_eq!(
            e.classify_outcome("on i-80"),
            (CallOutcome::InTransitUpdate, DriverStatus::Driving)
        );
    }

    #[test]
    fn test_full_extraction_non_emergency() {
        let e = extractor();
        let data = e.extract(
            "Hi this is Mike, I'm on I-80 near Lincoln, ETA is 3pm",
            &ConversationState::new(),
        );

        assert_eq!(data.current_location.as_deref(), Some("I-80"));
        assert_eq!(data.eta.as_deref(), Some("3pm"));
        assert_eq!(data.call_outcome, CallOutcome::InTransitUpdate);
        assert_eq!(data.driver_status, Some(DriverStatus::Driving));
        assert_eq!(data.delay_reason, DelayReason::NoDelay);
        assert_eq!(data.unloading_status, "N/A");
        assert!(data.emergency_type.is_none());
        assert!(data.safety_status.is_none());
    }

    #[test]
    fn test_emergency_extraction() {
        let e = extractor();
        let data = e.extract("We had an accident, everyone is safe", &emergency_state());

        assert_eq!(data.call_outcome, CallOutcome::EmergencyEscalation);
        assert_eq!(data.driver_status, None);
        assert_eq!(data.emergency_type, Some(EmergencyType::Accident));
        assert_eq!(data.safety_status, Some(SafetyStatus::ConfirmedSafe));
        assert_eq!(data.injury_status, Some(InjuryStatus::Unknown));
        assert_eq!(data.emergency_location, None);
        assert_eq!(data.escalation_status, None);
    }

    #[test]
    fn test_emergency_escalation_when_complete() {
        let e = extractor();
        let data = e.extract(
            "we had a blowout\nwe're safe, no one hurt\nmile marker 88 on i-70",
            &emergency_state(),
        );

        assert_eq!(data.emergency_type, Some(EmergencyType::Breakdown));
        assert_eq!(data.injury_status, Some(InjuryStatus::NoneReported));
        assert_eq!(data.emergency_location.as_deref(), Some("I-70"));
        assert_eq!(data.current_location.as_deref(), Some("I-70"));
        assert_eq!(
            data.escalation_status.as_deref(),
            Some("Connected to Human Dispatcher")
        );
    }

    #[test]
    fn test_emergency_classifiers() {
        let e = extractor();
        assert_eq!(
            e.classify_emergency_type("feeling dizzy"),
            EmergencyType::Medical
        );
        assert_eq!(
            e.classify_emergency_type("something is on fire"),
            EmergencyType::Other
        );
        assert_eq!(
            e.classify_safety("it's not safe here"),
            SafetyStatus::ConcernReported
        );
        assert_eq!(e.classify_injury("my partner is bleeding"), InjuryStatus::Reported);
        assert_eq!(e.classify_load_secure("load is secure"), Some(true));
        assert_eq!(e.classify_load_secure("the load shifted"), Some(false));
        assert_eq!(e.classify_load_secure("not sure"), None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let e = extractor();
        let text = "arrived at the receiver, in door 7\nsent the paperwork";
        let state = ConversationState::new();
        assert_eq!(e.extract(text, &state), e.extract(text, &state));

        let state = emergency_state();
        assert_eq!(e.extract(text, &state), e.extract(text, &state));
    }
}
