//! Call initialization record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Script variant selected when the call is created.
///
/// Selects response wording and escalation messaging. Extraction logic is
/// the same for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioVariant {
    /// Standard check call
    #[default]
    General,
    /// Shorter driver check-in script
    DriverCheckin,
    /// Safety-first script used when dispatch suspects an incident
    EmergencyProtocol,
}

impl ScenarioVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioVariant::General => "general",
            ScenarioVariant::DriverCheckin => "driver_checkin",
            ScenarioVariant::EmergencyProtocol => "emergency_protocol",
        }
    }

    pub fn all() -> &'static [ScenarioVariant] {
        &[
            ScenarioVariant::General,
            ScenarioVariant::DriverCheckin,
            ScenarioVariant::EmergencyProtocol,
        ]
    }
}

impl fmt::Display for ScenarioVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "general" => Ok(ScenarioVariant::General),
            "driver_checkin" | "checkin" => Ok(ScenarioVariant::DriverCheckin),
            "emergency_protocol" | "emergency" => Ok(ScenarioVariant::EmergencyProtocol),
            other => Err(Error::UnknownScenario(other.to_string())),
        }
    }
}

/// Immutable per-call record supplied once at call start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    call_id: String,
    driver_name: String,
    load_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone_number: Option<String>,
    #[serde(default)]
    scenario: ScenarioVariant,
    started_at: DateTime<Utc>,
}

impl CallContext {
    /// Create a context with a freshly generated call id
    pub fn new(
        driver_name: impl Into<String>,
        load_number: impl Into<String>,
        scenario: ScenarioVariant,
    ) -> Self {
        Self {
            call_id: uuid::Uuid::new_v4().to_string(),
            driver_name: driver_name.into(),
            load_number: load_number.into(),
            phone_number: None,
            scenario,
            started_at: Utc::now(),
        }
    }

    /// Use a call id assigned by the telephony provider
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn load_number(&self) -> &str {
        &self.load_number
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    pub fn scenario(&self) -> ScenarioVariant {
        self.scenario
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_parsing() {
        assert_eq!(
            "driver_checkin".parse::<ScenarioVariant>().unwrap(),
            ScenarioVariant::DriverCheckin
        );
        assert_eq!(
            "Emergency-Protocol".parse::<ScenarioVariant>().unwrap(),
            ScenarioVariant::EmergencyProtocol
        );
        assert!("sales".parse::<ScenarioVariant>().is_err());
    }

    #[test]
    fn test_scenario_serde() {
        let json = serde_json::to_string(&ScenarioVariant::EmergencyProtocol).unwrap();
        assert_eq!(json, "\"emergency_protocol\"");
    }

    #[test]
    fn test_context_builder() {
        let ctx = CallContext::new("Mike", "L-1001", ScenarioVariant::General)
            .with_call_id("call-1")
            .with_phone_number("+15550100");

        assert_eq!(ctx.call_id(), "call-1");
        assert_eq!(ctx.driver_name(), "Mike");
        assert_eq!(ctx.load_number(), "L-1001");
        assert_eq!(ctx.phone_number(), Some("+15550100"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CallContext::new("A", "1", ScenarioVariant::General);
        let b = CallContext::new("A", "1", ScenarioVariant::General);
        assert_ne!(a.call_id(), b.call_id());
    }
}
