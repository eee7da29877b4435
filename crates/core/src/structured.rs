//! Structured status data extracted from a call
//!
//! Serialized names match the labels dispatch reports use, e.g.
//! `"In-Transit Update"` or `"Heavy Traffic"`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CallOutcome {
    #[default]
    #[serde(rename = "In-Transit Update")]
    InTransitUpdate,
    #[serde(rename = "Arrival Confirmation")]
    ArrivalConfirmation,
    #[serde(rename = "Emergency Escalation")]
    EmergencyEscalation,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::InTransitUpdate => "In-Transit Update",
            CallOutcome::ArrivalConfirmation => "Arrival Confirmation",
            CallOutcome::EmergencyEscalation => "Emergency Escalation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverStatus {
    Driving,
    Delayed,
    Arrived,
    Unloading,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Driving => "Driving",
            DriverStatus::Delayed => "Delayed",
            DriverStatus::Arrived => "Arrived",
            DriverStatus::Unloading => "Unloading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DelayReason {
    #[serde(rename = "Heavy Traffic")]
    HeavyTraffic,
    Weather,
    Mechanical,
    #[serde(rename = "Loading/Unloading")]
    LoadingUnloading,
    Other,
    #[default]
    #[serde(rename = "None")]
    NoDelay,
}

impl DelayReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelayReason::HeavyTraffic => "Heavy Traffic",
            DelayReason::Weather => "Weather",
            DelayReason::Mechanical => "Mechanical",
            DelayReason::LoadingUnloading => "Loading/Unloading",
            DelayReason::Other => "Other",
            DelayReason::NoDelay => "None",
        }
    }

    pub fn is_delayed(&self) -> bool {
        !matches!(self, DelayReason::NoDelay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyType {
    Accident,
    Breakdown,
    Medical,
    Other,
}

impl EmergencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyType::Accident => "Accident",
            EmergencyType::Breakdown => "Breakdown",
            EmergencyType::Medical => "Medical",
            EmergencyType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyStatus {
    #[serde(rename = "Driver confirmed everyone is safe")]
    ConfirmedSafe,
    #[serde(rename = "Safety concerns reported")]
    ConcernReported,
    #[serde(rename = "Safety status unknown")]
    Unknown,
}

impl SafetyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::ConfirmedSafe => "Driver confirmed everyone is safe",
            SafetyStatus::ConcernReported => "Safety concerns reported",
            SafetyStatus::Unknown => "Safety status unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjuryStatus {
    #[serde(rename = "No injuries reported")]
    NoneReported,
    #[serde(rename = "Injuries reported")]
    Reported,
    #[serde(rename = "Injury status unknown")]
    Unknown,
}

impl InjuryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjuryStatus::NoneReported => "No injuries reported",
            InjuryStatus::Reported => "Injuries reported",
            InjuryStatus::Unknown => "Injury status unknown",
        }
    }
}

pub const UNLOADING_NOT_APPLICABLE: &str = "N/A";

pub const ESCALATION_CONNECTED: &str = "Connected to Human Dispatcher";

/// Snapshot of everything extracted from a call's transcript.
///
/// Rebuilt from the full transcript after every utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    pub call_outcome: CallOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_status: Option<DriverStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(default)]
    pub delay_reason: DelayReason,
    #[serde(default = "default_unloading_status")]
    pub unloading_status: String,
    #[serde(default)]
    pub pod_reminder_acknowledged: bool,

    // Emergency-only fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_type: Option<EmergencyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_status: Option<SafetyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_status: Option<InjuryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_status: Option<String>,
}

fn default_unloading_status() -> String {
    UNLOADING_NOT_APPLICABLE.to_string()
}

impl Default for StructuredData {
    fn default() -> Self {
        Self {
            call_outcome: CallOutcome::default(),
            driver_status: None,
            current_location: None,
            eta: None,
            delay_reason: DelayReason::default(),
            unloading_status: default_unloading_status(),
            pod_reminder_acknowledged: false,
            emergency_type: None,
            safety_status: None,
            injury_status: None,
            emergency_location: None,
            load_secure: None,
            escalation_status: None,
        }
    }
}

impl StructuredData {
    pub fn is_emergency(&self) -> bool {
        self.call_outcome == CallOutcome::EmergencyEscalation
    }

    /// Any classified safety status counts, including "unknown"
    pub fn safety_recorded(&self) -> bool {
        self.safety_status.is_some()
    }

    /// All three fields the emergency sequence collects are present
    pub fn emergency_details_complete(&self) -> bool {
        self.safety_recorded()
            && self.emergency_location.is_some()
            && self.emergency_type.is_some()
    }
}
