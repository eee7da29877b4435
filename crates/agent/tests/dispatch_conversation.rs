//! Integration tests for dispatch check calls (utterance -> phase -> response)
//!
//! These tests drive whole conversations through the public API.

use std::sync::Arc;

use dispatch_voice_agent::{DispatchConversation, DispatchEngine};
use dispatch_voice_core::{
    CallContext, CallOutcome, ConversationPhase, DelayReason, DriverStatus, EmergencyType,
    SafetyStatus, ScenarioVariant,
};

fn start(scenario: ScenarioVariant) -> DispatchConversation {
    let engine = Arc::new(DispatchEngine::new().unwrap());
    let mut conv = engine.start_call(CallContext::new("Mike", "L-4471", scenario));
    conv.open();
    conv
}

/// Driving report with location and ETA in the first reply
#[test]
fn test_driving_update_first_reply() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("Hi this is Mike, I'm on I-80 near Lincoln, ETA is 3pm");

    assert_eq!(conv.state().phase, ConversationPhase::LocationEta);
    assert!(!outcome.end_call);
    assert!(!outcome.emergency_raised);

    let data = conv.structured_data();
    assert_eq!(data.current_location.as_deref(), Some("I-80"));
    assert_eq!(data.eta.as_deref(), Some("3pm"));
    assert_eq!(data.call_outcome, CallOutcome::InTransitUpdate);
    assert_eq!(data.driver_status, Some(DriverStatus::Driving));
    assert_eq!(
        outcome.response_text,
        "Perfect, thanks for the update. Are there any issues or concerns I should know about with your load or equipment?"
    );

    let outcome = conv.handle_utterance("Nope, all good");
    assert_eq!(conv.state().phase, ConversationPhase::WrapUp);
    assert!(outcome.end_call);
    assert!(outcome.response_text.contains("proof of delivery"));
    assert!(conv.is_ended());
}

#[test]
fn test_status_asked_again_when_first_reply_has_none() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("Hello there");

    assert_eq!(conv.state().phase, ConversationPhase::StatusInquiry);
    assert!(outcome
        .response_text
        .starts_with("I want to make sure I understand correctly."));

    conv.handle_utterance("Yeah I'm driving, on I-25");
    assert_eq!(conv.state().phase, ConversationPhase::LocationEta);
}

#[test]
fn test_location_eta_moves_to_delay_details() {
    let mut conv = start(ScenarioVariant::General);
    conv.handle_utterance("Driving on I-25, should be there at 5pm");
    assert_eq!(conv.state().phase, ConversationPhase::LocationEta);

    let outcome = conv.handle_utterance("Some snow slowing me down");
    assert_eq!(conv.state().phase, ConversationPhase::DelayDetails);
    assert_eq!(conv.structured_data().delay_reason, DelayReason::Weather);
    assert!(outcome.response_text.starts_with("I understand about the delay."));
    assert!(!outcome.end_call);

    let outcome = conv.handle_utterance("That's it");
    assert_eq!(conv.state().phase, ConversationPhase::WrapUp);
    assert!(outcome.end_call);
}

#[test]
fn test_arrival_flow() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("Just arrived at the receiver");

    assert_eq!(conv.state().phase, ConversationPhase::ArrivalDetails);
    assert!(outcome.response_text.starts_with("Good to hear you've arrived."));
    assert_eq!(
        conv.structured_data().call_outcome,
        CallOutcome::ArrivalConfirmation
    );

    let outcome = conv.handle_utterance("We're in door 12 unloading now");
    assert_eq!(conv.state().phase, ConversationPhase::WrapUp);
    assert_eq!(conv.structured_data().unloading_status, "In Door 12");
    assert_eq!(conv.structured_data().driver_status, Some(DriverStatus::Arrived));
    assert!(outcome.end_call);
}

#[test]
fn test_delay_flow() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("I'm delayed, heavy traffic near Denver");

    assert_eq!(conv.state().phase, ConversationPhase::DelayDetails);
    assert!(!outcome.end_call);

    let data = conv.structured_data();
    assert_eq!(data.delay_reason, DelayReason::HeavyTraffic);
    assert_eq!(data.driver_status, Some(DriverStatus::Delayed));
    assert_eq!(data.current_location.as_deref(), Some("Denver"));
}

#[test]
fn test_emergency_sequence_and_escalation() {
    let mut conv = start(ScenarioVariant::General);
    conv.handle_utterance("Still driving");

    let outcome = conv.handle_utterance("We had an accident, everyone is safe");
    assert!(outcome.emergency_raised);
    assert!(conv.state().emergency_detected());
    assert_eq!(conv.state().phase, ConversationPhase::Emergency);

    let data = conv.structured_data();
    assert_eq!(data.call_outcome, CallOutcome::EmergencyEscalation);
    assert_eq!(data.emergency_type, Some(EmergencyType::Accident));
    assert_eq!(data.safety_status, Some(SafetyStatus::ConfirmedSafe));
    assert!(!outcome.end_call);
    assert!(outcome.response_text.contains("exact location"));
}

#[test]
fn test_emergency_asks_location_then_escalates() {
    let mut conv = start(ScenarioVariant::General);

    let outcome = conv.handle_utterance("My truck broke down");
    assert!(outcome.emergency_raised);
    assert!(outcome.response_text.contains("exact location"));

    let outcome = conv.handle_utterance("Yes we are safe");
    assert!(outcome.response_text.contains("exact location"));

    let outcome = conv.handle_utterance("Mile marker 212 on interstate 70");
    assert!(outcome.end_call);
    assert!(outcome.response_text.contains("human dispatcher"));

    let data = conv.structured_data();
    assert_eq!(data.emergency_type, Some(EmergencyType::Breakdown));
    assert_eq!(data.emergency_location.as_deref(), Some("I-70"));
    assert_eq!(
        data.escalation_status.as_deref(),
        Some("Connected to Human Dispatcher")
    );

    // Escalation never regresses to earlier questions
    let outcome = conv.handle_utterance("Hello?");
    assert!(outcome.end_call);
    assert!(outcome.response_text.contains("human dispatcher"));
    assert_eq!(
        conv.structured_data().call_outcome,
        CallOutcome::EmergencyEscalation
    );
}

/// Drivers who never use a recognised safety phrase still get escalated
#[test]
fn test_emergency_escalates_without_safety_phrase() {
    let mut conv = start(ScenarioVariant::General);

    let outcome = conv.handle_utterance("My truck broke down");
    assert!(!outcome.end_call);
    let outcome = conv.handle_utterance("Yes, I'm fine");
    assert!(!outcome.end_call);
    assert!(outcome.response_text.contains("exact location"));

    let outcome = conv.handle_utterance("I'm on I-80 at mile marker 212");
    assert!(outcome.end_call);
    assert!(outcome.response_text.contains("human dispatcher"));
    assert!(conv.is_ended());

    let data = conv.structured_data();
    assert_eq!(data.safety_status, Some(SafetyStatus::Unknown));
    assert_eq!(data.emergency_type, Some(EmergencyType::Breakdown));
    assert_eq!(data.emergency_location.as_deref(), Some("I-80"));
    assert_eq!(
        data.escalation_status.as_deref(),
        Some("Connected to Human Dispatcher")
    );
}

#[test]
fn test_emergency_protocol_escalation() {
    let mut conv = start(ScenarioVariant::EmergencyProtocol);
    conv.handle_utterance("There was a crash but I'm safe");
    let outcome = conv.handle_utterance("Near exit 44");

    assert!(outcome.end_call);
    assert!(outcome.response_text.starts_with("Emergency protocol activated."));
}

#[test]
fn test_emergency_flag_is_monotonic() {
    let mut conv = start(ScenarioVariant::DriverCheckin);
    conv.handle_utterance("Driving, need help with a tire");
    assert!(conv.state().emergency_detected());

    for utterance in ["everything is fine now", "i'm safe", "i-80 exit 10"] {
        conv.handle_utterance(utterance);
        assert!(conv.state().emergency_detected());
        assert_eq!(conv.state().phase, ConversationPhase::Emergency);
        assert_eq!(
            conv.structured_data().call_outcome,
            CallOutcome::EmergencyEscalation
        );
    }
}

#[test]
fn test_no_problem_false_positive() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("No problem at all");

    assert!(outcome.emergency_raised);
    assert!(conv.state().emergency_detected());
    assert_eq!(conv.state().phase, ConversationPhase::Emergency);
}

#[test]
fn test_agent_lines_do_not_trigger_emergency() {
    let mut conv = start(ScenarioVariant::General);
    // The clarification line mentions "trouble"; only driver text is scanned
    conv.handle_utterance("Hello there");
    conv.handle_utterance("umm");
    assert_eq!(conv.state().phase, ConversationPhase::Clarification);
    conv.handle_utterance("pardon");

    assert!(!conv.state().emergency_detected());
}

#[test]
fn test_clarification_exhaustion_ends_call() {
    let mut conv = start(ScenarioVariant::General);
    conv.handle_utterance("Hello there");
    conv.handle_utterance("umm");
    assert_eq!(conv.state().phase, ConversationPhase::Clarification);
    assert_eq!(conv.state().clarification_attempts, 0);

    conv.handle_utterance("pardon");
    assert_eq!(conv.state().phase, ConversationPhase::StatusInquiry);
    assert_eq!(conv.state().clarification_attempts, 1);

    conv.handle_utterance("sorry");
    assert_eq!(conv.state().phase, ConversationPhase::Clarification);

    let outcome = conv.handle_utterance("okay");
    assert_eq!(conv.state().phase, ConversationPhase::WrapUp);
    assert_eq!(conv.state().clarification_attempts, 2);
    assert!(outcome.end_call);
    assert!(outcome
        .response_text
        .starts_with("I'll make a note about your status."));
}

#[test]
fn test_general_wrap_up_short_acknowledgement() {
    let mut conv = start(ScenarioVariant::General);
    conv.handle_utterance("Driving on I-80, ETA 6pm");

    let outcome = conv.handle_utterance("yeah");
    assert_eq!(conv.state().phase, ConversationPhase::WrapUp);
    assert!(!outcome.end_call);
    assert!(outcome.response_text.starts_with("Thanks for the update. Just to confirm"));

    let outcome = conv.handle_utterance("no");
    assert!(outcome.end_call);
    assert!(outcome.response_text.starts_with("Thank you for the comprehensive update."));
}

#[test]
fn test_driver_checkin_closing() {
    let mut conv = start(ScenarioVariant::DriverCheckin);
    let outcome = conv.handle_utterance("Arrived, in door 3");
    assert_eq!(
        outcome.response_text,
        "Excellent. How's the unloading process going? Any issues with the receiver?"
    );

    let outcome = conv.handle_utterance("fine");
    assert!(outcome.end_call);
    assert!(outcome.response_text.contains("submit your POD"));
}

#[test]
fn test_emergency_protocol_all_clear() {
    let mut conv = start(ScenarioVariant::EmergencyProtocol);
    let outcome = conv.handle_utterance("I'm on I-80, all good");

    assert_eq!(conv.state().phase, ConversationPhase::LocationEta);
    assert!(outcome.end_call);
    assert!(outcome.response_text.contains("No emergency assistance needed"));
}

#[test]
fn test_uncooperative_overlay() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("I'm busy, driving");

    assert!(outcome
        .response_text
        .ends_with("This helps us serve our customers better."));
}

/// The pointed status question replaces the line only while the status is
/// still unresolved; once the driver reports one the detail line is spoken
#[test]
fn test_conflicting_overlay_stops_at_location_eta() {
    let mut conv = start(ScenarioVariant::General);
    conv.handle_utterance("hm");
    conv.handle_utterance("uh");
    assert_eq!(conv.state().phase, ConversationPhase::Clarification);

    let outcome = conv.handle_utterance("driving now");
    assert_eq!(conv.state().phase, ConversationPhase::StatusInquiry);
    assert_eq!(conv.state().clarification_attempts, 1);
    assert!(outcome
        .response_text
        .starts_with("I want to make sure I understand correctly. Let me ask specifically"));

    let outcome = conv.handle_utterance("driving now");
    assert_eq!(conv.state().phase, ConversationPhase::LocationEta);
    assert_eq!(conv.state().clarification_attempts, 1);
    assert_eq!(
        outcome.response_text,
        "Perfect, thanks for the update. Are there any issues or concerns I should know about with your load or equipment?"
    );
}

/// Any sequence that eventually states a status reaches WRAP_UP in bounded turns
#[test]
fn test_wrap_up_reachable() {
    let sequences: [&[&str]; 4] = [
        &["driving", "fine"],
        &["hello", "arrived", "ok then"],
        &["hm", "uh", "driving now", "driving now", "that's all"],
        &["hm", "uh", "eh", "er", "oh"],
    ];

    for sequence in sequences {
        let mut conv = start(ScenarioVariant::General);
        for utterance in sequence {
            conv.handle_utterance(utterance);
        }
        assert_eq!(
            conv.state().phase,
            ConversationPhase::WrapUp,
            "sequence: {:?}",
            sequence
        );
        assert!(conv.state().clarification_attempts <= 2);
    }
}

#[test]
fn test_extraction_idempotent_across_snapshots() {
    let mut conv = start(ScenarioVariant::General);
    let outcome = conv.handle_utterance("Driving on I-80 near Omaha, ETA 4pm");

    assert_eq!(&outcome.snapshot.structured_data, conv.structured_data());
    assert_eq!(outcome.snapshot.transcript.len(), 3);

    let json = serde_json::to_value(&outcome.snapshot).unwrap();
    assert_eq!(json["structured_data"]["call_outcome"], "In-Transit Update");
    assert_eq!(json["state"]["phase"], "location_eta");
}
