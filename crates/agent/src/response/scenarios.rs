//! Scripted lines per scenario and phase

use dispatch_voice_core::{
    CallContext, ConversationPhase, DriverStatus, ScenarioVariant, MAX_CLARIFICATION_ATTEMPTS,
};

use super::{is_short_acknowledgement, AgentResponse, ResponseContext};

pub(super) fn greeting(call: &CallContext) -> AgentResponse {
    let text = match call.scenario() {
        ScenarioVariant::EmergencyProtocol => format!(
            "Hi {}, this is Emergency Dispatch calling about load {}. I need to check on your status immediately. Are you safe and do you need any emergency assistance?",
            call.driver_name(),
            call.load_number()
        ),
        ScenarioVariant::General | ScenarioVariant::DriverCheckin => format!(
            "Hi {}! This is Dispatch with a check call on load {}. Can you give me an update on your status?",
            call.driver_name(),
            call.load_number()
        ),
    };
    AgentResponse::new(text, false)
}

pub(super) fn scripted(ctx: &ResponseContext<'_>) -> AgentResponse {
    if ctx.phase == ConversationPhase::Greeting {
        return greeting(ctx.call);
    }

    match ctx.scenario() {
        ScenarioVariant::General => general(ctx),
        ScenarioVariant::DriverCheckin => driver_checkin(ctx),
        ScenarioVariant::EmergencyProtocol => emergency_protocol(ctx),
    }
}

/// Driver status as evidenced so far. The extractor defaults to Driving,
/// which only counts once a location or ETA backs it up.
fn reported_status(ctx: &ResponseContext<'_>) -> Option<DriverStatus> {
    let data = ctx.data;
    match data.driver_status {
        Some(DriverStatus::Driving) if data.current_location.is_none() && data.eta.is_none() => {
            None
        },
        status => status,
    }
}

fn at_door(ctx: &ResponseContext<'_>) -> bool {
    ctx.data.unloading_status.contains("Door")
}

fn clarification_exhausted(ctx: &ResponseContext<'_>) -> bool {
    ctx.clarification_attempts >= MAX_CLARIFICATION_ATTEMPTS
}

fn general(ctx: &ResponseContext<'_>) -> AgentResponse {
    use ConversationPhase::*;

    const TERMINATION: &str = "I'll make a note about your status. Please contact dispatch if you need any assistance with your load. Drive safely!";

    match ctx.phase {
        StatusInquiry => match reported_status(ctx) {
            Some(DriverStatus::Driving) => AgentResponse::new(
                "Great, thanks for the update. What's your current location and estimated arrival time?",
                false,
            ),
            Some(DriverStatus::Arrived) | Some(DriverStatus::Unloading) => AgentResponse::new(
                "Perfect! Are you already unloading or still waiting to get into a dock? What's your unloading status?",
                false,
            ),
            Some(DriverStatus::Delayed) => AgentResponse::new(
                "I understand there's a delay. What's causing the delay and what's your new estimated arrival time?",
                false,
            ),
            None => AgentResponse::new(
                "I want to make sure I understand correctly. Are you currently driving, have you arrived at your destination, or are you delayed somewhere?",
                false,
            ),
        },
        LocationEta if ctx.data.delay_reason.is_delayed() => AgentResponse::new(
            "Thanks for the location and ETA. I see there might be some delays. Is everything okay with the load and truck?",
            false,
        ),
        LocationEta => AgentResponse::new(
            "Perfect, thanks for the update. Are there any issues or concerns I should know about with your load or equipment?",
            false,
        ),
        ArrivalDetails if at_door(ctx) => AgentResponse::new(
            "Excellent. How's the unloading process going? Any issues with the receiver or paperwork?",
            false,
        ),
        ArrivalDetails => AgentResponse::new(
            "Good to hear you've arrived. Have you started unloading yet, or are you still waiting to get assigned to a dock?",
            false,
        ),
        DelayDetails => AgentResponse::new(
            "I understand about the delay. Keep us updated if anything changes. Is there anything else I should know about your load or situation?",
            false,
        ),
        Clarification if clarification_exhausted(ctx) => AgentResponse::new(TERMINATION, true),
        Clarification => AgentResponse::new(
            "I'm having trouble hearing you clearly. Could you please repeat your current status - are you driving, arrived, or delayed?",
            false,
        ),
        WrapUp if clarification_exhausted(ctx) => AgentResponse::new(TERMINATION, true),
        // One extra confirming round before closing
        WrapUp if !ctx.wrap_up_prompted && is_short_acknowledgement(ctx.utterance) => {
            AgentResponse::new(
                "Thanks for the update. Just to confirm - do you need any assistance from dispatch, and do you have any other concerns about your load?",
                false,
            )
        },
        WrapUp => AgentResponse::new(
            "Thank you for the comprehensive update. Drive safely and remember to submit your proof of delivery when you complete the load. Contact us if anything changes!",
            true,
        ),
        Greeting | Emergency => AgentResponse::new(
            "I want to make sure I have all the details. Could you please give me a quick status update on your current situation?",
            false,
        ),
    }
}

fn driver_checkin(ctx: &ResponseContext<'_>) -> AgentResponse {
    use ConversationPhase::*;

    const TERMINATION: &str =
        "I'll make a note about your status. Please contact dispatch if you need assistance. Drive safely!";

    match ctx.phase {
        StatusInquiry => match reported_status(ctx) {
            Some(DriverStatus::Driving) => AgentResponse::new(
                "Great, thanks for the update. What's your current location and estimated arrival time?",
                false,
            ),
            Some(DriverStatus::Arrived) | Some(DriverStatus::Unloading) => AgentResponse::new(
                "Perfect! Are you already unloading or still waiting to get into a dock? What door are you in?",
                false,
            ),
            Some(DriverStatus::Delayed) => AgentResponse::new(
                "I understand there's a delay. What's causing the delay and when do you expect to arrive?",
                false,
            ),
            None => AgentResponse::new(
                "Could you give me a bit more detail about your current situation? Are you driving, at your destination, or experiencing any delays?",
                false,
            ),
        },
        LocationEta if ctx.data.delay_reason.is_delayed() => AgentResponse::new(
            "Thanks for the location and ETA. I see there might be some delays. Any issues with your load or equipment?",
            false,
        ),
        LocationEta => AgentResponse::new(
            "Perfect, thanks for the update. Any concerns with your load or truck I should know about?",
            false,
        ),
        ArrivalDetails if at_door(ctx) => AgentResponse::new(
            "Excellent. How's the unloading process going? Any issues with the receiver?",
            false,
        ),
        ArrivalDetails => AgentResponse::new(
            "Good to hear you've arrived. Are you unloading or waiting for a dock assignment?",
            false,
        ),
        DelayDetails => AgentResponse::new(
            "I understand about the delay. Keep us updated if anything changes. Any other concerns about your load?",
            false,
        ),
        Clarification | WrapUp if clarification_exhausted(ctx) => {
            AgentResponse::new(TERMINATION, true)
        },
        Clarification => AgentResponse::new(
            "I want to make sure I have all the details. Can you tell me more about your current situation?",
            false,
        ),
        WrapUp => AgentResponse::new(
            "Thank you for the detailed update. Drive safely and remember to submit your POD when you complete the load. Contact us if anything changes!",
            true,
        ),
        Greeting | Emergency => AgentResponse::new(
            "Could you please give me a quick status update on your current situation?",
            false,
        ),
    }
}

fn emergency_protocol(ctx: &ResponseContext<'_>) -> AgentResponse {
    use ConversationPhase::*;

    const SAFETY_CHECK: &str = "I need to confirm your safety status. Are there any immediate concerns or emergencies I should be aware of?";

    match ctx.phase {
        StatusInquiry => match reported_status(ctx) {
            Some(DriverStatus::Driving) => AgentResponse::new(
                "Understood. What's your exact location? Any mechanical issues or safety concerns?",
                false,
            ),
            Some(DriverStatus::Arrived) | Some(DriverStatus::Unloading) => AgentResponse::new(
                "Good. Any issues with unloading or receiver? Load secure?",
                false,
            ),
            Some(DriverStatus::Delayed) => AgentResponse::new(
                "Understood. What's causing the delay, and are you and your load secure?",
                false,
            ),
            None => AgentResponse::new(
                "I need to confirm your safety status. Are you and your load secure with no immediate concerns?",
                false,
            ),
        },
        LocationEta | ArrivalDetails | DelayDetails => AgentResponse::new(
            "Thank you for the update. No emergency assistance needed then. Continue with your delivery and contact us immediately if any situation changes.",
            true,
        ),
        Clarification | WrapUp if clarification_exhausted(ctx) => AgentResponse::new(
            "I'll make a note about your status. Please contact emergency dispatch immediately if any situation changes. Drive safely!",
            true,
        ),
        WrapUp => AgentResponse::new(
            "Emergency protocol complete - no immediate concerns. Drive safely and contact emergency dispatch immediately if any situation changes. Stay vigilant!",
            true,
        ),
        Clarification | Greeting | Emergency => AgentResponse::new(SAFETY_CHECK, false),
    }
}
