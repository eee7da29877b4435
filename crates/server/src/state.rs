//! Application State
//!
//! Shared state across all handlers, plus the call operations the HTTP and
//! WebSocket surfaces both use.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

use dispatch_voice_agent::{DispatchEngine, EventOutcome, UtteranceOutcome};
use dispatch_voice_config::Settings;
use dispatch_voice_core::{CallContext, CallEvent, CallSnapshot, EndReason, SnapshotSink};
use dispatch_voice_persistence::InMemorySnapshotStore;

use crate::metrics;
use crate::session::{CallRegistry, CallSession};
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Settings>>,
    /// Compiled conversation engine shared by every call
    pub engine: Arc<DispatchEngine>,
    pub calls: Arc<CallRegistry>,
    /// Snapshot store (ScyllaDB or in-memory)
    pub snapshots: Arc<dyn SnapshotSink>,
}

impl AppState {
    /// Create application state with an in-memory snapshot store
    pub fn new(config: Settings) -> Result<Self, ServerError> {
        Self::with_snapshot_sink(config, Arc::new(InMemorySnapshotStore::new()))
    }

    pub fn with_snapshot_sink(
        config: Settings,
        snapshots: Arc<dyn SnapshotSink>,
    ) -> Result<Self, ServerError> {
        let engine = DispatchEngine::from_settings(&config.agent)
            .map_err(|e| ServerError::Internal(format!("Failed to build engine: {}", e)))?;

        Ok(Self {
            calls: Arc::new(CallRegistry::from_settings(&config.server)),
            config: Arc::new(RwLock::new(config)),
            engine: Arc::new(engine),
            snapshots,
        })
    }

    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }

    /// Start a call and speak its opening line
    pub fn start_call(&self, call: CallContext) -> Result<(Arc<CallSession>, String), ServerError> {
        let scenario = call.scenario();
        let mut conversation = self.engine.start_call(call);
        let opening = conversation.open();

        let session = self.calls.create(conversation)?;
        metrics::record_call_started(scenario);
        metrics::record_active_calls(self.calls.count());
        self.persist_in_background(session.snapshot());

        Ok((session, opening.text))
    }

    pub fn session(&self, call_id: &str) -> Result<Arc<CallSession>, ServerError> {
        self.calls
            .get(call_id)
            .ok_or_else(|| ServerError::CallNotFound(call_id.to_string()))
    }

    /// Feed one driver utterance to a live call
    pub fn handle_utterance(&self, session: &CallSession, text: &str) -> UtteranceOutcome {
        let started = Instant::now();
        let was_ended = session.is_ended();
        let outcome = session.with_conversation(|c| c.handle_utterance(text));
        metrics::record_utterance(started.elapsed().as_secs_f64());

        self.record_outcome(&outcome, was_ended);
        self.persist_in_background(outcome.snapshot.clone());
        outcome
    }

    /// Dispatch any inbound call event to a live call
    pub fn handle_event(&self, session: &CallSession, event: CallEvent) -> EventOutcome {
        if let CallEvent::Transcription { text } = event {
            return EventOutcome::Responded(self.handle_utterance(session, &text));
        }

        let was_ended = session.is_ended();
        let outcome = session.with_conversation(|c| c.handle_event(event));
        match &outcome {
            EventOutcome::Ended(snapshot) => self.finish(&session.id, snapshot.clone(), was_ended),
            EventOutcome::Recorded => self.persist_in_background(session.snapshot()),
            EventOutcome::Responded(_) | EventOutcome::Ignored => {},
        }
        outcome
    }

    /// End a live call and return its final snapshot
    pub fn end_call(&self, call_id: &str, reason: EndReason) -> Result<CallSnapshot, ServerError> {
        let session = self.session(call_id)?;
        let was_ended = session.is_ended();
        let snapshot = session.with_conversation(|c| c.end(reason));
        self.finish(call_id, snapshot.clone(), was_ended);
        Ok(snapshot)
    }

    /// Live snapshot first, then the snapshot store
    pub async fn find_snapshot(&self, call_id: &str) -> Result<CallSnapshot, ServerError> {
        if let Some(session) = self.calls.get(call_id) {
            return Ok(session.snapshot());
        }

        self.snapshots
            .load(call_id)
            .await?
            .ok_or_else(|| ServerError::CallNotFound(call_id.to_string()))
    }

    fn record_outcome(&self, outcome: &UtteranceOutcome, was_ended: bool) {
        if outcome.emergency_raised {
            metrics::record_emergency();
        }
        if outcome.degraded {
            metrics::record_fallback();
        }
        if outcome.end_call && !was_ended {
            metrics::record_call_ended(
                EndReason::AgentClosed,
                outcome.snapshot.structured_data.call_outcome,
            );
        }
    }

    /// `was_ended`: the call had already closed and was counted then
    fn finish(&self, call_id: &str, snapshot: CallSnapshot, was_ended: bool) {
        if let (Some(reason), false) = (snapshot.end_reason, was_ended) {
            metrics::record_call_ended(reason, snapshot.structured_data.call_outcome);
        }
        self.calls.remove(call_id);
        metrics::record_active_calls(self.calls.count());
        self.persist_in_background(snapshot);
    }

    /// Persist without blocking the call; failures are logged and counted
    pub fn persist_in_background(&self, snapshot: CallSnapshot) {
        let sink = Arc::clone(&self.snapshots);
        tokio::spawn(async move {
            if let Err(e) = sink.persist(&snapshot).await {
                metrics::record_persistence_failure();
                tracing::warn!(
                    call_id = %snapshot.call_id(),
                    store = sink.name(),
                    error = %e,
                    "Failed to persist call snapshot"
                );
            }
        });
    }
}
