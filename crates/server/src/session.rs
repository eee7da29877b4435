//! Live call registry
//!
//! Each live call owns one `DispatchConversation` behind a mutex, so
//! utterances for the same call are applied strictly in arrival order while
//! different calls proceed independently. A background task ends calls that
//! have gone quiet for longer than the idle timeout.

use dispatch_voice_agent::DispatchConversation;
use dispatch_voice_config::ServerConfig;
use dispatch_voice_core::{CallSnapshot, EndReason, SnapshotSink};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::metrics;
use crate::ServerError;

/// One live call
pub struct CallSession {
    pub id: String,
    conversation: Mutex<DispatchConversation>,
    pub created_at: Instant,
    last_activity: RwLock<Instant>,
}

impl CallSession {
    pub fn new(conversation: DispatchConversation) -> Self {
        Self {
            id: conversation.call_id().to_string(),
            conversation: Mutex::new(conversation),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Run `f` with exclusive access to the conversation and mark the call active.
    ///
    /// The lock is synchronous; never hold it across an await point.
    pub fn with_conversation<R>(&self, f: impl FnOnce(&mut DispatchConversation) -> R) -> R {
        let result = {
            let mut conversation = self.conversation.lock();
            f(&mut conversation)
        };
        self.touch();
        result
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.conversation.lock().snapshot()
    }

    pub fn is_ended(&self) -> bool {
        self.conversation.lock().is_ended()
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }
}

/// Registry of live calls
pub struct CallRegistry {
    calls: RwLock<HashMap<String, Arc<CallSession>>>,
    max_calls: usize,
    idle_timeout: Duration,
    cleanup_interval: Duration,
}

impl CallRegistry {
    pub fn new(max_calls: usize) -> Self {
        Self::with_config(max_calls, Duration::from_secs(300), Duration::from_secs(30))
    }

    pub fn with_config(max_calls: usize, idle_timeout: Duration, cleanup_interval: Duration) -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            max_calls,
            idle_timeout,
            cleanup_interval,
        }
    }

    pub fn from_settings(config: &ServerConfig) -> Self {
        Self::with_config(
            config.max_calls,
            Duration::from_secs(config.call_idle_timeout_secs),
            Duration::from_secs(config.cleanup_interval_secs),
        )
    }

    /// Start a background task that ends idle calls and persists their
    /// final snapshots.
    ///
    /// Returns a shutdown sender that stops the task.
    pub fn start_cleanup_task(self: &Arc<Self>, sink: Arc<dyn SnapshotSink>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let interval = registry.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let reaped = registry.reap_idle();
                        if !reaped.is_empty() {
                            tracing::info!(
                                reaped = reaped.len(),
                                remaining = registry.count(),
                                "Idle call cleanup"
                            );
                        }
                        for snapshot in reaped {
                            if let Err(e) = sink.persist(&snapshot).await {
                                metrics::record_persistence_failure();
                                tracing::warn!(
                                    call_id = %snapshot.call_id(),
                                    error = %e,
                                    "Failed to persist final snapshot"
                                );
                            }
                        }
                        metrics::record_active_calls(registry.count());
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Call cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Register a new call.
    ///
    /// Calls that already ended are dropped first to make room.
    pub fn create(&self, conversation: DispatchConversation) -> Result<Arc<CallSession>, ServerError> {
        let mut calls = self.calls.write();

        if calls.len() >= self.max_calls {
            calls.retain(|_, call| !call.is_ended());
            if calls.len() >= self.max_calls {
                return Err(ServerError::CapacityReached(self.max_calls));
            }
        }

        let session = Arc::new(CallSession::new(conversation));
        calls.insert(session.id.clone(), Arc::clone(&session));
        tracing::info!(call_id = %session.id, active = calls.len(), "Registered call");

        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<CallSession>> {
        self.calls.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<CallSession>> {
        let removed = self.calls.write().remove(id);
        if removed.is_some() {
            tracing::info!(call_id = %id, "Removed call");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.calls.read().len()
    }

    pub fn list(&self) -> Vec<String> {
        self.calls.read().keys().cloned().collect()
    }

    /// Remove calls idle past the timeout, ending any still in progress.
    ///
    /// Returns the final snapshots of the calls that were still in progress.
    pub fn reap_idle(&self) -> Vec<CallSnapshot> {
        let expired: Vec<Arc<CallSession>> = {
            let mut calls = self.calls.write();
            let ids: Vec<String> = calls
                .iter()
                .filter(|(_, call)| call.is_expired(self.idle_timeout))
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| calls.remove(id)).collect()
        };

        expired
            .into_iter()
            .filter_map(|call| {
                let mut conversation = call.conversation.lock();
                if conversation.is_ended() {
                    return None;
                }
                let snapshot = conversation.end(EndReason::IdleTimeout);
                metrics::record_call_ended(
                    EndReason::IdleTimeout,
                    snapshot.structured_data.call_outcome,
                );
                tracing::info!(call_id = %call.id, "Ended idle call");
                Some(snapshot)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_voice_agent::DispatchEngine;
    use dispatch_voice_core::{CallContext, ScenarioVariant};

    fn conversation(engine: &Arc<DispatchEngine>) -> DispatchConversation {
        engine.start_call(CallContext::new("Mike", "L-9", ScenarioVariant::General))
    }

    fn engine() -> Arc<DispatchEngine> {
        Arc::new(DispatchEngine::new().unwrap())
    }

    #[test]
    fn test_call_registration() {
        let engine = engine();
        let registry = CallRegistry::new(10);
        let call = registry.create(conversation(&engine)).unwrap();

        assert!(!call.is_expired(Duration::from_secs(60)));
        assert_eq!(registry.get(&call.id).unwrap().id, call.id);
        assert_eq!(registry.list(), vec![call.id.clone()]);

        registry.remove(&call.id);
        assert!(registry.get(&call.id).is_none());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_capacity_reclaims_ended_calls() {
        let engine = engine();
        let registry = CallRegistry::new(1);
        let first = registry.create(conversation(&engine)).unwrap();

        assert!(matches!(
            registry.create(conversation(&engine)),
            Err(ServerError::CapacityReached(1))
        ));

        first.with_conversation(|c| c.end(EndReason::CallerHangup));
        assert!(registry.create(conversation(&engine)).is_ok());
        assert!(registry.get(&first.id).is_none());
    }

    #[test]
    fn test_reap_idle_ends_calls() {
        let engine = engine();
        let registry = CallRegistry::with_config(10, Duration::ZERO, Duration::from_secs(1));
        let call = registry.create(conversation(&engine)).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let reaped = registry.reap_idle();
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].end_reason, Some(EndReason::IdleTimeout));
        assert!(call.is_ended());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_reap_skips_already_ended_snapshot() {
        let engine = engine();
        let registry = CallRegistry::with_config(10, Duration::ZERO, Duration::from_secs(1));
        let call = registry.create(conversation(&engine)).unwrap();
        call.with_conversation(|c| c.end(EndReason::AgentClosed));
        std::thread::sleep(Duration::from_millis(5));

        assert!(registry.reap_idle().is_empty());
        assert_eq!(registry.count(), 0);
    }
}
