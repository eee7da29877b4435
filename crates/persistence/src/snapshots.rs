//! Call snapshot persistence
//!
//! One row per call; the newest snapshot wins. The full snapshot is stored
//! as JSON next to a few summary columns for ad-hoc CQL queries.

use async_trait::async_trait;
use dispatch_voice_core::{CallSnapshot, SnapshotSink};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{PersistenceError, ScyllaClient};

/// Upper bound on rows scanned by `list_recent`
const RECENT_SCAN_LIMIT: i32 = 5000;

/// Writes carry the snapshot's own timestamp, so a write that lands after a
/// newer one for the same call loses instead of overwriting it.
fn insert_query(keyspace: &str) -> String {
    format!(
        "INSERT INTO {}.call_snapshots (
            call_id, driver_name, load_number, scenario, phase,
            call_outcome, emergency, ended, updated_at, snapshot_json
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) USING TIMESTAMP ?",
        keyspace
    )
}

/// CQL write timestamp in microseconds
fn write_timestamp(snapshot: &CallSnapshot) -> i64 {
    snapshot.updated_at.timestamp_micros()
}

/// ScyllaDB implementation of the snapshot sink
#[derive(Clone)]
pub struct ScyllaSnapshotStore {
    client: ScyllaClient,
}

impl ScyllaSnapshotStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn write(&self, snapshot: &CallSnapshot) -> Result<(), PersistenceError> {
        let query = insert_query(self.client.keyspace());
        let json = serde_json::to_string(snapshot)?;
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    snapshot.call_id(),
                    snapshot.call.driver_name(),
                    snapshot.call.load_number(),
                    snapshot.call.scenario().as_str(),
                    snapshot.state.phase.as_str(),
                    snapshot.structured_data.call_outcome.as_str(),
                    snapshot.state.emergency_detected(),
                    snapshot.ended,
                    snapshot.updated_at.timestamp_millis(),
                    json,
                    write_timestamp(snapshot),
                ),
            )
            .await?;

        tracing::debug!(call_id = %snapshot.call_id(), "Snapshot written to ScyllaDB");
        Ok(())
    }

    async fn read(&self, call_id: &str) -> Result<Option<CallSnapshot>, PersistenceError> {
        let query = format!(
            "SELECT snapshot_json FROM {}.call_snapshots WHERE call_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (call_id,))
            .await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let (json,): (String,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return Ok(Some(serde_json::from_str(&json)?));
            }
        }

        Ok(None)
    }

    async fn scan_recent(&self, limit: usize) -> Result<Vec<CallSnapshot>, PersistenceError> {
        // No global ordering across partitions; sort the bounded scan instead
        let query = format!(
            "SELECT updated_at, snapshot_json FROM {}.call_snapshots LIMIT ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (RECENT_SCAN_LIMIT,))
            .await?;

        let mut rows: Vec<(i64, String)> = Vec::new();
        for row in result.rows.unwrap_or_default() {
            let typed: (i64, String) = row
                .into_typed()
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
            rows.push(typed);
        }

        rows.sort_by(|a, b| b.0.cmp(&a.0));
        rows.into_iter()
            .take(limit)
            .map(|(_, json)| serde_json::from_str(&json).map_err(PersistenceError::from))
            .collect()
    }
}

#[async_trait]
impl SnapshotSink for ScyllaSnapshotStore {
    async fn persist(&self, snapshot: &CallSnapshot) -> dispatch_voice_core::Result<()> {
        Ok(self.write(snapshot).await?)
    }

    async fn load(&self, call_id: &str) -> dispatch_voice_core::Result<Option<CallSnapshot>> {
        Ok(self.read(call_id).await?)
    }

    async fn list_recent(&self, limit: usize) -> dispatch_voice_core::Result<Vec<CallSnapshot>> {
        Ok(self.scan_recent(limit).await?)
    }

    fn name(&self) -> &'static str {
        "scylla"
    }
}

/// Process-local snapshot store, used when ScyllaDB is disabled and in tests
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<String, CallSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[async_trait]
impl SnapshotSink for InMemorySnapshotStore {
    async fn persist(&self, snapshot: &CallSnapshot) -> dispatch_voice_core::Result<()> {
        let mut snapshots = self.snapshots.write();
        // Writes can land out of order when spawned; never go backwards
        let stale = snapshots
            .get(snapshot.call_id())
            .map(|existing| existing.updated_at > snapshot.updated_at)
            .unwrap_or(false);
        if !stale {
            snapshots.insert(snapshot.call_id().to_string(), snapshot.clone());
        }
        Ok(())
    }

    async fn load(&self, call_id: &str) -> dispatch_voice_core::Result<Option<CallSnapshot>> {
        Ok(self.snapshots.read().get(call_id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> dispatch_voice_core::Result<Vec<CallSnapshot>> {
        let mut all: Vec<CallSnapshot> = self.snapshots.read().values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all.truncate(limit);
        Ok(all)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
