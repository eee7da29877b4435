//! Snapshot storage

use async_trait::async_trait;

use crate::{CallSnapshot, Result};

/// Destination for call snapshots.
///
/// Writes are fire-and-forget from the conversation's point of view: a failed
/// `persist` is logged by the caller and never interrupts the call.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Store the latest snapshot for a call, replacing any earlier one
    async fn persist(&self, snapshot: &CallSnapshot) -> Result<()>;

    /// Latest snapshot for a call
    async fn load(&self, call_id: &str) -> Result<Option<CallSnapshot>>;

    /// Most recently updated snapshots, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<CallSnapshot>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}
