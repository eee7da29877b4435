//! Snapshot storage for the dispatch voice agent
//!
//! Provides `SnapshotSink` implementations:
//! - ScyllaDB, one row per call
//! - In-memory, for single-node deployments and tests

pub mod client;
pub mod error;
pub mod schema;
pub mod snapshots;

pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use snapshots::{InMemorySnapshotStore, ScyllaSnapshotStore};

/// Connect to ScyllaDB, create the schema and return the snapshot store
pub async fn init(config: ScyllaConfig) -> Result<ScyllaSnapshotStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaSnapshotStore::new(client))
}
