//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

/// Snapshots expire 30 days after their last write
const SNAPSHOT_TTL_SECS: u32 = 2_592_000;

fn keyspace_cql(keyspace: &str, replication_factor: u8) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    )
}

fn call_snapshots_cql(keyspace: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_snapshots (
            call_id TEXT,
            driver_name TEXT,
            load_number TEXT,
            scenario TEXT,
            phase TEXT,
            call_outcome TEXT,
            emergency BOOLEAN,
            ended BOOLEAN,
            updated_at BIGINT,
            snapshot_json TEXT,
            PRIMARY KEY (call_id)
        ) WITH default_time_to_live = {}
    "#,
        keyspace, SNAPSHOT_TTL_SECS
    )
}

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    session
        .query_unpaged(keyspace_cql(keyspace, replication_factor), ())
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    session
        .query_unpaged(call_snapshots_cql(keyspace), ())
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create call_snapshots table: {}", e))
        })?;

    tracing::info!("All tables created successfully");
    Ok(())
}
