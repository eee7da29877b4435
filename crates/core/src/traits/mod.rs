//! Traits implemented by collaborators outside the conversation core

mod snapshot_sink;

pub use snapshot_sink::SnapshotSink;
