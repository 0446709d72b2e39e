//! Replication: the ReplicatedMergeTree queue log plus the
//! leader-only cleanup tick that prunes it, the dedup-block store, and the
//! mutations list.

pub mod cleanup;
pub mod log;

pub use cleanup::{prune_blocks, prune_log, prune_mutations, ReplicationMetadataStore};
pub use log::{LogCommand, LogEntry};
