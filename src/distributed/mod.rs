//! Distributed dispatch: cluster topology, shard/replica
//! selection, processing-stage determination, and write-path spooling for
//! unreachable shards.

pub mod cluster;
pub mod dispatch;
pub mod spool;

pub use cluster::{Cluster, Replica, Shard};
pub use dispatch::{determine_stage, pick_replica, route_shard_for_row, ProcessingStage};
pub use spool::ShardSpool;
