//! Engine-wide configuration keys
//!
//! A plain, once-constructed settings struct. Loading/reloading a config file
//! from disk is out of scope; callers build a `Settings`
//! (or start from `Settings::default()`) and hand it to constructors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadBalancing {
    Random,
    NearestHostname,
    InOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalsMode {
    BeforeHaving,
    AfterHavingInclusive,
    AfterHavingExclusive,
    AfterHavingAuto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationAlterPartitionsSync {
    DontWait = 0,
    WaitSelf = 1,
    WaitAll = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_block_size: usize,
    pub max_threads: usize,
    pub max_distributed_connections: usize,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    pub connections_with_failover_max_tries: u32,
    pub use_uncompressed_cache: bool,
    pub min_compress_block_size: usize,
    pub max_compress_block_size: usize,
    pub replication_alter_partitions_sync: ReplicationAlterPartitionsSync,
    pub load_balancing: LoadBalancing,
    pub totals_mode: TotalsMode,
    pub distributed_group_by_no_merge: bool,
    pub max_parallel_replicas: usize,
    pub compile: bool,
    pub min_count_to_compile: usize,
    pub replicated_deduplication_window: usize,
    pub replicated_deduplication_window_seconds: u64,
    pub min_replicated_logs_to_keep: usize,
    pub max_replicated_logs_to_keep: usize,
    pub finished_mutations_to_keep: usize,
    pub cleanup_delay_period_secs: u64,
    pub cleanup_delay_period_random_add_secs: u64,
    pub index_granularity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_block_size: 65536,
            max_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            max_distributed_connections: 1024,
            connect_timeout_ms: 1_000,
            send_timeout_ms: 300_000,
            receive_timeout_ms: 300_000,
            connections_with_failover_max_tries: 3,
            use_uncompressed_cache: false,
            min_compress_block_size: 65536,
            max_compress_block_size: 1 << 20,
            replication_alter_partitions_sync: ReplicationAlterPartitionsSync::WaitAll,
            load_balancing: LoadBalancing::Random,
            totals_mode: TotalsMode::AfterHavingExclusive,
            distributed_group_by_no_merge: false,
            max_parallel_replicas: 1,
            compile: false,
            min_count_to_compile: 3,
            replicated_deduplication_window: 100,
            replicated_deduplication_window_seconds: 604_800,
            min_replicated_logs_to_keep: 100,
            max_replicated_logs_to_keep: 1000,
            finished_mutations_to_keep: 100,
            cleanup_delay_period_secs: 30,
            cleanup_delay_period_random_add_secs: 10,
            index_granularity: 8192,
        }
    }
}
