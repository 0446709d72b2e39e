//! Shard fan-out and processing-stage selection.

use crate::config::LoadBalancing;
use crate::distributed::cluster::{Cluster, Replica, Shard};
use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    FetchColumns,
    WithMergeableState,
    Complete,
}

/// "if a single effective stream (1 remote shard × 1 replica + 0 local
/// shards, or forced by `distributed_group_by_no_merge`), ask remote for
/// `Complete`; otherwise `WithMergeableState`, then merge locally."
pub fn determine_stage(cluster: &Cluster, local_shards: usize, distributed_group_by_no_merge: bool) -> ProcessingStage {
    let single_effective_stream = local_shards == 0 && cluster.shards.len() == 1 && cluster.shards[0].replicas.len() == 1;
    if single_effective_stream || distributed_group_by_no_merge {
        ProcessingStage::Complete
    } else {
        ProcessingStage::WithMergeableState
    }
}

/// Picks one replica per shard according to `load_balancing`. `cursor` is a
/// caller-owned counter for `InOrder`/round-robin-flavored policies;
/// `random_index` is a caller-supplied random draw for `Random`.
pub fn pick_replica<'a>(shard: &'a Shard, policy: LoadBalancing, cursor: usize, random_index: usize) -> EngineResult<&'a Replica> {
    if shard.replicas.is_empty() {
        return Err(EngineError::new(ErrorCode::AllConnectionTriesFailed, "shard has no replicas configured"));
    }
    let idx = match policy {
        LoadBalancing::InOrder => 0,
        LoadBalancing::Random => random_index % shard.replicas.len(),
        // Nearest-hostname needs the caller's own hostname to compare
        // against; absent that context here, fall back to the same
        // round-robin cursor NearestHostname degrades to when no replica
        // matches the local hostname.
        LoadBalancing::NearestHostname => cursor % shard.replicas.len(),
    };
    Ok(&shard.replicas[idx])
}

/// Write-path shard routing: requires either exactly one shard or a
/// sharding-key expression. `sharding_key` is the
/// already-evaluated expression result for one row.
pub fn route_shard_for_row(cluster: &Cluster, sharding_key: Option<u64>) -> EngineResult<usize> {
    if cluster.shards.len() == 1 {
        return Ok(0);
    }
    let key = sharding_key.ok_or_else(|| {
        EngineError::new(ErrorCode::StorageRequiresParameter, "multiple shards require a sharding key expression")
    })?;
    let total_weight: u32 = cluster.shards.iter().map(|s| s.weight.max(1)).sum();
    let mut target = (key % total_weight as u64) as u32;
    for (i, shard) in cluster.shards.iter().enumerate() {
        let w = shard.weight.max(1);
        if target < w {
            return Ok(i);
        }
        target -= w;
    }
    Ok(cluster.shards.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stream_forces_complete_stage() {
        let cluster = Cluster::single_shard_single_replica("h", 9000);
        assert_eq!(determine_stage(&cluster, 0, false), ProcessingStage::Complete);
    }

    #[test]
    fn multi_replica_uses_mergeable_state_by_default() {
        let cluster = Cluster {
            shards: vec![Shard { replicas: vec![Replica { host: "a".into(), port: 1 }, Replica { host: "b".into(), port: 1 }], weight: 1 }],
        };
        assert_eq!(determine_stage(&cluster, 0, false), ProcessingStage::WithMergeableState);
    }

    #[test]
    fn write_to_multiple_shards_requires_sharding_key() {
        let cluster = Cluster {
            shards: vec![
                Shard { replicas: vec![Replica { host: "a".into(), port: 1 }], weight: 1 },
                Shard { replicas: vec![Replica { host: "b".into(), port: 1 }], weight: 1 },
            ],
        };
        let err = route_shard_for_row(&cluster, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageRequiresParameter);
        assert!(route_shard_for_row(&cluster, Some(7)).is_ok());
    }

    #[test]
    fn single_shard_write_never_needs_a_key() {
        let cluster = Cluster::single_shard_single_replica("h", 9000);
        assert_eq!(route_shard_for_row(&cluster, None).unwrap(), 0);
    }
}
