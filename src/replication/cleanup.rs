//! Replication cleanup tick. Runs only on the believed leader;
//! a race between two leader-believers is tolerated because every
//! operation here is idempotent (delete-if-present, mark-if-still-matching
//! version).
//!
//! Modeled against a `ReplicationMetadataStore` trait rather than this
//! crate's own `coordination` service directly, so the algorithm can be
//! unit-tested against a plain in-memory fake instead of a running server.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult, ErrorCode};

/// Batch size for conditioned multi-op deletes: entries are removed in
/// groups of `4 * MULTI_BATCH_SIZE`.
const MULTI_BATCH_SIZE: usize = 100;

pub trait ReplicationMetadataStore {
    /// Log entry indices, ascending.
    fn log_indices(&self) -> Vec<u64>;
    /// Per-replica `log_pointer` value.
    fn replica_log_pointers(&self) -> HashMap<String, u64>;
    fn replica_is_active(&self, name: &str) -> bool;
    fn replica_is_lost(&self, name: &str) -> bool;
    /// Marks a replica lost, conditioned on `replicas_version` still
    /// matching what the caller observed (host-version check). Returns
    /// `Err(BadVersion)` if a new replica appeared mid-cleanup.
    fn mark_replica_lost(&mut self, name: &str, replicas_version: u64) -> EngineResult<()>;
    fn replicas_version(&self) -> u64;
    fn delete_log_entries(&mut self, indices: &[u64]);

    /// `(dedup_token, ctime_secs)` pairs.
    fn blocks(&self) -> Vec<(String, u64)>;
    fn delete_blocks(&mut self, tokens: &[String]);

    fn mutation_indices(&self) -> Vec<u64>;
    fn replica_mutation_pointers(&self) -> HashMap<String, u64>;
    fn delete_mutations(&mut self, indices: &[u64]);
}

/// Prunes `<zk_path>/log/*`. `max_replicated_logs_to_keep` does not bound
/// how much log is retained: it only decides which inactive replicas are
/// far enough behind to mark as lost. Retention itself is bounded by
/// `min_replicated_logs_to_keep` (a protected tail) and by the lowest
/// `log_pointer` among replicas still considered live.
pub fn prune_log(
    store: &mut dyn ReplicationMetadataStore,
    min_replicated_logs_to_keep: usize,
    max_replicated_logs_to_keep: usize,
) -> EngineResult<()> {
    let mut indices = store.log_indices();
    indices.sort_unstable();
    if indices.is_empty() {
        return Ok(());
    }

    // An inactive replica whose log_pointer falls below this value has
    // fallen behind for good rather than merely lagging.
    let lost_threshold = if indices.len() > max_replicated_logs_to_keep && max_replicated_logs_to_keep > 0 {
        indices[indices.len() - max_replicated_logs_to_keep]
    } else {
        indices[0]
    };

    let pointers = store.replica_log_pointers();
    let all_replicas: Vec<String> = pointers.keys().cloned().collect();
    let mut to_mark_lost = Vec::new();
    let mut min_live_pointer = u64::MAX;
    for (replica, &pointer) in &pointers {
        if store.replica_is_lost(replica) {
            continue;
        }
        if store.replica_is_active(replica) || pointer >= lost_threshold {
            min_live_pointer = min_live_pointer.min(pointer);
        } else {
            to_mark_lost.push(replica.clone());
        }
    }

    if !to_mark_lost.is_empty() && to_mark_lost.len() == all_replicas.len() {
        tracing::warn!(count = to_mark_lost.len(), "refusing to mark all replicas lost");
        return Err(EngineError::new(ErrorCode::AllReplicasLost, "marking all replicas lost would leave none to recover from"));
    }

    let version = store.replicas_version();
    for replica in &to_mark_lost {
        match store.mark_replica_lost(replica, version) {
            Ok(()) => tracing::info!(replica, "marked lost during log cleanup"),
            Err(e) if e.code == ErrorCode::BadVersion => {
                // replica became active again mid-cleanup: abort the lost
                // mark, no cleanup this pass
                tracing::debug!(replica, "replica became active mid-cleanup, aborting tick");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }

    // Never touch the last min_replicated_logs_to_keep entries, regardless
    // of any replica's pointer.
    let lower_keep = min_replicated_logs_to_keep.min(indices.len());
    let keep_from_index = if lower_keep == 0 { u64::MAX } else { indices[indices.len() - lower_keep] };
    let prune_below = keep_from_index.min(min_live_pointer);

    let prunable: Vec<u64> = indices.into_iter().filter(|&i| i < prune_below).collect();
    tracing::debug!(count = prunable.len(), "pruning replicated log entries");
    for batch in prunable.chunks(4 * MULTI_BATCH_SIZE) {
        store.delete_log_entries(batch);
    }
    Ok(())
}

/// Prunes `<zk_path>/blocks/*` dedup tokens. Retention is the intersection
/// of a count window and a time window — whichever cutoff keeps fewer
/// entries wins, it is not enough to satisfy only one of the two.
pub fn prune_blocks(store: &mut dyn ReplicationMetadataStore, window: usize, window_seconds: u64, now_secs: u64) -> EngineResult<()> {
    let mut blocks = store.blocks();
    if blocks.is_empty() {
        return Ok(());
    }
    blocks.sort_by_key(|(_, ctime)| std::cmp::Reverse(*ctime));

    let most_recent_ctime = blocks.first().map(|(_, c)| *c).unwrap_or(now_secs);
    let time_threshold = most_recent_ctime.saturating_sub(window_seconds);

    let fixed_keep = window.min(blocks.len());
    let time_keep = blocks.iter().take_while(|(_, ctime)| *ctime >= time_threshold).count();
    let keep_count = fixed_keep.min(time_keep);

    let to_delete: Vec<String> = blocks.into_iter().skip(keep_count).map(|(token, _)| token).collect();
    store.delete_blocks(&to_delete);
    Ok(())
}

/// Prunes `<zk_path>/mutations/*`: keep entries
/// `>= min(replica.mutation_pointer)`, then always retain the most recent
/// `finished_mutations_to_keep`.
pub fn prune_mutations(store: &mut dyn ReplicationMetadataStore, finished_mutations_to_keep: usize) -> EngineResult<()> {
    let mut indices = store.mutation_indices();
    indices.sort_unstable();
    let pointers = store.replica_mutation_pointers();
    let min_pointer = pointers.values().copied().min().unwrap_or(0);

    let keep_recent_from = indices.len().saturating_sub(finished_mutations_to_keep);
    let to_delete: Vec<u64> = indices
        .iter()
        .enumerate()
        .filter(|(i, &idx)| idx < min_pointer && *i < keep_recent_from)
        .map(|(_, &idx)| idx)
        .collect();
    store.delete_mutations(&to_delete);
    Ok(())
}

#[cfg(test)]
pub mod test_store {
    use super::*;

    #[derive(Default)]
    pub struct InMemoryStore {
        pub log: Vec<u64>,
        pub log_pointers: HashMap<String, u64>,
        pub active: HashMap<String, bool>,
        pub lost: HashMap<String, bool>,
        pub replicas_version: u64,
        pub blocks: Vec<(String, u64)>,
        pub mutations: Vec<u64>,
        pub mutation_pointers: HashMap<String, u64>,
    }

    impl ReplicationMetadataStore for InMemoryStore {
        fn log_indices(&self) -> Vec<u64> {
            self.log.clone()
        }
        fn replica_log_pointers(&self) -> HashMap<String, u64> {
            self.log_pointers.clone()
        }
        fn replica_is_active(&self, name: &str) -> bool {
            *self.active.get(name).unwrap_or(&false)
        }
        fn replica_is_lost(&self, name: &str) -> bool {
            *self.lost.get(name).unwrap_or(&false)
        }
        fn mark_replica_lost(&mut self, name: &str, replicas_version: u64) -> EngineResult<()> {
            if replicas_version != self.replicas_version {
                return Err(EngineError::new(ErrorCode::BadVersion, "replicas node changed"));
            }
            self.lost.insert(name.to_string(), true);
            Ok(())
        }
        fn replicas_version(&self) -> u64 {
            self.replicas_version
        }
        fn delete_log_entries(&mut self, indices: &[u64]) {
            self.log.retain(|i| !indices.contains(i));
        }
        fn blocks(&self) -> Vec<(String, u64)> {
            self.blocks.clone()
        }
        fn delete_blocks(&mut self, tokens: &[String]) {
            self.blocks.retain(|(t, _)| !tokens.contains(t));
        }
        fn mutation_indices(&self) -> Vec<u64> {
            self.mutations.clone()
        }
        fn replica_mutation_pointers(&self) -> HashMap<String, u64> {
            self.mutation_pointers.clone()
        }
        fn delete_mutations(&mut self, indices: &[u64]) {
            self.mutations.retain(|i| !indices.contains(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_store::InMemoryStore;
    use super::*;

    #[test]
    fn aborts_when_marking_all_replicas_lost() {
        let mut store = InMemoryStore {
            log: (0..100).collect(),
            log_pointers: HashMap::from([("r1".to_string(), 0u64)]),
            active: HashMap::from([("r1".to_string(), false)]),
            ..Default::default()
        };
        let result = prune_log(&mut store, 10, 50);
        assert!(matches!(result, Err(e) if e.code == ErrorCode::AllReplicasLost));
    }

    #[test]
    fn caught_up_active_replicas_only_protect_the_min_kept_tail() {
        // Both replicas are active and fully caught up (pointer==99), so
        // max_replicated_logs_to_keep (50) must not act as a retention
        // floor — only min_replicated_logs_to_keep (10) protects a tail.
        let mut store = InMemoryStore {
            log: (0..100).collect(),
            log_pointers: HashMap::from([("r1".to_string(), 99u64), ("r2".to_string(), 99u64)]),
            active: HashMap::from([("r1".to_string(), true), ("r2".to_string(), true)]),
            ..Default::default()
        };
        prune_log(&mut store, 10, 50).unwrap();
        assert_eq!(store.log.len(), 10);
    }

    #[test]
    fn blocks_dedup_keeps_the_intersection_of_count_and_time_windows() {
        // ctime == index, most recent is 19. window=5 alone would keep
        // ctimes 15-19; window_seconds=2 alone would keep ctimes 17-19.
        // The stricter (smaller) cutoff wins: only 17-19 survive.
        let mut store = InMemoryStore { blocks: (0..20).map(|i| (format!("tok{i}"), i as u64)).collect(), ..Default::default() };
        prune_blocks(&mut store, 5, 2, 19).unwrap();
        assert_eq!(store.blocks.len(), 3);
        for kept in ["tok17", "tok18", "tok19"] {
            assert!(store.blocks.iter().any(|(t, _)| t == kept));
        }
    }

    #[test]
    fn mutations_retain_most_recent_even_below_pointer() {
        let mut store = InMemoryStore {
            mutations: (0..20).collect(),
            mutation_pointers: HashMap::from([("r1".to_string(), 5u64)]),
            ..Default::default()
        };
        prune_mutations(&mut store, 3).unwrap();
        // entries 0..5 are below the min pointer but the most recent 3
        // overall (17,18,19) must survive regardless.
        assert!(store.mutations.contains(&17));
        assert!(store.mutations.contains(&18));
        assert!(store.mutations.contains(&19));
    }
}
