//! Background merge selection: picks parts in
//! one partition whose total size fits a diminishing-returns curve, reserves
//! disk, and (via `writer::commit_merge`) atomically swaps the result in.

use crate::diskspace::Schema;
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::storage::mergetree::part::Part;

/// Larger merges need proportionally larger benefit to be worth doing: the
/// candidate set's max/min byte-size ratio must not exceed this, so the
/// scheduler won't merge one huge part with a handful of tiny ones just
/// because they're adjacent.
const MAX_SIZE_RATIO_FOR_MERGE: f64 = 5.0;
/// Largest number of parts folded into a single merge op.
const MAX_PARTS_PER_MERGE: usize = 16;

fn part_byte_size(part: &Part) -> u64 {
    part.column_byte_size.iter().map(|(_, b)| b).sum()
}

/// Picks the most promising contiguous run of same-partition parts to
/// merge next, or `None` if nothing in `candidates` clears the
/// diminishing-returns bar.
pub fn select_parts_to_merge(candidates: &[Part]) -> Option<Vec<usize>> {
    let mut by_partition: std::collections::HashMap<&str, Vec<usize>> = std::collections::HashMap::new();
    for (i, p) in candidates.iter().enumerate() {
        by_partition.entry(p.name.partition.as_str()).or_default().push(i);
    }

    let mut best: Option<(f64, Vec<usize>)> = None;
    for indices in by_partition.values() {
        if indices.len() < 2 {
            continue;
        }
        for window in 2..=indices.len().min(MAX_PARTS_PER_MERGE) {
            for start in 0..=(indices.len() - window) {
                let group = &indices[start..start + window];
                let sizes: Vec<u64> = group.iter().map(|&i| part_byte_size(&candidates[i])).collect();
                let (min, max) = (*sizes.iter().min().unwrap(), *sizes.iter().max().unwrap());
                if max as f64 > min.max(1) as f64 * MAX_SIZE_RATIO_FOR_MERGE {
                    continue;
                }
                let total: u64 = sizes.iter().sum();
                let score = total as f64; // diminishing returns: prefer merging more/bigger, bounded by the ratio gate above
                if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                    best = Some((score, group.to_vec()));
                }
            }
        }
    }
    best.map(|(_, g)| g)
}

/// Reserves disk space for the merged part's estimated size (sum of
/// inputs — merges rarely grow total bytes) before any I/O starts.
pub fn reserve_for_merge(schema: &Schema, candidates: &[Part], selection: &[usize]) -> EngineResult<crate::diskspace::Reservation> {
    if selection.is_empty() {
        return Err(EngineError::new(ErrorCode::ParameterOutOfBound, "empty merge selection"));
    }
    let total: u64 = selection.iter().map(|&i| part_byte_size(&candidates[i])).sum();
    schema.reserve(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mergetree::part::PartName;
    use std::path::PathBuf;

    fn part(partition: &str, min: u64, max: u64, size: u64) -> Part {
        Part {
            name: PartName { partition: partition.into(), min_block: min, max_block: max, level: 0, mutation: None },
            path: PathBuf::from("/tmp"),
            columns: vec![],
            rows_count: 0,
            marks_count: 0,
            column_byte_size: vec![("v".into(), size)],
            default_dependencies: vec![],
        }
    }

    #[test]
    fn merges_adjacent_similarly_sized_parts() {
        let parts = vec![part("p", 1, 1, 100), part("p", 2, 2, 110), part("p", 3, 3, 95)];
        let selection = select_parts_to_merge(&parts).unwrap();
        assert!(selection.len() >= 2);
    }

    #[test]
    fn refuses_to_merge_wildly_mismatched_sizes() {
        let parts = vec![part("p", 1, 1, 10), part("p", 2, 2, 1_000_000)];
        assert!(select_parts_to_merge(&parts).is_none());
    }

    #[test]
    fn single_partition_member_has_nothing_to_merge() {
        let parts = vec![part("p", 1, 1, 100)];
        assert!(select_parts_to_merge(&parts).is_none());
    }
}
