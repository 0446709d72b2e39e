//! Two-level aggregation: once the primary table grows past
//! `Aggregator::two_level_threshold()`, rows are pre-hashed and dispatched
//! to 256 sub-tables keyed by the hash's high bits, so merging across
//! threads becomes 256 independent, lock-free merges instead of one
//! contended table.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::aggregation::aggregator::{AggregateDescriptor, Aggregator};
use crate::aggregation::key::{build_key, GroupingKey};
use crate::block::DataBlock;
use crate::error::EngineResult;

const NUM_BUCKETS: usize = 256;

pub struct TwoLevelAggregator {
    key_columns: Vec<String>,
    buckets: Vec<Aggregator>,
}

fn bucket_of(key: &GroupingKey) -> usize {
    let mut h = DefaultHasher::new();
    key.hash(&mut h);
    (h.finish() >> 56) as usize % NUM_BUCKETS
}

impl TwoLevelAggregator {
    pub fn new(key_columns: Vec<String>, make_descriptors: impl Fn() -> Vec<AggregateDescriptor>) -> Self {
        let buckets = (0..NUM_BUCKETS).map(|_| Aggregator::new(key_columns.clone(), make_descriptors())).collect();
        Self { key_columns, buckets }
    }

    pub fn consume(&mut self, block: &DataBlock) -> EngineResult<()> {
        // A real engine would split `block` per bucket and call each
        // sub-aggregator's `consume` with only its rows, to vectorize the
        // dispatch; row-at-a-time is simpler and behaviorally identical.
        for row in 0..block.rows() {
            let key = build_key(block, &self.key_columns, row)?;
            let bucket = bucket_of(&key);
            let single_row = block.permute(&[row as u64], None)?;
            self.buckets[bucket].consume(&single_row)?;
        }
        Ok(())
    }

    /// Each bucket merges independently — callers may run this across a
    /// thread pool, one bucket (or a contiguous range of buckets) per
    /// worker, with no cross-bucket synchronization required.
    pub fn merge_bucket(&mut self, bucket: usize, other: Aggregator) -> EngineResult<()> {
        self.buckets[bucket].merge(other)
    }

    pub fn into_buckets(self) -> Vec<Aggregator> {
        self.buckets
    }

    pub fn finalize(self) -> EngineResult<Vec<DataBlock>> {
        self.buckets.into_iter().filter(|b| !b.is_empty()).map(Aggregator::finalize).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::function::AggregateFunctionKind;
    use crate::block::NamedColumn;
    use crate::column::{Column, DataType, Field, PodArray};

    fn block_with_group(groups: &[u64]) -> DataBlock {
        let mut g = Column::UInt64(PodArray::new());
        for &v in groups {
            g.insert_field(Field::UInt64(v)).unwrap();
        }
        DataBlock::from_columns(vec![NamedColumn { name: "g".into(), data_type: DataType::UInt64, column: g }]).unwrap()
    }

    #[test]
    fn distributes_rows_across_buckets_and_preserves_all_groups() {
        let mut two_level = TwoLevelAggregator::new(vec!["g".into()], || {
            vec![AggregateDescriptor { kind: AggregateFunctionKind::Count, argument: "g".into(), result_name: "c".into() }]
        });
        let groups: Vec<u64> = (0..500).collect();
        two_level.consume(&block_with_group(&groups)).unwrap();
        let blocks = two_level.finalize().unwrap();
        let total_groups: usize = blocks.iter().map(|b| b.rows()).sum();
        assert_eq!(total_groups, 500);
    }
}
