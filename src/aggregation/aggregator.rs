//! Single-level hash aggregator: one `HashMap<GroupingKey, Vec<AggregateState>>`
//! per aggregation, matching "insert-or-return-slot" API (Rust's
//! `entry()` API *is* that API — no separate open-addressing table needed
//! for the fixed/serialized/string key layouts; `key::build_key` already
//! picked the cheapest `GroupingKey` representation per layout).

use std::collections::HashMap;

use crate::aggregation::function::{AggregateFunctionKind, AggregateState};
use crate::aggregation::key::{build_key, GroupingKey};
use crate::block::{DataBlock, NamedColumn};
use crate::column::{Column, DataType, Field, PodArray};
use crate::error::{EngineError, EngineResult, ErrorCode};

pub struct AggregateDescriptor {
    pub kind: AggregateFunctionKind,
    pub argument: String,
    pub result_name: String,
}

pub struct Aggregator {
    key_columns: Vec<String>,
    descriptors: Vec<AggregateDescriptor>,
    groups: HashMap<GroupingKey, (Field, Vec<AggregateState>)>,
}

impl Aggregator {
    pub fn new(key_columns: Vec<String>, descriptors: Vec<AggregateDescriptor>) -> Self {
        Self { key_columns, descriptors, groups: HashMap::new() }
    }

    /// Threshold past which a caller should switch to `TwoLevelAggregator`
    /// for the remaining input.
    pub fn two_level_threshold() -> usize {
        100_000
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn consume(&mut self, block: &DataBlock) -> EngineResult<()> {
        for row in 0..block.rows() {
            let key = build_key(block, &self.key_columns, row)?;
            let repr_key_field = if self.key_columns.is_empty() {
                Field::Null
            } else {
                block.column(&self.key_columns[0]).unwrap().column.get_as_field(row)?
            };
            let entry = self
                .groups
                .entry(key)
                .or_insert_with(|| (repr_key_field, self.descriptors.iter().map(|d| d.kind.create_state()).collect()));
            for (d, state) in self.descriptors.iter().zip(entry.1.iter_mut()) {
                let arg = block
                    .column(&d.argument)
                    .ok_or_else(|| EngineError::new(ErrorCode::UnknownIdentifier, d.argument.clone()))?
                    .column
                    .get_as_field(row)?;
                d.kind.add(state, &arg)?;
            }
        }
        Ok(())
    }

    /// Merge associativity (spec's testable property) follows directly
    /// from merging states key-by-key: a group absent on one side is
    /// inserted wholesale, a group present on both is folded via the
    /// descriptor's own `merge`.
    pub fn merge(&mut self, other: Aggregator) -> EngineResult<()> {
        for (key, (key_field, other_states)) in other.groups {
            match self.groups.get_mut(&key) {
                Some((_, states)) => {
                    for (d, (s, o)) in self.descriptors.iter().zip(states.iter_mut().zip(other_states.iter())) {
                        d.kind.merge(s, o)?;
                    }
                }
                None => {
                    self.groups.insert(key, (key_field, other_states));
                }
            }
        }
        Ok(())
    }

    pub fn finalize(self) -> EngineResult<DataBlock> {
        let mut key_column = Column::UInt64(PodArray::new());
        let mut key_is_string = false;
        if let Some((_, (first_key, _))) = self.groups.iter().next() {
            if matches!(first_key, Field::String(_)) {
                key_column = Column::String(Default::default());
                key_is_string = true;
            }
        }
        let mut result_columns: Vec<Column> = self.descriptors.iter().map(|_| Column::Float64(PodArray::new())).collect();

        for (_, (key_field, states)) in self.groups {
            if !self.key_columns.is_empty() {
                let normalized = if key_is_string {
                    match key_field {
                        Field::String(s) => Field::String(s),
                        other => Field::String(format!("{other:?}")),
                    }
                } else {
                    key_field.as_f64().map(Field::Float64).unwrap_or(Field::Float64(0.0))
                };
                key_column.insert_field(normalized)?;
            }
            for (i, (d, state)) in self.descriptors.iter().zip(states.iter()).enumerate() {
                result_columns[i].insert_field(d.kind.finalize(state))?;
            }
        }

        let mut named = Vec::new();
        if !self.key_columns.is_empty() {
            named.push(NamedColumn {
                name: self.key_columns[0].clone(),
                data_type: if key_is_string { DataType::String } else { DataType::Float64 },
                column: key_column,
            });
        }
        for (d, col) in self.descriptors.iter().zip(result_columns) {
            named.push(NamedColumn { name: d.result_name.clone(), data_type: DataType::Float64, column: col });
        }
        DataBlock::from_columns(named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Field;

    fn block_with_group_and_value(groups: &[u64], values: &[u64]) -> DataBlock {
        let mut g = Column::UInt64(PodArray::new());
        let mut v = Column::UInt64(PodArray::new());
        for (&gr, &va) in groups.iter().zip(values) {
            g.insert_field(Field::UInt64(gr)).unwrap();
            v.insert_field(Field::UInt64(va)).unwrap();
        }
        DataBlock::from_columns(vec![
            NamedColumn { name: "g".into(), data_type: DataType::UInt64, column: g },
            NamedColumn { name: "v".into(), data_type: DataType::UInt64, column: v },
        ])
        .unwrap()
    }

    #[test]
    fn groups_by_key_and_sums_per_group() {
        let descriptors = vec![AggregateDescriptor { kind: AggregateFunctionKind::Sum, argument: "v".into(), result_name: "s".into() }];
        let mut agg = Aggregator::new(vec!["g".into()], descriptors);
        agg.consume(&block_with_group_and_value(&[1, 1, 2], &[10, 20, 30])).unwrap();
        assert_eq!(agg.len(), 2);
        let out = agg.finalize().unwrap();
        let mut total = 0.0;
        for row in 0..out.rows() {
            if let Field::Float64(s) = out.column("s").unwrap().column.get_as_field(row).unwrap() {
                total += s;
            }
        }
        assert_eq!(total, 60.0);
    }

    #[test]
    fn empty_key_set_collapses_all_rows_into_one_group() {
        let descriptors = vec![AggregateDescriptor { kind: AggregateFunctionKind::Count, argument: "v".into(), result_name: "c".into() }];
        let mut agg = Aggregator::new(vec![], descriptors);
        agg.consume(&block_with_group_and_value(&[1, 2, 3], &[1, 1, 1])).unwrap();
        assert_eq!(agg.len(), 1);
    }
}
