//! Stream transforms stacked by an interpreter atop a storage/distributed
//! read.
//!
//! `AggregationTransform` lives in `crate::aggregation`; the rest are here
//! since they're thin wrappers around `DataBlock`/`Column` operations
//! already implemented in `crate::block`/`crate::column`.

use crate::block::DataBlock;
use crate::error::EngineResult;
use crate::expression::ExpressionActions;
use crate::pipeline::stream::BlockInputStream;

pub struct FilterTransform<S> {
    inner: S,
    filter_column: String,
    remove_filter_column: bool,
}

impl<S: BlockInputStream> FilterTransform<S> {
    pub fn new(inner: S, filter_column: impl Into<String>, remove_filter_column: bool) -> Self {
        Self { inner, filter_column: filter_column.into(), remove_filter_column }
    }
}

impl<S: BlockInputStream> BlockInputStream for FilterTransform<S> {
    fn read(&mut self) -> EngineResult<DataBlock> {
        loop {
            let block = self.inner.read()?;
            if block.is_empty() {
                return Ok(block);
            }
            let filter_col = block
                .column(&self.filter_column)
                .ok_or_else(|| crate::error::EngineError::new(crate::error::ErrorCode::UnknownIdentifier, &self.filter_column))?;
            let mask: Vec<u8> = (0..block.rows())
                .map(|i| match filter_col.column.get_as_field(i) {
                    Ok(f) => f.as_f64().map(|v| v != 0.0).unwrap_or(false) as u8,
                    Err(_) => 0,
                })
                .collect();
            let filtered = block.filter(&mask)?;
            if self.remove_filter_column {
                let mut out = filtered;
                out.remove_column(&self.filter_column);
                if out.rows() > 0 || out.num_columns() > 0 {
                    return Ok(out);
                }
            } else if filtered.rows() > 0 {
                return Ok(filtered);
            }
            // an all-filtered-out block is not EOS: keep pulling upstream
        }
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

pub struct ExpressionTransform<S> {
    inner: S,
    actions: ExpressionActions,
}

impl<S: BlockInputStream> ExpressionTransform<S> {
    pub fn new(inner: S, actions: ExpressionActions) -> Self {
        Self { inner, actions }
    }
}

impl<S: BlockInputStream> BlockInputStream for ExpressionTransform<S> {
    fn read(&mut self) -> EngineResult<DataBlock> {
        let block = self.inner.read()?;
        if block.is_empty() {
            return Ok(block);
        }
        self.actions.execute(block)
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

/// Sorts rows within each block independently (a cheap first pass before a
/// `MergeSortTransform` produces a globally sorted stream).
pub struct PartialSortTransform<S> {
    inner: S,
    sort_by: String,
    descending: bool,
    limit: Option<usize>,
}

impl<S: BlockInputStream> PartialSortTransform<S> {
    pub fn new(inner: S, sort_by: impl Into<String>, descending: bool, limit: Option<usize>) -> Self {
        Self { inner, sort_by: sort_by.into(), descending, limit }
    }
}

impl<S: BlockInputStream> BlockInputStream for PartialSortTransform<S> {
    fn read(&mut self) -> EngineResult<DataBlock> {
        let block = self.inner.read()?;
        if block.is_empty() {
            return Ok(block);
        }
        let key = &block.column(&self.sort_by).ok_or_else(|| {
            crate::error::EngineError::new(crate::error::ErrorCode::UnknownIdentifier, &self.sort_by)
        })?.column;
        let perm = key.get_permutation(self.descending, self.limit, false)?;
        block.permute(&perm, self.limit)
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

/// Merges several already-sorted input streams into one globally sorted
/// stream (k-way merge by repeatedly taking the smallest-front block's next
/// row group). A simple, correct, non-streaming implementation: buffers one
/// block per child and interleaves by key.
pub struct MergeSortTransform<S> {
    children: Vec<S>,
    sort_by: String,
    descending: bool,
    fronts: Vec<Option<DataBlock>>,
    cursors: Vec<usize>,
    started: bool,
}

impl<S: BlockInputStream> MergeSortTransform<S> {
    pub fn new(children: Vec<S>, sort_by: impl Into<String>, descending: bool) -> Self {
        let n = children.len();
        Self { children, sort_by: sort_by.into(), descending, fronts: vec![None; n], cursors: vec![0; n], started: false }
    }

    fn fill_front(&mut self, i: usize) -> EngineResult<()> {
        if self.fronts[i].is_none() {
            let b = self.children[i].read()?;
            if !b.is_empty() {
                self.fronts[i] = Some(b);
                self.cursors[i] = 0;
            }
        }
        Ok(())
    }
}

impl<S: BlockInputStream> BlockInputStream for MergeSortTransform<S> {
    fn read(&mut self) -> EngineResult<DataBlock> {
        if !self.started {
            for i in 0..self.children.len() {
                self.children[i].read_prefix()?;
                self.fill_front(i)?;
            }
            self.started = true;
        }

        // Build one output block of up to one row per active child, in sorted key order.
        let mut rows: Vec<(f64, usize)> = Vec::new();
        for (i, front) in self.fronts.iter().enumerate() {
            if let Some(b) = front {
                let cursor = self.cursors[i];
                if cursor < b.rows() {
                    let key_col = &b.column(&self.sort_by).unwrap().column;
                    let v = key_col.get_as_field(cursor)?.as_f64().unwrap_or(0.0);
                    rows.push((v, i));
                }
            }
        }
        if rows.is_empty() {
            return Ok(DataBlock::new());
        }
        if self.descending {
            rows.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        } else {
            rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        }
        let (_, winner) = rows[0];
        let front = self.fronts[winner].as_ref().unwrap();
        let cursor = self.cursors[winner];
        let out = front.permute(&[cursor as u64], None)?;
        self.cursors[winner] += 1;
        if self.cursors[winner] >= front.rows() {
            self.fronts[winner] = None;
            self.fill_front(winner)?;
        }
        Ok(out)
    }

    fn cancel(&self) {
        for c in &self.children {
            c.cancel();
        }
    }
}

pub struct LimitTransform<S> {
    inner: S,
    offset: usize,
    limit: usize,
    seen: usize,
}

impl<S: BlockInputStream> LimitTransform<S> {
    pub fn new(inner: S, offset: usize, limit: usize) -> Self {
        Self { inner, offset, limit, seen: 0 }
    }
}

impl<S: BlockInputStream> BlockInputStream for LimitTransform<S> {
    fn read(&mut self) -> EngineResult<DataBlock> {
        loop {
            if self.seen >= self.offset + self.limit {
                return Ok(DataBlock::new());
            }
            let block = self.inner.read()?;
            if block.is_empty() {
                return Ok(block);
            }
            let rows = block.rows();
            let start = self.offset.saturating_sub(self.seen).min(rows);
            let want = self.offset + self.limit - self.seen;
            let end = rows.min(want.saturating_add(start).min(rows)).max(start);
            self.seen += rows;
            if start >= end {
                continue;
            }
            let perm: Vec<u64> = (start as u64..end as u64).collect();
            return block.permute(&perm, None);
        }
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NamedColumn;
    use crate::column::{Column, DataType, Field, PodArray};

    fn block_of(values: &[u64]) -> DataBlock {
        let mut c = Column::UInt64(PodArray::new());
        for &v in values {
            c.insert_field(Field::UInt64(v)).unwrap();
        }
        DataBlock::from_columns(vec![NamedColumn { name: "v".into(), data_type: DataType::UInt64, column: c }]).unwrap()
    }

    struct OneShot(Option<DataBlock>);
    impl BlockInputStream for OneShot {
        fn read(&mut self) -> EngineResult<DataBlock> {
            Ok(self.0.take().unwrap_or_default())
        }
    }

    #[test]
    fn limit_applies_offset_and_count() {
        let mut t = LimitTransform::new(OneShot(Some(block_of(&[0, 1, 2, 3, 4, 5]))), 2, 3);
        let out = t.read().unwrap();
        let vals: Vec<u64> = (0..out.rows()).map(|i| match out.column("v").unwrap().column.get_as_field(i).unwrap() {
            Field::UInt64(v) => v,
            _ => unreachable!(),
        }).collect();
        assert_eq!(vals, vec![2, 3, 4]);
    }

    #[test]
    fn partial_sort_orders_single_block() {
        let mut t = PartialSortTransform::new(OneShot(Some(block_of(&[3, 1, 2]))), "v", false, None);
        let out = t.read().unwrap();
        let vals: Vec<u64> = (0..out.rows()).map(|i| match out.column("v").unwrap().column.get_as_field(i).unwrap() {
            Field::UInt64(v) => v,
            _ => unreachable!(),
        }).collect();
        assert_eq!(vals, vec![1, 2, 3]);
    }
}
