//! The `Column` sum type and its shared operation set.
//!
//! Prefers a tagged-variant with function-table dispatch over virtual-call
//! chains: `Column` is a closed enum rather than a `dyn Trait` object. Every
//! variant implements the same capability set; the enum's inherent methods
//! dispatch via `match` instead of a vtable, which also makes
//! `filter`/`permute`/`replicate` trivially exhaustive to extend.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::column::field::Field;
use crate::column::pod_array::PodArray;
use crate::error::{EngineError, ErrorCode};

pub type ColResult<T> = Result<T, EngineError>;

fn sizes_mismatch(expected: usize, got: usize) -> EngineError {
    EngineError::new(
        ErrorCode::SizesOfColumnsDoesntMatch,
        format!("expected {expected} rows, got {got}"),
    )
}

fn out_of_bound(what: &str) -> EngineError {
    EngineError::new(ErrorCode::ParameterOutOfBound, what.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    UInt64(PodArray<u64>),
    Int64(PodArray<i64>),
    Float64(PodArray<f64>),
    String(StringColumn),
    Array(ArrayColumn),
    Nullable(NullableColumn),
    Const(ConstColumn),
    LowCardinality(LowCardinalityColumn),
}

/// Variable-width string column: one contiguous byte buffer plus a
/// one-past-the-end offset per row (including the row's trailing zero byte,
/// "String column layout").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringColumn {
    pub data: Vec<u8>,
    /// offsets[i] = one-past-end byte of row i (inclusive of trailing \0)
    pub offsets: Vec<u64>,
}

impl StringColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.offsets.push(self.data.len() as u64);
    }

    pub fn row_bytes(&self, i: usize) -> &[u8] {
        let start = if i == 0 { 0 } else { self.offsets[i - 1] as usize };
        let end = self.offsets[i] as usize - 1; // drop trailing zero
        &self.data[start..end]
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayColumn {
    pub data: Box<Column>,
    /// offsets[i] = one-past-end element index of row i
    pub offsets: Vec<u64>,
}

impl ArrayColumn {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn row_range(&self, i: usize) -> (usize, usize) {
        let start = if i == 0 { 0 } else { self.offsets[i - 1] as usize };
        (start, self.offsets[i] as usize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullableColumn {
    pub data: Box<Column>,
    /// 1 = null, 0 = not null
    pub null_mask: Vec<u8>,
}

impl NullableColumn {
    pub fn new(data: Column) -> ColResult<Self> {
        if matches!(data, Column::Nullable(_)) {
            return Err(EngineError::new(
                ErrorCode::IllegalColumnConstruction,
                "nullable column cannot wrap another nullable column",
            ));
        }
        let len = data.size();
        Ok(Self { data: Box::new(data), null_mask: vec![0; len] })
    }

    pub fn is_null_at(&self, i: usize) -> bool {
        self.null_mask[i] != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstColumn {
    pub value: Field,
    pub size: usize,
}

impl ConstColumn {
    pub fn new(value: Field, size: usize) -> Self {
        Self { value, size }
    }

    /// Materialize to a full-size column of the matching scalar variant.
    pub fn materialize(&self) -> Column {
        match &self.value {
            Field::UInt64(v) => Column::UInt64(PodArray::from_iter(std::iter::repeat(*v).take(self.size))),
            Field::Int64(v) => Column::Int64(PodArray::from_iter(std::iter::repeat(*v).take(self.size))),
            Field::Float64(v) => Column::Float64(PodArray::from_iter(std::iter::repeat(*v).take(self.size))),
            Field::String(s) => {
                let mut c = StringColumn::new();
                for _ in 0..self.size {
                    c.push_str(s);
                }
                Column::String(c)
            }
            Field::Null => {
                let inner = Column::UInt64(PodArray::from_iter(std::iter::repeat(0u64).take(self.size)));
                let mut n = NullableColumn::new(inner).expect("inner is never nullable");
                n.null_mask = vec![1; self.size];
                Column::Nullable(n)
            }
            Field::Array(_) => {
                // constant empty arrays; good enough for a constant-wrapper default
                Column::Array(ArrayColumn { data: Box::new(Column::UInt64(PodArray::new())), offsets: vec![0; self.size] })
            }
        }
    }
}

/// Deduplicated dictionary column: `dictionary[i]` is the i-th distinct
/// value, `index[row]` points into it. Mirrors
/// "low-cardinality/unique" variant.
#[derive(Debug, Clone, PartialEq)]
pub struct LowCardinalityColumn {
    pub dictionary: Vec<Field>,
    pub index: Vec<u32>,
}

impl LowCardinalityColumn {
    pub fn new() -> Self {
        Self { dictionary: Vec::new(), index: Vec::new() }
    }

    pub fn push(&mut self, value: Field) {
        let idx = match self.dictionary.iter().position(|v| *v == value) {
            Some(i) => i,
            None => {
                self.dictionary.push(value);
                self.dictionary.len() - 1
            }
        };
        self.index.push(idx as u32);
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

impl Default for LowCardinalityColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl Column {
    pub fn clone_empty(&self) -> Column {
        match self {
            Column::UInt64(_) => Column::UInt64(PodArray::new()),
            Column::Int64(_) => Column::Int64(PodArray::new()),
            Column::Float64(_) => Column::Float64(PodArray::new()),
            Column::String(_) => Column::String(StringColumn::new()),
            Column::Array(a) => Column::Array(ArrayColumn { data: Box::new(a.data.clone_empty()), offsets: Vec::new() }),
            Column::Nullable(n) => {
                Column::Nullable(NullableColumn { data: Box::new(n.data.clone_empty()), null_mask: Vec::new() })
            }
            Column::Const(c) => Column::Const(ConstColumn::new(c.value.clone(), 0)),
            Column::LowCardinality(_) => Column::LowCardinality(LowCardinalityColumn::new()),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Column::UInt64(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::String(s) => s.len(),
            Column::Array(a) => a.len(),
            Column::Nullable(n) => n.data.size(),
            Column::Const(c) => c.size,
            Column::LowCardinality(l) => l.len(),
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            Column::UInt64(v) => v.byte_size(),
            Column::Int64(v) => v.byte_size(),
            Column::Float64(v) => v.byte_size(),
            Column::String(s) => s.data.len() + s.offsets.len() * 8,
            Column::Array(a) => a.data.byte_size() + a.offsets.len() * 8,
            Column::Nullable(n) => n.data.byte_size() + n.null_mask.len(),
            Column::Const(_) => std::mem::size_of::<Field>(),
            Column::LowCardinality(l) => l.dictionary.len() * std::mem::size_of::<Field>() + l.index.len() * 4,
        }
    }

    pub fn get_as_field(&self, row: usize) -> ColResult<Field> {
        if row >= self.size() {
            return Err(out_of_bound(&format!("row {row} out of bounds (size {})", self.size())));
        }
        Ok(match self {
            Column::UInt64(v) => Field::UInt64(v.as_slice()[row]),
            Column::Int64(v) => Field::Int64(v.as_slice()[row]),
            Column::Float64(v) => Field::Float64(v.as_slice()[row]),
            Column::String(s) => Field::String(String::from_utf8_lossy(s.row_bytes(row)).into_owned()),
            Column::Array(a) => {
                let (start, end) = a.row_range(row);
                let mut out = Vec::with_capacity(end - start);
                for i in start..end {
                    out.push(a.data.get_as_field(i)?);
                }
                Field::Array(out)
            }
            Column::Nullable(n) => {
                if n.is_null_at(row) {
                    Field::Null
                } else {
                    n.data.get_as_field(row)?
                }
            }
            Column::Const(c) => c.value.clone(),
            Column::LowCardinality(l) => l.dictionary[l.index[row] as usize].clone(),
        })
    }

    pub fn insert_field(&mut self, value: Field) -> ColResult<()> {
        match self {
            Column::UInt64(v) => v.push(match value {
                Field::UInt64(x) => x,
                Field::Int64(x) => x as u64,
                _ => return Err(EngineError::new(ErrorCode::TypeMismatch, "expected UInt64")),
            }),
            Column::Int64(v) => v.push(match value {
                Field::Int64(x) => x,
                Field::UInt64(x) => x as i64,
                _ => return Err(EngineError::new(ErrorCode::TypeMismatch, "expected Int64")),
            }),
            Column::Float64(v) => v.push(value.as_f64().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, "expected numeric"))?),
            Column::String(s) => match value {
                Field::String(x) => s.push_str(&x),
                _ => return Err(EngineError::new(ErrorCode::TypeMismatch, "expected String")),
            },
            Column::Array(a) => match value {
                Field::Array(items) => {
                    for item in items {
                        a.data.insert_field(item)?;
                    }
                    a.offsets.push(a.data.size() as u64);
                }
                _ => return Err(EngineError::new(ErrorCode::TypeMismatch, "expected Array")),
            },
            Column::Nullable(n) => {
                if value.is_null() {
                    let default = n.data.clone_empty();
                    let default_value = match &default {
                        Column::UInt64(_) => Field::UInt64(0),
                        Column::Int64(_) => Field::Int64(0),
                        Column::Float64(_) => Field::Float64(0.0),
                        Column::String(_) => Field::String(String::new()),
                        _ => Field::Null,
                    };
                    n.data.insert_field(default_value)?;
                    n.null_mask.push(1);
                } else {
                    n.data.insert_field(value)?;
                    n.null_mask.push(0);
                }
            }
            Column::Const(c) => {
                if value != c.value {
                    return Err(EngineError::new(ErrorCode::IllegalColumnConstruction, "constant column's inner column is non-single-valued"));
                }
                c.size += 1;
            }
            Column::LowCardinality(l) => l.push(value),
        }
        Ok(())
    }

    pub fn insert_from(&mut self, other: &Column, row: usize) -> ColResult<()> {
        self.insert_field(other.get_as_field(row)?)
    }

    /// Keep exactly the rows where `mask[i] != 0`. Result has `popcount(mask)` rows.
    pub fn filter(&self, mask: &[u8]) -> ColResult<Column> {
        if mask.len() != self.size() {
            return Err(sizes_mismatch(self.size(), mask.len()));
        }
        let mut out = self.clone_empty();
        for (i, &m) in mask.iter().enumerate() {
            if m != 0 {
                out.insert_from(self, i)?;
            }
        }
        Ok(out)
    }

    pub fn permute(&self, perm: &[u64], limit: Option<usize>) -> ColResult<Column> {
        let n = limit.unwrap_or(perm.len()).min(perm.len());
        let mut out = self.clone_empty();
        for &p in &perm[..n] {
            let idx = p as usize;
            if idx >= self.size() {
                return Err(out_of_bound("permutation index out of bounds"));
            }
            out.insert_from(self, idx)?;
        }
        Ok(out)
    }

    /// Expand row `i` into `offsets[i] - offsets[i-1]` copies.
    pub fn replicate(&self, offsets: &[u64]) -> ColResult<Column> {
        if offsets.len() != self.size() {
            return Err(sizes_mismatch(self.size(), offsets.len()));
        }
        let mut out = self.clone_empty();
        let mut prev = 0u64;
        for (i, &end) in offsets.iter().enumerate() {
            let count = end.saturating_sub(prev);
            for _ in 0..count {
                out.insert_from(self, i)?;
            }
            prev = end;
        }
        Ok(out)
    }

    pub fn compare_at(&self, a: usize, b: usize, other: &Column, nulls_last: bool) -> ColResult<Ordering> {
        let fa = self.get_as_field(a)?;
        let fb = other.get_as_field(b)?;
        Ok(fa.compare(&fb, nulls_last))
    }

    /// Stable permutation that sorts the column; `reverse` for descending,
    /// `limit` caps output size (still covers the full sort for a correct
    /// top-K, i.e. used as-if the whole thing were sorted then truncated).
    pub fn get_permutation(&self, reverse: bool, limit: Option<usize>, nulls_last: bool) -> ColResult<Vec<u64>> {
        let n = self.size();
        let mut perm: Vec<u64> = (0..n as u64).collect();
        perm.sort_by(|&a, &b| {
            let ord = self
                .get_as_field(a as usize)
                .unwrap()
                .compare(&self.get_as_field(b as usize).unwrap(), nulls_last);
            let ord = if reverse { ord.reverse() } else { ord };
            ord.then(a.cmp(&b)) // stability tie-break on original index
        });
        if let Some(l) = limit {
            perm.truncate(l);
        }
        Ok(perm)
    }

    pub fn reserve(&mut self, additional: usize) {
        if let Column::UInt64(v) = self {
            v.reserve(additional);
        }
        if let Column::Int64(v) = self {
            v.reserve(additional);
        }
        if let Column::Float64(v) = self {
            v.reserve(additional);
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Column::Nullable(_))
    }
}

/// A named, typed column inside a block — see `crate::block::NamedColumn`.
pub type ColumnRef = Column;
