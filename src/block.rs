//! `DataBlock` — the unit of transport through the pipeline.
//!
//! Named `DataBlock` to keep `Block` free for a future pipeline-node
//! abstraction; a `DataBlock` is the columnar row-batch that flows *through*
//! a `BlockInputStream`, not a node in any execution graph.

use crate::column::{Column, DataType};
use crate::error::{EngineError, ErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub struct NamedColumn {
    pub name: String,
    pub data_type: DataType,
    pub column: Column,
}

/// Ordered list of `(name, type, column)` triples, `Block`.
/// Invariant: all columns report equal `size()` — the block's row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBlock {
    columns: Vec<NamedColumn>,
}

impl DataBlock {
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    pub fn from_columns(columns: Vec<NamedColumn>) -> Result<Self, EngineError> {
        let block = Self { columns };
        block.check_invariant()?;
        Ok(block)
    }

    fn check_invariant(&self) -> Result<(), EngineError> {
        let mut rows = None;
        for c in &self.columns {
            let n = c.column.size();
            match rows {
                None => rows = Some(n),
                Some(r) if r != n => {
                    return Err(EngineError::new(
                        ErrorCode::SizesOfColumnsDoesntMatch,
                        format!("column '{}' has {} rows, block has {}", c.name, n, r),
                    ))
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn push_column(&mut self, column: NamedColumn) -> Result<(), EngineError> {
        self.columns.push(column);
        self.check_invariant()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.column.size()).unwrap_or(0)
    }

    /// Per: an empty block (zero columns OR zero rows, by
    /// convention) signals end-of-stream from a stream.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows() == 0
    }

    pub fn column(&self, name: &str) -> Option<&NamedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut NamedColumn> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn remove_column(&mut self, name: &str) -> Option<NamedColumn> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[NamedColumn] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<NamedColumn> {
        self.columns
    }

    /// Project and rename to a final output shape (used by the expression
    /// engine's PROJECT action).
    pub fn project(&self, names_to_aliases: &[(String, String)]) -> Result<DataBlock, EngineError> {
        let mut out = Vec::with_capacity(names_to_aliases.len());
        for (name, alias) in names_to_aliases {
            let src = self.column(name).ok_or_else(|| {
                EngineError::new(ErrorCode::UnknownIdentifier, format!("unknown column '{name}'"))
            })?;
            out.push(NamedColumn { name: alias.clone(), data_type: src.data_type.clone(), column: src.column.clone() });
        }
        DataBlock::from_columns(out)
    }

    /// Keep exactly the rows where `mask[i] != 0`, across every column.
    pub fn filter(&self, mask: &[u8]) -> Result<DataBlock, EngineError> {
        let mut out = Vec::with_capacity(self.columns.len());
        for c in &self.columns {
            out.push(NamedColumn { name: c.name.clone(), data_type: c.data_type.clone(), column: c.column.filter(mask)? });
        }
        DataBlock::from_columns(out)
    }

    pub fn permute(&self, perm: &[u64], limit: Option<usize>) -> Result<DataBlock, EngineError> {
        let mut out = Vec::with_capacity(self.columns.len());
        for c in &self.columns {
            out.push(NamedColumn { name: c.name.clone(), data_type: c.data_type.clone(), column: c.column.permute(perm, limit)? });
        }
        DataBlock::from_columns(out)
    }

    pub fn byte_size(&self) -> usize {
        self.columns.iter().map(|c| c.column.byte_size()).sum()
    }
}
