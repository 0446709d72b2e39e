//! Group-by key layout dispatch: "dispatches on the key layout:
//! single fixed-width key → open-addressing hash map keyed by the raw value;
//! serialized composite key → hash of packed bytes; single string key →
//! StringRef hash; empty key set → single bucket."
//!
//! Rust's `HashMap` is already open-addressing-adjacent (SwissTable under
//! the hood via `hashbrown`) so rather than hand-rolling four hash table
//! specializations, `GroupingKey` picks the *cheapest representation*
//! per layout and lets one `HashMap<GroupingKey, _>` do the probing. The
//! dispatch that matters for correctness and speed is building the key
//! itself, across the four cases above.

use crate::block::DataBlock;
use crate::column::Field;
use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupingKey {
    /// Single fixed-width key — the raw bit pattern.
    Fixed(u64),
    /// Serialized composite key — packed bytes of every key column's value.
    Serialized(Vec<u8>),
    /// Single string key.
    SingleString(String),
    /// No GROUP BY columns — every row maps to the one bucket.
    Empty,
}

pub fn build_key(block: &DataBlock, key_columns: &[String], row: usize) -> EngineResult<GroupingKey> {
    if key_columns.is_empty() {
        return Ok(GroupingKey::Empty);
    }
    if key_columns.len() == 1 {
        let col = &block.column(&key_columns[0]).ok_or_else(|| EngineError::new(ErrorCode::UnknownIdentifier, key_columns[0].clone()))?.column;
        return Ok(match col.get_as_field(row)? {
            Field::UInt64(v) => GroupingKey::Fixed(v),
            Field::Int64(v) => GroupingKey::Fixed(v as u64),
            Field::Float64(v) => GroupingKey::Fixed(v.to_bits()),
            Field::String(s) => GroupingKey::SingleString(s),
            Field::Null => GroupingKey::Fixed(0),
            Field::Array(_) => GroupingKey::Serialized(serialize_field(&col.get_as_field(row)?)),
        });
    }
    let mut bytes = Vec::new();
    for name in key_columns {
        let col = &block.column(name).ok_or_else(|| EngineError::new(ErrorCode::UnknownIdentifier, name.clone()))?.column;
        bytes.extend(serialize_field(&col.get_as_field(row)?));
    }
    Ok(GroupingKey::Serialized(bytes))
}

fn serialize_field(field: &Field) -> Vec<u8> {
    let mut out = Vec::new();
    match field {
        Field::Null => out.push(0),
        Field::UInt64(v) => {
            out.push(1);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Field::Int64(v) => {
            out.push(2);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Field::Float64(v) => {
            out.push(3);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Field::String(s) => {
            out.push(4);
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Field::Array(items) => {
            out.push(5);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                out.extend(serialize_field(item));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NamedColumn;
    use crate::column::{Column, DataType, PodArray};

    #[test]
    fn empty_key_set_collapses_to_one_bucket() {
        let mut c = Column::UInt64(PodArray::new());
        c.insert_field(Field::UInt64(1)).unwrap();
        let block = DataBlock::from_columns(vec![NamedColumn { name: "a".into(), data_type: DataType::UInt64, column: c }]).unwrap();
        assert_eq!(build_key(&block, &[], 0).unwrap(), GroupingKey::Empty);
    }

    #[test]
    fn single_fixed_key_uses_raw_bits() {
        let mut c = Column::UInt64(PodArray::new());
        c.insert_field(Field::UInt64(42)).unwrap();
        let block = DataBlock::from_columns(vec![NamedColumn { name: "a".into(), data_type: DataType::UInt64, column: c }]).unwrap();
        assert_eq!(build_key(&block, &["a".to_string()], 0).unwrap(), GroupingKey::Fixed(42));
    }

    #[test]
    fn composite_key_serializes_each_column() {
        let mut a = Column::UInt64(PodArray::new());
        a.insert_field(Field::UInt64(1)).unwrap();
        let mut b = Column::String(Default::default());
        b.insert_field(Field::String("x".into())).unwrap();
        let block = DataBlock::from_columns(vec![
            NamedColumn { name: "a".into(), data_type: DataType::UInt64, column: a },
            NamedColumn { name: "b".into(), data_type: DataType::String, column: b },
        ])
        .unwrap();
        let key = build_key(&block, &["a".to_string(), "b".to_string()], 0).unwrap();
        assert!(matches!(key, GroupingKey::Serialized(_)));
    }
}
