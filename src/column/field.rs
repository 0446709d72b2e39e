//! `Field` — a dynamically-typed single value, used at column/row boundaries
//! (`get_as_field`, `insert_field`) the way capability set
//! requires, without forcing every column variant to be generic over `Field`.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    UInt64(u64),
    Int64(i64),
    Float64(f64),
    String(String),
    Array(Vec<Field>),
}

impl Field {
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::UInt64(v) => Some(*v as f64),
            Field::Int64(v) => Some(*v as f64),
            Field::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Three-way compare honoring a nulls-direction hint: `nulls_last=true`
    /// sorts NULL after every non-null value, matching
    /// `compare_at(..., nulls_direction)`.
    pub fn compare(&self, other: &Field, nulls_last: bool) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return if nulls_last { Ordering::Greater } else { Ordering::Less },
            (false, true) => return if nulls_last { Ordering::Less } else { Ordering::Greater },
            (false, false) => {}
        }
        match (self, other) {
            (Field::String(a), Field::String(b)) => a.cmp(b),
            _ => self
                .as_f64()
                .unwrap_or(f64::NAN)
                .partial_cmp(&other.as_f64().unwrap_or(f64::NAN))
                .unwrap_or(Ordering::Equal),
        }
    }
}

impl From<u64> for Field {
    fn from(v: u64) -> Self {
        Field::UInt64(v)
    }
}
impl From<i64> for Field {
    fn from(v: i64) -> Self {
        Field::Int64(v)
    }
}
impl From<f64> for Field {
    fn from(v: f64) -> Self {
        Field::Float64(v)
    }
}
impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::String(v)
    }
}
impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::String(v.to_string())
    }
}
