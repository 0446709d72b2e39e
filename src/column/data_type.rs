//! `DataType` — describes a column's logical type: default value, equality,
//! and the capability predicates requires (`is_numeric`,
//! `is_nullable`, `is_fixed_and_contiguous`, `have_maximum_size_of_value`).

use super::field::Field;

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    UInt64,
    Int64,
    Float64,
    String,
    Date,
    Array(Box<DataType>),
    Nullable(Box<DataType>),
    LowCardinality(Box<DataType>),
    Decimal { precision: u8, scale: u8 },
    AggregateFunctionState(String),
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 | DataType::Decimal { .. }
        )
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    /// Fixed-width AND laid out contiguously in memory (i.e. not string/array).
    pub fn is_fixed_and_contiguous(&self) -> bool {
        matches!(
            self,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 | DataType::Date | DataType::Decimal { .. }
        )
    }

    pub fn have_maximum_size_of_value(&self) -> bool {
        self.is_fixed_and_contiguous()
    }

    pub fn default_value(&self) -> Field {
        match self {
            DataType::UInt64 | DataType::Date => Field::UInt64(0),
            DataType::Int64 => Field::Int64(0),
            DataType::Float64 | DataType::Decimal { .. } => Field::Float64(0.0),
            DataType::String => Field::String(String::new()),
            DataType::Array(_) => Field::Array(Vec::new()),
            DataType::Nullable(_) => Field::Null,
            DataType::LowCardinality(inner) => inner.default_value(),
            DataType::AggregateFunctionState(_) => Field::Null,
        }
    }

    pub fn name(&self) -> String {
        match self {
            DataType::UInt64 => "UInt64".into(),
            DataType::Int64 => "Int64".into(),
            DataType::Float64 => "Float64".into(),
            DataType::String => "String".into(),
            DataType::Date => "Date".into(),
            DataType::Array(inner) => format!("Array({})", inner.name()),
            DataType::Nullable(inner) => format!("Nullable({})", inner.name()),
            DataType::LowCardinality(inner) => format!("LowCardinality({})", inner.name()),
            DataType::Decimal { precision, scale } => format!("Decimal({precision}, {scale})"),
            DataType::AggregateFunctionState(f) => format!("AggregateFunction({f})"),
        }
    }
}
