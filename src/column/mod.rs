//! Columnar data model.
//!
//! A closed, typed `Column` sum type: fixed-width vector, variable-width
//! string, array-of-offsets, nullable, constant, and low-cardinality/
//! dictionary variants, each backed by `PodArray` rather than boxed values.

pub mod column;
pub mod data_type;
pub mod field;
pub mod pod_array;

pub use column::{ArrayColumn, Column, ColumnRef, ConstColumn, LowCardinalityColumn, NullableColumn, StringColumn};
pub use data_type::DataType;
pub use field::Field;
pub use pod_array::PodArray;
