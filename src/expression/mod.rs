//! Vectorized expression engine.
//!
//! An actions list (ADD_COLUMN / REMOVE_COLUMN / COPY_COLUMN /
//! APPLY_FUNCTION / PROJECT) applied to a `DataBlock`, without the SQL
//! parser that would produce it.

pub mod action;
pub mod function;

pub use action::{Action, ExpressionActions};
pub use function::{Function, FunctionRegistry};
