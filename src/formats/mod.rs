//! Streaming format parsers: JSONEachRow and the file
//! segmentation engine behind parallel parsing.

pub mod json_each_row;
pub mod parallel_parsing;

pub use json_each_row::{ColumnIndex, JsonEachRowSettings};
pub use parallel_parsing::{segment, segment_all, ParallelParsingRing};
