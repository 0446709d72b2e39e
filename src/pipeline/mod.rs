//! Pull-based block pipeline: streams, profiling/limits, and the
//! transforms an interpreter stacks on top of a storage or distributed read.

pub mod profiling;
pub mod stream;
pub mod transforms;

pub use profiling::{Limits, OverflowMode, ProfilingStream};
pub use stream::{drain, BlockInputStream, CancellationToken};
pub use transforms::{ExpressionTransform, FilterTransform, LimitTransform, MergeSortTransform, PartialSortTransform};
