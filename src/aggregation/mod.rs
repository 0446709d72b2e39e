//! Aggregation engine: hash-table key-layout dispatch,
//! specialized state blobs, and two-level parallel aggregation.

pub mod aggregator;
pub mod function;
pub mod hyperloglog;
pub mod key;
pub mod quantile_timing;
pub mod two_level;

pub use aggregator::{AggregateDescriptor, Aggregator};
pub use function::{AggregateFunctionKind, AggregateState};
pub use hyperloglog::HyperLogLog;
pub use key::GroupingKey;
pub use quantile_timing::QuantileTimingState;
pub use two_level::TwoLevelAggregator;
