// Pure aggregation over fetched samples: grouping, latest-value and windowed modes.
// No I/O here; callers fetch from the store and pass owned samples in.

pub mod grouping;
pub mod latest;
pub mod timeseries;

pub use grouping::{GroupTotal, by_deployment, by_namespace, by_node, group_by, partition_by_entity};
pub use latest::{EntityRate, latest_by_group, latest_for_group, latest_per_entity, latest_rate};
pub use timeseries::{AggregateError, WindowedAverage, windowed_average, windowed_group_sum};
