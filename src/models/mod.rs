// Domain models: stored samples, producer snapshots, query reports

mod report;
mod sample;
mod snapshot;

pub use report::{GroupReport, NodeReport, PodReport, WindowReport};
pub use sample::{CpuCounter, Grouping, IoCounters, NodeSample, PodSample, Sample};
pub use snapshot::{HostSnapshot, NodeCounters, PodCounters};
