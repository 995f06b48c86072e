// Stored samples: one row per entity per collection tick.
// Cumulative counters are only ever differenced; gauges are read as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of the CPU figure; selects which rate formula applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CpuCounter {
    /// Host-wide cumulative busy / total CPU time over all cores.
    HostTime { busy: f64, total: f64, cpus: u32 },
    /// Absolute cumulative usage in microseconds (cgroup `cpu.stat`).
    UsageUsec(u64),
}

/// Cumulative disk and network byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

/// Common view over host and workload samples used by the rate and aggregation code.
pub trait Sample {
    fn entity_id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn cpu(&self) -> CpuCounter;
    fn io(&self) -> IoCounters;
    /// Point-in-time memory in bytes.
    fn memory_used(&self) -> u64;
}

impl<S: Sample + ?Sized> Sample for &S {
    fn entity_id(&self) -> &str {
        (**self).entity_id()
    }
    fn timestamp(&self) -> DateTime<Utc> {
        (**self).timestamp()
    }
    fn cpu(&self) -> CpuCounter {
        (**self).cpu()
    }
    fn io(&self) -> IoCounters {
        (**self).io()
    }
    fn memory_used(&self) -> u64 {
        (**self).memory_used()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub timestamp: DateTime<Utc>,
    pub node_name: String,
    pub cpu_total: f64,
    pub cpu_busy: f64,
    pub cpu_count: u32,
    pub memory_total: u64,
    pub memory_available: u64,
    pub memory_used: u64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

impl Sample for NodeSample {
    fn entity_id(&self) -> &str {
        &self.node_name
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn cpu(&self) -> CpuCounter {
        CpuCounter::HostTime {
            busy: self.cpu_busy,
            total: self.cpu_total,
            cpus: self.cpu_count,
        }
    }

    fn io(&self) -> IoCounters {
        IoCounters {
            disk_read_bytes: self.disk_read_bytes,
            disk_write_bytes: self.disk_write_bytes,
            network_rx_bytes: self.network_rx_bytes,
            network_tx_bytes: self.network_tx_bytes,
        }
    }

    /// Used = total - available; the producer's own `memory_used` includes reclaimable cache.
    fn memory_used(&self) -> u64 {
        self.memory_total.saturating_sub(self.memory_available)
    }
}

/// Grouping attributes denormalized onto each workload sample at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub node_name: String,
    pub namespace: Option<String>,
    pub deployment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSample {
    pub timestamp: DateTime<Utc>,
    pub uid: String,
    pub pod_name: String,
    pub cpu_usage_usec: u64,
    pub memory_usage: u64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub grouping: Grouping,
}

impl Sample for PodSample {
    fn entity_id(&self) -> &str {
        &self.uid
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn cpu(&self) -> CpuCounter {
        CpuCounter::UsageUsec(self.cpu_usage_usec)
    }

    fn io(&self) -> IoCounters {
        IoCounters {
            disk_read_bytes: self.disk_read_bytes,
            disk_write_bytes: self.disk_write_bytes,
            network_rx_bytes: self.network_rx_bytes,
            network_tx_bytes: self.network_tx_bytes,
        }
    }

    fn memory_used(&self) -> u64 {
        self.memory_usage
    }
}
