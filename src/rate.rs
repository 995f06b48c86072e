// Pairwise rate calculation from two samples of the same entity.
// Counter resets clamp to zero; a non-positive interval is an error, never a value.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::models::{CpuCounter, Sample};

/// Derived per-entity figures. Summed field-by-field for groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub cpu_millicores: f64,
    /// Gauge taken from the newer sample.
    pub memory_bytes: u64,
    /// Bytes per second.
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    pub network_rx_rate: f64,
    pub network_tx_rate: f64,
}

impl Rates {
    /// Field-wise mean over `count` accumulated pairs; `None` for zero pairs.
    pub fn averaged(self, count: usize) -> Option<Rates> {
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Rates {
            cpu_millicores: self.cpu_millicores / n,
            memory_bytes: self.memory_bytes / count as u64,
            disk_read_rate: self.disk_read_rate / n,
            disk_write_rate: self.disk_write_rate / n,
            network_rx_rate: self.network_rx_rate / n,
            network_tx_rate: self.network_tx_rate / n,
        })
    }
}

impl Add for Rates {
    type Output = Rates;

    fn add(self, rhs: Rates) -> Rates {
        Rates {
            cpu_millicores: self.cpu_millicores + rhs.cpu_millicores,
            memory_bytes: self.memory_bytes.saturating_add(rhs.memory_bytes),
            disk_read_rate: self.disk_read_rate + rhs.disk_read_rate,
            disk_write_rate: self.disk_write_rate + rhs.disk_write_rate,
            network_rx_rate: self.network_rx_rate + rhs.network_rx_rate,
            network_tx_rate: self.network_tx_rate + rhs.network_tx_rate,
        }
    }
}

impl AddAssign for Rates {
    fn add_assign(&mut self, rhs: Rates) {
        *self = *self + rhs;
    }
}

impl Sum for Rates {
    fn sum<I: Iterator<Item = Rates>>(iter: I) -> Rates {
        iter.fold(Rates::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("samples belong to different entities: {latest} vs {previous}")]
    EntityMismatch { latest: String, previous: String },
    #[error("insufficient interval between samples of {entity_id} ({millis} ms)")]
    InsufficientInterval { entity_id: String, millis: i64 },
}

/// Rates between `latest` and `previous` (same entity, `latest` strictly newer).
pub fn rate<S: Sample>(latest: &S, previous: &S) -> Result<Rates, RateError> {
    if latest.entity_id() != previous.entity_id() {
        return Err(RateError::EntityMismatch {
            latest: latest.entity_id().to_string(),
            previous: previous.entity_id().to_string(),
        });
    }
    let millis = (latest.timestamp() - previous.timestamp()).num_milliseconds();
    if millis <= 0 {
        return Err(RateError::InsufficientInterval {
            entity_id: latest.entity_id().to_string(),
            millis,
        });
    }
    let secs = millis as f64 / 1000.0;

    let cur = latest.io();
    let prev = previous.io();
    Ok(Rates {
        cpu_millicores: cpu_millicores(latest.cpu(), previous.cpu(), secs),
        memory_bytes: latest.memory_used(),
        disk_read_rate: byte_rate(cur.disk_read_bytes, prev.disk_read_bytes, secs),
        disk_write_rate: byte_rate(cur.disk_write_bytes, prev.disk_write_bytes, secs),
        network_rx_rate: byte_rate(cur.network_rx_bytes, prev.network_rx_bytes, secs),
        network_tx_rate: byte_rate(cur.network_tx_bytes, prev.network_tx_bytes, secs),
    })
}

/// CPU in millicores.
///
/// Host counters: busy fraction of elapsed CPU time, scaled by logical CPU count so the
/// figure is aggregate millicores across cores. Usage counters: microseconds consumed per
/// elapsed second, divided by 1000.
pub fn cpu_millicores(latest: CpuCounter, previous: CpuCounter, secs: f64) -> f64 {
    match (latest, previous) {
        (
            CpuCounter::HostTime { busy, total, cpus },
            CpuCounter::HostTime {
                busy: prev_busy,
                total: prev_total,
                ..
            },
        ) => {
            let d_total = total - prev_total;
            let d_busy = busy - prev_busy;
            if d_total <= 0.0 || d_busy < 0.0 {
                return 0.0;
            }
            (d_busy / d_total) * 1000.0 * f64::from(cpus.max(1))
        }
        (CpuCounter::UsageUsec(usage), CpuCounter::UsageUsec(prev_usage)) => {
            if secs <= 0.0 {
                return 0.0;
            }
            usage
                .checked_sub(prev_usage)
                .map_or(0.0, |d| d as f64 / (secs * 1000.0))
        }
        _ => 0.0,
    }
}

/// Bytes per second; a decreasing counter (restart or wrap) yields 0.
pub fn byte_rate(current: u64, previous: u64, secs: f64) -> f64 {
    if secs <= 0.0 {
        return 0.0;
    }
    current
        .checked_sub(previous)
        .map_or(0.0, |d| d as f64 / secs)
}
