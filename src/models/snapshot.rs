// Producer wire format: one host snapshot with the counters of every workload on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Grouping, NodeSample, PodSample};
use crate::identity::IdentityLookup;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCounters {
    pub node_name: String,
    #[serde(default)]
    pub cpu_total: f64,
    #[serde(default)]
    pub cpu_busy: f64,
    #[serde(default)]
    pub cpu_count: u32,
    #[serde(default)]
    pub memory_total: u64,
    #[serde(default)]
    pub memory_available: u64,
    #[serde(default)]
    pub memory_used: u64,
    #[serde(default)]
    pub disk_read_bytes: u64,
    #[serde(default)]
    pub disk_write_bytes: u64,
    #[serde(default)]
    pub network_rx_bytes: u64,
    #[serde(default)]
    pub network_tx_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodCounters {
    #[serde(default)]
    pub namespace: String,
    pub uid: String,
    #[serde(default)]
    pub cpu_usage_usec: u64,
    #[serde(default)]
    pub memory_usage: u64,
    #[serde(default)]
    pub disk_read_bytes: u64,
    #[serde(default)]
    pub disk_write_bytes: u64,
    #[serde(default)]
    pub network_rx_bytes: u64,
    #[serde(default)]
    pub network_tx_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    pub timestamp: DateTime<Utc>,
    pub node_metric: NodeCounters,
    #[serde(default)]
    pub pod_metric: Vec<PodCounters>,
}

impl HostSnapshot {
    pub fn node_sample(&self) -> NodeSample {
        let n = &self.node_metric;
        NodeSample {
            timestamp: self.timestamp,
            node_name: n.node_name.clone(),
            cpu_total: n.cpu_total,
            cpu_busy: n.cpu_busy,
            cpu_count: n.cpu_count,
            memory_total: n.memory_total,
            memory_available: n.memory_available,
            memory_used: n.memory_used,
            disk_read_bytes: n.disk_read_bytes,
            disk_write_bytes: n.disk_write_bytes,
            network_rx_bytes: n.network_rx_bytes,
            network_tx_bytes: n.network_tx_bytes,
        }
    }

    /// Workload samples with grouping attributes attached. Unresolved workloads keep their
    /// uid as name and the producer-reported namespace (if any), with no deployment.
    pub fn pod_samples(&self, identity: &dyn IdentityLookup) -> Vec<PodSample> {
        self.pod_metric
            .iter()
            .map(|p| {
                // The producer's namespace fills in when identity has none.
                let reported_ns = Some(p.namespace.clone()).filter(|s| !s.is_empty());
                let (pod_name, namespace, deployment) = match identity.resolve(&p.uid) {
                    Some(id) => (id.pod_name, id.namespace.or(reported_ns), id.deployment),
                    None => {
                        tracing::debug!(uid = %p.uid, "workload identity not resolved");
                        (p.uid.clone(), reported_ns, None)
                    }
                };
                PodSample {
                    timestamp: self.timestamp,
                    uid: p.uid.clone(),
                    pod_name,
                    cpu_usage_usec: p.cpu_usage_usec,
                    memory_usage: p.memory_usage,
                    disk_read_bytes: p.disk_read_bytes,
                    disk_write_bytes: p.disk_write_bytes,
                    network_rx_bytes: p.network_rx_bytes,
                    network_tx_bytes: p.network_tx_bytes,
                    grouping: Grouping {
                        node_name: self.node_metric.node_name.clone(),
                        namespace,
                        deployment,
                    },
                }
            })
            .collect()
    }
}
