// Query results. Always derived on read; never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NodeSample, PodSample};
use crate::rate::Rates;

/// Instantaneous figures for one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub timestamp: DateTime<Utc>,
    pub node_name: String,
    #[serde(flatten)]
    pub rates: Rates,
}

impl NodeReport {
    pub fn new(latest: &NodeSample, rates: Rates) -> Self {
        Self {
            timestamp: latest.timestamp,
            node_name: latest.node_name.clone(),
            rates,
        }
    }
}

/// Instantaneous figures for one workload unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodReport {
    pub timestamp: DateTime<Utc>,
    pub pod_name: String,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    pub node_name: String,
    #[serde(flatten)]
    pub rates: Rates,
}

impl PodReport {
    pub fn new(latest: &PodSample, rates: Rates) -> Self {
        Self {
            timestamp: latest.timestamp,
            pod_name: latest.pod_name.clone(),
            uid: latest.uid.clone(),
            namespace: latest.grouping.namespace.clone(),
            deployment: latest.grouping.deployment.clone(),
            node_name: latest.grouping.node_name.clone(),
            rates,
        }
    }
}

/// Summed figures for a set of workload units (deployment, namespace or host membership).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub name: String,
    /// Set for deployments, which are only unique within a namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub pod_count: usize,
    #[serde(flatten)]
    pub rates: Rates,
}

/// Windowed average for one entity, or the summed member averages of a group.
///
/// Workload windows are keyed by uid and carry the labels of the newest sample, so
/// restarts under one name stay distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub window: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub pairs_used: usize,
    pub members: usize,
    #[serde(flatten)]
    pub rates: Rates,
}

impl WindowReport {
    /// Attach the labels of `latest` to a workload window.
    pub fn with_workload(self, latest: &PodSample) -> Self {
        Self {
            pod_name: Some(latest.pod_name.clone()),
            namespace: latest.grouping.namespace.clone(),
            deployment: latest.grouping.deployment.clone(),
            node_name: Some(latest.grouping.node_name.clone()),
            ..self
        }
    }
}
