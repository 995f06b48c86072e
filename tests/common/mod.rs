// Shared test helpers
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use cluster_metrics::history_repo::HistoryRepo;
use cluster_metrics::models::*;
use tempfile::TempDir;

/// Fixed origin for sample timestamps.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::seconds(secs)
}

/// Clock for windowed queries: ten minutes after the origin.
pub fn test_clock() -> DateTime<Utc> {
    at(600)
}

pub fn node_sample(name: &str, secs: i64, busy: f64, total: f64, cpus: u32) -> NodeSample {
    NodeSample {
        timestamp: at(secs),
        node_name: name.into(),
        cpu_total: total,
        cpu_busy: busy,
        cpu_count: cpus,
        memory_total: 8 * 1024 * 1024 * 1024,
        memory_available: 6 * 1024 * 1024 * 1024,
        memory_used: 3 * 1024 * 1024 * 1024,
        disk_read_bytes: 0,
        disk_write_bytes: 0,
        network_rx_bytes: 0,
        network_tx_bytes: 0,
    }
}

pub fn pod_sample(uid: &str, secs: i64, cpu_usage_usec: u64) -> PodSample {
    PodSample {
        timestamp: at(secs),
        uid: uid.into(),
        pod_name: format!("{uid}-pod"),
        cpu_usage_usec,
        memory_usage: 100 * 1024 * 1024,
        disk_read_bytes: 0,
        disk_write_bytes: 0,
        network_rx_bytes: 0,
        network_tx_bytes: 0,
        grouping: Grouping {
            node_name: "node-a".into(),
            namespace: None,
            deployment: None,
        },
    }
}

pub fn in_group(mut s: PodSample, node: &str, ns: Option<&str>, deployment: Option<&str>) -> PodSample {
    s.grouping = Grouping {
        node_name: node.into(),
        namespace: ns.map(Into::into),
        deployment: deployment.map(Into::into),
    };
    s
}

pub async fn temp_repo() -> (TempDir, Arc<HistoryRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 3650)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}
