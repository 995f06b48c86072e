// Maintenance worker: first tick prunes expired rows, shutdown stops the task

mod common;

use cluster_metrics::history_repo::{HistoryRepo, PodFilter};
use cluster_metrics::maintenance_worker::{MaintenanceConfig, spawn};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn maintenance_prunes_on_first_tick_and_shuts_down() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let repo = Arc::new(HistoryRepo::connect(path.to_str().unwrap(), 1).await.unwrap());
    repo.init().await.unwrap();
    repo.save_host_samples(
        &node_sample("node-a", 0, 0.0, 0.0, 1),
        &[pod_sample("u1", 0, 0)],
    )
    .await
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn(
        repo.clone(),
        MaintenanceConfig {
            prune_interval_secs: 3600,
            vacuum_schedule: None,
            vacuum_interval_secs: 3600,
        },
        shutdown_rx,
    );

    // interval's first tick is immediate
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !repo.recent_node_samples(None, 1).await.unwrap().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "prune did not run");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(repo.recent_pod_samples(&PodFilter::All, 1).await.unwrap().is_empty());

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}
