// HistoryRepo tests: connect, init, save, recent/range queries, filters, prune

mod common;

use cluster_metrics::history_repo::{HistoryRepo, PodFilter};
use common::*;
use tempfile::TempDir;

#[tokio::test]
async fn history_repo_connect_and_init() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("history.db");
    let path_str = path.to_str().unwrap();

    let repo = HistoryRepo::connect(path_str, 3).await.unwrap();
    repo.init().await.unwrap();
    // Second init is no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn save_and_read_back_host_tick() {
    let (_dir, repo) = temp_repo().await;
    let node = node_sample("node-a", 0, 100.0, 1000.0, 4);
    let pod = in_group(
        pod_sample("u1", 0, 42),
        "node-a",
        Some("prod"),
        Some("web"),
    );
    repo.save_host_samples(&node, std::slice::from_ref(&pod))
        .await
        .unwrap();

    let nodes = repo.recent_node_samples(None, 2).await.unwrap();
    assert_eq!(nodes, vec![node]);
    let pods = repo.recent_pod_samples(&PodFilter::All, 2).await.unwrap();
    assert_eq!(pods, vec![pod]);
}

#[tokio::test]
async fn absent_grouping_attributes_round_trip_as_none() {
    let (_dir, repo) = temp_repo().await;
    let node = node_sample("node-a", 0, 0.0, 0.0, 1);
    let pod = in_group(pod_sample("u1", 0, 0), "node-a", None, None);
    repo.save_host_samples(&node, &[pod]).await.unwrap();

    let pods = repo.recent_pod_samples(&PodFilter::All, 1).await.unwrap();
    assert_eq!(pods[0].grouping.namespace, None);
    assert_eq!(pods[0].grouping.deployment, None);
}

#[tokio::test]
async fn recent_samples_are_limited_per_entity_and_newest_first() {
    let (_dir, repo) = temp_repo().await;
    for t in [0, 60, 120, 180] {
        repo.save_host_samples(
            &node_sample("node-a", t, 0.0, 0.0, 1),
            &[pod_sample("u1", t, 0), pod_sample("u2", t, 0)],
        )
        .await
        .unwrap();
        repo.save_host_samples(&node_sample("node-b", t + 5, 0.0, 0.0, 1), &[])
            .await
            .unwrap();
    }

    let nodes = repo.recent_node_samples(None, 2).await.unwrap();
    assert_eq!(nodes.len(), 4);
    assert!(nodes.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert_eq!(nodes[0].node_name, "node-b");
    assert_eq!(nodes[0].timestamp, at(185));

    let only_a = repo.recent_node_samples(Some("node-a"), 3).await.unwrap();
    let times: Vec<_> = only_a.iter().map(|n| n.timestamp).collect();
    assert_eq!(times, vec![at(180), at(120), at(60)]);

    let pods = repo.recent_pod_samples(&PodFilter::All, 2).await.unwrap();
    assert_eq!(pods.len(), 4);
    assert!(pods.iter().all(|p| p.timestamp >= at(120)));
}

#[tokio::test]
async fn range_queries_are_inclusive_and_descending() {
    let (_dir, repo) = temp_repo().await;
    for t in [0, 60, 120, 180] {
        repo.save_host_samples(
            &node_sample("node-a", t, 0.0, 0.0, 1),
            &[pod_sample("u1", t, 0)],
        )
        .await
        .unwrap();
    }

    let nodes = repo
        .node_samples_in_range(Some("node-a"), at(60), at(120))
        .await
        .unwrap();
    let times: Vec<_> = nodes.iter().map(|n| n.timestamp).collect();
    assert_eq!(times, vec![at(120), at(60)]);

    let pods = repo
        .pod_samples_in_range(&PodFilter::All, at(61), at(600))
        .await
        .unwrap();
    assert_eq!(pods.len(), 2);
    assert_eq!(pods[0].timestamp, at(180));
}

#[tokio::test]
async fn pod_filters_select_by_grouping() {
    let (_dir, repo) = temp_repo().await;
    let pods = vec![
        in_group(pod_sample("u1", 0, 0), "node-a", Some("prod"), Some("web")),
        in_group(pod_sample("u2", 0, 0), "node-a", Some("prod"), Some("api")),
        in_group(pod_sample("u3", 0, 0), "node-a", Some("dev"), Some("web")),
    ];
    repo.save_host_samples(&node_sample("node-a", 0, 0.0, 0.0, 1), &pods)
        .await
        .unwrap();
    repo.save_host_samples(
        &node_sample("node-b", 0, 0.0, 0.0, 1),
        &[in_group(pod_sample("u4", 0, 0), "node-b", None, None)],
    )
    .await
    .unwrap();

    let uids = |v: Vec<cluster_metrics::models::PodSample>| {
        let mut u: Vec<String> = v.into_iter().map(|p| p.uid).collect();
        u.sort();
        u
    };

    let ns = repo
        .recent_pod_samples(&PodFilter::Namespace("prod".into()), 2)
        .await
        .unwrap();
    assert_eq!(uids(ns), vec!["u1", "u2"]);

    let dep = repo
        .recent_pod_samples(
            &PodFilter::Deployment {
                namespace: "prod".into(),
                name: "web".into(),
            },
            2,
        )
        .await
        .unwrap();
    assert_eq!(uids(dep), vec!["u1"]);

    let node = repo
        .recent_pod_samples(&PodFilter::Node("node-b".into()), 2)
        .await
        .unwrap();
    assert_eq!(uids(node), vec!["u4"]);

    let by_name = repo
        .recent_pod_samples(&PodFilter::Pod("u3-pod".into()), 2)
        .await
        .unwrap();
    assert_eq!(uids(by_name), vec!["u3"]);
}

#[tokio::test]
async fn prune_removes_rows_past_retention() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 1).await.unwrap();
    repo.init().await.unwrap();

    // Fixture timestamps are far older than one day.
    repo.save_host_samples(
        &node_sample("node-a", 0, 0.0, 0.0, 1),
        &[pod_sample("u1", 0, 0)],
    )
    .await
    .unwrap();
    let fresh = cluster_metrics::models::NodeSample {
        timestamp: chrono::Utc::now(),
        ..node_sample("node-a", 0, 0.0, 0.0, 1)
    };
    repo.save_host_samples(&fresh, &[]).await.unwrap();

    let removed = repo.prune_old_data().await.unwrap();
    assert_eq!(removed, 2);
    let nodes = repo.recent_node_samples(None, 10).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert!(repo.recent_pod_samples(&PodFilter::All, 10).await.unwrap().is_empty());

    repo.vacuum().await.unwrap();
}
