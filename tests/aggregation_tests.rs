// Aggregation tests: latest-value mode, windowed mode, group sums

mod common;

use cluster_metrics::aggregate::{
    AggregateError, by_deployment, by_namespace, latest_by_group, latest_for_group,
    latest_per_entity, latest_rate, windowed_average, windowed_group_sum,
};
use cluster_metrics::rate::rate;
use cluster_metrics::window::WindowSpec;
use common::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn window(expr: &str) -> WindowSpec {
    expr.parse().unwrap()
}

#[test]
fn latest_rate_uses_two_newest_samples_regardless_of_order() {
    let history = vec![
        pod_sample("a", 60, 6_000_000),
        pod_sample("a", 0, 0),
        pod_sample("a", 120, 18_000_000),
    ];
    let e = latest_rate(history).unwrap();
    assert_eq!(e.latest.timestamp, at(120));
    assert!(close(e.rates.cpu_millicores, 200.0));
}

#[test]
fn latest_rate_needs_two_samples() {
    assert!(latest_rate(vec![pod_sample("a", 0, 0)]).is_none());
    assert!(latest_rate(Vec::<cluster_metrics::models::PodSample>::new()).is_none());
}

#[test]
fn latest_rate_skips_duplicate_timestamps() {
    let history = vec![pod_sample("a", 60, 10), pod_sample("a", 60, 20)];
    assert!(latest_rate(history).is_none());
}

#[test]
fn host_latest_rate_scales_by_cpu_count() {
    let history = vec![
        node_sample("node-a", 0, 100.0, 1000.0, 1),
        node_sample("node-a", 60, 300.0, 2000.0, 1),
    ];
    let e = latest_rate(history).unwrap();
    assert!(close(e.rates.cpu_millicores, 200.0));
    // 8 GiB total - 6 GiB available
    assert_eq!(e.rates.memory_bytes, 2 * 1024 * 1024 * 1024);
}

#[test]
fn latest_per_entity_skips_entities_without_history() {
    let samples = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("b", 60, 1_000),
    ];
    let rates = latest_per_entity(samples);
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].latest.uid, "a");
}

#[test]
fn group_total_is_sum_of_member_rates() {
    let samples = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("b", 10, 0),
        pod_sample("b", 70, 12_000_000),
    ];
    let total = latest_for_group(samples).unwrap();
    assert_eq!(total.members, 2);
    assert!(close(total.rates.cpu_millicores, 300.0));
    assert_eq!(total.rates.memory_bytes, 2 * 100 * 1024 * 1024);
    assert_eq!(total.timestamp, at(70));
}

#[test]
fn group_total_ignores_member_order() {
    let mut samples = vec![
        pod_sample("a", 0, 0),
        pod_sample("b", 10, 0),
        pod_sample("c", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("b", 70, 12_000_000),
        pod_sample("c", 30, 3_000_000),
    ];
    let forward = latest_for_group(samples.clone()).unwrap();
    samples.reverse();
    let backward = latest_for_group(samples).unwrap();
    assert_eq!(forward.members, backward.members);
    assert!(close(
        forward.rates.cpu_millicores,
        backward.rates.cpu_millicores
    ));
}

#[test]
fn group_without_qualifying_members_has_no_data() {
    let samples = vec![pod_sample("a", 0, 0), pod_sample("b", 0, 0)];
    assert!(latest_for_group(samples).is_none());
}

#[test]
fn grouping_by_deployment_excludes_unattributed_workloads() {
    let samples = vec![
        in_group(pod_sample("a", 0, 0), "node-a", Some("prod"), Some("web")),
        in_group(pod_sample("a", 60, 6_000_000), "node-a", Some("prod"), Some("web")),
        in_group(pod_sample("b", 0, 0), "node-b", Some("prod"), None),
        in_group(pod_sample("b", 60, 6_000_000), "node-b", Some("prod"), None),
    ];
    let by_dep = latest_by_group(samples.clone(), by_deployment);
    assert_eq!(by_dep.len(), 1);
    let web = &by_dep[&("prod".to_string(), "web".to_string())];
    assert_eq!(web.members, 1);

    let by_ns = latest_by_group(samples, by_namespace);
    assert_eq!(by_ns["prod"].members, 2);
    assert!(close(by_ns["prod"].rates.cpu_millicores, 200.0));
}

#[test]
fn windowed_average_uses_pairs_within_window() {
    let history = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("a", 130, 13_000_000),
    ];
    let avg = windowed_average(&history, &window("90s")).unwrap().unwrap();
    assert_eq!(avg.pairs_used, 2);
    assert!(close(avg.rates.cpu_millicores, 100.0));
    assert_eq!(avg.window_end, at(130));
    assert_eq!(avg.window_start, at(40));
}

#[test]
fn windowed_average_without_usable_pairs_is_no_data() {
    let history = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("a", 130, 13_000_000),
    ];
    assert_eq!(windowed_average(&history, &window("50s")), Ok(None));
}

#[test]
fn windowed_average_skips_only_the_gap() {
    // 0 -> 60 is regular, 60 -> 600 is an outage
    let history = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 12_000_000),
        pod_sample("a", 600, 13_000_000),
    ];
    let avg = windowed_average(&history, &window("2m")).unwrap().unwrap();
    assert_eq!(avg.pairs_used, 1);
    assert!(close(avg.rates.cpu_millicores, 200.0));
}

#[test]
fn windowed_average_over_two_samples_matches_pairwise_rate() {
    let previous = pod_sample("a", 0, 0);
    let latest = pod_sample("a", 45, 9_000_000);
    let pairwise = rate(&latest, &previous).unwrap();
    let avg = windowed_average(&[previous, latest], &window("1m"))
        .unwrap()
        .unwrap();
    assert_eq!(avg.pairs_used, 1);
    assert_eq!(avg.rates, pairwise);
}

#[test]
fn windowed_average_counts_reset_pairs_as_zero() {
    let history = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 12_000_000),
        pod_sample("a", 120, 1_000),
    ];
    let avg = windowed_average(&history, &window("5m")).unwrap().unwrap();
    assert_eq!(avg.pairs_used, 2);
    assert!(close(avg.rates.cpu_millicores, 100.0));
}

#[test]
fn windowed_average_skips_duplicate_timestamps() {
    let history = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("a", 60, 6_000_000),
    ];
    let avg = windowed_average(&history, &window("5m")).unwrap().unwrap();
    assert_eq!(avg.pairs_used, 1);
    assert!(close(avg.rates.cpu_millicores, 100.0));
}

#[test]
fn windowed_average_rejects_short_history() {
    let history = vec![pod_sample("a", 0, 0)];
    assert_eq!(
        windowed_average(&history, &window("5m")),
        Err(AggregateError::InsufficientDataPoints { got: 1 })
    );
}

#[test]
fn windowed_group_sum_adds_member_averages() {
    let samples = vec![
        pod_sample("a", 0, 0),
        pod_sample("a", 60, 6_000_000),
        pod_sample("a", 120, 12_000_000),
        pod_sample("b", 0, 0),
        pod_sample("b", 60, 12_000_000),
        // single sample: contributes nothing
        pod_sample("c", 60, 0),
    ];
    let sum = windowed_group_sum(samples, &window("2m")).unwrap();
    assert_eq!(sum.members, 2);
    assert_eq!(sum.pairs_used, 3);
    assert!(close(sum.rates.cpu_millicores, 300.0));
    assert_eq!(sum.window_end, at(120));
    assert_eq!(sum.window_start, at(0));
}

#[test]
fn windowed_group_sum_without_members_is_none() {
    let samples = vec![pod_sample("a", 0, 0), pod_sample("b", 0, 0)];
    assert!(windowed_group_sum(samples, &window("2m")).is_none());
}

#[test]
fn windowed_average_over_one_stale_pair_is_no_data() {
    let history = vec![pod_sample("a", 0, 0), pod_sample("a", 61, 6_000_000)];
    assert_eq!(windowed_average(&history, &window("1m")), Ok(None));
}

#[test]
fn group_sum_is_associative() {
    let a = vec![pod_sample("a", 0, 0), pod_sample("a", 60, 6_000_000)];
    let b = vec![pod_sample("b", 10, 0), pod_sample("b", 70, 3_000_000)];
    let together = latest_for_group(a.iter().chain(b.iter()).cloned()).unwrap();
    let stepwise = latest_for_group(a)
        .unwrap()
        .merge(latest_for_group(b).unwrap());
    assert_eq!(together, stepwise);
}
