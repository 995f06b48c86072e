// Background ingestion: on every scheduled tick, pull one snapshot from each producer,
// attach workload grouping attributes and append the samples to history.
// A failing producer is logged and counted; it never stops the others.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::future::join_all;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::history_repo::HistoryRepo;
use crate::identity::IdentityLookup;
use crate::producer::SnapshotSource;

/// Outcome of one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub hosts_ok: usize,
    pub hosts_failed: usize,
    pub pods_saved: usize,
}

/// Producers, collaborators, and shutdown for the worker.
pub struct IngestDeps<P> {
    pub sources: Vec<P>,
    pub identity: Arc<dyn IdentityLookup>,
    pub history_repo: Arc<HistoryRepo>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Cron expression with seconds field, local time. "0 * * * * *" = every minute.
    pub schedule: String,
}

/// Fetches all producers concurrently, then persists each host in its own transaction.
pub async fn collect_once<P: SnapshotSource>(
    sources: &[P],
    identity: &dyn IdentityLookup,
    repo: &HistoryRepo,
) -> CollectReport {
    let results = join_all(
        sources
            .iter()
            .map(|s| async move { (s.name(), s.fetch().await) }),
    )
    .await;

    let mut report = CollectReport::default();
    for (source, result) in results {
        let snapshot = match result {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, source = %source, operation = "fetch_snapshot", "producer fetch failed");
                report.hosts_failed += 1;
                continue;
            }
        };
        let node = snapshot.node_sample();
        if node.node_name.is_empty() {
            warn!(source = %source, operation = "fetch_snapshot", "snapshot without node name; dropped");
            report.hosts_failed += 1;
            continue;
        }
        let pods = snapshot.pod_samples(identity);
        match repo.save_host_samples(&node, &pods).await {
            Ok(()) => {
                report.hosts_ok += 1;
                report.pods_saved += pods.len();
            }
            Err(e) => {
                warn!(error = %e, node = %node.node_name, operation = "save_host_samples", "failed to persist host samples");
                report.hosts_failed += 1;
            }
        }
    }
    report
}

/// Spawns the ingestion worker. Fails fast on an unparsable schedule.
pub fn spawn<P>(deps: IngestDeps<P>, config: IngestConfig) -> anyhow::Result<tokio::task::JoinHandle<()>>
where
    P: SnapshotSource + 'static,
{
    let schedule = cron::Schedule::from_str(&config.schedule)
        .with_context(|| format!("invalid collection schedule: {}", config.schedule))?;
    Ok(tokio::spawn(run(deps, schedule)))
}

#[instrument(skip_all, fields(producers = deps.sources.len()))]
async fn run<P: SnapshotSource>(deps: IngestDeps<P>, schedule: cron::Schedule) {
    let IngestDeps {
        sources,
        identity,
        history_repo,
        mut shutdown_rx,
    } = deps;

    let mut passes_total: u64 = 0;
    loop {
        let now = chrono::Local::now();
        let Some(next) = schedule.after(&now).next() else {
            warn!("collection schedule has no upcoming run; ingestion stopped");
            break;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                let report = collect_once(&sources, identity.as_ref(), &history_repo).await;
                passes_total += 1;
                info!(
                    hosts_ok = report.hosts_ok,
                    hosts_failed = report.hosts_failed,
                    pods_saved = report.pods_saved,
                    passes_total,
                    "collection pass complete"
                );
            }
            _ = &mut shutdown_rx => {
                debug!("Ingest worker shutting down");
                break;
            }
        }
    }
}
