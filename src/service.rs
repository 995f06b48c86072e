// Query orchestration over the history store. Presence of a window expression selects
// windowed mode; otherwise readings come from the two newest samples per entity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{self, GroupTotal, WindowedAverage};
use crate::history_repo::{HistoryRepo, PodFilter};
use crate::models::{GroupReport, NodeReport, PodReport, PodSample, Sample, WindowReport};
use crate::window::{WindowError, WindowSpec};

/// Latest mode needs exactly the two newest samples of each entity.
const LATEST_SAMPLES: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Caller supplied a bad window expression.
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("store query failed: {0}")]
    Store(#[from] anyhow::Error),
}

/// One entity or group reading in either mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading<L> {
    Latest(L),
    Windowed(WindowReport),
}

enum Mode {
    Latest,
    Windowed {
        spec: WindowSpec,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

pub struct MetricsService {
    repo: Arc<HistoryRepo>,
    clock: fn() -> DateTime<Utc>,
}

impl MetricsService {
    pub fn new(repo: Arc<HistoryRepo>) -> Self {
        Self::with_clock(repo, Utc::now)
    }

    /// Windowed queries cover `[clock() - window, clock()]`.
    pub fn with_clock(repo: Arc<HistoryRepo>, clock: fn() -> DateTime<Utc>) -> Self {
        Self { repo, clock }
    }

    /// `?window=` with no value is a malformed window, not a request for latest mode.
    fn mode(&self, window: Option<&str>) -> Result<Mode, QueryError> {
        let Some(expr) = window else {
            return Ok(Mode::Latest);
        };
        let spec: WindowSpec = expr.parse()?;
        let end = (self.clock)();
        Ok(Mode::Windowed {
            spec,
            start: spec.start(end),
            end,
        })
    }

    pub async fn nodes(&self, window: Option<&str>) -> Result<Vec<Reading<NodeReport>>, QueryError> {
        match self.mode(window)? {
            Mode::Latest => {
                let samples = self.repo.recent_node_samples(None, LATEST_SAMPLES).await?;
                Ok(aggregate::latest_per_entity(samples)
                    .into_iter()
                    .map(|e| Reading::Latest(NodeReport::new(&e.latest, e.rates)))
                    .collect())
            }
            Mode::Windowed { spec, start, end } => {
                let samples = self.repo.node_samples_in_range(None, start, end).await?;
                Ok(aggregate::partition_by_entity(samples)
                    .into_iter()
                    .filter_map(|(node, history)| windowed_entity(&node, &history, &spec))
                    .map(Reading::Windowed)
                    .collect())
            }
        }
    }

    pub async fn node(
        &self,
        name: &str,
        window: Option<&str>,
    ) -> Result<Option<Reading<NodeReport>>, QueryError> {
        match self.mode(window)? {
            Mode::Latest => {
                let samples = self
                    .repo
                    .recent_node_samples(Some(name), LATEST_SAMPLES)
                    .await?;
                Ok(aggregate::latest_rate(samples)
                    .map(|e| Reading::Latest(NodeReport::new(&e.latest, e.rates))))
            }
            Mode::Windowed { spec, start, end } => {
                let samples = self
                    .repo
                    .node_samples_in_range(Some(name), start, end)
                    .await?;
                Ok(windowed_entity(name, &samples, &spec).map(Reading::Windowed))
            }
        }
    }

    pub async fn pods_on_node(
        &self,
        node: &str,
        window: Option<&str>,
    ) -> Result<Vec<Reading<PodReport>>, QueryError> {
        self.pod_readings(&PodFilter::Node(node.to_string()), window)
            .await
    }

    pub async fn pods(&self, window: Option<&str>) -> Result<Vec<Reading<PodReport>>, QueryError> {
        self.pod_readings(&PodFilter::All, window).await
    }

    /// Several uids can share a name across restarts; the newest one wins.
    pub async fn pod(
        &self,
        name: &str,
        window: Option<&str>,
    ) -> Result<Option<Reading<PodReport>>, QueryError> {
        let readings = self
            .pod_readings(&PodFilter::Pod(name.to_string()), window)
            .await?;
        Ok(readings.into_iter().max_by_key(|r| match r {
            Reading::Latest(p) => p.timestamp,
            Reading::Windowed(w) => w.window_end,
        }))
    }

    pub async fn namespaces(
        &self,
        window: Option<&str>,
    ) -> Result<Vec<Reading<GroupReport>>, QueryError> {
        self.group_readings(&PodFilter::All, window, aggregate::by_namespace, |ns| {
            (ns.clone(), None)
        })
        .await
    }

    pub async fn namespace(
        &self,
        namespace: &str,
        window: Option<&str>,
    ) -> Result<Option<Reading<GroupReport>>, QueryError> {
        let filter = PodFilter::Namespace(namespace.to_string());
        let readings = self
            .group_readings(&filter, window, aggregate::by_namespace, |ns| {
                (ns.clone(), None)
            })
            .await?;
        Ok(readings.into_iter().next())
    }

    pub async fn namespace_pods(
        &self,
        namespace: &str,
        window: Option<&str>,
    ) -> Result<Vec<Reading<PodReport>>, QueryError> {
        self.pod_readings(&PodFilter::Namespace(namespace.to_string()), window)
            .await
    }

    pub async fn deployments(
        &self,
        namespace: &str,
        window: Option<&str>,
    ) -> Result<Vec<Reading<GroupReport>>, QueryError> {
        let filter = PodFilter::Namespace(namespace.to_string());
        self.group_readings(&filter, window, aggregate::by_deployment, describe_deployment)
            .await
    }

    pub async fn deployment(
        &self,
        namespace: &str,
        name: &str,
        window: Option<&str>,
    ) -> Result<Option<Reading<GroupReport>>, QueryError> {
        let filter = PodFilter::Deployment {
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        let readings = self
            .group_readings(&filter, window, aggregate::by_deployment, describe_deployment)
            .await?;
        Ok(readings.into_iter().next())
    }

    pub async fn deployment_pods(
        &self,
        namespace: &str,
        name: &str,
        window: Option<&str>,
    ) -> Result<Vec<Reading<PodReport>>, QueryError> {
        let filter = PodFilter::Deployment {
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        self.pod_readings(&filter, window).await
    }

    /// Summed workload load per host, as seen from the workloads' side.
    pub async fn node_workloads(
        &self,
        window: Option<&str>,
    ) -> Result<Vec<Reading<GroupReport>>, QueryError> {
        self.group_readings(&PodFilter::All, window, aggregate::by_node, |node| {
            (node.clone(), None)
        })
        .await
    }

    async fn pod_readings(
        &self,
        filter: &PodFilter,
        window: Option<&str>,
    ) -> Result<Vec<Reading<PodReport>>, QueryError> {
        match self.mode(window)? {
            Mode::Latest => {
                let samples = self.repo.recent_pod_samples(filter, LATEST_SAMPLES).await?;
                Ok(aggregate::latest_per_entity(samples)
                    .into_iter()
                    .map(|e| Reading::Latest(PodReport::new(&e.latest, e.rates)))
                    .collect())
            }
            Mode::Windowed { spec, start, end } => {
                let samples = self.repo.pod_samples_in_range(filter, start, end).await?;
                Ok(aggregate::partition_by_entity(samples)
                    .into_values()
                    .filter_map(|history| {
                        let latest = history.iter().max_by_key(|p| p.timestamp)?;
                        let report = windowed_entity(&latest.uid, &history, &spec)?;
                        Some(Reading::Windowed(report.with_workload(latest)))
                    })
                    .collect())
            }
        }
    }

    /// One reading per group key that has at least one qualifying member.
    async fn group_readings<K, F, D>(
        &self,
        filter: &PodFilter,
        window: Option<&str>,
        key: F,
        describe: D,
    ) -> Result<Vec<Reading<GroupReport>>, QueryError>
    where
        K: Ord,
        F: Fn(&PodSample) -> Option<K>,
        D: Fn(&K) -> (String, Option<String>),
    {
        match self.mode(window)? {
            Mode::Latest => {
                let samples = self.repo.recent_pod_samples(filter, LATEST_SAMPLES).await?;
                Ok(aggregate::latest_by_group(samples, key)
                    .into_iter()
                    .map(|(k, total)| {
                        let (name, namespace) = describe(&k);
                        Reading::Latest(group_report(name, namespace, total))
                    })
                    .collect())
            }
            Mode::Windowed { spec, start, end } => {
                let samples = self.repo.pod_samples_in_range(filter, start, end).await?;
                Ok(aggregate::group_by(samples, key)
                    .into_iter()
                    .filter_map(|(k, members)| {
                        let label = match describe(&k) {
                            (name, Some(ns)) => format!("{ns}/{name}"),
                            (name, None) => name,
                        };
                        let Some(avg) = aggregate::windowed_group_sum(members, &spec) else {
                            debug!(group = %label, window = %spec, "no member has pairs within window");
                            return None;
                        };
                        Some(Reading::Windowed(window_report(label, &spec, avg)))
                    })
                    .collect())
            }
        }
    }
}

fn describe_deployment(key: &(String, String)) -> (String, Option<String>) {
    (key.1.clone(), Some(key.0.clone()))
}

fn group_report(name: String, namespace: Option<String>, total: GroupTotal) -> GroupReport {
    GroupReport {
        name,
        namespace,
        timestamp: total.timestamp,
        pod_count: total.members,
        rates: total.rates,
    }
}

fn window_report(entity_id: String, spec: &WindowSpec, avg: WindowedAverage) -> WindowReport {
    WindowReport {
        entity_id,
        pod_name: None,
        namespace: None,
        deployment: None,
        node_name: None,
        window: spec.to_string(),
        window_start: avg.window_start,
        window_end: avg.window_end,
        pairs_used: avg.pairs_used,
        members: avg.members,
        rates: avg.rates,
    }
}

/// `None` when the history is too short or has no pair inside the window; both are
/// "no data" to the caller but are logged apart.
fn windowed_entity<S: Sample>(name: &str, history: &[S], spec: &WindowSpec) -> Option<WindowReport> {
    match aggregate::windowed_average(history, spec) {
        Ok(Some(avg)) => Some(window_report(name.to_string(), spec, avg)),
        Ok(None) => {
            debug!(entity = %name, window = %spec, "no sample pairs within window");
            None
        }
        Err(e) => {
            debug!(entity = %name, window = %spec, error = %e, "insufficient data for window");
            None
        }
    }
}
