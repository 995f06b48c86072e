// Background store hygiene: prune rows past retention on a fixed interval,
// VACUUM on a cron schedule (local time) or every vacuum_interval_secs.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::history_repo::HistoryRepo;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub prune_interval_secs: u64,
    /// e.g. "0 0 3 * * *" = 03:00 daily. Takes precedence over vacuum_interval_secs.
    pub vacuum_schedule: Option<String>,
    pub vacuum_interval_secs: u64,
}

enum VacuumCadence {
    Cron(Box<cron::Schedule>),
    Every(Duration),
    Never,
}

impl VacuumCadence {
    fn from_config(config: &MaintenanceConfig) -> Self {
        match config.vacuum_schedule.as_deref() {
            Some(expr) => match cron::Schedule::from_str(expr) {
                Ok(s) => VacuumCadence::Cron(Box::new(s)),
                Err(e) => {
                    warn!(cron = %expr, error = %e, "invalid vacuum_schedule; VACUUM will not run");
                    VacuumCadence::Never
                }
            },
            None => VacuumCadence::Every(Duration::from_secs(config.vacuum_interval_secs)),
        }
    }

    /// Time until the next VACUUM; `None` when it should never run.
    fn next_delay(&self) -> Option<Duration> {
        match self {
            VacuumCadence::Cron(schedule) => {
                let now = chrono::Local::now();
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::from_secs(1)))
            }
            VacuumCadence::Every(d) => Some(*d),
            VacuumCadence::Never => None,
        }
    }
}

pub fn spawn(
    repo: Arc<HistoryRepo>,
    config: MaintenanceConfig,
    shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(repo, config, shutdown_rx))
}

#[instrument(skip(repo, shutdown_rx), fields(prune_interval_secs = config.prune_interval_secs))]
async fn run(repo: Arc<HistoryRepo>, config: MaintenanceConfig, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut prune_tick = tokio::time::interval(Duration::from_secs(config.prune_interval_secs));
    prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let cadence = VacuumCadence::from_config(&config);
    // A disabled VACUUM parks on a far-future deadline.
    let park = Duration::from_secs(365 * 24 * 3600);
    let vacuum_sleep = tokio::time::sleep(cadence.next_delay().unwrap_or(park));
    tokio::pin!(vacuum_sleep);

    let mut rows_pruned_total: u64 = 0;
    loop {
        tokio::select! {
            _ = prune_tick.tick() => {
                match repo.prune_old_data().await {
                    Ok(n) => {
                        rows_pruned_total += n;
                        debug!(operation = "prune_old_data", rows = n, rows_pruned_total, "old data pruned");
                    }
                    Err(e) => warn!(error = %e, operation = "prune_old_data", "Failed to prune old data"),
                }
            }
            _ = &mut vacuum_sleep => {
                match repo.vacuum().await {
                    Ok(()) => info!(rows_pruned_total, "vacuum complete"),
                    Err(e) => warn!(error = %e, operation = "vacuum", "vacuum failed"),
                }
                let delay = cadence.next_delay().unwrap_or(park);
                vacuum_sleep.as_mut().reset(tokio::time::Instant::now() + delay);
            }
            _ = &mut shutdown_rx => {
                debug!("Maintenance worker shutting down");
                break;
            }
        }
    }
}
