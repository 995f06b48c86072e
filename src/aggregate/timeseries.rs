// Windowed mode: mean of every usable consecutive-pair rate in a history.
// Pairs separated by more than the window are sampling gaps and are left out.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::grouping::partition_by_entity;
use crate::models::Sample;
use crate::rate::{Rates, rate};
use crate::window::WindowSpec;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowedAverage {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub rates: Rates,
    /// Consecutive pairs that contributed to `rates` (summed across members for groups).
    pub pairs_used: usize,
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("insufficient data points for time series calculation (need at least 2, got {got})")]
    InsufficientDataPoints { got: usize },
}

/// Average rate over one entity's history.
///
/// Returns `Ok(None)` when no pair survives the gap rule: the history exists but says
/// nothing about the requested resolution, which is different from an all-zero load.
pub fn windowed_average<S: Sample>(
    history: &[S],
    window: &WindowSpec,
) -> Result<Option<WindowedAverage>, AggregateError> {
    if history.len() < 2 {
        return Err(AggregateError::InsufficientDataPoints { got: history.len() });
    }
    let mut ordered: Vec<&S> = history.iter().collect();
    ordered.sort_by_key(|s| std::cmp::Reverse(s.timestamp()));

    let window_end = ordered[0].timestamp();
    let window_start = window.start(window_end);
    let max_gap = window.duration();

    let mut total = Rates::default();
    let mut pairs_used = 0usize;
    for pair in ordered.windows(2) {
        let (current, previous) = (pair[0], pair[1]);
        if current.timestamp() - previous.timestamp() > max_gap {
            continue;
        }
        match rate(current, previous) {
            Ok(r) => {
                total += r;
                pairs_used += 1;
            }
            Err(e) => debug!(error = %e, operation = "windowed_average", "skipping pair"),
        }
    }

    let Some(rates) = total.averaged(pairs_used) else {
        return Ok(None);
    };
    Ok(Some(WindowedAverage {
        window_start,
        window_end,
        rates,
        pairs_used,
        members: 1,
    }))
}

/// Group load over a window: each member is averaged on its own, then the averages are
/// summed (not re-averaged), matching the latest-mode group sum.
pub fn windowed_group_sum<S, I>(samples: I, window: &WindowSpec) -> Option<WindowedAverage>
where
    S: Sample,
    I: IntoIterator<Item = S>,
{
    let mut acc: Option<WindowedAverage> = None;
    for (entity_id, history) in partition_by_entity(samples) {
        let avg = match windowed_average(&history, window) {
            Ok(Some(avg)) => avg,
            Ok(None) => {
                debug!(entity_id = %entity_id, "no pairs within window");
                continue;
            }
            Err(e) => {
                debug!(entity_id = %entity_id, error = %e, "member skipped");
                continue;
            }
        };
        acc = Some(match acc {
            None => avg,
            Some(sum) => {
                let window_end = sum.window_end.max(avg.window_end);
                WindowedAverage {
                    window_start: window.start(window_end),
                    window_end,
                    rates: sum.rates + avg.rates,
                    pairs_used: sum.pairs_used + avg.pairs_used,
                    members: sum.members + 1,
                }
            }
        });
    }
    acc
}
