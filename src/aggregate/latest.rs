// Instantaneous mode: the two most recent samples per entity, summed across group members.

use std::collections::BTreeMap;

use tracing::debug;

use super::grouping::{GroupTotal, group_by, partition_by_entity, sort_descending};
use crate::models::Sample;
use crate::rate::{Rates, rate};

/// Rate of one entity plus the newest sample it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRate<S> {
    pub latest: S,
    pub rates: Rates,
}

/// Rate from the two newest samples of a single-entity history.
/// `None` when fewer than two samples exist or the interval is unusable.
pub fn latest_rate<S: Sample>(mut history: Vec<S>) -> Option<EntityRate<S>> {
    if history.len() < 2 {
        return None;
    }
    sort_descending(&mut history);
    let rates = match rate(&history[0], &history[1]) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, operation = "latest_rate", "skipping entity");
            return None;
        }
    };
    let latest = history.into_iter().next()?;
    Some(EntityRate { latest, rates })
}

/// One rate per entity that has at least two samples, ordered by entity id.
pub fn latest_per_entity<S, I>(samples: I) -> Vec<EntityRate<S>>
where
    S: Sample,
    I: IntoIterator<Item = S>,
{
    partition_by_entity(samples)
        .into_values()
        .filter_map(latest_rate)
        .collect()
}

/// Sum over all qualifying entities; `None` when no entity qualifies.
pub fn latest_for_group<S, I>(samples: I) -> Option<GroupTotal>
where
    S: Sample,
    I: IntoIterator<Item = S>,
{
    latest_per_entity(samples)
        .into_iter()
        .map(|e| GroupTotal::single(e.rates, e.latest.timestamp()))
        .reduce(GroupTotal::merge)
}

/// Group totals for every parent key that has at least one qualifying member.
pub fn latest_by_group<S, K, I, F>(samples: I, key: F) -> BTreeMap<K, GroupTotal>
where
    S: Sample,
    K: Ord,
    I: IntoIterator<Item = S>,
    F: Fn(&S) -> Option<K>,
{
    group_by(samples, key)
        .into_iter()
        .filter_map(|(k, members)| latest_for_group(members).map(|total| (k, total)))
        .collect()
}
