// Partitioning of flat sample sets into per-entity histories and parent groups.
// One routine serves every hierarchy level; only the key extractor differs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{PodSample, Sample};
use crate::rate::Rates;

/// Newest first. Storage order is not trusted.
pub fn sort_descending<S: Sample>(history: &mut [S]) {
    history.sort_by_key(|s| std::cmp::Reverse(s.timestamp()));
}

/// Per-entity histories, each sorted newest first.
pub fn partition_by_entity<S, I>(samples: I) -> BTreeMap<String, Vec<S>>
where
    S: Sample,
    I: IntoIterator<Item = S>,
{
    let mut by_id: BTreeMap<String, Vec<S>> = BTreeMap::new();
    for s in samples {
        by_id.entry(s.entity_id().to_string()).or_default().push(s);
    }
    for history in by_id.values_mut() {
        sort_descending(history);
    }
    by_id
}

/// Samples bucketed by parent key. Samples whose key is absent belong to no group.
pub fn group_by<S, K, I, F>(samples: I, key: F) -> BTreeMap<K, Vec<S>>
where
    K: Ord,
    I: IntoIterator<Item = S>,
    F: Fn(&S) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<S>> = BTreeMap::new();
    for s in samples {
        if let Some(k) = key(&s) {
            groups.entry(k).or_default().push(s);
        }
    }
    groups
}

/// Running sum over the qualifying members of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub rates: Rates,
    /// Newest timestamp seen among qualifying members.
    pub timestamp: DateTime<Utc>,
    pub members: usize,
}

impl GroupTotal {
    pub fn single(rates: Rates, timestamp: DateTime<Utc>) -> Self {
        Self {
            rates,
            timestamp,
            members: 1,
        }
    }

    pub fn merge(self, other: GroupTotal) -> GroupTotal {
        GroupTotal {
            rates: self.rates + other.rates,
            timestamp: self.timestamp.max(other.timestamp),
            members: self.members + other.members,
        }
    }
}

pub fn by_namespace(s: &PodSample) -> Option<String> {
    s.grouping.namespace.clone()
}

/// Deployments are keyed as (namespace, deployment); both must be present.
pub fn by_deployment(s: &PodSample) -> Option<(String, String)> {
    let g = &s.grouping;
    Some((g.namespace.clone()?, g.deployment.clone()?))
}

pub fn by_node(s: &PodSample) -> Option<String> {
    Some(s.grouping.node_name.clone()).filter(|n| !n.is_empty())
}
