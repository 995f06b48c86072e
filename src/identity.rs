// Workload identity resolution: uid -> name plus grouping attributes.
// Lookups are best-effort; an unknown uid is never an error.

use std::collections::HashMap;

use crate::config::WorkloadConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadIdentity {
    pub pod_name: String,
    pub namespace: Option<String>,
    pub deployment: Option<String>,
}

pub trait IdentityLookup: Send + Sync {
    fn resolve(&self, uid: &str) -> Option<WorkloadIdentity>;
}

/// Fixed uid table, loaded from `[[workloads]]` entries.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    by_uid: HashMap<String, WorkloadIdentity>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(workloads: &[WorkloadConfig]) -> Self {
        let mut identity = Self::new();
        for w in workloads {
            identity.insert(
                &w.uid,
                WorkloadIdentity {
                    pod_name: w.pod_name.clone(),
                    namespace: non_empty(w.namespace.as_deref()),
                    deployment: non_empty(w.deployment.as_deref()),
                },
            );
        }
        identity
    }

    pub fn insert(&mut self, uid: &str, id: WorkloadIdentity) {
        self.by_uid.insert(uid.to_string(), id);
    }

    pub fn len(&self) -> usize {
        self.by_uid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty()
    }
}

impl IdentityLookup for StaticIdentity {
    fn resolve(&self, uid: &str) -> Option<WorkloadIdentity> {
        self.by_uid.get(uid).cloned()
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_attributes_become_none() {
        let identity = StaticIdentity::from_config(&[WorkloadConfig {
            uid: "u-1".into(),
            pod_name: "web-0".into(),
            namespace: Some("prod".into()),
            deployment: Some(String::new()),
        }]);
        let id = identity.resolve("u-1").unwrap();
        assert_eq!(id.pod_name, "web-0");
        assert_eq!(id.namespace.as_deref(), Some("prod"));
        assert_eq!(id.deployment, None);
        assert!(identity.resolve("u-2").is_none());
    }
}
