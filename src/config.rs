use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub collection: CollectionConfig,
    /// Static workload identity table (uid -> name, namespace, deployment).
    #[serde(default)]
    pub workloads: Vec<WorkloadConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Cron expression for VACUUM (seconds field first, local time). Overrides vacuum_interval_secs.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

fn default_retention_days() -> u32 {
    7
}

fn default_prune_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Cron expression for collection passes. Default: top of every minute.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Snapshot endpoints, one per host agent.
    #[serde(default)]
    pub producers: Vec<String>,
}

fn default_schedule() -> String {
    "0 * * * * *".into()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    pub uid: String,
    pub pod_name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub deployment: Option<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.prune_interval_secs > 0,
            "database.prune_interval_secs must be > 0, got {}",
            self.database.prune_interval_secs
        );
        anyhow::ensure!(
            self.database.vacuum_interval_secs > 0,
            "database.vacuum_interval_secs must be > 0, got {}",
            self.database.vacuum_interval_secs
        );
        if let Some(ref expr) = self.database.vacuum_schedule {
            anyhow::ensure!(
                cron::Schedule::from_str(expr).is_ok(),
                "database.vacuum_schedule is not a valid cron expression: {}",
                expr
            );
        }
        anyhow::ensure!(
            cron::Schedule::from_str(&self.collection.schedule).is_ok(),
            "collection.schedule is not a valid cron expression: {}",
            self.collection.schedule
        );
        anyhow::ensure!(
            self.collection.request_timeout_ms > 0,
            "collection.request_timeout_ms must be > 0, got {}",
            self.collection.request_timeout_ms
        );
        for (i, url) in self.collection.producers.iter().enumerate() {
            anyhow::ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                "collection.producers[{}] must be an http(s) URL, got {}",
                i,
                url
            );
        }
        for (i, w) in self.workloads.iter().enumerate() {
            anyhow::ensure!(!w.uid.is_empty(), "workloads[{}].uid must be non-empty", i);
            anyhow::ensure!(
                !w.pod_name.is_empty(),
                "workloads[{}].pod_name must be non-empty",
                i
            );
        }
        Ok(())
    }
}
