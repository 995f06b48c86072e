// SQLite sample history. Append-only raw rows; every query returns newest first.

mod schema;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::instrument;

use crate::models::{Grouping, NodeSample, PodSample};

const NODE_COLUMNS: &str = "timestamp, node_name, cpu_total, cpu_busy, cpu_count, memory_total, \
     memory_available, memory_used, disk_read_bytes, disk_write_bytes, network_rx_bytes, network_tx_bytes";

const POD_COLUMNS: &str = "timestamp, uid, pod_name, namespace, deployment, node_name, cpu_usage_usec, \
     memory_usage, disk_read_bytes, disk_write_bytes, network_rx_bytes, network_tx_bytes";

/// Which workload rows a pod query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodFilter {
    All,
    Pod(String),
    Node(String),
    Namespace(String),
    Deployment { namespace: String, name: String },
}

impl PodFilter {
    /// SQL predicate plus its bind values, in order.
    fn predicate(&self) -> (&'static str, Vec<&str>) {
        match self {
            PodFilter::All => ("1 = 1", vec![]),
            PodFilter::Pod(name) => ("pod_name = ?", vec![name.as_str()]),
            PodFilter::Node(name) => ("node_name = ?", vec![name.as_str()]),
            PodFilter::Namespace(ns) => ("namespace = ?", vec![ns.as_str()]),
            PodFilter::Deployment { namespace, name } => (
                "namespace = ? AND deployment = ?",
                vec![namespace.as_str(), name.as_str()],
            ),
        }
    }
}

pub struct HistoryRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl HistoryRepo {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        Self::connect_with_pool_size(path, retention_days, 5).await
    }

    pub async fn connect_with_pool_size(
        path: &str,
        retention_days: u32,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_tables(&self.pool).await
    }

    /// One host tick: the host row and all its workload rows in a single transaction.
    #[instrument(skip(self, node, pods), fields(repo = "history", operation = "save_host_samples", node = %node.node_name, pods_count = pods.len()))]
    pub async fn save_host_samples(
        &self,
        node: &NodeSample,
        pods: &[PodSample],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO node_metrics ({NODE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(node.timestamp.timestamp_millis())
        .bind(&node.node_name)
        .bind(node.cpu_total)
        .bind(node.cpu_busy)
        .bind(node.cpu_count as i64)
        .bind(node.memory_total as i64)
        .bind(node.memory_available as i64)
        .bind(node.memory_used as i64)
        .bind(node.disk_read_bytes as i64)
        .bind(node.disk_write_bytes as i64)
        .bind(node.network_rx_bytes as i64)
        .bind(node.network_tx_bytes as i64)
        .execute(&mut *tx)
        .await?;

        let insert_pod = format!(
            "INSERT INTO pod_metrics ({POD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        for p in pods {
            sqlx::query(&insert_pod)
                .bind(p.timestamp.timestamp_millis())
                .bind(&p.uid)
                .bind(&p.pod_name)
                .bind(p.grouping.namespace.as_deref())
                .bind(p.grouping.deployment.as_deref())
                .bind(&p.grouping.node_name)
                .bind(p.cpu_usage_usec as i64)
                .bind(p.memory_usage as i64)
                .bind(p.disk_read_bytes as i64)
                .bind(p.disk_write_bytes as i64)
                .bind(p.network_rx_bytes as i64)
                .bind(p.network_tx_bytes as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Up to `per_entity` newest samples for each host (or just `node`).
    #[instrument(skip(self), fields(repo = "history", operation = "recent_node_samples"))]
    pub async fn recent_node_samples(
        &self,
        node: Option<&str>,
        per_entity: u32,
    ) -> anyhow::Result<Vec<NodeSample>> {
        let predicate = if node.is_some() { "node_name = ?" } else { "1 = 1" };
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM (
                 SELECT *, ROW_NUMBER() OVER (PARTITION BY node_name ORDER BY timestamp DESC) AS rn
                 FROM node_metrics WHERE {predicate}
             ) WHERE rn <= ? ORDER BY timestamp DESC"
        );
        let mut q = sqlx::query(&sql);
        if let Some(n) = node {
            q = q.bind(n);
        }
        let rows = q.bind(per_entity as i64).fetch_all(&self.pool).await?;
        rows.iter().map(parse_node_row).collect()
    }

    /// Host samples with `start <= timestamp <= end`.
    #[instrument(skip(self), fields(repo = "history", operation = "node_samples_in_range"))]
    pub async fn node_samples_in_range(
        &self,
        node: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<NodeSample>> {
        let predicate = if node.is_some() { "node_name = ?" } else { "1 = 1" };
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM node_metrics
             WHERE {predicate} AND timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp DESC"
        );
        let mut q = sqlx::query(&sql);
        if let Some(n) = node {
            q = q.bind(n);
        }
        let rows = q
            .bind(start.timestamp_millis())
            .bind(end.timestamp_millis())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_node_row).collect()
    }

    /// Up to `per_entity` newest samples for each workload uid matching `filter`.
    #[instrument(skip(self), fields(repo = "history", operation = "recent_pod_samples"))]
    pub async fn recent_pod_samples(
        &self,
        filter: &PodFilter,
        per_entity: u32,
    ) -> anyhow::Result<Vec<PodSample>> {
        let (predicate, binds) = filter.predicate();
        let sql = format!(
            "SELECT {POD_COLUMNS} FROM (
                 SELECT *, ROW_NUMBER() OVER (PARTITION BY uid ORDER BY timestamp DESC) AS rn
                 FROM pod_metrics WHERE {predicate}
             ) WHERE rn <= ? ORDER BY timestamp DESC"
        );
        let mut q = sqlx::query(&sql);
        for b in binds {
            q = q.bind(b);
        }
        let rows = q.bind(per_entity as i64).fetch_all(&self.pool).await?;
        rows.iter().map(parse_pod_row).collect()
    }

    #[instrument(skip(self), fields(repo = "history", operation = "pod_samples_in_range"))]
    pub async fn pod_samples_in_range(
        &self,
        filter: &PodFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<PodSample>> {
        let (predicate, binds) = filter.predicate();
        let sql = format!(
            "SELECT {POD_COLUMNS} FROM pod_metrics
             WHERE {predicate} AND timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp DESC"
        );
        let mut q = sqlx::query(&sql);
        for b in binds {
            q = q.bind(b);
        }
        let rows = q
            .bind(start.timestamp_millis())
            .bind(end.timestamp_millis())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_pod_row).collect()
    }

    /// Delete rows older than retention_days from both tables. Returns rows removed.
    #[instrument(skip(self), fields(repo = "history", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        let cutoff = Utc::now().timestamp_millis() - self.retention_ms;
        let nodes = sqlx::query("DELETE FROM node_metrics WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        let pods = sqlx::query("DELETE FROM pod_metrics WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(nodes.rows_affected() + pods.rows_affected())
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "history", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

fn millis_to_utc(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {}", ms))
}

fn parse_node_row(row: &SqliteRow) -> anyhow::Result<NodeSample> {
    let timestamp: i64 = row.try_get("timestamp")?;
    let cpu_count: i64 = row.try_get("cpu_count")?;
    let memory_total: i64 = row.try_get("memory_total")?;
    let memory_available: i64 = row.try_get("memory_available")?;
    let memory_used: i64 = row.try_get("memory_used")?;
    let disk_read_bytes: i64 = row.try_get("disk_read_bytes")?;
    let disk_write_bytes: i64 = row.try_get("disk_write_bytes")?;
    let network_rx_bytes: i64 = row.try_get("network_rx_bytes")?;
    let network_tx_bytes: i64 = row.try_get("network_tx_bytes")?;

    Ok(NodeSample {
        timestamp: millis_to_utc(timestamp)?,
        node_name: row.try_get("node_name")?,
        cpu_total: row.try_get("cpu_total")?,
        cpu_busy: row.try_get("cpu_busy")?,
        cpu_count: cpu_count as u32,
        memory_total: memory_total as u64,
        memory_available: memory_available as u64,
        memory_used: memory_used as u64,
        disk_read_bytes: disk_read_bytes as u64,
        disk_write_bytes: disk_write_bytes as u64,
        network_rx_bytes: network_rx_bytes as u64,
        network_tx_bytes: network_tx_bytes as u64,
    })
}

fn parse_pod_row(row: &SqliteRow) -> anyhow::Result<PodSample> {
    let timestamp: i64 = row.try_get("timestamp")?;
    let cpu_usage_usec: i64 = row.try_get("cpu_usage_usec")?;
    let memory_usage: i64 = row.try_get("memory_usage")?;
    let disk_read_bytes: i64 = row.try_get("disk_read_bytes")?;
    let disk_write_bytes: i64 = row.try_get("disk_write_bytes")?;
    let network_rx_bytes: i64 = row.try_get("network_rx_bytes")?;
    let network_tx_bytes: i64 = row.try_get("network_tx_bytes")?;

    Ok(PodSample {
        timestamp: millis_to_utc(timestamp)?,
        uid: row.try_get("uid")?,
        pod_name: row.try_get("pod_name")?,
        cpu_usage_usec: cpu_usage_usec as u64,
        memory_usage: memory_usage as u64,
        disk_read_bytes: disk_read_bytes as u64,
        disk_write_bytes: disk_write_bytes as u64,
        network_rx_bytes: network_rx_bytes as u64,
        network_tx_bytes: network_tx_bytes as u64,
        grouping: Grouping {
            node_name: row.try_get("node_name")?,
            namespace: row.try_get("namespace")?,
            deployment: row.try_get("deployment")?,
        },
    })
}
