// Table layout for raw samples. Timestamps are unix milliseconds.
// Grouping attributes are denormalized onto pod rows so group queries need no join.

use sqlx::SqlitePool;

/// Creates node_metrics, pod_metrics and their indexes if not present.
pub async fn init_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS node_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            node_name TEXT NOT NULL,
            cpu_total REAL NOT NULL,
            cpu_busy REAL NOT NULL,
            cpu_count INTEGER NOT NULL,
            memory_total INTEGER NOT NULL,
            memory_available INTEGER NOT NULL,
            memory_used INTEGER NOT NULL,
            disk_read_bytes INTEGER NOT NULL,
            disk_write_bytes INTEGER NOT NULL,
            network_rx_bytes INTEGER NOT NULL,
            network_tx_bytes INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_node_metrics_node_ts ON node_metrics(node_name, timestamp)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pod_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            uid TEXT NOT NULL,
            pod_name TEXT NOT NULL,
            namespace TEXT,
            deployment TEXT,
            node_name TEXT NOT NULL,
            cpu_usage_usec INTEGER NOT NULL,
            memory_usage INTEGER NOT NULL,
            disk_read_bytes INTEGER NOT NULL,
            disk_write_bytes INTEGER NOT NULL,
            network_rx_bytes INTEGER NOT NULL,
            network_tx_bytes INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_pod_metrics_uid_ts ON pod_metrics(uid, timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_pod_metrics_name ON pod_metrics(pod_name)",
        "CREATE INDEX IF NOT EXISTS idx_pod_metrics_namespace ON pod_metrics(namespace, deployment)",
        "CREATE INDEX IF NOT EXISTS idx_pod_metrics_node ON pod_metrics(node_name)",
        "CREATE INDEX IF NOT EXISTS idx_pod_metrics_ts ON pod_metrics(timestamp)",
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }

    Ok(())
}
