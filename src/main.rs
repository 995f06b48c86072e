use anyhow::Result;
use cluster_metrics::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let history_repo = Arc::new(
        history_repo::HistoryRepo::connect_with_pool_size(
            &app_config.database.path,
            app_config.database.retention_days,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    history_repo.init().await?;

    let identity = Arc::new(identity::StaticIdentity::from_config(&app_config.workloads));
    let timeout = Duration::from_millis(app_config.collection.request_timeout_ms);
    let sources = app_config
        .collection
        .producers
        .iter()
        .map(|url| producer::HttpProducer::new(url.as_str(), timeout))
        .collect::<Result<Vec<_>>>()?;
    if sources.is_empty() {
        tracing::warn!("no producers configured; only stored history will be served");
    }
    tracing::info!(
        producers = sources.len(),
        workloads = identity.len(),
        schedule = %app_config.collection.schedule,
        "starting collection"
    );

    let (ingest_shutdown_tx, ingest_shutdown_rx) = tokio::sync::oneshot::channel();
    let ingest_handle = ingest_worker::spawn(
        ingest_worker::IngestDeps {
            sources,
            identity,
            history_repo: history_repo.clone(),
            shutdown_rx: ingest_shutdown_rx,
        },
        ingest_worker::IngestConfig {
            schedule: app_config.collection.schedule.clone(),
        },
    )?;

    let (maintenance_shutdown_tx, maintenance_shutdown_rx) = tokio::sync::oneshot::channel();
    let maintenance_handle = maintenance_worker::spawn(
        history_repo.clone(),
        maintenance_worker::MaintenanceConfig {
            prune_interval_secs: app_config.database.prune_interval_secs,
            vacuum_schedule: app_config.database.vacuum_schedule.clone(),
            vacuum_interval_secs: app_config.database.vacuum_interval_secs,
        },
        maintenance_shutdown_rx,
    );

    let service = Arc::new(service::MetricsService::new(history_repo));
    let app = routes::app(service);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    let _ = ingest_shutdown_tx.send(());
    let _ = maintenance_shutdown_tx.send(());
    let _ = ingest_handle.await;
    let _ = maintenance_handle.await;

    Ok(())
}
