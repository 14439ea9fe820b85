//! Standalone worker process: applies queued check-ins and check-outs without
//! serving HTTP. Run it next to an `api` started with `RUN_EMBEDDED_WORKERS=false`.

use api::bootstrap::{build, connect_and_migrate, init_logging};
use services::queue::WorkerPool;
use tokio_util::sync::CancellationToken;
use util::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::global().clone();
    let _log_guard = init_logging(&cfg);

    let db = connect_and_migrate(&cfg).await?;
    let runtime = build(&cfg, db)?;

    let cancel = CancellationToken::new();
    let pool = WorkerPool::spawn(runtime.queue, runtime.handler, cfg.worker_concurrency, cancel);
    tracing::info!(workers = pool.size(), "Worker process running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, draining in-flight tasks");
    pool.shutdown().await;
    Ok(())
}
