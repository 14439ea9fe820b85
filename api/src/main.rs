use anyhow::Context;
use api::bootstrap::{build, connect_and_migrate, init_logging};
use services::queue::WorkerPool;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use util::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::global().clone();
    let _log_guard = init_logging(&cfg);

    let db = connect_and_migrate(&cfg).await?;
    let runtime = build(&cfg, db)?;

    // Workers can also run in their own process (see the `worker` binary).
    let cancel = CancellationToken::new();
    let pool = cfg.run_embedded_workers.then(|| {
        WorkerPool::spawn(
            runtime.queue.clone(),
            runtime.handler.clone(),
            cfg.worker_concurrency,
            cancel.clone(),
        )
    });

    let app = api::app(runtime.state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        env = %cfg.env,
        embedded_workers = pool.as_ref().map_or(0, WorkerPool::size),
        "Starting {} on http://{addr}",
        cfg.project_name
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    if let Some(pool) = pool {
        tracing::info!("Stopping workers");
        pool.shutdown().await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
