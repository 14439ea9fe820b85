//! Startup wiring shared by the `api` and `worker` binaries.

use anyhow::Context;
use sea_orm::DatabaseConnection;
use services::attendance::{AttendanceProtocol, AttendanceTaskHandler, ProtocolSettings};
use services::face::{FaceVerifier, HttpFaceEmbedder, Metric};
use services::notification::{FcmPushClient, NoopPushClient, NotificationDispatcher, PushClient};
use services::queue::{QueueSettings, TaskQueue};
use services::storage::{LocalObjectStore, SupabaseStorage};
use std::sync::Arc;
use std::time::Duration;
use util::clock::SystemClock;
use util::config::AppConfig;

use crate::state::{AppState, HttpSettings, Storage};

/// Everything a process needs: the HTTP state plus the queue and the handler its
/// workers run.
pub struct Runtime {
    pub state: AppState,
    pub queue: TaskQueue,
    pub handler: Arc<AttendanceTaskHandler>,
}

pub fn storage_from_config(cfg: &AppConfig) -> anyhow::Result<Storage> {
    match cfg.storage_backend.trim().to_ascii_lowercase().as_str() {
        "supabase" => {
            let store = SupabaseStorage::new(&cfg.supabase_url, &cfg.supabase_service_role_key, &cfg.supabase_bucket)
                .context("invalid Supabase storage configuration")?;
            Ok(Storage::remote(Arc::new(store)))
        }
        "local" => Ok(Storage::local(Arc::new(LocalObjectStore::new(
            &cfg.storage_root,
            &cfg.public_base_url,
            &cfg.storage_signing_secret,
        )))),
        other => anyhow::bail!("unsupported STORAGE_BACKEND: {other}"),
    }
}

pub fn push_from_config(cfg: &AppConfig) -> Arc<dyn PushClient> {
    if cfg.push_endpoint.trim().is_empty() || cfg.push_server_key.trim().is_empty() {
        tracing::warn!("Push delivery not configured; notifications are recorded only");
        Arc::new(NoopPushClient)
    } else {
        Arc::new(FcmPushClient::new(&cfg.push_endpoint, &cfg.push_server_key))
    }
}

pub fn build(cfg: &AppConfig, db: DatabaseConnection) -> anyhow::Result<Runtime> {
    let storage = storage_from_config(cfg)?;

    let metric: Metric = cfg.face_metric.parse().map_err(anyhow::Error::msg)?;
    let timeout = Duration::from_secs(cfg.face_timeout_seconds.max(1));
    let embedder = HttpFaceEmbedder::new(&cfg.face_embedder_url, timeout).context("face embedder")?;
    if cfg.face_embedder_url.trim().is_empty() {
        tracing::warn!("FACE_EMBEDDER_URL is empty; face checks will fail until it is set");
    }
    let face = Arc::new(FaceVerifier::new(
        Arc::new(embedder),
        storage.store.clone(),
        metric,
        cfg.face_threshold,
        timeout,
    ));

    let notifier = NotificationDispatcher::new(db.clone(), push_from_config(cfg));
    let queue = TaskQueue::new(db.clone(), QueueSettings::from(cfg));
    let protocol = Arc::new(AttendanceProtocol::new(
        db.clone(),
        face.clone(),
        queue.clone(),
        Arc::new(SystemClock::new(cfg.business_offset())),
        ProtocolSettings::from(cfg),
    ));
    let handler = Arc::new(AttendanceTaskHandler::new(db.clone(), notifier.clone()));

    tracing::info!(
        storage = storage.store.backend(),
        metric = ?metric,
        threshold = cfg.face_threshold,
        timezone = %cfg.timezone_offset,
        "Services initialised"
    );

    let state = AppState::new(db, protocol, face, storage, notifier, HttpSettings::from(cfg));
    Ok(Runtime { state, queue, handler })
}

/// Opens the store and brings the schema up to date.
pub async fn connect_and_migrate(cfg: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    use migration::Migrator;
    use sea_orm_migration::MigratorTrait;

    let db = db::connect(&cfg.database_path)
        .await
        .with_context(|| format!("failed to open database at {}", cfg.database_path))?;
    Migrator::up(&db, None).await.context("failed to run migrations")?;
    Ok(db)
}

/// Installs the tracing subscriber: a daily-rolling file under `logs/`, and stdout
/// when `LOG_TO_STDOUT=true`. Keep the returned guard alive for the whole process.
pub fn init_logging(cfg: &AppConfig) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    std::fs::create_dir_all("logs").ok();

    let file_appender = tracing_appender::rolling::daily("logs", &cfg.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = cfg.log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    let env_filter = EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("api=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}
