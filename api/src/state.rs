//! Application state shared by every route handler.
//!
//! Nothing in here is a process-wide singleton: the binaries (and the HTTP tests)
//! construct each service explicitly and hand it to [`AppState::new`].

use sea_orm::DatabaseConnection;
use services::attendance::AttendanceProtocol;
use services::face::FaceVerifier;
use services::notification::NotificationDispatcher;
use services::storage::{LocalObjectStore, ObjectStore};
use std::sync::Arc;
use std::time::Duration;
use util::config::AppConfig;

/// HTTP-only knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Lifetime of signed links handed out for baseline images.
    pub signed_url_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            signed_url_ttl: Duration::from_secs(604_800),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl From<&AppConfig> for HttpSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            signed_url_ttl: Duration::from_secs(cfg.signed_url_expires),
            max_upload_bytes: cfg.max_upload_bytes,
        }
    }
}

/// The object store, plus the concrete local backend when that is what's running
/// (the API serves its signed links itself).
#[derive(Clone)]
pub struct Storage {
    pub store: Arc<dyn ObjectStore>,
    pub local: Option<Arc<LocalObjectStore>>,
}

impl Storage {
    pub fn local(store: Arc<LocalObjectStore>) -> Self {
        Self {
            store: store.clone(),
            local: Some(store),
        }
    }

    pub fn remote(store: Arc<dyn ObjectStore>) -> Self {
        Self { store, local: None }
    }
}

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    protocol: Arc<AttendanceProtocol>,
    face: Arc<FaceVerifier>,
    storage: Storage,
    notifier: NotificationDispatcher,
    settings: HttpSettings,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        protocol: Arc<AttendanceProtocol>,
        face: Arc<FaceVerifier>,
        storage: Storage,
        notifier: NotificationDispatcher,
        settings: HttpSettings,
    ) -> Self {
        Self {
            db,
            protocol,
            face,
            storage,
            notifier,
            settings,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn protocol(&self) -> &AttendanceProtocol {
        &self.protocol
    }

    pub fn face(&self) -> &FaceVerifier {
        &self.face
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }
}
