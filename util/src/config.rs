//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. Binaries read
//! it once at startup and hand explicit settings to each service; the per-field
//! setters exist for tests and runtime overrides.

use chrono::FixedOffset;
use rand::{Rng, distributions::Alphanumeric};
use std::env;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    /// UTC offset of the business day, e.g. `+08:00`.
    pub timezone_offset: String,
    pub default_geofence_radius: u32,
    pub face_metric: String,
    pub face_threshold: f64,
    pub face_embedder_url: String,
    pub face_timeout_seconds: u64,
    pub storage_backend: String,
    pub storage_root: String,
    pub storage_signing_secret: String,
    pub public_base_url: String,
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub supabase_bucket: String,
    pub signed_url_expires: u64,
    pub push_endpoint: String,
    pub push_server_key: String,
    pub worker_concurrency: usize,
    pub worker_poll_ms: u64,
    pub task_lease_seconds: i64,
    pub task_max_attempts: i32,
    pub run_embedded_workers: bool,
    pub max_agenda_link_per_request: usize,
    pub max_recipients_per_request: usize,
    pub max_notes_per_request: usize,
    pub max_upload_bytes: usize,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every key has a default so a bare development checkout starts; unparsable
    /// numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = var_or("HOST", "127.0.0.1");
        let port = parsed_or("PORT", 3000u16);

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "absensi-api"),
            log_level: var_or("LOG_LEVEL", "api=info,services=info,db=info"),
            log_file: var_or("LOG_FILE", "api.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/absensi.db"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://{host}:{port}")),
            host,
            port,
            timezone_offset: var_or("TIMEZONE_OFFSET", "+08:00"),
            default_geofence_radius: parsed_or("DEFAULT_GEOFENCE_RADIUS", 100),
            face_metric: var_or("FACE_METRIC", "cosine"),
            face_threshold: parsed_or("FACE_THRESHOLD", 0.45),
            face_embedder_url: var_or("FACE_EMBEDDER_URL", ""),
            face_timeout_seconds: parsed_or("FACE_TIMEOUT_SECONDS", 15),
            storage_backend: var_or("STORAGE_BACKEND", "local"),
            storage_root: var_or("STORAGE_ROOT", "data/storage"),
            storage_signing_secret: env::var("STORAGE_SIGNING_SECRET")
                .unwrap_or_else(|_| random_secret()),
            supabase_url: var_or("SUPABASE_URL", ""),
            supabase_service_role_key: var_or("SUPABASE_SERVICE_ROLE_KEY", ""),
            supabase_bucket: var_or("SUPABASE_BUCKET", "e-hrm"),
            signed_url_expires: parsed_or("SIGNED_URL_EXPIRES", 604_800),
            push_endpoint: var_or("PUSH_ENDPOINT", ""),
            push_server_key: var_or("PUSH_SERVER_KEY", ""),
            worker_concurrency: parsed_or("WORKER_CONCURRENCY", 4),
            worker_poll_ms: parsed_or("WORKER_POLL_MS", 500),
            task_lease_seconds: parsed_or("TASK_LEASE_SECONDS", 300),
            task_max_attempts: parsed_or("TASK_MAX_ATTEMPTS", 5),
            run_embedded_workers: var_or("RUN_EMBEDDED_WORKERS", "true") == "true",
            max_agenda_link_per_request: parsed_or("MAX_AGENDA_LINK_PER_REQUEST", 50),
            max_recipients_per_request: parsed_or("MAX_RECIPIENTS_PER_REQUEST", 20),
            max_notes_per_request: parsed_or("MAX_NOTES_PER_REQUEST", 10),
            max_upload_bytes: parsed_or("MAX_UPLOAD_BYTES", 16 * 1024 * 1024),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Parses `timezone_offset` (`+08:00`, `-0530`, `Z`). Falls back to UTC.
    pub fn business_offset(&self) -> FixedOffset {
        parse_offset(&self.timezone_offset).unwrap_or_else(|| {
            tracing::warn!(
                value = %self.timezone_offset,
                "Invalid TIMEZONE_OFFSET, falling back to UTC"
            );
            FixedOffset::east_opt(0).expect("zero offset is valid")
        })
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_storage_root(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.storage_root = value.into());
    }

    pub fn set_timezone_offset(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.timezone_offset = value.into());
    }

    pub fn set_default_geofence_radius(value: u32) {
        AppConfig::set_field(|cfg| cfg.default_geofence_radius = value);
    }

    pub fn set_run_embedded_workers(value: bool) {
        AppConfig::set_field(|cfg| cfg.run_embedded_workers = value);
    }
}

/// Parses a UTC offset string such as `+08:00`, `+0800`, `-05:30` or `Z`.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// --- Free accessors used by the binaries ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_common_offset_forms() {
        assert_eq!(parse_offset("+08:00").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(parse_offset("+0800").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(
            parse_offset("-05:30").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_garbage_offsets() {
        assert!(parse_offset("Asia/Makassar").is_none());
        assert!(parse_offset("+8").is_none());
        assert!(parse_offset("+25:00").is_none());
    }

    #[test]
    #[serial]
    fn setters_override_loaded_values() {
        AppConfig::set_default_geofence_radius(250);
        assert_eq!(AppConfig::global().default_geofence_radius, 250);
        AppConfig::set_timezone_offset("+07:00");
        assert_eq!(
            AppConfig::global().business_offset().local_minus_utc(),
            7 * 3600
        );
        AppConfig::reset();
    }
}
