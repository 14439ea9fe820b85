pub mod models;
pub mod test_utils;

use sea_orm::{Database, DatabaseConnection, DbErr, SqlErr};
use std::path::Path;

/// Opens the store. Accepts a full DSN or a bare SQLite file path.
pub async fn connect(path_or_url: &str) -> Result<DatabaseConnection, DbErr> {
    // If it's already a DSN, use it as-is; otherwise treat it as a SQLite file path.
    let url = if path_or_url.starts_with("sqlite:") {
        path_or_url.to_owned()
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    Database::connect(&url).await
}

/// True when the error came from a UNIQUE constraint (or unique index) rejecting a write.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
