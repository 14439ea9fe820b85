use migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

/// Fresh in-memory store with every migration applied.
///
/// Pinned to one pooled connection: each SQLite `:memory:` connection is its own
/// database, so a second connection would see an empty schema.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to in-memory db");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}
