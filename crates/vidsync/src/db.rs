//! Opening the catalog database.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DbErr, Statement};

pub use sea_orm::DatabaseConnection;

/// Per-connection SQLite settings: WAL so readers never block the sync
/// writer, a 5 s lock wait and `synchronous=NORMAL`.
const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn is_sqlite_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Pool settings for `database_url`. An in-memory SQLite database exists per
/// connection, so its pool is pinned to a single one.
fn connect_options(database_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url);
    options
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .sqlx_logging(false);
    if is_in_memory(database_url) {
        options.min_connections(1).max_connections(1);
    }
    options
}

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(backend, pragma)).await?;
    }
    Ok(())
}

/// Open a connection pool. SQLite databases get the pragmas above.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(database_url)).await?;
    if is_sqlite_url(database_url) {
        configure_sqlite(&db).await?;
        tracing::debug!(database_url, "opened sqlite database");
    }
    Ok(db)
}

/// Connect and bring the schema up to date.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or a migration fails.
///
/// # Example
/// ```ignore
/// let db = vidsync::connect_and_migrate("sqlite://vidsync.db?mode=rwc").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
