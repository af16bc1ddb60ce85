pub mod models;
pub mod repo;
pub mod songs;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

/// How long a writer waits on SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the pool and makes sure the schema exists.
///
/// In-memory databases live only as long as their connection, so those get a
/// single connection that is never recycled. File databases run in WAL mode so
/// readers never block the single writer.
pub async fn connect(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let in_memory = db_url.contains(":memory:") || db_url.contains("mode=memory");
    let (pool_options, options) = if in_memory {
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        (pool_options, options)
    } else {
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        (SqlitePoolOptions::new().max_connections(5), options)
    };

    let pool = pool_options.connect_with(options).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    repo::create_user_tables(pool).await?;
    songs::create_song_tables(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wishlist (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            song_id TEXT NOT NULL,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, song_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    connect("sqlite::memory:").await.unwrap()
}
