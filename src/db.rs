use std::{str::FromStr, time::Duration};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    FromRow, Sqlite, SqlitePool, Transaction,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::appresult::{AppError, AppResult};

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// A registered user. The password hash stays in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TopicCount {
    pub id: Uuid,
    pub name: String,
    pub room_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: String,

    pub topic_id: Uuid,
    pub topic_name: String,

    pub host_id: Uuid,
    pub host_username: String,

    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,

    pub room_id: Uuid,
    pub room_name: String,

    pub author_id: Uuid,
    pub author_username: String,
    pub author_avatar: Option<String>,

    pub body: String,
    pub created: OffsetDateTime,
}

/// Parses an id taken from a URL. Garbage ids name nothing, so they are `NotFound`.
pub fn parse_id(raw: &str, what: &'static str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(what))
}

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&db_pool).await?;
    Ok(db_pool)
}

/// A transaction that holds the write lock from its first statement, so a
/// read-then-write sequence never has to upgrade its lock.
/// Concurrent writers wait out the busy timeout instead of failing with `SQLITE_BUSY`.
pub(crate) async fn begin_write(db_pool: &SqlitePool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    db_pool.begin_with("BEGIN IMMEDIATE").await
}

/// A single-connection in-memory database with the schema applied.
#[cfg(test)]
pub(crate) async fn memory() -> SqlitePool {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::from_str("sqlite::memory:").unwrap().foreign_keys(true))
        .await
        .unwrap();
    MIGRATOR.run(&db_pool).await.unwrap();
    db_pool
}

/// A migrated database file under the temp dir, shared by several connections.
/// Returns the path so the caller can remove it.
#[cfg(test)]
pub(crate) async fn scratch_file() -> (SqlitePool, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("studyrooms-{}.db", Uuid::now_v7()));
    let db_pool = connect(&format!("sqlite://{}", path.display()), 8).await.unwrap();
    (db_pool, path)
}

#[cfg(test)]
pub(crate) async fn remove_scratch_file(db_pool: SqlitePool, path: std::path::PathBuf) {
    db_pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
