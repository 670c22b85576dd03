use anyhow::{Context, Result};
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub fn create_pool(database_path: &str) -> Result<DbPool> {
    let manager = build_manager(database_path);
    build_pool(manager, None)
}

/// A pool over a single in-memory database. Every in-memory connection is
/// its own database, so the pool is capped at one connection.
pub fn create_memory_pool() -> Result<DbPool> {
    build_pool(SqliteConnectionManager::memory(), Some(1))
}

fn build_manager(path: &str) -> SqliteConnectionManager {
    SqliteConnectionManager::file(path)
        .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)))
}

fn build_pool(manager: SqliteConnectionManager, max_size: Option<u32>) -> Result<DbPool> {
    let mut builder = r2d2::Pool::builder();
    if let Some(max_size) = max_size {
        // The connection is the database; it must never be recycled.
        builder = builder
            .max_size(max_size)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    builder
        .build(manager)
        .context("Failed to create database connection pool")
}

pub fn get_connection(pool: &DbPool) -> Result<DbConn> {
    pool.get()
        .context("Failed to get database connection from pool")
}

pub fn ping(conn: &mut DbConn) -> Result<()> {
    conn.query_row("SELECT 1", [], |_| Ok(()))
        .context("Database did not answer")
}

/// Whether `err` was raised by a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(failure, _))
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
