//! Database connection and transactions
//!
//! A single connection is shared by every caller of the store. Writes run in
//! immediate transactions and are retried with backoff when another process
//! holds the database lock.

use crate::{migrations, Error, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OpenFlags, Transaction, TransactionBehavior};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Maximum retry attempts for SQLITE_BUSY
pub const MAX_BUSY_RETRIES: u32 = 5;

/// Base backoff duration in milliseconds
pub const BASE_BACKOFF_MS: u64 = 50;

/// Maximum backoff duration in milliseconds
pub const MAX_BACKOFF_MS: u64 = 1000;

/// Database connection wrapper
pub struct Database {
    conn: Mutex<Connection>,
    created: bool,
}

impl Database {
    /// Open (creating if needed) the settings database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // journal_mode returns the resulting mode as a row
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode={})", path.display(), mode);

        let created = migrations::schema_version(&conn)? == 0;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            created,
        })
    }

    /// Whether this open created the schema
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// Run a read against the connection
    pub fn read<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&Connection) -> Result<T>,
    {
        with_busy_retry(|| {
            let conn = self.conn.lock();
            f(&conn)
        })
    }

    /// Run `f` inside one immediate transaction, committing on success
    ///
    /// Any error from `f` rolls the transaction back. The whole transaction
    /// is re-run if SQLite reports the database as busy.
    pub fn write<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        with_busy_retry(|| {
            let mut conn = self.conn.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

/// Retry `f` while it fails with SQLITE_BUSY
fn with_busy_retry<T, F>(mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempts = 0;

    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(Error::Database(ref e)) if is_busy_error(e) && attempts < MAX_BUSY_RETRIES => {
                attempts += 1;
                let backoff = calculate_backoff(attempts);
                tracing::debug!(
                    "SQLITE_BUSY (attempt {}/{}), retrying in {}ms",
                    attempts,
                    MAX_BUSY_RETRIES,
                    backoff
                );
                thread::sleep(Duration::from_millis(backoff));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Check if error is SQLITE_BUSY or SQLITE_LOCKED
fn is_busy_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked,
                ..
            },
            _
        )
    )
}

/// Calculate exponential backoff with jitter
fn calculate_backoff(attempt: u32) -> u64 {
    let base = BASE_BACKOFF_MS * (1 << attempt.min(6));
    let jitter = rand::random::<u64>() % (base / 4 + 1);
    (base + jitter).min(MAX_BACKOFF_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("system").join("locksettings.db");

        let db = Database::open(&path).unwrap();
        assert!(db.was_created());
        assert!(path.exists());

        drop(db);
        let db = Database::open(&path).unwrap();
        assert!(!db.was_created());
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("locksettings.db")).unwrap();

        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO locksettings (name, user, value) VALUES ('k', 0, 'v')",
                [],
            )?;
            Err(Error::Migration("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM locksettings", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_busy_error_is_not_retried_forever() {
        let mut calls = 0;
        let result: Result<()> = with_busy_retry(|| {
            calls += 1;
            Err(Error::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(5),
                None,
            )))
        });
        assert!(result.is_err());
        assert_eq!(calls, MAX_BUSY_RETRIES + 1);
    }

    #[test]
    fn test_calculate_backoff() {
        let b1 = calculate_backoff(1);
        let b2 = calculate_backoff(2);
        let b3 = calculate_backoff(3);

        assert!(b1 < b2 || b2 < b3);
        assert!(calculate_backoff(10) <= MAX_BACKOFF_MS);
    }
}
