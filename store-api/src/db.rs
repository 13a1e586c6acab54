//! SQLite connection and schema.
//!
//! Tables:
//! - `users`: id, username (unique), password
//! - `stores`: id, name (unique)
//! - `items`: id, name (unique), price, store_id -> stores(id)
//!
//! Foreign keys are enforced; deleting a store deletes its items.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{ffi, Connection, ErrorCode};
use thiserror::Error;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS stores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        price REAL NOT NULL,
        store_id INTEGER NOT NULL REFERENCES stores(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_items_store ON items(store_id);
";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("foreign key constraint violated")]
    ForeignKeyViolation,
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            if failure.code == ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return DbError::UniqueViolation;
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::ForeignKeyViolation,
                    _ => {}
                }
            }
        }
        DbError::Sqlite(err)
    }
}

/// Shared handle to the single SQLite connection. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`. The path `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` while holding the connection lock.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DbError> {
        let conn = self.conn.lock();
        f(&conn).map_err(DbError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{Database, DbError};

    #[test]
    fn schema_is_created_idempotently_on_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.db");

        let first = Database::open(&path)?;
        first.with_conn(|conn| conn.execute("INSERT INTO stores (name) VALUES ('a')", []))?;
        drop(first);

        let reopened = Database::open(&path)?;
        let count: i64 =
            reopened.with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM stores", [], |r| r.get(0)))?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn duplicate_name_maps_to_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| conn.execute("INSERT INTO stores (name) VALUES ('a')", []))
            .unwrap();

        let err = db
            .with_conn(|conn| conn.execute("INSERT INTO stores (name) VALUES ('a')", []))
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation));
    }

    #[test]
    fn dangling_store_reference_maps_to_foreign_key_violation() {
        let db = Database::open_in_memory().unwrap();

        let err = db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO items (name, price, store_id) VALUES ('x', 1.0, 42)",
                    [],
                )
            })
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation));
    }
}
