//! Database layer for CarePulse.

mod devices;
mod medications;
mod migrations;
mod patients;
mod posts;
mod telehealth;
mod vitals;

#[allow(unused_imports)]
pub use devices::*;
#[allow(unused_imports)]
pub use medications::*;
pub use migrations::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use posts::*;
#[allow(unused_imports)]
pub use telehealth::*;
#[allow(unused_imports)]
pub use vitals::*;

use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, Row};
use thiserror::Error;

use crate::models::UnknownValue;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating it and applying pending migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::initialize(Connection::open(path)?)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Read a TEXT column holding an enum variant.
pub(crate) fn text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownValue>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a UNIQUE/CHECK/FOREIGN KEY failure to [`DbError::Constraint`].
pub(crate) fn constraint_error(err: rusqlite::Error, context: &str) -> DbError {
    match err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::Constraint(format!(
                "{}: {}",
                context,
                msg.unwrap_or_else(|| e.to_string())
            ))
        }
        other => DbError::Sqlite(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "patients",
            "devices",
            "vital_readings",
            "telehealth_visits",
            "medication_sessions",
            "medication_tracking",
            "posts",
            "schema_migrations",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let fk: i64 = db
            .conn()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carepulse.db");

        let version = {
            let db = Database::open(&path).unwrap();
            db.schema_version().unwrap()
        };

        // Second open applies nothing and keeps the version
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), version);
    }
}
