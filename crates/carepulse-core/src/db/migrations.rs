//! Versioned schema migrations.
//!
//! Each migration is a SQL file under `migrations/`, applied once in version
//! order inside its own transaction and recorded in `schema_migrations` with a
//! SHA-256 checksum. Re-running is a no-op; an applied migration whose file
//! content changed is reported as an error instead of being re-applied.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{Database, DbError, DbResult};

/// A single schema migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Hex-encoded SHA-256 of the migration SQL.
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

/// All migrations shipped with this crate, in version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "patients_devices",
        sql: include_str!("../../migrations/001_patients_devices.sql"),
    },
    Migration {
        version: 2,
        name: "medications",
        sql: include_str!("../../migrations/002_medications.sql"),
    },
    Migration {
        version: 3,
        name: "posts",
        sql: include_str!("../../migrations/003_posts.sql"),
    },
];

const MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#;

/// A row of `schema_migrations`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MigrationReport {
    /// Versions applied by this run
    pub applied: Vec<u32>,
    /// Highest applied version after the run
    pub current_version: u32,
}

impl Database {
    /// Apply all pending migrations from [`MIGRATIONS`].
    pub fn migrate(&mut self) -> DbResult<MigrationReport> {
        apply_migrations(&mut self.conn, MIGRATIONS)
    }

    /// Highest applied migration version (0 for an empty database).
    pub fn schema_version(&self) -> DbResult<u32> {
        let version: Option<u32> = self
            .conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })?;
        Ok(version.unwrap_or(0))
    }

    /// List applied migrations in version order.
    pub fn applied_migrations(&self) -> DbResult<Vec<AppliedMigration>> {
        let mut stmt = self.conn.prepare(
            "SELECT version, name, checksum, applied_at FROM schema_migrations ORDER BY version",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AppliedMigration {
                version: row.get(0)?,
                name: row.get(1)?,
                checksum: row.get(2)?,
                applied_at: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Apply `migrations` (sorted by version) to `conn`.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<MigrationReport> {
    conn.execute_batch(MIGRATIONS_TABLE)?;

    let mut applied = Vec::new();
    for migration in migrations {
        let recorded: Option<String> = conn
            .query_row(
                "SELECT checksum FROM schema_migrations WHERE version = ?",
                [migration.version],
                |row| row.get(0),
            )
            .optional()?;

        let checksum = migration.checksum();
        match recorded {
            Some(existing) if existing == checksum => continue,
            Some(_) => {
                return Err(DbError::Migration {
                    version: migration.version,
                    reason: format!("checksum mismatch for '{}'", migration.name),
                })
            }
            None => {}
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| DbError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, checksum, applied_at) VALUES (?1, ?2, ?3, ?4)",
            params![migration.version, migration.name, checksum, Utc::now()],
        )?;
        tx.commit()?;

        applied.push(migration.version);
    }

    let current_version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;

    Ok(MigrationReport {
        applied,
        current_version: current_version.unwrap_or(0),
    })
}
