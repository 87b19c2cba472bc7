//! SQLite-backed store for locations, accounts, and members.
//!
//! The database lives at `~/.memberbase/memberbase.db` by default. Every
//! mutating service operation runs inside exactly one `with_transaction`
//! scope: `BEGIN IMMEDIATE` takes the writer lock up front, so count-then-act
//! sequences (primary-exists check before insert, member count before delete,
//! successor selection before promotion) can never interleave between two
//! writers, in-process or across processes.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags};

use crate::migrations;

pub mod types;
pub use types::*;

pub mod accounts;
pub mod locations;
pub mod members;

/// Upper bound on waiting for the writer lock. When a concurrent transaction
/// holds the database past this, the operation fails with a storage error and
/// the caller may retry.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MemberDb {
    conn: Connection,
}

impl MemberDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    ///
    /// `BEGIN IMMEDIATE` acquires the write lock before the first read, which
    /// is what serializes primary-designation decisions per account.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&Self) -> Result<T, E>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(DbError::from(e)))?;
        match f(self) {
            Ok(val) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(val),
                Err(e) => {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    Err(E::from(DbError::from(e)))
                }
            },
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at the default path and apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL mode for concurrent readers alongside the single writer
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        // FK enforcement is set after migrations so table-recreation
        // migrations can run with it off.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Open the database in read-only mode. Used by the audit binary for safe
    /// concurrent reads while a service process owns writes.
    pub fn open_readonly() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_readonly_at(&path)
    }

    /// Open a database at an explicit path in read-only mode. Does not apply
    /// migrations.
    pub fn open_readonly_at(path: &std::path::Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        // Same journal mode as the writer so reads coexist with a live WAL
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.memberbase/memberbase.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".memberbase").join("memberbase.db"))
    }

    /// Per-account member and primary counts across the whole database.
    ///
    /// LEFT JOIN so accounts with zero members appear with zero counts; those
    /// never violate the invariant but keep the census complete.
    pub fn primary_census(&self) -> Result<Vec<PrimaryCensusRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.uid, a.guid,
                    COUNT(m.uid),
                    COALESCE(SUM(m.is_primary), 0)
             FROM account a
             LEFT JOIN member m ON m.account_uid = a.uid
             GROUP BY a.uid, a.guid
             ORDER BY a.uid",
        )?;
        let rows = stmt.query_map(params![], |row| {
            Ok(PrimaryCensusRow {
                account_uid: row.get(0)?,
                account_guid: row.get(1)?,
                member_count: row.get(2)?,
                primary_count: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================


// =============================================================================
// Tests
// =============================================================================
