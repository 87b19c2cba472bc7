//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// Account standing, ordered by severity. The numeric value is what the
/// `account.status` column stores; "active" filtering relies on the ordering
/// (anything below `Cancelled` counts as active).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountStatus {
    Good = 0,
    Warning = 1,
    AtRisk = 2,
    Cancelled = 3,
    Collections = 4,
}

impl AccountStatus {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Map a stored status value. Unknown values land on `Collections` so a
    /// corrupt row never passes the active filter.
    pub fn from_i64_lossy(value: i64) -> Self {
        match value {
            0 => AccountStatus::Good,
            1 => AccountStatus::Warning,
            2 => AccountStatus::AtRisk,
            3 => AccountStatus::Cancelled,
            _ => AccountStatus::Collections,
        }
    }

    /// Active accounts are those not yet cancelled or in collections.
    pub fn is_active(self) -> bool {
        self < AccountStatus::Cancelled
    }
}

/// A row from the `location` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLocation {
    /// Internal identity (rowid). Zero until persisted.
    pub uid: i64,
    /// Public-facing identifier (UUIDv4).
    pub guid: String,
    pub name: String,
    pub disabled: bool,
    pub address: Option<String>,
    pub city: Option<String>,
    pub locale: Option<String>,
    pub postal_code: Option<String>,
    pub created_utc: String,
    pub updated_utc: Option<String>,
}

/// A row from the `account` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAccount {
    pub uid: i64,
    pub guid: String,
    pub location_uid: i64,
    pub status: AccountStatus,
    pub account_type: i64,
    pub payment_amount: Option<f64>,
    pub pend_cancel: bool,
    pub pend_cancel_date_utc: Option<String>,
    pub period_start_utc: String,
    pub period_end_utc: String,
    pub next_billing_utc: String,
    pub end_date_utc: Option<String>,
    pub created_utc: String,
    pub updated_utc: Option<String>,
}

/// A row from the `member` table.
///
/// `location_uid` is denormalized from the owning account so member listings
/// never need a join back through `account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbMember {
    pub uid: i64,
    pub guid: String,
    pub account_uid: i64,
    pub location_uid: i64,
    pub is_primary: bool,
    pub joined_date_utc: String,
    pub cancel_date_utc: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub locale: Option<String>,
    pub postal_code: Option<String>,
    pub cancelled: bool,
    pub created_utc: String,
    pub updated_utc: Option<String>,
}

/// One row of the primary-member census: per-account member and primary
/// counts, used by the audit binary to surface invariant violations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryCensusRow {
    pub account_uid: i64,
    pub account_guid: String,
    pub member_count: i64,
    pub primary_count: i64,
}

impl PrimaryCensusRow {
    /// An account with members must have exactly one primary.
    pub fn violates_invariant(&self) -> bool {
        self.member_count > 0 && self.primary_count != 1
    }
}
