//! Shared service-level types: operation inputs, outcomes, and the
//! cancellation token threaded through every mutating call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Cooperative cancellation signal for a single logical operation.
///
/// Checked at operation start and again before commit; a cancellation
/// observed at either point rolls the transaction back so no partial state
/// is ever visible. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fields for creating a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub locale: Option<String>,
    pub postal_code: Option<String>,
}

/// Fields for creating an account under a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub location_guid: String,
    pub status: crate::db::AccountStatus,
    pub account_type: i64,
    pub payment_amount: Option<f64>,
    pub period_start_utc: String,
    pub period_end_utc: String,
    pub next_billing_utc: String,
    pub pend_cancel: bool,
    pub pend_cancel_date_utc: Option<String>,
    pub end_date_utc: Option<String>,
}

/// Fields for creating a member on an account.
///
/// `primary` is a request, not a guarantee: the first member of an account is
/// made primary regardless, and a requested primary is refused while one
/// already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub account_guid: String,
    pub primary: bool,
    pub joined_date_utc: String,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub locale: Option<String>,
    pub postal_code: Option<String>,
}

/// Result of a single-member deletion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Guid of the member that was removed.
    pub deleted_guid: String,
    /// Guid of the member promoted to primary, when the deleted member was
    /// the primary.
    pub promoted_guid: Option<String>,
}

impl DeleteOutcome {
    pub fn promoted(&self) -> bool {
        self.promoted_guid.is_some()
    }
}

/// Result of an account cascade delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub account_guid: String,
    pub members_deleted: usize,
}
