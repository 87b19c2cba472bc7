//! Account lifecycle.
//!
//! Accounts live under a location and own their members. Cascade deletion is
//! the one path allowed to remove a primary member without promotion, because
//! the account itself ceases to exist in the same transaction.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{DbAccount, MemberDb};
use crate::error::{Entity, ServiceError};
use crate::types::{CancelToken, CascadeOutcome, NewAccount};

/// Create an account under an existing location.
pub fn create_account(
    db: &MemberDb,
    req: &NewAccount,
    cancel: &CancelToken,
) -> Result<DbAccount, ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }

    db.with_transaction(|db| {
        let location = db
            .get_location(&req.location_guid)?
            .ok_or(ServiceError::NotFound(Entity::Location))?;

        let mut account = DbAccount {
            uid: 0,
            guid: Uuid::new_v4().to_string(),
            location_uid: location.uid,
            status: req.status,
            account_type: req.account_type,
            payment_amount: req.payment_amount,
            pend_cancel: req.pend_cancel,
            pend_cancel_date_utc: req.pend_cancel_date_utc.clone(),
            period_start_utc: req.period_start_utc.clone(),
            period_end_utc: req.period_end_utc.clone(),
            next_billing_utc: req.next_billing_utc.clone(),
            end_date_utc: req.end_date_utc.clone(),
            created_utc: Utc::now().to_rfc3339(),
            updated_utc: None,
        };
        account.uid = db.insert_account(&account)?;

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        log::info!(
            "Created account {} under location {}",
            account.guid,
            location.guid
        );
        Ok(account)
    })
}

/// Fetch an account by guid.
pub fn get_account(db: &MemberDb, account_guid: &str) -> Result<DbAccount, ServiceError> {
    db.get_account(account_guid)?
        .ok_or(ServiceError::NotFound(Entity::Account))
}

/// List a location's active accounts (status below `Cancelled`).
pub fn list_active_accounts(
    db: &MemberDb,
    location_guid: &str,
) -> Result<Vec<DbAccount>, ServiceError> {
    let location = db
        .get_location(location_guid)?
        .ok_or(ServiceError::NotFound(Entity::Location))?;
    Ok(db.get_active_accounts(location.uid)?)
}

/// Delete an account and all of its members.
///
/// Member rows go first, then the account row, all in one transaction. The
/// last-member and promotion rules do not apply here; the whole subtree is
/// removed or nothing is.
pub fn cascade_delete_account(
    db: &MemberDb,
    account_guid: &str,
    cancel: &CancelToken,
) -> Result<CascadeOutcome, ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }

    db.with_transaction(|db| {
        let account = db
            .get_account(account_guid)?
            .ok_or(ServiceError::NotFound(Entity::Account))?;

        let members_deleted = db.delete_members_for_account(account.uid)?;
        if !db.delete_account_row(account.uid)? {
            return Err(ServiceError::NotFound(Entity::Account));
        }

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        log::info!(
            "Cascade deleted account {} ({} members)",
            account.guid,
            members_deleted
        );
        Ok(CascadeOutcome {
            account_guid: account.guid,
            members_deleted,
        })
    })
}
