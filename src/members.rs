//! Member lifecycle and primary designation.
//!
//! Every account with members has exactly one primary member. This module is
//! where that invariant is enforced: creation decides the effective primary
//! flag (first member is always primary, a second primary is refused), and
//! deletion of the primary promotes a deterministic successor inside the same
//! transaction. Counts and the successor selection run under the write lock
//! taken by `with_transaction`, so concurrent callers cannot both observe
//! "no primary exists" or pick the same successor.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{DbMember, MemberDb};
use crate::error::{ConflictKind, Entity, ServiceError};
use crate::types::{CancelToken, DeleteOutcome, NewMember};

/// Create a member on an account.
///
/// The effective primary flag is `requested || account has no members`; a
/// requested primary is refused with `Conflict(DuplicatePrimary)` while one
/// exists. Exactly one row is written.
pub fn create_member(
    db: &MemberDb,
    req: &NewMember,
    cancel: &CancelToken,
) -> Result<DbMember, ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ServiceError::InvalidArgument(
            "member first and last name are required".to_string(),
        ));
    }

    db.with_transaction(|db| {
        let account = db
            .get_account(&req.account_guid)?
            .ok_or(ServiceError::NotFound(Entity::Account))?;

        let member_count = db.count_members(account.uid)?;
        let primary_count = db.count_primary_members(account.uid)?;

        if req.primary && primary_count > 0 {
            return Err(ServiceError::Conflict(ConflictKind::DuplicatePrimary));
        }

        // The first member of an account is primary no matter what the
        // caller asked for.
        let is_primary = req.primary || member_count == 0;

        let mut member = DbMember {
            uid: 0,
            guid: Uuid::new_v4().to_string(),
            account_uid: account.uid,
            location_uid: account.location_uid,
            is_primary,
            joined_date_utc: req.joined_date_utc.clone(),
            cancel_date_utc: None,
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            address: req.address.clone(),
            city: req.city.clone(),
            locale: req.locale.clone(),
            postal_code: req.postal_code.clone(),
            cancelled: false,
            created_utc: Utc::now().to_rfc3339(),
            updated_utc: None,
        };
        member.uid = db.insert_member(&member)?;

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        log::info!(
            "Created member {} on account {} (primary: {})",
            member.guid,
            account.guid,
            member.is_primary
        );
        Ok(member)
    })
}

/// Delete a member.
///
/// The last member of an account cannot be deleted through this path. When
/// the deleted member is the primary, the successor (earliest `created_utc`,
/// ties broken by lowest uid) is promoted in the same transaction; a failure
/// at either step rolls back both, leaving the original primary intact.
pub fn delete_member(
    db: &MemberDb,
    member_guid: &str,
    cancel: &CancelToken,
) -> Result<DeleteOutcome, ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }

    db.with_transaction(|db| {
        let member = db
            .get_member(member_guid)?
            .ok_or(ServiceError::NotFound(Entity::Member))?;

        let total = db.count_members(member.account_uid)?;
        if total <= 1 {
            return Err(ServiceError::Conflict(ConflictKind::LastMember));
        }

        let mut promoted_guid = None;
        if member.is_primary {
            match db.find_successor(member.account_uid, member.uid)? {
                Some(successor) => {
                    db.set_primary(successor.uid)?;
                    log::info!(
                        "Promoted member {} to primary on account uid {}",
                        successor.guid,
                        member.account_uid
                    );
                    promoted_guid = Some(successor.guid);
                }
                None => {
                    // The count said another member exists; not finding one
                    // means the store is inconsistent. Abort rather than
                    // delete the only primary.
                    log::warn!(
                        "No promotion successor on account uid {} despite {} members",
                        member.account_uid,
                        total
                    );
                    return Err(ServiceError::Conflict(ConflictKind::PromotionFailed));
                }
            }
        }

        if !db.delete_member_row(member.uid)? {
            return Err(ServiceError::NotFound(Entity::Member));
        }

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        Ok(DeleteOutcome {
            deleted_guid: member.guid,
            promoted_guid,
        })
    })
}

/// Delete every non-primary member of an account. The primary is never
/// touched, so no promotion logic applies; a second call removes nothing.
pub fn delete_non_primary_members(
    db: &MemberDb,
    account_guid: &str,
    cancel: &CancelToken,
) -> Result<usize, ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }

    db.with_transaction(|db| {
        let account = db
            .get_account(account_guid)?
            .ok_or(ServiceError::NotFound(Entity::Account))?;

        let removed = db.delete_non_primary_for_account(account.uid)?;

        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        if removed > 0 {
            log::info!(
                "Removed {} non-primary members from account {}",
                removed,
                account.guid
            );
        }
        Ok(removed)
    })
}

/// Fetch a member by guid.
pub fn get_member(db: &MemberDb, member_guid: &str) -> Result<DbMember, ServiceError> {
    db.get_member(member_guid)?
        .ok_or(ServiceError::NotFound(Entity::Member))
}

/// List an account's members, primary first, then by creation order.
pub fn list_members(db: &MemberDb, account_guid: &str) -> Result<Vec<DbMember>, ServiceError> {
    let account = db
        .get_account(account_guid)?
        .ok_or(ServiceError::NotFound(Entity::Account))?;
    Ok(db.get_members_for_account(account.uid)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::db::test_utils::test_db;
    use crate::db::AccountStatus;
    use crate::locations;
    use crate::types::{NewAccount, NewLocation};

    fn seed_account(db: &MemberDb) -> String {
        let cancel = CancelToken::new();
        let location = locations::create_location(
            db,
            &NewLocation {
                name: "Downtown".to_string(),
                address: None,
                city: None,
                locale: None,
                postal_code: None,
            },
            &cancel,
        )
        .expect("create location");

        accounts::create_account(
            db,
            &NewAccount {
                location_guid: location.guid,
                status: AccountStatus::Good,
                account_type: 1,
                payment_amount: Some(49.99),
                period_start_utc: "2026-01-01T00:00:00+00:00".to_string(),
                period_end_utc: "2026-02-01T00:00:00+00:00".to_string(),
                next_billing_utc: "2026-02-01T00:00:00+00:00".to_string(),
                pend_cancel: false,
                pend_cancel_date_utc: None,
                end_date_utc: None,
            },
            &cancel,
        )
        .expect("create account")
        .guid
    }

    fn new_member(account_guid: &str, name: &str, primary: bool) -> NewMember {
        NewMember {
            account_guid: account_guid.to_string(),
            primary,
            joined_date_utc: "2026-01-01T00:00:00+00:00".to_string(),
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            address: None,
            city: None,
            locale: None,
            postal_code: None,
        }
    }

    #[test]
    fn test_first_member_always_primary() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        // Explicitly NOT requesting primary; the engine overrides
        let member = create_member(&db, &new_member(&account, "Alice", false), &cancel)
            .expect("create member");
        assert!(member.is_primary);
        assert!(!member.cancelled);
        // updated_utc stays unset until the first update
        assert!(member.updated_utc.is_none());
    }

    #[test]
    fn test_duplicate_primary_rejected() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        create_member(&db, &new_member(&account, "Alice", false), &cancel).expect("first member");

        let err = create_member(&db, &new_member(&account, "Bob", true), &cancel)
            .expect_err("second primary must be refused");
        assert!(matches!(
            err,
            ServiceError::Conflict(ConflictKind::DuplicatePrimary)
        ));

        // Nothing was written
        let members = list_members(&db, &account).expect("list");
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_subsequent_non_primary_stays_non_primary() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        create_member(&db, &new_member(&account, "Alice", false), &cancel).expect("first");
        let carol = create_member(&db, &new_member(&account, "Carol", false), &cancel)
            .expect("second member");
        assert!(!carol.is_primary);
    }

    #[test]
    fn test_create_on_missing_account() {
        let db = test_db();
        let cancel = CancelToken::new();
        let err = create_member(&db, &new_member("no-such-account", "Alice", false), &cancel)
            .expect_err("missing account");
        assert!(matches!(err, ServiceError::NotFound(Entity::Account)));
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();
        let err = create_member(&db, &new_member(&account, "  ", false), &cancel)
            .expect_err("blank name");
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[test]
    fn test_last_member_protected() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        let alice =
            create_member(&db, &new_member(&account, "Alice", false), &cancel).expect("create");

        let err = delete_member(&db, &alice.guid, &cancel).expect_err("last member undeletable");
        assert!(matches!(
            err,
            ServiceError::Conflict(ConflictKind::LastMember)
        ));
        assert_eq!(list_members(&db, &account).expect("list").len(), 1);
    }

    #[test]
    fn test_primary_delete_promotes_oldest() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        let a = create_member(&db, &new_member(&account, "A", false), &cancel).expect("a");
        let b = create_member(&db, &new_member(&account, "B", false), &cancel).expect("b");
        let c = create_member(&db, &new_member(&account, "C", false), &cancel).expect("c");
        assert!(a.is_primary);

        let outcome = delete_member(&db, &a.guid, &cancel).expect("delete primary");
        assert!(outcome.promoted());
        assert_eq!(outcome.promoted_guid.as_deref(), Some(b.guid.as_str()));

        // B is now primary, C untouched, A gone
        let promoted = get_member(&db, &b.guid).expect("b exists");
        assert!(promoted.is_primary);
        let untouched = get_member(&db, &c.guid).expect("c exists");
        assert!(!untouched.is_primary);
        assert!(matches!(
            get_member(&db, &a.guid),
            Err(ServiceError::NotFound(Entity::Member))
        ));
    }

    #[test]
    fn test_non_primary_delete_skips_promotion() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        let a = create_member(&db, &new_member(&account, "A", false), &cancel).expect("a");
        create_member(&db, &new_member(&account, "B", false), &cancel).expect("b");
        let c = create_member(&db, &new_member(&account, "C", false), &cancel).expect("c");

        let outcome = delete_member(&db, &c.guid, &cancel).expect("delete non-primary");
        assert!(!outcome.promoted());

        let still_primary = get_member(&db, &a.guid).expect("a exists");
        assert!(still_primary.is_primary);
    }

    #[test]
    fn test_delete_missing_member() {
        let db = test_db();
        let cancel = CancelToken::new();
        let err = delete_member(&db, "no-such-member", &cancel).expect_err("missing");
        assert!(matches!(err, ServiceError::NotFound(Entity::Member)));
    }

    #[test]
    fn test_non_primary_purge_is_idempotent() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        let a = create_member(&db, &new_member(&account, "A", false), &cancel).expect("a");
        create_member(&db, &new_member(&account, "B", false), &cancel).expect("b");
        create_member(&db, &new_member(&account, "C", false), &cancel).expect("c");

        let removed = delete_non_primary_members(&db, &account, &cancel).expect("purge");
        assert_eq!(removed, 2);

        let members = list_members(&db, &account).expect("list");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].guid, a.guid);
        assert!(members[0].is_primary);

        let removed_again = delete_non_primary_members(&db, &account, &cancel).expect("repeat");
        assert_eq!(removed_again, 0);
    }

    #[test]
    fn test_cancelled_token_writes_nothing() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = create_member(&db, &new_member(&account, "Alice", false), &cancel)
            .expect_err("cancelled");
        assert!(matches!(err, ServiceError::Cancelled));
        assert!(list_members(&db, &account).expect("list").is_empty());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let db = test_db();
        let account = seed_account(&db);
        let cancel = CancelToken::new();

        let alice = create_member(&db, &new_member(&account, "Alice", false), &cancel)
            .expect("alice");
        assert!(alice.is_primary);

        let err = create_member(&db, &new_member(&account, "Bob", true), &cancel)
            .expect_err("bob as primary");
        assert!(err.is_conflict());

        let carol =
            create_member(&db, &new_member(&account, "Carol", false), &cancel).expect("carol");
        assert!(!carol.is_primary);

        let outcome = delete_member(&db, &alice.guid, &cancel).expect("delete alice");
        assert!(outcome.promoted());
        assert_eq!(outcome.promoted_guid.as_deref(), Some(carol.guid.as_str()));

        // Invariant holds after the promotion
        let census = db.primary_census().expect("census");
        assert!(census.iter().all(|row| !row.violates_invariant()));
    }
}
