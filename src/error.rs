//! Service-level error taxonomy.
//!
//! Every operation surfaces exactly one classified error per call and never
//! retries on its own; all failures roll back the enclosing transaction. The
//! external API layer owns the mapping to transport status codes.

use std::fmt;

use thiserror::Error;

use crate::db::DbError;

/// The entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Location,
    Account,
    Member,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Location => write!(f, "location"),
            Entity::Account => write!(f, "account"),
            Entity::Member => write!(f, "member"),
        }
    }
}

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Create requested a primary member while one already exists.
    DuplicatePrimary,
    /// Delete targeted the sole remaining member of an account.
    LastMember,
    /// The member count said a successor must exist but none was found.
    /// Internal consistency fault; the deletion is aborted rather than
    /// leaving the account without a primary.
    PromotionFailed,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DuplicatePrimary => {
                write!(f, "a primary member already exists for this account")
            }
            ConflictKind::LastMember => {
                write!(f, "cannot delete the last member of an account")
            }
            ConflictKind::PromotionFailed => {
                write!(f, "no successor found for primary promotion")
            }
        }
    }
}

/// Errors surfaced by the membership services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled before commit")]
    Cancelled,

    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
}

impl ServiceError {
    /// Storage failures (lock timeouts, connectivity) are safe to retry:
    /// nothing was committed. Conflicts and not-found reflect data state and
    /// will recur until it changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Storage(_))
    }

    /// True for refusals that enforce a business invariant.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let conflict = ServiceError::Conflict(ConflictKind::LastMember);
        assert!(conflict.is_conflict());
        assert!(!conflict.is_retryable());

        let storage = ServiceError::Storage(DbError::Migration("boom".into()));
        assert!(storage.is_retryable());
        assert!(!storage.is_conflict());

        assert!(!ServiceError::NotFound(Entity::Member).is_retryable());
    }

    #[test]
    fn test_display_names_entity() {
        let err = ServiceError::NotFound(Entity::Account);
        assert_eq!(err.to_string(), "account not found");
    }
}
