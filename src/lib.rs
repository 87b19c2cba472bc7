//! Membership management core: locations, accounts, and members over an
//! embedded SQLite store.
//!
//! The load-bearing rule is the primary-member invariant: every account with
//! members has exactly one primary member. [`members`] enforces it on every
//! mutation; [`accounts::cascade_delete_account`] is the only path that may
//! remove a primary without promoting a successor, because the account goes
//! with it. All mutations run inside a single write transaction on
//! [`db::MemberDb`], so the invariant holds at every commit boundary.

pub mod accounts;
pub mod db;
pub mod error;
pub mod locations;
pub mod members;
mod migrations;
pub mod types;

pub use db::MemberDb;
pub use error::{ConflictKind, Entity, ServiceError};
pub use types::CancelToken;
