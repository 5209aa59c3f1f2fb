//! # matchpot-types
//!
//! Shared types, errors, and configuration for the **Matchpot** ledger core.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`UserId`], [`RequestId`], [`MatchId`], [`AuditId`]
//! - **Wallet model**: [`Wallet`], [`Money`], [`validate_amount`]
//! - **Payment requests**: [`PaymentRequest`], [`RequestKind`], [`RequestStatus`], [`Decision`]
//! - **Match escrow**: [`Match`], [`MatchStatus`], [`PayoutStatus`], [`MatchPlayer`], [`NewMatch`]
//! - **Audit trail**: [`AuditEntry`], [`AuditOperation`]
//! - **Configuration**: [`LedgerConfig`]
//! - **Errors**: [`LedgerError`] with `MP_ERR_` prefix codes
//! - **Constants**: limits and defaults

pub mod arena;
pub mod audit;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod request;
pub mod wallet;

pub use arena::*;
pub use audit::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use request::*;
pub use wallet::*;

// Constants are accessed via `matchpot_types::constants::FOO`.
