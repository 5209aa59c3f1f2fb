//! Error types for the Matchpot ledger core.
//!
//! All errors use the `MP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation / identity errors
//! - 2xx: Wallet errors
//! - 3xx: Payment request errors
//! - 4xx: Match escrow errors
//! - 9xx: Store / internal errors
//!
//! Every failure is scoped to a single request: the transaction that
//! produced it is aborted and no write of that transaction is committed.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{MatchId, RequestId, RequestType, UserId};

/// Central error enum for all ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Validation / Identity (1xx)
    // =================================================================
    /// Malformed, missing or out-of-range input. No state change.
    #[error("MP_ERR_100: Validation failed: {reason}")]
    Validation { reason: String },

    /// Credential missing or invalid, or caller is not the owner.
    #[error("MP_ERR_101: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Authenticated caller lacks the required role.
    #[error("MP_ERR_102: Forbidden: {0} is not an admin")]
    Forbidden(UserId),

    // =================================================================
    // Wallet (2xx)
    // =================================================================
    /// Not enough available balance to lock.
    #[error("MP_ERR_200: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Wallet absent where presence is required.
    #[error("MP_ERR_201: Wallet not found for user {0}")]
    WalletNotFound(UserId),

    // =================================================================
    // Payment Requests (3xx)
    // =================================================================
    /// Request absent.
    #[error("MP_ERR_300: Payment request not found: {0}")]
    RequestNotFound(RequestId),

    /// Request already approved or denied.
    #[error("MP_ERR_301: Payment request already processed: {0}")]
    AlreadyProcessed(RequestId),

    /// A request with the same `(uid, paymentRef)` already exists.
    #[error("MP_ERR_302: Duplicate payment reference: {payment_ref}")]
    DuplicateReference { payment_ref: String },

    /// A typed resolve was invoked against a request of another type.
    #[error("MP_ERR_303: Request type mismatch: expected {expected}, got {actual}")]
    RequestTypeMismatch {
        expected: RequestType,
        actual: RequestType,
    },

    // =================================================================
    // Match Escrow (4xx)
    // =================================================================
    /// Match absent.
    #[error("MP_ERR_400: Match not found: {0}")]
    MatchNotFound(MatchId),

    /// User already holds a roster slot in this match.
    #[error("MP_ERR_401: User {user} already joined {match_id}")]
    AlreadyJoined { match_id: MatchId, user: UserId },

    /// Roster is full.
    #[error("MP_ERR_402: Match {match_id} is full ({slots} slots)")]
    CapacityExceeded { match_id: MatchId, slots: u32 },

    /// Match is no longer open for joining.
    #[error("MP_ERR_403: Match {0} is closed")]
    MatchClosed(MatchId),

    /// Match start time has elapsed.
    #[error("MP_ERR_404: Match {0} has already started")]
    MatchStarted(MatchId),

    /// Match already settled (`open → claimed` happens once).
    #[error("MP_ERR_405: Match {0} already claimed")]
    AlreadyClaimed(MatchId),

    /// Payout requested or resolved against a match that is not claimed.
    #[error("MP_ERR_406: Match {0} is not eligible for payout")]
    MatchNotEligible(MatchId),

    /// Winner already requested the payout.
    #[error("MP_ERR_407: Payout already requested for {0}")]
    AlreadyRequested(MatchId),

    /// Prize already paid out.
    #[error("MP_ERR_408: Payout already paid for {0}")]
    AlreadyPaid(MatchId),

    // =================================================================
    // Store / Internal (9xx)
    // =================================================================
    /// Transaction collided with a concurrent commit. Safe to retry.
    #[error("MP_ERR_900: Transaction conflict: {0}")]
    Conflict(String),

    /// Transient or permanent store failure.
    #[error("MP_ERR_901: Store error: {0}")]
    Store(String),

    /// Invalid configuration.
    #[error("MP_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("MP_ERR_903: Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`LedgerError::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Whether the caller may resubmit the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
