//! Two-pool wallet model.
//!
//! Every user has an `available` pool (spendable, lockable into escrow)
//! and a `locked` pool (earmarked for a pending withdrawal or a match fee).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result, UserId, constants};

/// Monetary amount. Exact decimal, always finite.
pub type Money = Decimal;

/// Per-user balance document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wallet {
    /// Owner; also the document key.
    pub user_id: UserId,
    /// Spendable balance.
    pub available: Money,
    /// Escrowed balance.
    pub locked: Money,
    /// Stamped on every write.
    pub last_updated: DateTime<Utc>,
}

impl Wallet {
    /// A zero wallet, as created lazily on first reference.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            available: Decimal::ZERO,
            locked: Decimal::ZERO,
            last_updated: Utc::now(),
        }
    }

    /// Total balance (available + locked).
    #[must_use]
    pub fn total(&self) -> Money {
        self.available.saturating_add(self.locked)
    }

    /// Whether both pools are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.locked.is_zero()
    }

    /// Both pools non-negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.available.is_sign_negative() && !self.locked.is_sign_negative()
    }

    /// `(available, locked)` pair, handy for before/after comparisons.
    #[must_use]
    pub fn pools(&self) -> (Money, Money) {
        (self.available, self.locked)
    }
}

/// Validate a caller-supplied amount: strictly positive and at most
/// [`constants::MONEY_SCALE`] decimal places.
///
/// # Errors
/// Returns [`LedgerError::Validation`] naming `field`.
pub fn validate_amount(amount: Money, field: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{field} must be positive, got {amount}"
        )));
    }
    validate_scale(amount, field)
}

/// Reject amounts with more than [`constants::MONEY_SCALE`] decimal places.
/// Trailing zeros do not count. Zero is accepted.
///
/// # Errors
/// Returns [`LedgerError::Validation`] naming `field`.
pub fn validate_scale(amount: Money, field: &str) -> Result<()> {
    if amount.normalize().scale() > constants::MONEY_SCALE {
        return Err(LedgerError::validation(format!(
            "{field} has more than {} decimal places",
            constants::MONEY_SCALE
        )));
    }
    Ok(())
}
