//! Ledger configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Money, Result, UserId, constants};

/// Limits and roles for one ledger deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Smallest deposit request accepted.
    pub minimum_deposit: Money,
    /// Smallest withdrawal request accepted.
    pub minimum_withdrawal: Money,
    /// Users holding the admin capability.
    pub admins: Vec<UserId>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            minimum_deposit: constants::DEFAULT_MINIMUM_DEPOSIT,
            minimum_withdrawal: constants::DEFAULT_MINIMUM_WITHDRAWAL,
            admins: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Parse from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`LedgerError::Serialization`] on malformed JSON, or
    /// [`LedgerError::Configuration`] if the values are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Minimums must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.minimum_deposit <= Decimal::ZERO {
            return Err(LedgerError::Configuration(format!(
                "minimum_deposit must be positive, got {}",
                self.minimum_deposit
            )));
        }
        if self.minimum_withdrawal <= Decimal::ZERO {
            return Err(LedgerError::Configuration(format!(
                "minimum_withdrawal must be positive, got {}",
                self.minimum_withdrawal
            )));
        }
        Ok(())
    }

    /// Builder-style admin registration.
    #[must_use]
    pub fn with_admin(mut self, admin: UserId) -> Self {
        self.admins.push(admin);
        self
    }
}
