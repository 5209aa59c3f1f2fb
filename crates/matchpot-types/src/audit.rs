//! Audit trail for balance drift.
//!
//! When a release or finalize asks for more than a wallet has locked, the
//! ledger clamps the wallet at zero instead of going negative and records
//! an [`AuditEntry`] in the same transaction, so the inconsistency is
//! surfaced rather than silently absorbed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuditId, Money, UserId};

/// Which locked-pool operation was clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    ReleaseToAvailable,
    FinalizeLocked,
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReleaseToAvailable => write!(f, "RELEASE_TO_AVAILABLE"),
            Self::FinalizeLocked => write!(f, "FINALIZE_LOCKED"),
        }
    }
}

/// One clamped locked-pool mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub user_id: UserId,
    pub operation: AuditOperation,
    /// Amount the caller asked to move.
    pub requested: Money,
    /// Amount actually moved (the locked pool before the operation).
    pub applied: Money,
    pub locked_before: Money,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    #[must_use]
    pub fn clamp(
        user_id: UserId,
        operation: AuditOperation,
        requested: Money,
        locked_before: Money,
    ) -> Self {
        Self {
            id: AuditId::new(),
            user_id,
            operation,
            requested,
            applied: locked_before,
            locked_before,
            recorded_at: Utc::now(),
        }
    }

    /// Amount that could not be taken from the locked pool.
    #[must_use]
    pub fn shortfall(&self) -> Money {
        self.requested - self.applied
    }
}
