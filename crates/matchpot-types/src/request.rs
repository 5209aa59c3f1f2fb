//! # PaymentRequest: deposit, withdrawal and prize lifecycle
//!
//! All three request types share one lifecycle and differ only in what
//! resolution does to the wallet. The type is a tagged variant
//! ([`RequestKind`]) carrying the correlation data of that type.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  approve   ┌──────────┐
//!   │ PENDING ├───────────▶│ APPROVED │
//!   └────┬────┘            └──────────┘
//!        │ deny
//!        ▼
//!   ┌────────┐
//!   │ DENIED │
//!   └────────┘
//! ```
//!
//! Both terminal states are final: a resolved request is never revisited.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, MatchId, Money, RequestId, Result, UserId};

/// Discriminant of [`RequestKind`], used for filtering and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Deposit,
    Withdraw,
    Prize,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdraw => write!(f, "withdraw"),
            Self::Prize => write!(f, "prize"),
        }
    }
}

/// Request type plus its correlation field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequestKind {
    /// Funds paid in externally; `payment_ref` is the external reference.
    Deposit { payment_ref: String },
    /// Funds to be paid out to `destination` (e.g. a UPI handle).
    Withdraw { destination: String },
    /// Prize payout for a claimed match.
    Prize { match_id: MatchId },
}

impl RequestKind {
    #[must_use]
    pub fn request_type(&self) -> RequestType {
        match self {
            Self::Deposit { .. } => RequestType::Deposit,
            Self::Withdraw { .. } => RequestType::Withdraw,
            Self::Prize { .. } => RequestType::Prize,
        }
    }
}

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    /// Only `Pending → Approved | Denied` is allowed.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Approved | Self::Denied))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Admin decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    /// Terminal status this decision leads to.
    #[must_use]
    pub fn target_status(self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Deny => RequestStatus::Denied,
        }
    }
}

/// Who resolved the request and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub decided_by: UserId,
    pub decision: Decision,
    pub resolved_at: DateTime<Utc>,
}

/// A deposit, withdrawal or prize request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: RequestId,
    /// Requesting user; the wallet resolution acts on.
    pub user_id: UserId,
    /// Always > 0.
    pub amount: Money,
    #[serde(flatten)]
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, on resolution.
    pub resolution: Option<Resolution>,
}

impl PaymentRequest {
    /// A fresh pending request.
    #[must_use]
    pub fn pending(id: RequestId, user_id: UserId, amount: Money, kind: RequestKind) -> Self {
        Self {
            id,
            user_id,
            amount,
            kind,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            resolution: None,
        }
    }

    #[must_use]
    pub fn request_type(&self) -> RequestType {
        self.kind.request_type()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// `approvedBy` view of the resolution.
    #[must_use]
    pub fn approved_by(&self) -> Option<UserId> {
        self.resolution
            .as_ref()
            .filter(|r| r.decision == Decision::Approve)
            .map(|r| r.decided_by)
    }

    /// `deniedBy` view of the resolution.
    #[must_use]
    pub fn denied_by(&self) -> Option<UserId> {
        self.resolution
            .as_ref()
            .filter(|r| r.decision == Decision::Deny)
            .map(|r| r.decided_by)
    }

    /// Move to the terminal state for `decision`.
    ///
    /// # Errors
    /// Returns [`LedgerError::AlreadyProcessed`] unless the request is pending.
    pub fn resolve(&mut self, decision: Decision, admin: UserId) -> Result<()> {
        let target = decision.target_status();
        if !self.status.can_transition_to(target) {
            return Err(LedgerError::AlreadyProcessed(self.id));
        }
        self.status = target;
        self.resolution = Some(Resolution {
            decided_by: admin,
            decision,
            resolved_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl PaymentRequest {
    /// Pending deposit with a random payment reference. **Tests only.**
    pub fn dummy_deposit(user_id: UserId, amount: Money) -> Self {
        let payment_ref = format!("REF-{}", rand::random::<u32>());
        Self::pending(
            RequestId::for_deposit(user_id, &payment_ref),
            user_id,
            amount,
            RequestKind::Deposit { payment_ref },
        )
    }
}
