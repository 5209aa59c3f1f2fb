//! Match and roster types for fee escrow.
//!
//! A match moves `OPEN → CLAIMED` exactly once. Independently, the payout
//! flags move `payout_requested: false → true` and
//! `payout_status: UNSET → PAID`, each at most once.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, MatchId, Money, Result, UserId, validate_scale};

/// Competitive status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Accepting players.
    Open,
    /// Settled: winner recorded, entry fees burned.
    Claimed,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Claimed => write!(f, "CLAIMED"),
        }
    }
}

/// Prize payout status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    #[default]
    Unset,
    Paid,
}

/// Match document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub title: String,
    /// Entry fee locked from each joining player.
    pub fee: Money,
    /// Prize credited to the winner on approved cashout.
    pub prize: Money,
    /// Roster capacity, at least 1.
    pub slots: u32,
    pub status: MatchStatus,
    /// Denormalized roster size. Capacity checks re-derive it from the roster.
    pub joined_count: u32,
    pub start_time: DateTime<Utc>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// Set only at claim.
    pub winner: Option<UserId>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub payout_requested: bool,
    pub payout_status: PayoutStatus,
}

impl Match {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == MatchStatus::Open
    }

    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.status == MatchStatus::Claimed
    }

    /// Whether the start time has passed at `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    /// `OPEN → CLAIMED`, recording the winner.
    ///
    /// # Errors
    /// Returns [`LedgerError::AlreadyClaimed`] if the match was settled before.
    pub fn claim(&mut self, winner: UserId, at: DateTime<Utc>) -> Result<()> {
        if self.is_claimed() {
            return Err(LedgerError::AlreadyClaimed(self.id));
        }
        self.status = MatchStatus::Claimed;
        self.winner = Some(winner);
        self.claimed_at = Some(at);
        Ok(())
    }
}

/// Admin input for creating a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMatch {
    pub title: String,
    pub fee: Money,
    pub prize: Money,
    pub slots: u32,
    pub start_time: Option<DateTime<Utc>>,
}

impl NewMatch {
    /// Check the parameters and build the open match document.
    ///
    /// # Errors
    /// Returns [`LedgerError::Validation`] for zero slots, a negative fee or
    /// prize, a fee or prize finer than a cent, or a missing start time.
    pub fn into_match(self, id: MatchId, created_by: UserId) -> Result<Match> {
        if self.slots < 1 {
            return Err(LedgerError::validation("slots must be at least 1"));
        }
        if self.fee < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "fee must be non-negative, got {}",
                self.fee
            )));
        }
        if self.prize < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "prize must be non-negative, got {}",
                self.prize
            )));
        }
        validate_scale(self.fee, "fee")?;
        validate_scale(self.prize, "prize")?;
        let start_time = self
            .start_time
            .ok_or_else(|| LedgerError::validation("start time is required"))?;

        Ok(Match {
            id,
            title: self.title,
            fee: self.fee,
            prize: self.prize,
            slots: self.slots,
            status: MatchStatus::Open,
            joined_count: 0,
            start_time,
            created_by,
            created_at: Utc::now(),
            winner: None,
            claimed_at: None,
            payout_requested: false,
            payout_status: PayoutStatus::Unset,
        })
    }
}

/// Per-player roster state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// Fee escrowed in the player's locked pool.
    Joined,
    /// Fee burned at settlement.
    Settled,
}

/// Roster entry: one per (match, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub match_id: MatchId,
    pub user_id: UserId,
    /// Fee snapshot at join time. Settlement burns this, not the live fee.
    pub fee_locked: Money,
    pub joined_at: DateTime<Utc>,
    pub status: PlayerStatus,
}

#[cfg(any(test, feature = "test-helpers"))]
impl NewMatch {
    /// Two-player match starting in an hour. **Tests only.**
    pub fn dummy(fee: Money, prize: Money) -> Self {
        Self {
            title: "1v1 showdown".into(),
            fee,
            prize,
            slots: 2,
            start_time: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }
}
