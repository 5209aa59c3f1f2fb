//! Match settlement and prize cashout.
//!
//! Settlement burns every escrowed entry fee (winner included) and claims
//! the match. The prize is a separate liability: the winner files a prize
//! request which an admin resolves through the payment ledger.

use chrono::{DateTime, Utc};
use matchpot_ledger::{
    LedgerStore, LedgerTransaction, require_admin, require_match, wallet_manager,
};
use matchpot_types::{
    LedgerError, MatchId, Money, PaymentRequest, PayoutStatus, PlayerStatus, RequestId,
    RequestKind, Result, UserId,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::MatchEscrow;

/// Entry fee removed from one player's locked pool at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBurn {
    pub user_id: UserId,
    /// Fee snapshot taken at join.
    pub fee_locked: Money,
    /// Amount actually removed; less than `fee_locked` only when the
    /// wallet held less in escrow (the shortfall is audited).
    pub burned: Money,
}

/// Outcome of a settled match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub match_id: MatchId,
    pub winner: UserId,
    pub burns: Vec<FeeBurn>,
    pub claimed_at: DateTime<Utc>,
}

impl Settlement {
    #[must_use]
    pub fn total_burned(&self) -> Money {
        self.burns
            .iter()
            .fold(Money::ZERO, |acc, b| acc.saturating_add(b.burned))
    }
}

impl<S: LedgerStore> MatchEscrow<S> {
    /// Settle a match: burn every player's escrowed fee and record the winner.
    ///
    /// # Errors
    /// - `Forbidden` if `admin` lacks the admin role
    /// - `MatchNotFound`, `AlreadyClaimed`
    /// - `Validation` if `winner` is not on the roster
    pub fn settle_match(
        &self,
        match_id: MatchId,
        winner: UserId,
        admin: UserId,
    ) -> Result<Settlement> {
        require_admin(self.roles.as_ref(), admin)?;

        let settlement = self
            .store
            .run_transaction(|tx| settle_in_tx(tx, match_id, winner, Utc::now()))
            .inspect_err(|err| {
                tracing::debug!(match_id = %match_id, error = %err, "Settlement rejected");
            })?;

        tracing::info!(
            match_id = %match_id,
            winner = %winner,
            admin = %admin,
            players = settlement.burns.len(),
            burned = %settlement.total_burned(),
            "Match settled, entry fees burned"
        );
        Ok(settlement)
    }

    /// Winner asks for the prize. Creates a pending prize request; no wallet
    /// moves until an admin approves it.
    ///
    /// # Errors
    /// - `MatchNotFound`, `MatchNotEligible` if the match is not claimed
    /// - `Unauthorized` if `user_id` is not the recorded winner
    /// - `AlreadyPaid`, `AlreadyRequested`
    /// - `Validation` if the match carries no prize
    pub fn request_cashout(&self, match_id: MatchId, user_id: UserId) -> Result<RequestId> {
        let request_id = self.store.run_transaction(|tx| {
            let mut record = require_match(tx, match_id)?;
            if !record.is_claimed() {
                return Err(LedgerError::MatchNotEligible(match_id));
            }
            if record.winner != Some(user_id) {
                return Err(LedgerError::unauthorized(format!(
                    "{user_id} is not the winner of {match_id}"
                )));
            }
            if record.payout_status == PayoutStatus::Paid {
                return Err(LedgerError::AlreadyPaid(match_id));
            }
            if record.payout_requested {
                return Err(LedgerError::AlreadyRequested(match_id));
            }
            if record.prize <= Decimal::ZERO {
                return Err(LedgerError::validation(format!("{match_id} has no prize")));
            }

            let request_id = RequestId::for_prize(match_id);
            let request = PaymentRequest::pending(
                request_id,
                user_id,
                record.prize,
                RequestKind::Prize { match_id },
            );
            if !tx.insert_request(request)? {
                return Err(LedgerError::AlreadyRequested(match_id));
            }

            record.payout_requested = true;
            tx.put_match(record)?;
            Ok(request_id)
        })?;

        tracing::info!(
            match_id = %match_id,
            user = %user_id,
            request = %request_id,
            "Prize cashout requested"
        );
        Ok(request_id)
    }
}

fn settle_in_tx(
    tx: &mut dyn LedgerTransaction,
    match_id: MatchId,
    winner: UserId,
    now: DateTime<Utc>,
) -> Result<Settlement> {
    let mut record = require_match(tx, match_id)?;
    if record.is_claimed() {
        return Err(LedgerError::AlreadyClaimed(match_id));
    }

    let roster = tx.roster(match_id)?;
    if !roster.iter().any(|p| p.user_id == winner) {
        return Err(LedgerError::validation(format!(
            "winner {winner} did not join {match_id}"
        )));
    }

    let mut burns = Vec::with_capacity(roster.len());
    for mut player in roster {
        let mut burned = Money::ZERO;
        if player.fee_locked > Decimal::ZERO {
            let locked_before = tx
                .wallet(player.user_id)?
                .map_or(Money::ZERO, |w| w.locked);
            let after = wallet_manager::finalize_locked(tx, player.user_id, player.fee_locked)?;
            burned = locked_before - after.locked;
        }
        burns.push(FeeBurn {
            user_id: player.user_id,
            fee_locked: player.fee_locked,
            burned,
        });

        player.status = PlayerStatus::Settled;
        tx.put_player(player)?;
    }

    record.claim(winner, now)?;
    tx.put_match(record)?;

    Ok(Settlement {
        match_id,
        winner,
        burns,
        claimed_at: now,
    })
}
