//! Match Escrow Coordinator: match creation and fee escrow on join.
//!
//! Joining atomically locks the entry fee in the player's wallet and adds a
//! roster entry holding a snapshot of that fee. If the lock fails, no roster
//! entry is written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use matchpot_ledger::{
    LedgerStore, LedgerTransaction, RoleLookup, require_admin, require_match, wallet_manager,
};
use matchpot_types::{
    LedgerError, Match, MatchId, MatchPlayer, Money, NewMatch, PlayerStatus, Result, UserId,
};
use serde::Serialize;

/// Outcome of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReceipt {
    pub match_id: MatchId,
    pub user_id: UserId,
    /// Fee escrowed for this player.
    pub fee_locked: Money,
    /// Roster size after the join.
    pub joined_count: u32,
    pub joined_at: DateTime<Utc>,
}

/// Owns match capacity, roster and fee escrow.
pub struct MatchEscrow<S> {
    pub(crate) store: Arc<S>,
    pub(crate) roles: Arc<dyn RoleLookup>,
}

impl<S: LedgerStore> MatchEscrow<S> {
    #[must_use]
    pub fn new(store: Arc<S>, roles: Arc<dyn RoleLookup>) -> Self {
        Self { store, roles }
    }

    /// Create an open match with an empty roster.
    ///
    /// # Errors
    /// - `Forbidden` if `admin` lacks the admin role
    /// - `Validation` for zero slots, negative fee/prize or missing start time
    pub fn create_match(&self, admin: UserId, params: NewMatch) -> Result<MatchId> {
        require_admin(self.roles.as_ref(), admin)?;

        let id = MatchId::new();
        let record = params.into_match(id, admin)?;
        let (fee, slots, start) = (record.fee, record.slots, record.start_time);

        self.store.run_transaction(|tx| {
            if tx.match_record(id)?.is_some() {
                return Err(LedgerError::Store(format!("match id collision: {id}")));
            }
            tx.put_match(record)
        })?;

        tracing::info!(match_id = %id, fee = %fee, slots, start = %start, "Match created");
        Ok(id)
    }

    /// Join an open match, escrowing its entry fee.
    ///
    /// Capacity is checked against the roster collection read inside the
    /// transaction, never against the cached `joined_count`.
    ///
    /// # Errors
    /// - `MatchNotFound`, `MatchClosed`, `MatchStarted`
    /// - `AlreadyJoined` if `user_id` is on the roster
    /// - `CapacityExceeded` if the roster is full
    /// - `InsufficientFunds` if the fee is not covered by available balance
    pub fn join_match(&self, match_id: MatchId, user_id: UserId) -> Result<JoinReceipt> {
        let receipt = self
            .store
            .run_transaction(|tx| join_in_tx(tx, match_id, user_id, Utc::now()))
            .inspect_err(|err| {
                tracing::debug!(match_id = %match_id, user = %user_id, error = %err, "Join rejected");
            })?;

        tracing::info!(
            match_id = %match_id,
            user = %user_id,
            fee_locked = %receipt.fee_locked,
            joined = receipt.joined_count,
            "Player joined, fee escrowed"
        );
        Ok(receipt)
    }

    /// Current match document.
    pub fn match_record(&self, match_id: MatchId) -> Result<Match> {
        self.store.run_transaction(|tx| require_match(tx, match_id))
    }

    /// Authoritative roster of a match.
    pub fn roster(&self, match_id: MatchId) -> Result<Vec<MatchPlayer>> {
        self.store.run_transaction(|tx| {
            require_match(tx, match_id)?;
            tx.roster(match_id)
        })
    }
}

fn join_in_tx(
    tx: &mut dyn LedgerTransaction,
    match_id: MatchId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<JoinReceipt> {
    let mut record = require_match(tx, match_id)?;
    if !record.is_open() {
        return Err(LedgerError::MatchClosed(match_id));
    }
    if record.has_started(now) {
        return Err(LedgerError::MatchStarted(match_id));
    }

    let roster = tx.roster(match_id)?;
    if roster.iter().any(|p| p.user_id == user_id) {
        return Err(LedgerError::AlreadyJoined {
            match_id,
            user: user_id,
        });
    }
    let seated = u32::try_from(roster.len()).unwrap_or(u32::MAX);
    if seated >= record.slots {
        return Err(LedgerError::CapacityExceeded {
            match_id,
            slots: record.slots,
        });
    }

    // Free matches escrow nothing.
    if !record.fee.is_zero() {
        wallet_manager::lock_funds(tx, user_id, record.fee)?;
    }

    tx.put_player(MatchPlayer {
        match_id,
        user_id,
        fee_locked: record.fee,
        joined_at: now,
        status: PlayerStatus::Joined,
    })?;

    record.joined_count = seated + 1;
    let joined_count = record.joined_count;
    let fee_locked = record.fee;
    tx.put_match(record)?;

    Ok(JoinReceipt {
        match_id,
        user_id,
        fee_locked,
        joined_count,
        joined_at: now,
    })
}
