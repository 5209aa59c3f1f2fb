//! Wallet Manager: two-pool balance transitions.
//!
//! Every function runs inside a caller-owned transaction and stamps
//! `last_updated` on each write. Moves between pools:
//!
//! ```text
//!   credit_available    external  ──▶ available
//!   lock_funds          available ──▶ locked
//!   release_to_available  locked  ──▶ available
//!   finalize_locked       locked  ──▶ external (paid out / burned)
//! ```
//!
//! Locked-pool removals never drive `locked` below zero. An over-sized
//! request is clamped to what is locked and recorded as an [`AuditEntry`]
//! in the same transaction.

use chrono::Utc;
use matchpot_types::{
    AuditEntry, AuditOperation, LedgerError, Money, Result, UserId, Wallet, validate_amount,
};
use rust_decimal::Decimal;

use crate::store::{LedgerStore, LedgerTransaction};

/// Read the wallet, creating a zero wallet if absent. Never overwrites an
/// existing wallet; calling it twice is the same as calling it once.
pub fn ensure_wallet(tx: &mut dyn LedgerTransaction, user_id: UserId) -> Result<Wallet> {
    if let Some(wallet) = tx.wallet(user_id)? {
        return Ok(wallet);
    }
    let wallet = Wallet::empty(user_id);
    tx.put_wallet(wallet.clone())?;
    tracing::debug!(user = %user_id, "Wallet created");
    Ok(wallet)
}

/// `available += amount`. Used for approved deposits and prize payouts.
///
/// # Errors
/// Returns `Validation` if `amount` is not positive or the balance would
/// overflow.
pub fn credit_available(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    amount: Money,
) -> Result<Wallet> {
    validate_amount(amount, "credit amount")?;
    let mut wallet = ensure_wallet(tx, user_id)?;
    wallet.available = add_to_pool(wallet.available, amount, "available")?;
    store_wallet(tx, wallet)
}

/// Escrow funds (available → locked). Used for withdrawal requests and
/// match entry fees.
///
/// # Errors
/// Returns `InsufficientFunds` if `amount > available`.
pub fn lock_funds(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    amount: Money,
) -> Result<Wallet> {
    validate_amount(amount, "lock amount")?;
    let mut wallet = ensure_wallet(tx, user_id)?;

    if wallet.available < amount {
        return Err(LedgerError::InsufficientFunds {
            needed: amount,
            available: wallet.available,
        });
    }

    wallet.locked = add_to_pool(wallet.locked, amount, "locked")?;
    wallet.available -= amount;
    store_wallet(tx, wallet)
}

/// Refund escrowed funds (locked → available). Used for withdrawal denial.
///
/// # Errors
/// Returns `WalletNotFound` if the user has no wallet.
pub fn release_to_available(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    amount: Money,
) -> Result<Wallet> {
    validate_amount(amount, "release amount")?;
    let mut wallet = tx
        .wallet(user_id)?
        .ok_or(LedgerError::WalletNotFound(user_id))?;

    let applied = take_locked(tx, &mut wallet, amount, AuditOperation::ReleaseToAvailable)?;
    wallet.available = add_to_pool(wallet.available, applied, "available")?;
    store_wallet(tx, wallet)
}

/// Remove escrowed funds from the system (locked → external). Used for
/// withdrawal approval and entry-fee burn at settlement.
///
/// # Errors
/// Returns `WalletNotFound` if the user has no wallet.
pub fn finalize_locked(
    tx: &mut dyn LedgerTransaction,
    user_id: UserId,
    amount: Money,
) -> Result<Wallet> {
    validate_amount(amount, "finalize amount")?;
    let mut wallet = tx
        .wallet(user_id)?
        .ok_or(LedgerError::WalletNotFound(user_id))?;

    take_locked(tx, &mut wallet, amount, AuditOperation::FinalizeLocked)?;
    store_wallet(tx, wallet)
}

/// Committed wallet of `user_id`.
///
/// # Errors
/// Returns `WalletNotFound` if the wallet was never created.
pub fn wallet<S: LedgerStore>(store: &S, user_id: UserId) -> Result<Wallet> {
    store.run_transaction(|tx| tx.wallet(user_id)?.ok_or(LedgerError::WalletNotFound(user_id)))
}

/// Subtract up to `amount` from `locked`, returning what was actually taken.
fn take_locked(
    tx: &mut dyn LedgerTransaction,
    wallet: &mut Wallet,
    amount: Money,
    operation: AuditOperation,
) -> Result<Money> {
    if amount <= wallet.locked {
        wallet.locked -= amount;
        return Ok(amount);
    }

    let entry = AuditEntry::clamp(wallet.user_id, operation, amount, wallet.locked);
    tracing::warn!(
        user = %wallet.user_id,
        operation = %operation,
        requested = %amount,
        locked = %wallet.locked,
        shortfall = %entry.shortfall(),
        "Locked pool shortfall, clamping at zero"
    );
    let applied = entry.applied;
    tx.append_audit(entry)?;
    wallet.locked = Decimal::ZERO;
    Ok(applied)
}

/// `pool + amount`, failing instead of overflowing the decimal range.
fn add_to_pool(pool: Money, amount: Money, name: &str) -> Result<Money> {
    pool.checked_add(amount).ok_or_else(|| {
        LedgerError::validation(format!("{name} balance would overflow adding {amount}"))
    })
}

fn store_wallet(tx: &mut dyn LedgerTransaction, mut wallet: Wallet) -> Result<Wallet> {
    wallet.last_updated = Utc::now();
    debug_assert!(wallet.is_consistent(), "wallet pools went negative");
    tx.put_wallet(wallet.clone())?;
    Ok(wallet)
}
