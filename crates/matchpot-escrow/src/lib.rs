//! # matchpot-escrow
//!
//! **Match Escrow Coordinator**: match capacity, per-player fee escrow,
//! settlement and prize cashout.
//!
//! ## Lifecycle
//!
//! 1. Admin creates an `OPEN` match ([`MatchEscrow::create_match`])
//! 2. Players join; each join locks the entry fee and adds a roster entry
//! 3. Admin settles: every `fee_locked` is burned, the match becomes `CLAIMED`
//! 4. Winner requests cashout: a pending prize request is filed
//! 5. Admin resolves the prize through `matchpot_ledger::PaymentLedger`
//!
//! Every step is one transaction against the ledger store. Wallet
//! mutations go through `matchpot_ledger::wallet_manager` inside that
//! transaction.

pub mod coordinator;
pub mod settlement;

pub use coordinator::{JoinReceipt, MatchEscrow};
pub use settlement::{FeeBurn, Settlement};
