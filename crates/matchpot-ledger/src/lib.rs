//! # matchpot-ledger
//!
//! Balance and payment-request half of the **Matchpot** ledger core.
//!
//! ## Architecture
//!
//! 1. **LedgerStore**: transactional document store contract (external);
//!    [`InMemoryStore`] is the reference implementation
//! 2. **Wallet Manager** ([`wallet_manager`]): two-pool transitions inside a transaction
//! 3. **PaymentLedger**: deposit / withdrawal / prize request lifecycle
//! 4. **Access**: identity verification and admin role lookup collaborators
//!
//! ## Request Flow
//!
//! ```text
//! caller identity → PaymentLedger.submit_*() ─┐
//!                                             ├─ LedgerStore.run_transaction()
//! admin identity  → PaymentLedger.resolve_*() ┘      └─ wallet_manager::*
//! ```
//!
//! Every operation is one atomic transaction. Failures abort all writes of
//! that transaction; nothing is retried in-core.

pub mod access;
pub mod memory_store;
pub mod payment_ledger;
pub mod store;
pub mod wallet_manager;

pub use access::{IdentityVerifier, RoleLookup, StaticRoles, StaticTokenVerifier, require_admin};
pub use memory_store::InMemoryStore;
pub use payment_ledger::PaymentLedger;
pub use store::{LedgerStore, LedgerTransaction, RequestFilter, require_match};
