//! Ledger Store contract.
//!
//! The store is an external transactional document database. The core
//! only relies on:
//! - single-shot multi-document transactions ([`LedgerStore::run_transaction`])
//!   that either commit every write or none,
//! - typed reads, last-write-wins writes and create-if-absent inserts
//!   inside a transaction ([`LedgerTransaction`]),
//! - a non-transactional indexed query over payment requests.
//!
//! Conflicting concurrent transactions are serialized by the store; the
//! loser fails with [`LedgerError::Conflict`]. The store never retries on
//! its own and neither does the core.

use matchpot_types::{
    AuditEntry, LedgerError, Match, MatchId, MatchPlayer, PaymentRequest, RequestId, RequestStatus,
    RequestType, Result, UserId, Wallet,
};

/// Operations available inside one transaction.
///
/// Reads observe the transaction's own buffered writes. Nothing is visible
/// to other transactions until the closure returns `Ok` and the commit
/// succeeds.
pub trait LedgerTransaction {
    /// Read a wallet document.
    fn wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>>;

    /// Write (replace) a wallet document.
    fn put_wallet(&mut self, wallet: Wallet) -> Result<()>;

    /// Read a payment request.
    fn request(&mut self, id: RequestId) -> Result<Option<PaymentRequest>>;

    /// Write (replace) a payment request.
    fn put_request(&mut self, request: PaymentRequest) -> Result<()>;

    /// Create the request only if no document exists under its ID.
    /// Returns `false` (and writes nothing) when one already exists.
    fn insert_request(&mut self, request: PaymentRequest) -> Result<bool>;

    /// Read a match document.
    fn match_record(&mut self, id: MatchId) -> Result<Option<Match>>;

    /// Write (replace) a match document.
    fn put_match(&mut self, record: Match) -> Result<()>;

    /// Authoritative roster of a match, read from the player collection.
    ///
    /// The read covers the whole collection: a concurrent join committed
    /// after this read makes this transaction conflict.
    fn roster(&mut self, match_id: MatchId) -> Result<Vec<MatchPlayer>>;

    /// Write (replace) a roster entry.
    fn put_player(&mut self, player: MatchPlayer) -> Result<()>;

    /// Append an audit entry.
    fn append_audit(&mut self, entry: AuditEntry) -> Result<()>;
}

/// A transactional document store holding the ledger.
pub trait LedgerStore: Send + Sync {
    /// Run `f` as one atomic transaction.
    ///
    /// If `f` returns `Err`, every buffered write is discarded and the error
    /// is returned unchanged. If the commit collides with a concurrent
    /// transaction, [`LedgerError::Conflict`] is returned and nothing is
    /// written.
    fn run_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTransaction) -> Result<T>;

    /// Indexed, non-transactional query over payment requests.
    fn query_requests(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>>;
}

/// Conjunctive filter over payment requests. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub user_id: Option<UserId>,
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
    pub payment_ref: Option<String>,
}

impl RequestFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn of_type(mut self, request_type: RequestType) -> Self {
        self.request_type = Some(request_type);
        self
    }

    #[must_use]
    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn payment_ref(mut self, payment_ref: impl Into<String>) -> Self {
        self.payment_ref = Some(payment_ref.into());
        self
    }

    /// Whether `request` satisfies every set field.
    #[must_use]
    pub fn matches(&self, request: &PaymentRequest) -> bool {
        use matchpot_types::RequestKind;

        if self.user_id.is_some_and(|u| u != request.user_id) {
            return false;
        }
        if self
            .request_type
            .is_some_and(|t| t != request.request_type())
        {
            return false;
        }
        if self.status.is_some_and(|s| s != request.status) {
            return false;
        }
        if let Some(wanted) = &self.payment_ref {
            match &request.kind {
                RequestKind::Deposit { payment_ref } if payment_ref == wanted => {}
                _ => return false,
            }
        }
        true
    }
}

/// Read a request or fail with `RequestNotFound`.
pub(crate) fn require_request(
    tx: &mut dyn LedgerTransaction,
    id: RequestId,
) -> Result<PaymentRequest> {
    tx.request(id)?.ok_or(LedgerError::RequestNotFound(id))
}

/// Read a match or fail with `MatchNotFound`.
pub fn require_match(tx: &mut dyn LedgerTransaction, id: MatchId) -> Result<Match> {
    tx.match_record(id)?.ok_or(LedgerError::MatchNotFound(id))
}
