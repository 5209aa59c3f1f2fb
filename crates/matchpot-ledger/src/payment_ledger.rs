//! Payment Request Ledger: deposit, withdrawal and prize lifecycle.
//!
//! Submissions create `PENDING` requests; an admin resolves each request
//! exactly once. Resolution effects depend on the request type:
//!
//! | type     | approve                      | deny                       |
//! |----------|------------------------------|----------------------------|
//! | deposit  | credit available             | nothing (never escrowed)   |
//! | withdraw | finalize locked (paid out)   | release locked → available |
//! | prize    | credit available, match PAID | nothing                    |
//!
//! Withdrawal funds are escrowed at submission time, not at approval.

use std::sync::Arc;

use matchpot_types::{
    Decision, LedgerConfig, LedgerError, Money, PayoutStatus, PaymentRequest, RequestId,
    RequestKind, RequestType, Result, UserId, constants, validate_amount,
};

use crate::access::{RoleLookup, require_admin};
use crate::store::{
    LedgerStore, LedgerTransaction, RequestFilter, require_match, require_request,
};
use crate::wallet_manager;

/// Owns the payment request lifecycle.
pub struct PaymentLedger<S> {
    store: Arc<S>,
    roles: Arc<dyn RoleLookup>,
    config: LedgerConfig,
}

impl<S: LedgerStore> PaymentLedger<S> {
    #[must_use]
    pub fn new(store: Arc<S>, roles: Arc<dyn RoleLookup>, config: LedgerConfig) -> Self {
        Self {
            store,
            roles,
            config,
        }
    }

    /// Submit a deposit claim for admin review.
    ///
    /// Duplicate `(user, payment_ref)` pairs are rejected twice over: a
    /// best-effort indexed lookup before the transaction, and a
    /// create-if-absent insert under a key derived from the pair.
    ///
    /// # Errors
    /// - `Validation` if `amount < minimum_deposit` or the reference is malformed
    /// - `DuplicateReference` if the reference was already submitted
    pub fn submit_deposit(
        &self,
        user_id: UserId,
        amount: Money,
        payment_ref: &str,
    ) -> Result<RequestId> {
        validate_amount(amount, "deposit amount")?;
        if amount < self.config.minimum_deposit {
            return Err(LedgerError::validation(format!(
                "deposit amount {amount} is below minimum {}",
                self.config.minimum_deposit
            )));
        }
        let payment_ref =
            validate_text(payment_ref, "payment reference", constants::MAX_PAYMENT_REF_LEN)?;

        let existing = self.store.query_requests(
            &RequestFilter::new()
                .user(user_id)
                .of_type(RequestType::Deposit)
                .payment_ref(payment_ref.clone()),
        )?;
        if !existing.is_empty() {
            tracing::warn!(user = %user_id, payment_ref = %payment_ref, "Duplicate deposit reference");
            return Err(LedgerError::DuplicateReference { payment_ref });
        }

        let id = RequestId::for_deposit(user_id, &payment_ref);
        let request = PaymentRequest::pending(
            id,
            user_id,
            amount,
            RequestKind::Deposit {
                payment_ref: payment_ref.clone(),
            },
        );

        self.store.run_transaction(|tx| {
            if tx.insert_request(request)? {
                Ok(())
            } else {
                Err(LedgerError::DuplicateReference {
                    payment_ref: payment_ref.clone(),
                })
            }
        })?;

        tracing::info!(request = %id, user = %user_id, amount = %amount, "Deposit submitted");
        Ok(id)
    }

    /// Lock `amount` and submit a withdrawal for admin review.
    ///
    /// # Errors
    /// - `Validation` if `amount < minimum_withdrawal` or the destination is malformed
    /// - `InsufficientFunds` if `amount > available`
    pub fn submit_withdrawal(
        &self,
        user_id: UserId,
        amount: Money,
        destination: &str,
    ) -> Result<RequestId> {
        validate_amount(amount, "withdrawal amount")?;
        if amount < self.config.minimum_withdrawal {
            return Err(LedgerError::validation(format!(
                "withdrawal amount {amount} is below minimum {}",
                self.config.minimum_withdrawal
            )));
        }
        let destination =
            validate_text(destination, "destination", constants::MAX_DESTINATION_LEN)?;

        let id = RequestId::new();
        let wallet = self.store.run_transaction(|tx| {
            let wallet = wallet_manager::lock_funds(tx, user_id, amount)?;
            let request = PaymentRequest::pending(
                id,
                user_id,
                amount,
                RequestKind::Withdraw { destination },
            );
            if !tx.insert_request(request)? {
                return Err(LedgerError::Store(format!("request id collision: {id}")));
            }
            Ok(wallet)
        })?;

        tracing::info!(
            request = %id,
            user = %user_id,
            amount = %amount,
            available = %wallet.available,
            locked = %wallet.locked,
            "Withdrawal submitted, funds locked"
        );
        Ok(id)
    }

    /// Resolve a pending deposit. Approval credits the user's wallet.
    pub fn resolve_deposit(
        &self,
        request_id: RequestId,
        admin: UserId,
        decision: Decision,
    ) -> Result<PaymentRequest> {
        self.resolve_as(request_id, admin, decision, Some(RequestType::Deposit))
    }

    /// Resolve a pending withdrawal. Approval burns the locked funds (paid
    /// out externally); denial refunds them to available.
    pub fn resolve_withdrawal(
        &self,
        request_id: RequestId,
        admin: UserId,
        decision: Decision,
    ) -> Result<PaymentRequest> {
        self.resolve_as(request_id, admin, decision, Some(RequestType::Withdraw))
    }

    /// Resolve a pending prize request. The match must be claimed; approval
    /// credits the winner and marks the match payout as paid.
    pub fn resolve_prize(
        &self,
        request_id: RequestId,
        admin: UserId,
        decision: Decision,
    ) -> Result<PaymentRequest> {
        self.resolve_as(request_id, admin, decision, Some(RequestType::Prize))
    }

    /// Resolve any pending request, dispatching on its type.
    pub fn resolve(
        &self,
        request_id: RequestId,
        admin: UserId,
        decision: Decision,
    ) -> Result<PaymentRequest> {
        self.resolve_as(request_id, admin, decision, None)
    }

    fn resolve_as(
        &self,
        request_id: RequestId,
        admin: UserId,
        decision: Decision,
        expected: Option<RequestType>,
    ) -> Result<PaymentRequest> {
        require_admin(self.roles.as_ref(), admin)?;

        let resolved = self
            .store
            .run_transaction(|tx| resolve_in_tx(tx, request_id, admin, decision, expected))
            .inspect_err(|err| {
                if matches!(err, LedgerError::AlreadyProcessed(_)) {
                    tracing::warn!(request = %request_id, admin = %admin, "Request already processed");
                }
            })?;

        tracing::info!(
            request = %request_id,
            kind = %resolved.request_type(),
            user = %resolved.user_id,
            amount = %resolved.amount,
            status = %resolved.status,
            admin = %admin,
            "Payment request resolved"
        );
        Ok(resolved)
    }

    /// Look up one request.
    pub fn request(&self, request_id: RequestId) -> Result<PaymentRequest> {
        self.store
            .run_transaction(|tx| require_request(tx, request_id))
    }

    /// Requests matching `filter`, for admin consoles and user history.
    pub fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>> {
        self.store.query_requests(filter)
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

/// Check preconditions, apply the type-specific effect, then mark the
/// request terminal. All inside the caller's transaction.
fn resolve_in_tx(
    tx: &mut dyn LedgerTransaction,
    request_id: RequestId,
    admin: UserId,
    decision: Decision,
    expected: Option<RequestType>,
) -> Result<PaymentRequest> {
    let mut request = require_request(tx, request_id)?;

    if let Some(expected) = expected {
        let actual = request.request_type();
        if actual != expected {
            return Err(LedgerError::RequestTypeMismatch { expected, actual });
        }
    }
    if !request.is_pending() {
        return Err(LedgerError::AlreadyProcessed(request_id));
    }

    match (&request.kind, decision) {
        (RequestKind::Deposit { .. }, Decision::Approve) => {
            wallet_manager::credit_available(tx, request.user_id, request.amount)?;
        }
        (RequestKind::Deposit { .. }, Decision::Deny) => {}
        (RequestKind::Withdraw { .. }, Decision::Approve) => {
            wallet_manager::finalize_locked(tx, request.user_id, request.amount)?;
        }
        (RequestKind::Withdraw { .. }, Decision::Deny) => {
            wallet_manager::release_to_available(tx, request.user_id, request.amount)?;
        }
        (RequestKind::Prize { match_id }, decision) => {
            let mut record = require_match(tx, *match_id)?;
            if !record.is_claimed() {
                return Err(LedgerError::MatchNotEligible(record.id));
            }
            if decision == Decision::Approve {
                if record.payout_status == PayoutStatus::Paid {
                    return Err(LedgerError::AlreadyPaid(record.id));
                }
                wallet_manager::credit_available(tx, request.user_id, request.amount)?;
                record.payout_status = PayoutStatus::Paid;
                tx.put_match(record)?;
            }
        }
    }

    request.resolve(decision, admin)?;
    tx.put_request(request.clone())?;
    Ok(request)
}

/// Trim and bound a free-text field.
fn validate_text(value: &str, field: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LedgerError::validation(format!("{field} is required")));
    }
    if value.len() > max_len {
        return Err(LedgerError::validation(format!(
            "{field} exceeds {max_len} characters"
        )));
    }
    Ok(value.to_string())
}
