//! Manual approval registry
//!
//! Holds the queue of PENDING transactions and serializes every decision on
//! one transaction behind a per-transaction lock, so two concurrent approvals
//! (or an approve racing a reject) resolve exactly one way.
//!
//! ```text
//! open(id) ──► lock(id) ──► load ──► PENDING? ──no──► STATE_CONFLICT
//!                                       │yes
//!                                       ▼
//!                               ReviewSession (guard held)
//!                                       │ approve / reject
//!                                       ▼
//!                               caller persists ──► settle() ──► unlock
//! ```
//!
//! Dropping a session without settling it leaves the stored transaction and
//! the queue untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use corebank_core::{AccountId, Actor, Amount, Currency, KeyGuard, KeyedLocks, TransactionId};
use corebank_ledger::{ApprovalStatus, LedgerStore, Transaction, TransactionType};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::context::{ApprovalResult, NO_HANDLER};
use crate::error::ApprovalError;

/// Queue entry for a transaction waiting on a person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReview {
    pub id: TransactionId,
    pub number: String,
    pub kind: TransactionType,
    pub amount: Amount,
    pub currency: Currency,
    pub source: AccountId,
    pub destination: Option<AccountId>,
    pub handler: String,
    pub required_role: Option<String>,
    pub requested_by: Actor,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Transaction> for PendingReview {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            number: tx.number.clone(),
            kind: tx.kind,
            amount: tx.amount,
            currency: tx.currency.clone(),
            source: tx.source,
            destination: tx.destination,
            handler: tx
                .decided_by_handler
                .clone()
                .unwrap_or_else(|| NO_HANDLER.to_string()),
            required_role: tx.required_role.clone(),
            requested_by: tx.requested_by.clone(),
            submitted_at: tx.created_at,
        }
    }
}

/// Transaction counts by approval status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStats {
    pub pending: usize,
    pub auto_approved: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl ApprovalStats {
    pub fn total(&self) -> usize {
        self.pending + self.auto_approved + self.approved + self.rejected
    }
}

/// Exclusive access to one PENDING transaction.
///
/// The per-transaction lock is held until the session is settled or dropped.
pub struct ReviewSession {
    transaction: Transaction,
    _guard: KeyGuard<TransactionId>,
}

impl ReviewSession {
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Mark APPROVED/COMPLETED in memory. The caller moves the money and
    /// persists before settling.
    pub fn approve(
        &mut self,
        approver: &Actor,
        comment: Option<String>,
    ) -> Result<ApprovalResult, ApprovalError> {
        let status = self.transaction.approval_status;
        self.transaction
            .complete_approved(approver, comment, Utc::now())
            .map_err(|err| ApprovalError::from_transition(self.transaction.id, status, err))?;
        Ok(ApprovalResult::from_transaction(&self.transaction))
    }

    /// Mark REJECTED/REJECTED in memory
    pub fn reject(
        &mut self,
        rejecter: &Actor,
        reason: Option<String>,
    ) -> Result<ApprovalResult, ApprovalError> {
        let status = self.transaction.approval_status;
        self.transaction
            .reject(Some(rejecter), reason, Utc::now())
            .map_err(|err| ApprovalError::from_transition(self.transaction.id, status, err))?;
        Ok(ApprovalResult::from_transaction(&self.transaction))
    }
}

impl std::fmt::Debug for ReviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewSession")
            .field("transaction", &self.transaction.id)
            .field("approval_status", &self.transaction.approval_status)
            .finish()
    }
}

/// Registry of transactions awaiting manual approval
pub struct ManualApprovalRegistry {
    store: Arc<dyn LedgerStore>,
    locks: KeyedLocks<TransactionId>,
    queue: DashMap<TransactionId, PendingReview>,
}

impl ManualApprovalRegistry {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            queue: DashMap::new(),
        }
    }

    /// Rebuild the queue from PENDING transactions in the store
    pub fn restore(&self) -> Result<usize, ApprovalError> {
        let pending = self
            .store
            .transactions_by_approval_status(ApprovalStatus::Pending)?;

        let mut restored = 0;
        for tx in pending.iter().filter(|tx| tx.is_awaiting_approval()) {
            self.queue.insert(tx.id, PendingReview::from(tx));
            restored += 1;
        }

        tracing::info!(restored, "Restored manual approval queue");
        Ok(restored)
    }

    /// Queue a transaction the chain classified as PENDING
    pub fn enqueue(&self, tx: &Transaction) {
        tracing::info!(
            transaction = %tx.number,
            role = tx.required_role.as_deref().unwrap_or(NO_HANDLER),
            amount = %tx.amount,
            "Transaction queued for manual approval"
        );
        self.queue.insert(tx.id, PendingReview::from(tx));
    }

    /// Lock a transaction and check it can still be decided.
    ///
    /// NOT_FOUND if the store has no such transaction, STATE_CONFLICT if it
    /// is no longer PENDING.
    pub async fn open(&self, id: TransactionId) -> Result<ReviewSession, ApprovalError> {
        let guard = self.locks.lock(id).await;

        // Read under the lock: a decision made by another task is visible here
        let transaction = self.store.find_transaction(id)?;
        if !transaction.is_awaiting_approval() {
            self.queue.remove(&id);
            return Err(ApprovalError::StateConflict {
                id,
                status: transaction.approval_status,
            });
        }

        Ok(ReviewSession {
            transaction,
            _guard: guard,
        })
    }

    /// Finish a session whose outcome has been persisted
    pub fn settle(&self, session: ReviewSession) -> Transaction {
        let ReviewSession {
            transaction,
            _guard,
        } = session;

        self.queue.remove(&transaction.id);
        tracing::info!(
            transaction = %transaction.number,
            status = %transaction.approval_status,
            "Manual approval settled"
        );
        transaction
    }

    /// Reject a PENDING transaction and persist the outcome. No money moves.
    pub async fn reject(
        &self,
        id: TransactionId,
        rejecter: &Actor,
        reason: Option<String>,
    ) -> Result<Transaction, ApprovalError> {
        let mut session = self.open(id).await?;
        session.reject(rejecter, reason)?;
        self.store.save_transaction(session.transaction())?;
        Ok(self.settle(session))
    }

    /// Current approval outcome of any transaction
    pub fn status(&self, id: TransactionId) -> Result<ApprovalResult, ApprovalError> {
        let tx = self.store.find_transaction(id)?;
        Ok(ApprovalResult::from_transaction(&tx))
    }

    /// Transactions currently locked or waited on
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn is_queued(&self, id: TransactionId) -> bool {
        self.queue.contains_key(&id)
    }

    /// Queued transactions, oldest first
    pub fn pending(&self) -> Vec<PendingReview> {
        let mut pending: Vec<PendingReview> =
            self.queue.iter().map(|entry| entry.value().clone()).collect();
        pending.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.number.cmp(&b.number))
        });
        pending
    }

    /// Queued transactions a given role can decide
    pub fn pending_for_role(&self, role: &str) -> Vec<PendingReview> {
        self.pending()
            .into_iter()
            .filter(|review| review.required_role.as_deref() == Some(role))
            .collect()
    }

    pub fn stats(&self) -> Result<ApprovalStats, ApprovalError> {
        let count = |status| {
            self.store
                .transactions_by_approval_status(status)
                .map(|found| found.len())
        };
        Ok(ApprovalStats {
            pending: count(ApprovalStatus::Pending)?,
            auto_approved: count(ApprovalStatus::AutoApproved)?,
            approved: count(ApprovalStatus::Approved)?,
            rejected: count(ApprovalStatus::Rejected)?,
        })
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl std::fmt::Debug for ManualApprovalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualApprovalRegistry")
            .field("queued", &self.queue.len())
            .finish()
    }
}
