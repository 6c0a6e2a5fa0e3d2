//! Values passed into and out of the approval chain

use chrono::{DateTime, Utc};
use corebank_core::{Actor, Amount};
use corebank_ledger::{Account, ApprovalStatus, Transaction, TransactionType};
use serde::{Deserialize, Serialize};

/// Handler name recorded when no tier claimed the amount
pub const NO_HANDLER: &str = "none";

/// Everything a handler may look at to classify one transaction.
///
/// Borrowed for the duration of a single `classify` call; never stored.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalContext<'a> {
    pub transaction: &'a Transaction,
    pub requester: &'a Actor,
    pub source: &'a Account,
    pub destination: Option<&'a Account>,
}

impl<'a> ApprovalContext<'a> {
    pub fn new(
        transaction: &'a Transaction,
        source: &'a Account,
        destination: Option<&'a Account>,
    ) -> Self {
        Self {
            transaction,
            requester: &transaction.requested_by,
            source,
            destination,
        }
    }

    pub fn amount(&self) -> Amount {
        self.transaction.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.transaction.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.transaction.description.as_deref()
    }
}

/// Outcome of a classification or a manual resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResult {
    /// AUTO_APPROVED, PENDING or REJECTED from the chain;
    /// APPROVED or REJECTED from a manual resolution
    pub status: ApprovalStatus,

    /// Name of the handler that produced the decision
    pub handler: String,

    /// Role required to resolve a PENDING result
    pub required_role: Option<String>,

    /// Identity of the person who approved or rejected
    pub decided_by: Option<String>,

    pub comment: Option<String>,

    pub decided_at: DateTime<Utc>,
}

impl ApprovalResult {
    pub fn auto_approved(handler: impl Into<String>) -> Self {
        Self {
            status: ApprovalStatus::AutoApproved,
            handler: handler.into(),
            required_role: None,
            decided_by: None,
            comment: None,
            decided_at: Utc::now(),
        }
    }

    pub fn pending(handler: impl Into<String>, role: impl Into<String>) -> Self {
        let role = role.into();
        Self {
            status: ApprovalStatus::Pending,
            handler: handler.into(),
            comment: Some(format!("requires {role} approval")),
            required_role: Some(role),
            decided_by: None,
            decided_at: Utc::now(),
        }
    }

    /// The chain ran out of handlers
    pub fn exhausted(amount: Amount) -> Self {
        Self {
            status: ApprovalStatus::Rejected,
            handler: NO_HANDLER.to_string(),
            required_role: None,
            decided_by: None,
            comment: Some(format!("no suitable handler for amount {amount}")),
            decided_at: Utc::now(),
        }
    }

    pub fn is_auto_approved(&self) -> bool {
        self.status == ApprovalStatus::AutoApproved
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    pub fn is_rejected(&self) -> bool {
        self.status == ApprovalStatus::Rejected
    }

    /// Rebuild the result recorded on a transaction
    pub fn from_transaction(tx: &Transaction) -> Self {
        let (decided_by, decided_at) = match tx.approval_status {
            ApprovalStatus::Rejected => (tx.rejected_by.clone(), tx.rejected_at),
            _ => (tx.approved_by.clone(), tx.approved_at),
        };
        Self {
            status: tx.approval_status,
            handler: tx
                .decided_by_handler
                .clone()
                .unwrap_or_else(|| NO_HANDLER.to_string()),
            required_role: tx.required_role.clone(),
            decided_by,
            comment: tx.comment.clone(),
            decided_at: decided_at.unwrap_or(tx.updated_at),
        }
    }
}
