//! Transaction records
//!
//! A transaction is created PENDING and moves exactly once to a final
//! state. Once COMPLETED or REJECTED it never changes again.

use chrono::{DateTime, Utc};
use corebank_core::{AccountId, Actor, Amount, Currency, TransactionId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LedgerError;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Fee,
}

impl TransactionType {
    /// True if the source account loses `amount`
    pub fn debits_source(&self) -> bool {
        !matches!(self, TransactionType::Deposit)
    }
}

/// Whether the money actually moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    Completed,
    Rejected,
}

/// Outcome of the approval process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    AutoApproved,
    Approved,
    Rejected,
}

/// A deposit, withdrawal, transfer or fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Unique business number, doubles as the idempotency key
    pub number: String,
    pub kind: TransactionType,
    pub amount: Amount,
    pub currency: Currency,
    pub source: AccountId,
    pub destination: Option<AccountId>,
    pub execution_status: ExecutionStatus,
    pub approval_status: ApprovalStatus,
    pub requested_by: Actor,
    pub description: Option<String>,

    /// Name of the approval handler that classified this transaction
    pub decided_by_handler: Option<String>,
    /// Role that must resolve it when manual approval is needed
    pub required_role: Option<String>,

    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    /// Approval comment or rejection reason
    pub comment: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generate a human-readable transaction number
pub fn generate_number() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "TXN-{}-{}",
        Utc::now().format("%Y%m%d"),
        uuid[..10].to_uppercase()
    )
}

impl Transaction {
    /// Create a new PENDING transaction.
    ///
    /// Transfers need a destination different from the source; every other
    /// kind must not have one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        number: String,
        kind: TransactionType,
        amount: Amount,
        currency: Currency,
        source: AccountId,
        destination: Option<AccountId>,
        requested_by: Actor,
        description: Option<String>,
    ) -> Result<Self, LedgerError> {
        match (kind, destination) {
            (TransactionType::Transfer, None) => return Err(LedgerError::MissingDestination),
            (TransactionType::Transfer, Some(dest)) if dest == source => {
                return Err(LedgerError::SameAccountTransfer(source));
            }
            (TransactionType::Deposit, Some(_)) => {
                return Err(LedgerError::UnexpectedDestination("Deposit"));
            }
            (TransactionType::Withdrawal, Some(_)) => {
                return Err(LedgerError::UnexpectedDestination("Withdrawal"));
            }
            (TransactionType::Fee, Some(_)) => return Err(LedgerError::UnexpectedDestination("Fee")),
            _ => {}
        }

        let now = Utc::now();
        Ok(Self {
            id: TransactionId::new(),
            number,
            kind,
            amount,
            currency,
            source,
            destination,
            execution_status: ExecutionStatus::Pending,
            approval_status: ApprovalStatus::Pending,
            requested_by,
            description,
            decided_by_handler: None,
            required_role: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            comment: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Accounts touched by this transaction, source first
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts = vec![self.source];
        accounts.extend(self.destination);
        accounts
    }

    pub fn is_final(&self) -> bool {
        self.execution_status != ExecutionStatus::Pending
    }

    pub fn is_awaiting_approval(&self) -> bool {
        self.approval_status == ApprovalStatus::Pending && !self.is_final()
    }

    fn ensure_awaiting(&self) -> Result<(), LedgerError> {
        if self.is_awaiting_approval() {
            Ok(())
        } else {
            Err(LedgerError::NotPending {
                id: self.id,
                status: self.approval_status.to_string(),
            })
        }
    }

    /// Record which handler classified this transaction and who must approve it
    pub fn record_handler(&mut self, handler: impl Into<String>, required_role: Option<String>) {
        self.decided_by_handler = Some(handler.into());
        self.required_role = required_role;
        self.updated_at = Utc::now();
    }

    /// Approved by the chain without human review; money has moved
    pub fn complete_auto_approved(&mut self, at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.ensure_awaiting()?;
        self.approval_status = ApprovalStatus::AutoApproved;
        self.execution_status = ExecutionStatus::Completed;
        self.approved_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Approved by a person; money has moved
    pub fn complete_approved(
        &mut self,
        approver: &Actor,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.ensure_awaiting()?;
        self.approval_status = ApprovalStatus::Approved;
        self.execution_status = ExecutionStatus::Completed;
        self.approved_by = Some(approver.id.clone());
        self.approved_at = Some(at);
        self.comment = comment;
        self.updated_at = at;
        Ok(())
    }

    /// Rejected, either by a person or by the chain (`rejecter` is `None`)
    pub fn reject(
        &mut self,
        rejecter: Option<&Actor>,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.ensure_awaiting()?;
        self.approval_status = ApprovalStatus::Rejected;
        self.execution_status = ExecutionStatus::Rejected;
        self.rejected_by = rejecter.map(|actor| actor.id.clone());
        self.rejected_at = Some(at);
        self.comment = reason;
        self.updated_at = at;
        Ok(())
    }
}
