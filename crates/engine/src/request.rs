//! Transaction requests and receipts

use chrono::{DateTime, Utc};
use corebank_core::{AccountId, Actor, Currency, TransactionId};
use corebank_ledger::{ApprovalStatus, ExecutionStatus, Transaction, TransactionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to move money.
///
/// The amount is unchecked here; the engine refuses anything not strictly
/// positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub kind: TransactionType,
    pub source: AccountId,
    pub destination: Option<AccountId>,
    pub amount: Decimal,
    /// Expected currency; defaults to the source account's
    pub currency: Option<Currency>,
    pub requested_by: Actor,
    /// Caller-chosen idempotency reference, used as the transaction number
    pub reference: Option<String>,
    pub description: Option<String>,
}

impl TransactionRequest {
    fn new(
        kind: TransactionType,
        source: AccountId,
        destination: Option<AccountId>,
        amount: Decimal,
    ) -> Self {
        Self {
            kind,
            source,
            destination,
            amount,
            currency: None,
            requested_by: Actor::system(),
            reference: None,
            description: None,
        }
    }

    pub fn deposit(account: AccountId, amount: Decimal) -> Self {
        Self::new(TransactionType::Deposit, account, None, amount)
    }

    pub fn withdrawal(account: AccountId, amount: Decimal) -> Self {
        Self::new(TransactionType::Withdrawal, account, None, amount)
    }

    pub fn transfer(from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self::new(TransactionType::Transfer, from, Some(to), amount)
    }

    pub fn fee(account: AccountId, amount: Decimal) -> Self {
        Self::new(TransactionType::Fee, account, None, amount)
    }

    pub fn by(mut self, actor: Actor) -> Self {
        self.requested_by = actor;
        self
    }

    pub fn in_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What the caller gets back from a submitted or decided transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_id: TransactionId,
    pub number: String,
    pub kind: TransactionType,
    pub execution_status: ExecutionStatus,
    pub approval_status: ApprovalStatus,
    /// Source balance after the transaction (unchanged while pending)
    pub source_balance: Decimal,
    /// Destination balance after a transfer
    pub destination_balance: Option<Decimal>,
    /// Role that must decide a pending transaction
    pub required_role: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionReceipt {
    pub(crate) fn new(
        tx: &Transaction,
        source_balance: Decimal,
        destination_balance: Option<Decimal>,
    ) -> Self {
        Self {
            transaction_id: tx.id,
            number: tx.number.clone(),
            kind: tx.kind,
            execution_status: tx.execution_status,
            approval_status: tx.approval_status,
            source_balance,
            destination_balance,
            required_role: tx.required_role.clone(),
            timestamp: tx.updated_at,
        }
    }

    /// Money has moved
    pub fn is_completed(&self) -> bool {
        self.execution_status == ExecutionStatus::Completed
    }

    /// Waiting on manual approval
    pub fn is_pending(&self) -> bool {
        self.approval_status == ApprovalStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_builders() {
        let from = AccountId::new();
        let to = AccountId::new();
        let request = TransactionRequest::transfer(from, to, dec!(10))
            .by(Actor::new("teller-1", "teller"))
            .with_reference("REF-1")
            .with_description("rent");

        assert_eq!(request.kind, TransactionType::Transfer);
        assert_eq!(request.destination, Some(to));
        assert_eq!(request.requested_by.id, "teller-1");
        assert_eq!(request.reference.as_deref(), Some("REF-1"));

        let deposit = TransactionRequest::deposit(from, dec!(5));
        assert!(deposit.destination.is_none());
        assert_eq!(deposit.requested_by, Actor::system());
    }
}
