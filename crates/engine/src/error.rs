//! Transaction engine errors

use corebank_approval::ApprovalError;
use corebank_core::{AccountId, AmountError, TransactionId};
use corebank_ledger::{ApprovalStatus, LedgerError, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Failure category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InsufficientBalance,
    StateConflict,
    ChainExhausted,
    Validation,
    Store,
}

/// Errors from transaction engine operations.
///
/// Every variant except `Rejected` and `Store` is raised before any state
/// changes.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Account {account} is {state}, expected {expected}")]
    InvalidState {
        account: AccountId,
        state: String,
        expected: &'static str,
    },

    #[error("Insufficient balance on {account}: available {available}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Decimal,
        required: Decimal,
    },

    #[error("Transaction {id} is already {status}")]
    StateConflict {
        id: TransactionId,
        status: ApprovalStatus,
    },

    /// The approval chain refused the transaction; it is stored as REJECTED
    #[error("Transaction {number} rejected: {reason}")]
    Rejected {
        id: TransactionId,
        number: String,
        reason: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

pub type TransactionResult<T> = Result<T, TransactionError>;

impl TransactionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::NotFound { .. } => ErrorKind::NotFound,
            TransactionError::InvalidState { .. } => ErrorKind::InvalidState,
            TransactionError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TransactionError::StateConflict { .. } => ErrorKind::StateConflict,
            TransactionError::Rejected { .. } => ErrorKind::ChainExhausted,
            TransactionError::Validation(_) => ErrorKind::Validation,
            TransactionError::Store(_) => ErrorKind::Store,
        }
    }

    pub fn account_not_found(id: AccountId) -> Self {
        TransactionError::NotFound {
            entity: "Account",
            id: id.to_string(),
        }
    }

    pub fn transaction_not_found(id: TransactionId) -> Self {
        TransactionError::NotFound {
            entity: "Transaction",
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for TransactionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => TransactionError::account_not_found(id),
            StoreError::TransactionNotFound(id) => TransactionError::transaction_not_found(id),
            StoreError::DuplicateTransactionNumber(number) => {
                TransactionError::Validation(format!("duplicate transaction reference: {number}"))
            }
            other => TransactionError::Store(other),
        }
    }
}

impl From<LedgerError> for TransactionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAccountState {
                account,
                state,
                expected,
            } => TransactionError::InvalidState {
                account,
                state,
                expected,
            },
            LedgerError::NonZeroBalance { account, balance } => TransactionError::InvalidState {
                account,
                state: format!("holding {balance}"),
                expected: "zero balance",
            },
            LedgerError::InsufficientBalance {
                account,
                available,
                required,
            } => TransactionError::InsufficientBalance {
                account,
                available,
                required,
            },
            LedgerError::NotPending { id, status } => TransactionError::StateConflict {
                id,
                status: status.parse().unwrap_or(ApprovalStatus::Pending),
            },
            other => TransactionError::Validation(other.to_string()),
        }
    }
}

impl From<AmountError> for TransactionError {
    fn from(err: AmountError) -> Self {
        TransactionError::Validation(err.to_string())
    }
}

impl From<ApprovalError> for TransactionError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::NotFound(id) => TransactionError::transaction_not_found(id),
            ApprovalError::StateConflict { id, status } => {
                TransactionError::StateConflict { id, status }
            }
            ApprovalError::Store(store) => store.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kinds() {
        let id = AccountId::new();
        assert_eq!(
            TransactionError::account_not_found(id).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            TransactionError::from(StoreError::DuplicateTransactionNumber("TXN-1".into())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            TransactionError::from(LedgerError::InsufficientBalance {
                account: id,
                available: dec!(1),
                required: dec!(2),
            })
            .kind(),
            ErrorKind::InsufficientBalance
        );
        assert_eq!(ErrorKind::ChainExhausted.to_string(), "CHAIN_EXHAUSTED");
    }

    #[test]
    fn test_approval_errors_map_to_taxonomy() {
        let id = TransactionId::new();
        let conflict = TransactionError::from(ApprovalError::StateConflict {
            id,
            status: ApprovalStatus::Approved,
        });
        assert_eq!(conflict.kind(), ErrorKind::StateConflict);

        let missing = TransactionError::from(ApprovalError::NotFound(id));
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_balance_overflow_is_validation() {
        let err = TransactionError::from(LedgerError::BalanceOverflow {
            account: AccountId::new(),
            balance: Decimal::MAX,
            amount: dec!(1),
        });
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_not_pending_keeps_status() {
        let id = TransactionId::new();
        let err = TransactionError::from(LedgerError::NotPending {
            id,
            status: "REJECTED".to_string(),
        });
        assert!(matches!(
            err,
            TransactionError::StateConflict { status: ApprovalStatus::Rejected, .. }
        ));
    }
}
