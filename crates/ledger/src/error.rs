//! Ledger errors

use corebank_core::{AccountId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by record state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account {account} is {state}, expected {expected}")]
    InvalidAccountState {
        account: AccountId,
        state: String,
        expected: &'static str,
    },

    #[error("Account {account} cannot be closed with non-zero balance {balance}")]
    NonZeroBalance { account: AccountId, balance: Decimal },

    #[error("Insufficient balance on {account}: available {available}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Decimal,
        required: Decimal,
    },

    #[error("Crediting {amount} to {account} would overflow balance {balance}")]
    BalanceOverflow {
        account: AccountId,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("Opening balance cannot be negative: {0}")]
    NegativeOpeningBalance(Decimal),

    #[error("Transfer requires a destination account")]
    MissingDestination,

    #[error("{0} must not have a destination account")]
    UnexpectedDestination(&'static str),

    #[error("Transfer source and destination are the same account: {0}")]
    SameAccountTransfer(AccountId),

    #[error("Transaction {id} is not pending approval (status: {status})")]
    NotPending { id: TransactionId, status: String },
}

/// Errors from ledger store adapters
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Transaction number already used: {0}")]
    DuplicateTransactionNumber(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True when the error means "no such record"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::AccountNotFound(_) | StoreError::TransactionNotFound(_)
        )
    }
}
