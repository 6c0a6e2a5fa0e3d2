//! Approval errors

use corebank_core::TransactionId;
use corebank_ledger::{ApprovalStatus, LedgerError, StoreError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Approval chain configuration problems, caught when the chain is built
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Tier '{name}' has an empty range [{low}, {high})")]
    EmptyRange {
        name: String,
        low: Decimal,
        high: Decimal,
    },

    #[error("Tier '{name}' starts below zero: {low}")]
    NegativeLow { name: String, low: Decimal },

    #[error("Gap between tier '{prev}' (ends {prev_high}) and '{next}' (starts {next_low})")]
    Gap {
        prev: String,
        prev_high: Decimal,
        next: String,
        next_low: Decimal,
    },

    #[error("Tier '{prev}' (ends {prev_high}) overlaps '{next}' (starts {next_low})")]
    Overlap {
        prev: String,
        prev_high: Decimal,
        next: String,
        next_low: Decimal,
    },

    #[error("Only the last tier may be unbounded, but '{0}' is not last")]
    UnboundedNotLast(String),

    #[error("Duplicate tier name: {0}")]
    DuplicateName(String),
}

/// Errors from manual approval operations
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    #[error("Transaction {id} is already {status}")]
    StateConflict {
        id: TransactionId,
        status: ApprovalStatus,
    },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ApprovalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TransactionNotFound(id) => ApprovalError::NotFound(id),
            other => ApprovalError::Store(other),
        }
    }
}

impl ApprovalError {
    /// Build the conflict error from a failed record transition
    pub(crate) fn from_transition(
        id: TransactionId,
        status: ApprovalStatus,
        err: LedgerError,
    ) -> Self {
        tracing::debug!(transaction = %id, error = %err, "Rejected approval transition");
        ApprovalError::StateConflict { id, status }
    }
}
