//! CoreBank Ledger - Account and transaction records
//!
//! # Key Types
//! - `Account`: customer account with a never-negative balance
//! - `Transaction`: a deposit, withdrawal, transfer or fee and its approval trail
//! - `LedgerStore`: storage contract consumed by the transaction engine
//! - `InMemoryLedgerStore`, `SqliteLedgerStore`: adapters

pub mod account;
pub mod error;
pub mod sqlite;
pub mod store;
pub mod transaction;

pub use account::{Account, AccountState};
pub use error::{LedgerError, StoreError};
pub use sqlite::SqliteLedgerStore;
pub use store::{InMemoryLedgerStore, LedgerStore};
pub use transaction::{
    generate_number, ApprovalStatus, ExecutionStatus, Transaction, TransactionType,
};
