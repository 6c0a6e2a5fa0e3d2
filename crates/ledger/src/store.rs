//! Ledger store contract and in-memory adapter

use std::collections::HashMap;
use std::sync::RwLock;

use corebank_core::{AccountId, TransactionId};

use crate::account::Account;
use crate::error::StoreError;
use crate::transaction::{ApprovalStatus, Transaction};

/// Durable keyed storage for accounts and transactions.
///
/// Stores do no locking beyond keeping individual calls consistent; the
/// transaction engine serializes conflicting writers itself.
pub trait LedgerStore: Send + Sync {
    fn find_account(&self, id: AccountId) -> Result<Account, StoreError>;

    fn save_account(&self, account: &Account) -> Result<(), StoreError>;

    /// All accounts, oldest first
    fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    fn find_transaction(&self, id: TransactionId) -> Result<Transaction, StoreError>;

    fn find_transaction_by_number(&self, number: &str) -> Result<Option<Transaction>, StoreError>;

    /// Insert or update. A different transaction reusing an existing number is
    /// refused with `DuplicateTransactionNumber`.
    fn save_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Transactions in the given approval status, oldest first
    fn transactions_by_approval_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Persist the accounts and transaction touched by one commit.
    ///
    /// Adapters with real transactions should override this to make the
    /// write all-or-nothing.
    fn commit(&self, accounts: &[Account], transaction: &Transaction) -> Result<(), StoreError> {
        for account in accounts {
            self.save_account(account)?;
        }
        self.save_transaction(transaction)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    numbers: HashMap<String, TransactionId>,
}

/// In-memory ledger store (tests, demos)
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<MemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn save_transaction_locked(
        state: &mut MemoryState,
        transaction: &Transaction,
    ) -> Result<(), StoreError> {
        if let Some(existing) = state.numbers.get(&transaction.number) {
            if *existing != transaction.id {
                return Err(StoreError::DuplicateTransactionNumber(
                    transaction.number.clone(),
                ));
            }
        }
        state
            .numbers
            .insert(transaction.number.clone(), transaction.id);
        state
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn find_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        state
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn save_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.opened_at);
        Ok(accounts)
    }

    fn find_transaction(&self, id: TransactionId) -> Result<Transaction, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        state
            .transactions
            .get(&id)
            .cloned()
            .ok_or(StoreError::TransactionNotFound(id))
    }

    fn find_transaction_by_number(&self, number: &str) -> Result<Option<Transaction>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state
            .numbers
            .get(number)
            .and_then(|id| state.transactions.get(id))
            .cloned())
    }

    fn save_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        Self::save_transaction_locked(&mut state, transaction)
    }

    fn transactions_by_approval_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        let mut found: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|tx| tx.approval_status == status)
            .cloned()
            .collect();
        found.sort_by_key(|tx| tx.created_at);
        Ok(found)
    }

    fn commit(&self, accounts: &[Account], transaction: &Transaction) -> Result<(), StoreError> {
        // Single write lock: readers never observe half a commit
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        Self::save_transaction_locked(&mut state, transaction)?;
        for account in accounts {
            state.accounts.insert(account.id, account.clone());
        }
        Ok(())
    }
}
