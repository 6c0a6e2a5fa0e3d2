//! Customer accounts
//!
//! The balance is only reachable through `credit` and `debit`, and `debit`
//! refuses to drive it below zero. Accounts are never deleted; closing is a
//! state transition that requires a zero balance.

use chrono::{DateTime, Utc};
use corebank_core::{AccountId, Amount, Currency, CustomerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LedgerError;

/// Account lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountState {
    /// Open for all operations
    Active,

    /// Temporarily blocked (a.k.a. frozen); no money moves in or out
    #[strum(to_string = "SUSPENDED", serialize = "FROZEN")]
    #[serde(alias = "FROZEN")]
    Suspended,

    /// Terminal
    Closed,
}

/// A customer account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: CustomerId,
    pub(crate) balance: Decimal,
    pub currency: Currency,
    pub state: AccountState,
    /// Grouping parent (e.g. a sub-account under a main account)
    pub parent_id: Option<AccountId>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new, empty, active account
    pub fn open(customer_id: CustomerId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            customer_id,
            balance: Decimal::ZERO,
            currency,
            state: AccountState::Active,
            parent_id: None,
            opened_at: now,
            updated_at: now,
        }
    }

    /// Open an account funded at creation time
    pub fn open_with_balance(
        customer_id: CustomerId,
        currency: Currency,
        opening_balance: Decimal,
    ) -> Result<Self, LedgerError> {
        if opening_balance < Decimal::ZERO {
            return Err(LedgerError::NegativeOpeningBalance(opening_balance));
        }
        let mut account = Self::open(customer_id, currency);
        account.balance = opening_balance;
        Ok(account)
    }

    /// Attach this account under a parent account
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_active(&self) -> bool {
        self.state == AccountState::Active
    }

    /// Fail unless the account accepts money movements
    pub fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(LedgerError::InvalidAccountState {
                account: self.id,
                state: self.state.to_string(),
                expected: "ACTIVE",
            })
        }
    }

    /// Fail unless `amount` can be taken out of this account
    pub fn ensure_covers(&self, amount: Amount) -> Result<(), LedgerError> {
        if self.balance >= amount.value() {
            Ok(())
        } else {
            Err(LedgerError::InsufficientBalance {
                account: self.id,
                available: self.balance,
                required: amount.value(),
            })
        }
    }

    /// Add funds. Only the transaction engine's commit path calls this.
    pub fn credit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount.value())
            .ok_or(LedgerError::BalanceOverflow {
                account: self.id,
                balance: self.balance,
                amount: amount.value(),
            })?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove funds. Only the transaction engine's commit path calls this.
    pub fn debit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_covers(amount)?;
        self.balance -= amount.value();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn suspend(&mut self) -> Result<(), LedgerError> {
        self.ensure_active()?;
        self.state = AccountState::Suspended;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), LedgerError> {
        if self.state != AccountState::Suspended {
            return Err(LedgerError::InvalidAccountState {
                account: self.id,
                state: self.state.to_string(),
                expected: "SUSPENDED",
            });
        }
        self.state = AccountState::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Close the account. Only allowed at exactly zero balance.
    pub fn close(&mut self) -> Result<(), LedgerError> {
        if self.state == AccountState::Closed {
            return Err(LedgerError::InvalidAccountState {
                account: self.id,
                state: self.state.to_string(),
                expected: "ACTIVE or SUSPENDED",
            });
        }
        if !self.balance.is_zero() {
            return Err(LedgerError::NonZeroBalance {
                account: self.id,
                balance: self.balance,
            });
        }
        self.state = AccountState::Closed;
        self.updated_at = Utc::now();
        Ok(())
    }
}
