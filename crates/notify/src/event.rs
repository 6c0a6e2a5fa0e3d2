//! Account events for fan-out distribution

use chrono::{DateTime, Utc};
use corebank_core::{AccountId, Currency, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What happened to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountEventKind {
    DepositCompleted,
    WithdrawalCompleted,
    TransferDebit,
    TransferCredit,
    FeeCharged,
    LowBalance,
    TransactionRejected,
}

impl AccountEventKind {
    /// Events a customer should hear about on every channel
    pub fn is_urgent(&self) -> bool {
        matches!(
            self,
            AccountEventKind::LowBalance | AccountEventKind::TransactionRejected
        )
    }
}

/// A balance change or alert on one account.
///
/// Events are handed to subscribers and then dropped; nothing here is
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub kind: AccountEventKind,
    pub account: AccountId,
    pub transaction: Option<TransactionId>,
    pub transaction_number: Option<String>,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub amount: Decimal,
    pub currency: Currency,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AccountEvent {
    pub fn new(
        kind: AccountEventKind,
        account: AccountId,
        previous_balance: Decimal,
        new_balance: Decimal,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        let message = default_message(kind, amount, &currency, new_balance);
        Self {
            kind,
            account,
            transaction: None,
            transaction_number: None,
            previous_balance,
            new_balance,
            amount,
            currency,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn with_transaction(mut self, id: TransactionId, number: impl Into<String>) -> Self {
        self.transaction = Some(id);
        self.transaction_number = Some(number.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_urgent(&self) -> bool {
        self.kind.is_urgent()
    }
}

fn default_message(
    kind: AccountEventKind,
    amount: Decimal,
    currency: &Currency,
    balance: Decimal,
) -> String {
    match kind {
        AccountEventKind::DepositCompleted => {
            format!("Deposit of {amount} {currency} received. Balance: {balance} {currency}")
        }
        AccountEventKind::WithdrawalCompleted => {
            format!("Withdrawal of {amount} {currency} completed. Balance: {balance} {currency}")
        }
        AccountEventKind::TransferDebit => {
            format!("Transfer of {amount} {currency} sent. Balance: {balance} {currency}")
        }
        AccountEventKind::TransferCredit => {
            format!("Transfer of {amount} {currency} received. Balance: {balance} {currency}")
        }
        AccountEventKind::FeeCharged => {
            format!("Fee of {amount} {currency} charged. Balance: {balance} {currency}")
        }
        AccountEventKind::LowBalance => {
            format!("Low balance warning: {balance} {currency}")
        }
        AccountEventKind::TransactionRejected => {
            format!("Transaction of {amount} {currency} was rejected")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_messages() {
        let event = AccountEvent::new(
            AccountEventKind::DepositCompleted,
            AccountId::new(),
            dec!(100),
            dec!(150),
            dec!(50),
            Currency::Usd,
        );
        assert_eq!(event.message, "Deposit of 50 USD received. Balance: 150 USD");
        assert!(!event.is_urgent());

        let low = AccountEvent::new(
            AccountEventKind::LowBalance,
            AccountId::new(),
            dec!(150),
            dec!(20),
            dec!(130),
            Currency::Eur,
        );
        assert!(low.message.contains("20 EUR"));
        assert!(low.is_urgent());
    }

    #[test]
    fn test_kind_string_form() {
        assert_eq!(AccountEventKind::TransferCredit.to_string(), "TRANSFER_CREDIT");
        let json = serde_json::to_string(&AccountEventKind::LowBalance).unwrap();
        assert_eq!(json, "\"LOW_BALANCE\"");
    }
}
