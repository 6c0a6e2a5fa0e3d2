//! Transaction Engine - validation, approval, money movement, notification
//!
//! ```text
//! submit(request)
//!   │ 1. amount > 0, shape, unused reference ── VALIDATION
//!   │ 2. accounts exist ──────────────────────── NOT_FOUND
//!   │ 3. accounts ACTIVE ─────────────────────── INVALID_STATE
//!   │ 4. currencies agree ────────────────────── VALIDATION
//!   │ 5. source covers amount ────────────────── INSUFFICIENT_BALANCE
//!   ▼
//! approval chain
//!   ├─ AUTO_APPROVED ──► lock accounts ──► re-read, move, commit ──► unlock ──► publish
//!   ├─ PENDING ────────► persist, queue for manual approval
//!   └─ REJECTED ───────► persist for audit, CHAIN_EXHAUSTED
//! ```
//!
//! Lock order is always transaction lock, then account locks in ascending id
//! order. Events are published only after every lock is released.

use std::sync::Arc;

use chrono::Utc;
use corebank_approval::{
    ApprovalChain, ApprovalContext, ApprovalResult, ApprovalStats, ChainError,
    ManualApprovalRegistry, PendingReview,
};
use corebank_core::{AccountId, Actor, Amount, Currency, CustomerId, KeyedLocks, TransactionId};
use corebank_ledger::{
    generate_number, Account, ApprovalStatus, LedgerError, LedgerStore, Transaction,
    TransactionType,
};
use corebank_notify::{AccountEvent, AccountEventKind, DeliveryReport, FanoutRegistry};
use rust_decimal::Decimal;

use crate::config::EngineConfig;
use crate::error::{TransactionError, TransactionResult};
use crate::request::{TransactionReceipt, TransactionRequest};

/// Accounts after money moved, not yet persisted
struct Movement {
    source: Account,
    source_before: Decimal,
    destination: Option<(Account, Decimal)>,
}

impl Movement {
    fn accounts(&self) -> Vec<Account> {
        let mut accounts = vec![self.source.clone()];
        if let Some((destination, _)) = &self.destination {
            accounts.push(destination.clone());
        }
        accounts
    }

    fn receipt(&self, tx: &Transaction) -> TransactionReceipt {
        TransactionReceipt::new(
            tx,
            self.source.balance(),
            self.destination.as_ref().map(|(d, _)| d.balance()),
        )
    }
}

/// Transaction orchestrator
pub struct TransactionEngine {
    store: Arc<dyn LedgerStore>,
    chain: ApprovalChain,
    approvals: ManualApprovalRegistry,
    fanout: Arc<FanoutRegistry>,
    account_locks: KeyedLocks<AccountId>,
    config: EngineConfig,
}

impl TransactionEngine {
    /// Build an engine. Fails if the approval tiers are inconsistent.
    pub fn new(store: Arc<dyn LedgerStore>, config: EngineConfig) -> Result<Self, ChainError> {
        let chain = ApprovalChain::from_config(&config.approval)?;
        Ok(Self {
            approvals: ManualApprovalRegistry::new(Arc::clone(&store)),
            store,
            chain,
            fanout: Arc::new(FanoutRegistry::new()),
            account_locks: KeyedLocks::new(),
            config,
        })
    }

    /// Use a shared fan-out registry
    pub fn with_fanout(mut self, fanout: Arc<FanoutRegistry>) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn fanout(&self) -> &Arc<FanoutRegistry> {
        &self.fanout
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reload the manual approval queue from the store
    pub fn restore(&self) -> TransactionResult<usize> {
        Ok(self.approvals.restore()?)
    }

    // === Accounts ===

    /// Open an empty account. `None` uses the configured default currency.
    pub fn open_account(
        &self,
        customer_id: CustomerId,
        currency: Option<Currency>,
    ) -> TransactionResult<Account> {
        let currency = currency.unwrap_or_else(|| self.config.default_currency.clone());
        let account = Account::open(customer_id, currency);
        self.store.save_account(&account)?;
        tracing::info!(
            account = %account.id,
            customer = %customer_id,
            currency = %account.currency,
            "Account opened"
        );
        Ok(account)
    }

    pub fn account(&self, id: AccountId) -> TransactionResult<Account> {
        Ok(self.store.find_account(id)?)
    }

    pub fn balance(&self, id: AccountId) -> TransactionResult<Decimal> {
        Ok(self.store.find_account(id)?.balance())
    }

    pub fn accounts(&self) -> TransactionResult<Vec<Account>> {
        Ok(self.store.accounts()?)
    }

    pub async fn suspend_account(&self, id: AccountId) -> TransactionResult<Account> {
        self.update_account(id, "suspended", Account::suspend).await
    }

    pub async fn activate_account(&self, id: AccountId) -> TransactionResult<Account> {
        self.update_account(id, "activated", Account::activate).await
    }

    /// Close an account; it must hold exactly zero
    pub async fn close_account(&self, id: AccountId) -> TransactionResult<Account> {
        self.update_account(id, "closed", Account::close).await
    }

    async fn update_account(
        &self,
        id: AccountId,
        action: &'static str,
        change: impl FnOnce(&mut Account) -> Result<(), LedgerError>,
    ) -> TransactionResult<Account> {
        let _guard = self.account_locks.lock(id).await;
        let mut account = self.store.find_account(id)?;
        change(&mut account)?;
        self.store.save_account(&account)?;
        tracing::info!(account = %id, state = %account.state, "Account {action}");
        Ok(account)
    }

    // === Money movement ===

    pub async fn deposit(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> TransactionResult<TransactionReceipt> {
        self.submit(TransactionRequest::deposit(account, amount)).await
    }

    pub async fn withdraw(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> TransactionResult<TransactionReceipt> {
        self.submit(TransactionRequest::withdrawal(account, amount))
            .await
    }

    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> TransactionResult<TransactionReceipt> {
        self.submit(TransactionRequest::transfer(from, to, amount))
            .await
    }

    pub async fn charge_fee(
        &self,
        account: AccountId,
        amount: Decimal,
    ) -> TransactionResult<TransactionReceipt> {
        self.submit(TransactionRequest::fee(account, amount)).await
    }

    /// Validate, classify and (if approved) execute a request
    pub async fn submit(&self, request: TransactionRequest) -> TransactionResult<TransactionReceipt> {
        let amount = Amount::new(request.amount)?;

        let mut tx = Transaction::new(
            request
                .reference
                .clone()
                .unwrap_or_else(generate_number),
            request.kind,
            amount,
            request.currency.clone().unwrap_or_default(),
            request.source,
            request.destination,
            request.requested_by.clone(),
            request.description.clone(),
        )?;

        if let Some(reference) = &request.reference {
            if self.store.find_transaction_by_number(reference)?.is_some() {
                return Err(TransactionError::Validation(format!(
                    "duplicate transaction reference: {reference}"
                )));
            }
        }

        let (source, destination) = self.load_accounts(&tx)?;
        if request.currency.is_none() {
            tx.currency = source.currency.clone();
        }
        check_accounts(&tx, &source, destination.as_ref())?;

        let decision = self
            .chain
            .classify(&ApprovalContext::new(&tx, &source, destination.as_ref()));
        tx.record_handler(decision.handler.clone(), decision.required_role.clone());

        match decision.status {
            ApprovalStatus::AutoApproved | ApprovalStatus::Approved => self.execute(tx).await,
            ApprovalStatus::Pending => {
                self.store.save_transaction(&tx)?;
                self.approvals.enqueue(&tx);
                tracing::info!(
                    transaction = %tx.number,
                    kind = %tx.kind,
                    amount = %tx.amount,
                    handler = %decision.handler,
                    "Transaction awaiting approval"
                );
                Ok(TransactionReceipt::new(
                    &tx,
                    source.balance(),
                    destination.map(|d| d.balance()),
                ))
            }
            ApprovalStatus::Rejected => {
                let reason = decision
                    .comment
                    .clone()
                    .unwrap_or_else(|| "no suitable handler".to_string());
                tx.reject(None, Some(reason.clone()), Utc::now())?;
                self.store.save_transaction(&tx)?;
                tracing::warn!(
                    transaction = %tx.number,
                    amount = %tx.amount,
                    reason = %reason,
                    "Transaction rejected by approval chain"
                );
                Err(TransactionError::Rejected {
                    id: tx.id,
                    number: tx.number,
                    reason,
                })
            }
        }
    }

    /// Auto-approved path: move the money under the account locks
    async fn execute(&self, mut tx: Transaction) -> TransactionResult<TransactionReceipt> {
        let guards = self.account_locks.lock_all(&tx.accounts()).await;

        let movement = self.move_funds(&tx)?;
        tx.complete_auto_approved(Utc::now())?;
        self.store.commit(&movement.accounts(), &tx)?;

        drop(guards);

        tracing::info!(
            transaction = %tx.number,
            kind = %tx.kind,
            amount = %tx.amount,
            "Transaction completed"
        );
        self.publish_movement(&tx, &movement).await;
        Ok(movement.receipt(&tx))
    }

    /// Re-read the accounts and apply the transaction to them in memory.
    /// Caller holds the account locks.
    fn move_funds(&self, tx: &Transaction) -> TransactionResult<Movement> {
        let (mut source, destination) = self.load_accounts(tx)?;
        check_accounts(tx, &source, destination.as_ref())?;

        let source_before = source.balance();
        if tx.kind.debits_source() {
            source.debit(tx.amount)?;
        } else {
            source.credit(tx.amount)?;
        }

        let destination = match destination {
            Some(mut account) => {
                let before = account.balance();
                account.credit(tx.amount)?;
                Some((account, before))
            }
            None => None,
        };

        Ok(Movement {
            source,
            source_before,
            destination,
        })
    }

    fn load_accounts(&self, tx: &Transaction) -> TransactionResult<(Account, Option<Account>)> {
        let source = self.store.find_account(tx.source)?;
        let destination = match tx.destination {
            Some(id) => Some(self.store.find_account(id)?),
            None => None,
        };
        Ok((source, destination))
    }

    // === Manual approval ===

    /// Approve a PENDING transaction and move the money.
    ///
    /// If the source can no longer cover the amount the approval fails with
    /// INSUFFICIENT_BALANCE and the transaction stays PENDING.
    pub async fn approve_transaction(
        &self,
        id: TransactionId,
        approver: &Actor,
        comment: Option<String>,
    ) -> TransactionResult<TransactionReceipt> {
        let mut session = self.approvals.open(id).await?;
        let accounts = session.transaction().accounts();
        let guards = self.account_locks.lock_all(&accounts).await;

        let movement = self.move_funds(session.transaction())?;
        session.approve(approver, comment)?;
        self.store.commit(&movement.accounts(), session.transaction())?;

        drop(guards);
        let tx = self.approvals.settle(session);

        tracing::info!(
            transaction = %tx.number,
            approver = %approver,
            amount = %tx.amount,
            "Transaction approved"
        );
        self.publish_movement(&tx, &movement).await;
        Ok(movement.receipt(&tx))
    }

    /// Reject a PENDING transaction. No money moves.
    pub async fn reject_transaction(
        &self,
        id: TransactionId,
        rejecter: &Actor,
        reason: Option<String>,
    ) -> TransactionResult<TransactionReceipt> {
        let tx = self.approvals.reject(id, rejecter, reason).await?;
        tracing::info!(
            transaction = %tx.number,
            rejecter = %rejecter,
            "Transaction rejected"
        );

        let source = self.store.find_account(tx.source)?;
        let destination_balance = match tx.destination {
            Some(dest) => Some(self.store.find_account(dest)?.balance()),
            None => None,
        };

        let mut event = AccountEvent::new(
            AccountEventKind::TransactionRejected,
            source.id,
            source.balance(),
            source.balance(),
            tx.amount.value(),
            tx.currency.clone(),
        )
        .with_transaction(tx.id, tx.number.clone());
        if let Some(reason) = &tx.comment {
            event = event.with_message(format!(
                "Transaction of {} {} was rejected: {reason}",
                tx.amount, tx.currency
            ));
        }
        self.fanout.publish(&event).await;

        Ok(TransactionReceipt::new(&tx, source.balance(), destination_balance))
    }

    pub fn approval_status(&self, id: TransactionId) -> TransactionResult<ApprovalResult> {
        Ok(self.approvals.status(id)?)
    }

    /// Transactions awaiting manual approval, oldest first
    pub fn pending_approvals(&self) -> Vec<PendingReview> {
        self.approvals.pending()
    }

    pub fn approval_stats(&self) -> TransactionResult<ApprovalStats> {
        Ok(self.approvals.stats()?)
    }

    pub fn transaction(&self, id: TransactionId) -> TransactionResult<Transaction> {
        Ok(self.store.find_transaction(id)?)
    }

    // === Notification ===

    async fn publish_movement(&self, tx: &Transaction, movement: &Movement) -> Vec<DeliveryReport> {
        let amount = tx.amount.value();
        let source_kind = match tx.kind {
            TransactionType::Deposit => AccountEventKind::DepositCompleted,
            TransactionType::Withdrawal => AccountEventKind::WithdrawalCompleted,
            TransactionType::Transfer => AccountEventKind::TransferDebit,
            TransactionType::Fee => AccountEventKind::FeeCharged,
        };

        let mut events = vec![AccountEvent::new(
            source_kind,
            movement.source.id,
            movement.source_before,
            movement.source.balance(),
            amount,
            tx.currency.clone(),
        )
        .with_transaction(tx.id, tx.number.clone())];

        if let Some((destination, before)) = &movement.destination {
            events.push(
                AccountEvent::new(
                    AccountEventKind::TransferCredit,
                    destination.id,
                    *before,
                    destination.balance(),
                    amount,
                    tx.currency.clone(),
                )
                .with_transaction(tx.id, tx.number.clone()),
            );
        }

        if tx.kind.debits_source() && movement.source.balance() < self.config.low_balance_threshold
        {
            events.push(
                AccountEvent::new(
                    AccountEventKind::LowBalance,
                    movement.source.id,
                    movement.source_before,
                    movement.source.balance(),
                    amount,
                    tx.currency.clone(),
                )
                .with_transaction(tx.id, tx.number.clone()),
            );
        }

        let mut reports = Vec::with_capacity(events.len());
        for event in &events {
            reports.push(self.fanout.publish(event).await);
        }
        reports
    }
}

impl std::fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("chain", &self.chain)
            .field("approvals", &self.approvals)
            .field("config", &self.config)
            .finish()
    }
}

/// State, currency and balance preconditions, in that order
fn check_accounts(
    tx: &Transaction,
    source: &Account,
    destination: Option<&Account>,
) -> TransactionResult<()> {
    source.ensure_active()?;
    if let Some(destination) = destination {
        destination.ensure_active()?;
    }

    if tx.currency != source.currency {
        return Err(TransactionError::Validation(format!(
            "currency mismatch: {} transaction on {} account {}",
            tx.currency, source.currency, source.id
        )));
    }
    if let Some(destination) = destination {
        if destination.currency != source.currency {
            return Err(TransactionError::Validation(format!(
                "currency mismatch: cannot transfer {} to {} account {}",
                source.currency, destination.currency, destination.id
            )));
        }
    }

    if tx.kind.debits_source() {
        source.ensure_covers(tx.amount)?;
    }
    Ok(())
}
