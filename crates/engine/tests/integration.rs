//! Integration tests for engine + approval + notify + ledger stores

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use corebank_core::{AccountId, Actor, CustomerId};
use corebank_engine::{EngineConfig, ErrorKind, TransactionEngine, TransactionRequest};
use corebank_ledger::{
    ApprovalStatus, ExecutionStatus, InMemoryLedgerStore, LedgerStore, SqliteLedgerStore,
};
use corebank_notify::{
    urgent_bundle, AccountEvent, AccountEventKind, Channel, FanoutRegistry, NotifyError, Outbox,
    Subscriber,
};

/// Records every event it sees
struct Recorder {
    name: String,
    events: std::sync::Mutex<Vec<AccountEvent>>,
}

impl Recorder {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            events: Default::default(),
        })
    }

    fn kinds(&self) -> Vec<AccountEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    fn count(&self, kind: AccountEventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

#[async_trait]
impl Subscriber for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &AccountEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Fails every delivery and counts attempts
struct Flaky {
    attempts: AtomicUsize,
}

#[async_trait]
impl Subscriber for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn handle(&self, _event: &AccountEvent) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::failed("flaky", "gateway timeout"))
    }
}

/// Subscriber with a bug
struct Exploding;

#[async_trait]
impl Subscriber for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn handle(&self, _event: &AccountEvent) -> Result<(), NotifyError> {
        panic!("template missing")
    }
}

fn memory_engine() -> TransactionEngine {
    TransactionEngine::new(Arc::new(InMemoryLedgerStore::new()), EngineConfig::default())
        .expect("default tiers are valid")
}

/// Open an account and fund it with auto-approved deposits
async fn open_funded(engine: &TransactionEngine, balance: Decimal) -> AccountId {
    let account = engine.open_account(CustomerId::new(), None).unwrap();
    let mut remaining = balance;
    while remaining > Decimal::ZERO {
        let chunk = remaining.min(dec!(999));
        engine.deposit(account.id, chunk).await.unwrap();
        remaining -= chunk;
    }
    account.id
}

#[tokio::test]
async fn test_deposit_end_to_end() {
    let engine = memory_engine();
    let recorder = Recorder::new("recorder");
    let account = open_funded(&engine, dec!(100)).await;
    engine.fanout().attach(account, recorder.clone());

    let receipt = engine.deposit(account, dec!(50)).await.unwrap();

    assert!(receipt.is_completed());
    assert_eq!(receipt.approval_status, ApprovalStatus::AutoApproved);
    assert_eq!(engine.balance(account).unwrap(), dec!(150));
    assert_eq!(recorder.kinds(), vec![AccountEventKind::DepositCompleted]);

    let event = recorder.events.lock().unwrap()[0].clone();
    assert_eq!(event.previous_balance, dec!(100));
    assert_eq!(event.new_balance, dec!(150));
    assert_eq!(event.transaction, Some(receipt.transaction_id));
}

#[tokio::test]
async fn test_pending_withdrawal_then_approve() {
    let engine = memory_engine();
    let recorder = Recorder::new("recorder");
    let account = open_funded(&engine, dec!(10000)).await;
    engine.fanout().attach(account, recorder.clone());

    let pending = engine.withdraw(account, dec!(5000)).await.unwrap();
    assert!(pending.is_pending());
    assert_eq!(pending.required_role.as_deref(), Some("manager"));
    assert_eq!(engine.balance(account).unwrap(), dec!(10000));
    assert!(recorder.kinds().is_empty());

    let status = engine.approval_status(pending.transaction_id).unwrap();
    assert!(status.is_pending());

    let manager = Actor::new("mgr-1", "manager");
    let approved = engine
        .approve_transaction(pending.transaction_id, &manager, Some("verified".into()))
        .await
        .unwrap();

    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert_eq!(approved.execution_status, ExecutionStatus::Completed);
    assert_eq!(engine.balance(account).unwrap(), dec!(5000));
    assert_eq!(recorder.count(AccountEventKind::WithdrawalCompleted), 1);

    let status = engine.approval_status(pending.transaction_id).unwrap();
    assert_eq!(status.decided_by.as_deref(), Some("mgr-1"));
    assert_eq!(status.comment.as_deref(), Some("verified"));

    // Resolved transactions cannot be decided again
    let again = engine
        .reject_transaction(pending.transaction_id, &manager, None)
        .await
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::StateConflict);
}

#[tokio::test]
async fn test_director_tier_and_reject_notification() {
    let engine = memory_engine();
    let recorder = Recorder::new("recorder");
    let account = open_funded(&engine, dec!(20000)).await;
    engine.fanout().attach(account, recorder.clone());

    let pending = engine.withdraw(account, dec!(15000)).await.unwrap();
    assert_eq!(pending.required_role.as_deref(), Some("director"));

    let director = Actor::new("dir-1", "director");
    let receipt = engine
        .reject_transaction(pending.transaction_id, &director, Some("unverified".into()))
        .await
        .unwrap();

    assert_eq!(receipt.execution_status, ExecutionStatus::Rejected);
    assert_eq!(engine.balance(account).unwrap(), dec!(20000));
    assert_eq!(recorder.kinds(), vec![AccountEventKind::TransactionRejected]);

    let tx = engine.transaction(pending.transaction_id).unwrap();
    assert_eq!(tx.rejected_by.as_deref(), Some("dir-1"));
    assert_eq!(tx.comment.as_deref(), Some("unverified"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let engine = Arc::new(memory_engine());
    let account = open_funded(&engine, dec!(500)).await;

    // 6 x 100 against 500: exactly one must fail
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.withdraw(account, dec!(100)).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                assert!(receipt.source_balance >= Decimal::ZERO);
                succeeded += 1;
            }
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::InsufficientBalance);
                insufficient += 1;
            }
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(insufficient, 1);
    assert_eq!(engine.balance(account).unwrap(), Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_conserve_money() {
    let engine = Arc::new(memory_engine());
    let a = open_funded(&engine, dec!(3000)).await;
    let b = open_funded(&engine, dec!(3000)).await;

    // Opposite directions at the same time must neither deadlock nor leak
    let handles: Vec<_> = (0..20)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            tokio::spawn(async move { engine.transfer(from, to, dec!(75)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total = engine.balance(a).unwrap() + engine.balance(b).unwrap();
    assert_eq!(total, dec!(6000));
    assert_eq!(engine.balance(a).unwrap(), dec!(3000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_resolve_once() {
    let engine = Arc::new(memory_engine());
    let account = open_funded(&engine, dec!(10000)).await;
    let pending = engine.withdraw(account, dec!(2500)).await.unwrap();
    let id = pending.transaction_id;

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let actor = Actor::new(format!("mgr-{i}"), "manager");
                if i % 2 == 0 {
                    engine.approve_transaction(id, &actor, None).await
                } else {
                    engine.reject_transaction(id, &actor, None).await
                }
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::StateConflict),
        }
    }
    assert_eq!(winners, 1);

    let tx = engine.transaction(id).unwrap();
    let expected = match tx.approval_status {
        ApprovalStatus::Approved => dec!(7500),
        ApprovalStatus::Rejected => dec!(10000),
        other => panic!("unexpected status {other}"),
    };
    assert_eq!(engine.balance(account).unwrap(), expected);
}

#[tokio::test]
async fn test_transfer_events_and_low_balance() {
    let engine = memory_engine();
    let from = open_funded(&engine, dec!(300)).await;
    let to = open_funded(&engine, dec!(0)).await;
    let from_events = Recorder::new("from");
    let to_events = Recorder::new("to");
    engine.fanout().attach(from, from_events.clone());
    engine.fanout().attach(to, to_events.clone());

    let receipt = engine.transfer(from, to, dec!(250)).await.unwrap();

    assert_eq!(receipt.source_balance, dec!(50));
    assert_eq!(receipt.destination_balance, Some(dec!(250)));
    assert_eq!(
        from_events.kinds(),
        vec![AccountEventKind::TransferDebit, AccountEventKind::LowBalance]
    );
    assert_eq!(to_events.kinds(), vec![AccountEventKind::TransferCredit]);
}

#[tokio::test]
async fn test_global_fallback_delivers_exactly_once() {
    let fanout = Arc::new(FanoutRegistry::new());
    let global = Recorder::new("global");
    fanout.attach_global(global.clone());

    let engine = memory_engine().with_fanout(fanout.clone());
    let quiet = open_funded(&engine, dec!(0)).await;
    let watched = open_funded(&engine, dec!(0)).await;
    let own = Recorder::new("own");
    fanout.attach(watched, own.clone());

    engine.deposit(quiet, dec!(500)).await.unwrap();
    engine.deposit(watched, dec!(500)).await.unwrap();

    assert_eq!(global.count(AccountEventKind::DepositCompleted), 1);
    assert_eq!(own.count(AccountEventKind::DepositCompleted), 1);
}

#[tokio::test]
async fn test_failing_subscriber_does_not_fail_transaction() {
    let engine = memory_engine();
    let account = open_funded(&engine, dec!(0)).await;
    let flaky = Arc::new(Flaky {
        attempts: AtomicUsize::new(0),
    });
    let recorder = Recorder::new("recorder");
    engine.fanout().attach(account, flaky.clone());
    engine.fanout().attach(account, recorder.clone());

    let receipt = engine.deposit(account, dec!(40)).await.unwrap();

    assert!(receipt.is_completed());
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.count(AccountEventKind::DepositCompleted), 1);
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_unwind_into_caller() {
    let engine = memory_engine();
    let account = open_funded(&engine, dec!(0)).await;
    let recorder = Recorder::new("recorder");
    engine.fanout().attach(account, Arc::new(Exploding));
    engine.fanout().attach(account, recorder.clone());

    let receipt = engine.deposit(account, dec!(40)).await.unwrap();

    assert!(receipt.is_completed());
    assert_eq!(engine.balance(account).unwrap(), dec!(40));
    assert_eq!(recorder.count(AccountEventKind::DepositCompleted), 1);

    // Locks were released before publishing, so the account is still usable
    engine.withdraw(account, dec!(5)).await.unwrap();
}

#[tokio::test]
async fn test_urgent_bundle_receives_low_balance() {
    let engine = memory_engine();
    let outbox = Outbox::new();
    let account = open_funded(&engine, dec!(150)).await;
    engine
        .fanout()
        .attach(account, Arc::new(urgent_bundle(&outbox)));

    engine.withdraw(account, dec!(100)).await.unwrap();

    // withdrawal + low balance, each on email, sms and in-app
    assert_eq!(outbox.len(), 6);
    let sms = outbox.for_channel(Channel::Sms);
    assert!(sms.iter().any(|m| m.body.contains("Low balance")));
}

#[tokio::test]
async fn test_sqlite_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let (account, pending_id) = {
        let store: Arc<dyn LedgerStore> = Arc::new(SqliteLedgerStore::new(&path).unwrap());
        let engine = TransactionEngine::new(store, EngineConfig::default()).unwrap();
        let account = open_funded(&engine, dec!(3000)).await;
        let pending = engine.withdraw(account, dec!(1200)).await.unwrap();
        (account, pending.transaction_id)
    };

    let store: Arc<dyn LedgerStore> = Arc::new(SqliteLedgerStore::new(&path).unwrap());
    let engine = TransactionEngine::new(store, EngineConfig::default()).unwrap();
    assert_eq!(engine.restore().unwrap(), 1);
    assert_eq!(engine.pending_approvals()[0].id, pending_id);
    assert_eq!(engine.balance(account).unwrap(), dec!(3000));

    engine
        .approve_transaction(pending_id, &Actor::new("mgr-1", "manager"), None)
        .await
        .unwrap();
    assert_eq!(engine.balance(account).unwrap(), dec!(1800));

    let stats = engine.approval_stats().unwrap();
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.pending, 0);
    assert!(stats.auto_approved >= 4);
}

#[tokio::test]
async fn test_idempotency_reference_across_kinds() {
    let engine = memory_engine();
    let account = open_funded(&engine, dec!(500)).await;

    engine
        .submit(
            TransactionRequest::withdrawal(account, dec!(20))
                .by(Actor::new("atm-7", "channel"))
                .with_reference("ATM-7-0001")
                .with_description("ATM cash"),
        )
        .await
        .unwrap();

    let retry = engine
        .submit(TransactionRequest::withdrawal(account, dec!(20)).with_reference("ATM-7-0001"))
        .await
        .unwrap_err();

    assert_eq!(retry.kind(), ErrorKind::Validation);
    assert_eq!(engine.balance(account).unwrap(), dec!(480));
}
