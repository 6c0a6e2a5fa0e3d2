//! Integration tests for the CLI context and commands
//!
//! These run the command handlers against a SQLite ledger in a temp dir,
//! reopening the context between steps the way separate CLI runs would.

use std::io::Write;

use corebank_cli::commands::{self, StateChange};
use corebank_cli::AppContext;
use corebank_core::{Actor, Currency};
use corebank_engine::TransactionRequest;
use corebank_ledger::ApprovalStatus;
use rust_decimal_macros::dec;
use tempfile::TempDir;

#[tokio::test]
async fn test_workflow_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path();

    // Run 1: open and fund
    let (account, pending_id) = {
        let ctx = AppContext::new(data, None).unwrap();
        assert!(ctx.ledger_path().ends_with("ledger.db"));

        let account = commands::open_account(&ctx, None, None, true).unwrap();
        for _ in 0..3 {
            commands::submit(&ctx, TransactionRequest::deposit(account, dec!(900)))
                .await
                .unwrap();
        }
        let pending = commands::submit(&ctx, TransactionRequest::withdrawal(account, dec!(2000)))
            .await
            .unwrap();
        assert!(pending.is_pending());

        // notify flag attached every channel
        assert_eq!(ctx.outbox.len(), 3 * 4);
        (account, pending.transaction_id)
    };

    // Run 2: the queue is rebuilt from disk
    let ctx = AppContext::new(data, None).unwrap();
    assert_eq!(ctx.engine.pending_approvals().len(), 1);
    commands::pending(&ctx, Some("manager")).unwrap();

    let receipt = commands::approve(&ctx, pending_id, Actor::new("mgr-1", "manager"), None)
        .await
        .unwrap();
    assert_eq!(receipt.approval_status, ApprovalStatus::Approved);
    assert_eq!(ctx.engine.balance(account).unwrap(), dec!(700));
    commands::status(&ctx, pending_id, true).unwrap();

    // Lifecycle
    commands::set_state(&ctx, account, StateChange::Suspend)
        .await
        .unwrap();
    assert!(
        commands::submit(&ctx, TransactionRequest::deposit(account, dec!(1)))
            .await
            .is_err()
    );
    commands::set_state(&ctx, account, StateChange::Activate)
        .await
        .unwrap();
    assert!(commands::set_state(&ctx, account, StateChange::Close)
        .await
        .is_err());
    commands::balance(&ctx, None).unwrap();
}

#[tokio::test]
async fn test_config_file_changes_tiers() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("engine.json");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"{{
            "default_currency": "EUR",
            "approval": {{ "tiers": [
                {{ "name": "auto", "min": "0", "max": "10", "decision": "auto_approve" }},
                {{ "name": "supervisor", "min": "10", "decision": {{ "require_role": "supervisor" }} }}
            ] }}
        }}"#
    )
    .unwrap();

    let ctx = AppContext::new(temp_dir.path().join("data"), Some(&config_path)).unwrap();
    let account = commands::open_account(&ctx, None, None, false).unwrap();
    assert_eq!(ctx.engine.account(account).unwrap().currency, Currency::Eur);

    let receipt = commands::submit(&ctx, TransactionRequest::deposit(account, dec!(50)))
        .await
        .unwrap();
    assert_eq!(receipt.required_role.as_deref(), Some("supervisor"));

    let rejected = commands::reject(
        &ctx,
        receipt.transaction_id,
        Actor::new("sup-1", "supervisor"),
        Some("unknown source".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
}

#[test]
fn test_invalid_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("engine.json");
    std::fs::write(
        &config_path,
        r#"{ "approval": { "tiers": [
            { "name": "a", "min": "0", "max": "10", "decision": "auto_approve" },
            { "name": "b", "min": "20", "decision": "auto_approve" }
        ] } }"#,
    )
    .unwrap();

    let result = AppContext::new(temp_dir.path().join("data"), Some(&config_path));
    assert!(result.is_err());
}
