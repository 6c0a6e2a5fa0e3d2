//! CLI commands

use corebank_core::{AccountId, Actor, Currency, CustomerId, TransactionId};
use corebank_engine::{TransactionReceipt, TransactionRequest};
use corebank_ledger::TransactionType;

use crate::context::AppContext;

fn print_receipt(action: &str, receipt: &TransactionReceipt) {
    if receipt.is_pending() {
        println!(
            "⏳ {} {} awaiting {} approval",
            action,
            receipt.number,
            receipt.required_role.as_deref().unwrap_or("manual")
        );
        println!("   Transaction ID: {}", receipt.transaction_id);
        return;
    }

    println!("✅ {} {} ({})", action, receipt.number, receipt.approval_status);
    println!("   Source balance: {}", receipt.source_balance);
    if let Some(balance) = receipt.destination_balance {
        println!("   Destination balance: {}", balance);
    }
}

/// Open a new account
pub fn open_account(
    ctx: &AppContext,
    customer: Option<CustomerId>,
    currency: Option<Currency>,
    notify: bool,
) -> Result<AccountId, anyhow::Error> {
    let customer = customer.unwrap_or_else(CustomerId::new);
    let account = ctx.engine.open_account(customer, currency)?;
    if notify {
        ctx.engine.fanout().attach_all(account.id);
    }

    println!("✅ Opened {} account {}", account.currency, account.id);
    println!("   Customer: {}", customer);
    Ok(account.id)
}

/// Submit a deposit, withdrawal, transfer or fee
pub async fn submit(
    ctx: &AppContext,
    request: TransactionRequest,
) -> Result<TransactionReceipt, anyhow::Error> {
    let action = match request.kind {
        TransactionType::Deposit => "Deposit",
        TransactionType::Withdrawal => "Withdrawal",
        TransactionType::Transfer => "Transfer",
        TransactionType::Fee => "Fee",
    };
    let receipt = ctx.engine.submit(request).await?;
    print_receipt(action, &receipt);
    Ok(receipt)
}

/// Approve a pending transaction
pub async fn approve(
    ctx: &AppContext,
    id: TransactionId,
    approver: Actor,
    comment: Option<String>,
) -> Result<TransactionReceipt, anyhow::Error> {
    let receipt = ctx
        .engine
        .approve_transaction(id, &approver, comment)
        .await?;
    print_receipt(&format!("Approved by {}:", approver.id), &receipt);
    Ok(receipt)
}

/// Reject a pending transaction
pub async fn reject(
    ctx: &AppContext,
    id: TransactionId,
    rejecter: Actor,
    reason: Option<String>,
) -> Result<TransactionReceipt, anyhow::Error> {
    let receipt = ctx
        .engine
        .reject_transaction(id, &rejecter, reason)
        .await?;
    println!("🚫 Rejected {} by {}", receipt.number, rejecter.id);
    Ok(receipt)
}

/// Show the approval state of a transaction
pub fn status(ctx: &AppContext, id: TransactionId, json: bool) -> Result<(), anyhow::Error> {
    let result = ctx.engine.approval_status(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Transaction {}: {}", id, result.status);
    println!("   Handler: {}", result.handler);
    if let Some(role) = &result.required_role {
        println!("   Required role: {}", role);
    }
    if let Some(by) = &result.decided_by {
        println!("   Decided by: {} at {}", by, result.decided_at);
    }
    if let Some(comment) = &result.comment {
        println!("   Comment: {}", comment);
    }
    Ok(())
}

/// List transactions awaiting approval
pub fn pending(ctx: &AppContext, role: Option<&str>) -> Result<(), anyhow::Error> {
    let pending: Vec<_> = ctx
        .engine
        .pending_approvals()
        .into_iter()
        .filter(|review| role.map_or(true, |r| review.required_role.as_deref() == Some(r)))
        .collect();

    if pending.is_empty() {
        println!("No transactions awaiting approval");
    } else {
        println!("Pending approvals:");
        for review in &pending {
            println!(
                "  {} {} {} {} (role: {}, requested by {})",
                review.id,
                review.kind,
                review.amount,
                review.currency,
                review.required_role.as_deref().unwrap_or("-"),
                review.requested_by
            );
        }
    }

    let stats = ctx.engine.approval_stats()?;
    println!(
        "Totals: {} pending, {} auto-approved, {} approved, {} rejected",
        stats.pending, stats.auto_approved, stats.approved, stats.rejected
    );
    Ok(())
}

/// Show one account, or all accounts
pub fn balance(ctx: &AppContext, account: Option<AccountId>) -> Result<(), anyhow::Error> {
    let accounts = match account {
        Some(id) => vec![ctx.engine.account(id)?],
        None => ctx.engine.accounts()?,
    };

    if accounts.is_empty() {
        println!("No accounts");
        return Ok(());
    }

    for account in accounts {
        println!(
            "{} {} {} [{}]",
            account.id,
            account.balance(),
            account.currency,
            account.state
        );
    }
    Ok(())
}

/// Account lifecycle transition
pub async fn set_state(
    ctx: &AppContext,
    id: AccountId,
    transition: StateChange,
) -> Result<(), anyhow::Error> {
    let account = match transition {
        StateChange::Suspend => ctx.engine.suspend_account(id).await?,
        StateChange::Activate => ctx.engine.activate_account(id).await?,
        StateChange::Close => ctx.engine.close_account(id).await?,
    };
    println!("✅ Account {} is now {}", account.id, account.state);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Suspend,
    Activate,
    Close,
}
