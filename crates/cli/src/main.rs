//! CoreBank CLI - Main entry point

use clap::{Args, Parser, Subcommand};
use corebank_cli::commands::{self, StateChange};
use corebank_cli::AppContext;
use corebank_core::{AccountId, Actor, Currency, CustomerId, TransactionId};
use corebank_engine::TransactionRequest;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corebank")]
#[command(about = "CoreBank - Accounts, transactions and approvals", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every money-moving command
#[derive(Args)]
struct RequestOpts {
    /// Requesting identity
    #[arg(long)]
    actor: Option<String>,
    /// Role of the requesting identity
    #[arg(long, default_value = "teller")]
    role: String,
    /// Idempotency reference (becomes the transaction number)
    #[arg(long)]
    reference: Option<String>,
    /// Free-text description
    #[arg(long)]
    description: Option<String>,
    /// Expected currency code
    #[arg(long)]
    currency: Option<Currency>,
}

impl RequestOpts {
    fn apply(self, mut request: TransactionRequest) -> TransactionRequest {
        if let Some(actor) = self.actor {
            request = request.by(Actor::new(actor, self.role));
        }
        if let Some(reference) = self.reference {
            request = request.with_reference(reference);
        }
        if let Some(description) = self.description {
            request = request.with_description(description);
        }
        if let Some(currency) = self.currency {
            request = request.in_currency(currency);
        }
        request
    }
}

/// Identity deciding a pending transaction
#[derive(Args)]
struct DeciderOpts {
    /// Deciding identity
    #[arg(long)]
    by: String,
    /// Role of the deciding identity
    #[arg(long, default_value = "manager")]
    role: String,
}

impl DeciderOpts {
    fn actor(self) -> Actor {
        Actor::new(self.by, self.role)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new account
    OpenAccount {
        /// Customer ID (a new one is generated if omitted)
        #[arg(long)]
        customer: Option<CustomerId>,
        /// Currency code (configured default if omitted)
        #[arg(long)]
        currency: Option<Currency>,
        /// Attach every notification channel to the account
        #[arg(long)]
        notify: bool,
    },

    /// Deposit funds
    Deposit {
        account: AccountId,
        amount: Decimal,
        #[command(flatten)]
        opts: RequestOpts,
    },

    /// Withdraw funds
    Withdraw {
        account: AccountId,
        amount: Decimal,
        #[command(flatten)]
        opts: RequestOpts,
    },

    /// Transfer funds between accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        #[command(flatten)]
        opts: RequestOpts,
    },

    /// Charge a fee
    Fee {
        account: AccountId,
        amount: Decimal,
        #[command(flatten)]
        opts: RequestOpts,
    },

    /// Approve a pending transaction
    Approve {
        transaction: TransactionId,
        #[command(flatten)]
        decider: DeciderOpts,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reject a pending transaction
    Reject {
        transaction: TransactionId,
        #[command(flatten)]
        decider: DeciderOpts,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show the approval state of a transaction
    Status {
        transaction: TransactionId,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions awaiting approval
    Pending {
        /// Only show transactions for this role
        #[arg(long)]
        role: Option<String>,
    },

    /// Show account balances
    Balance {
        /// Account ID (all accounts if omitted)
        account: Option<AccountId>,
    },

    /// Suspend an account
    Suspend { account: AccountId },

    /// Re-activate a suspended account
    Activate { account: AccountId },

    /// Close an account with zero balance
    Close { account: AccountId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Create application context
    let ctx = AppContext::new(&cli.data, cli.config.as_deref())?;

    match cli.command {
        Commands::OpenAccount {
            customer,
            currency,
            notify,
        } => {
            commands::open_account(&ctx, customer, currency, notify)?;
        }

        Commands::Deposit {
            account,
            amount,
            opts,
        } => {
            let request = opts.apply(TransactionRequest::deposit(account, amount));
            commands::submit(&ctx, request).await?;
        }

        Commands::Withdraw {
            account,
            amount,
            opts,
        } => {
            let request = opts.apply(TransactionRequest::withdrawal(account, amount));
            commands::submit(&ctx, request).await?;
        }

        Commands::Transfer {
            from,
            to,
            amount,
            opts,
        } => {
            let request = opts.apply(TransactionRequest::transfer(from, to, amount));
            commands::submit(&ctx, request).await?;
        }

        Commands::Fee {
            account,
            amount,
            opts,
        } => {
            let request = opts.apply(TransactionRequest::fee(account, amount));
            commands::submit(&ctx, request).await?;
        }

        Commands::Approve {
            transaction,
            decider,
            comment,
        } => {
            commands::approve(&ctx, transaction, decider.actor(), comment).await?;
        }

        Commands::Reject {
            transaction,
            decider,
            reason,
        } => {
            commands::reject(&ctx, transaction, decider.actor(), reason).await?;
        }

        Commands::Status { transaction, json } => {
            commands::status(&ctx, transaction, json)?;
        }

        Commands::Pending { role } => {
            commands::pending(&ctx, role.as_deref())?;
        }

        Commands::Balance { account } => {
            commands::balance(&ctx, account)?;
        }

        Commands::Suspend { account } => {
            commands::set_state(&ctx, account, StateChange::Suspend).await?;
        }

        Commands::Activate { account } => {
            commands::set_state(&ctx, account, StateChange::Activate).await?;
        }

        Commands::Close { account } => {
            commands::set_state(&ctx, account, StateChange::Close).await?;
        }
    }

    Ok(())
}
