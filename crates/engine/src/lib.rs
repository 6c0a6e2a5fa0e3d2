//! CoreBank Engine - Transaction orchestrator
//!
//! Flow: Validate → Classify (approval chain) → Lock → Move → Commit → Notify
//!
//! # Key Types
//! - `TransactionEngine`: deposits, withdrawals, transfers, fees and manual approval
//! - `EngineConfig`: approval tiers, low-balance threshold, default currency
//! - `TransactionError` / `ErrorKind`: failure taxonomy reported to callers

pub mod config;
pub mod engine;
pub mod error;
pub mod request;

pub use config::EngineConfig;
pub use engine::TransactionEngine;
pub use error::{ErrorKind, TransactionError, TransactionResult};
pub use request::{TransactionReceipt, TransactionRequest};
