//! CoreBank Approval - Tiered approval chain and manual approval registry
//!
//! The chain classifies every new transaction by amount:
//! - below the auto-approval limit: AUTO_APPROVED, money moves immediately
//! - inside a role tier: PENDING until that role approves or rejects
//! - outside every tier: REJECTED
//!
//! PENDING transactions wait in the `ManualApprovalRegistry`.

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;

pub use chain::{AmountRange, ApprovalChain, ApprovalHandler};
pub use config::{ApprovalConfig, TierConfig, TierDecision};
pub use context::{ApprovalContext, ApprovalResult, NO_HANDLER};
pub use error::{ApprovalError, ChainError};
pub use registry::{ApprovalStats, ManualApprovalRegistry, PendingReview, ReviewSession};
