//! CoreBank CLI - Operator command line
//!
//! This crate provides the `corebank` binary and its command handlers.

pub mod commands;
pub mod context;

pub use context::AppContext;
