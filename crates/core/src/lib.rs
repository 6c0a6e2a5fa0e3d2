//! CoreBank Core - Domain types
//!
//! This crate contains the fundamental types used across CoreBank:
//! - `Amount`: Strictly positive decimal for transaction amounts
//! - `Currency`: Currency codes
//! - `AccountId`, `CustomerId`, `TransactionId`: ordered UUID ids
//! - `Actor`: opaque acting identity used for attribution
//! - `KeyedLocks`: per-key async critical sections

pub mod actor;
pub mod amount;
pub mod currency;
pub mod id;
pub mod locks;

pub use actor::Actor;
pub use amount::{Amount, AmountError};
pub use currency::{Currency, CurrencyError};
pub use id::{AccountId, CustomerId, TransactionId};
pub use locks::{KeyGuard, KeyedLocks};
