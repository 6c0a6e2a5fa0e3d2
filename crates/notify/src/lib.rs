//! CoreBank Notify - Per-account notification fan-out
//!
//! Completed transactions and alerts become `AccountEvent`s. The
//! `FanoutRegistry` hands each event to the account's own subscribers, or to
//! the global subscribers when the account has none. Delivery is best effort:
//! a failing subscriber is logged and the rest still run.

pub mod channels;
pub mod error;
pub mod event;
pub mod registry;
pub mod subscriber;

pub use channels::{
    channel_catalog, standard_bundle, urgent_bundle, Channel, LogSubscriber, Outbox,
    OutboxMessage, OutboxSubscriber,
};
pub use error::NotifyError;
pub use event::{AccountEvent, AccountEventKind};
pub use registry::{DeliveryReport, FanoutRegistry};
pub use subscriber::{deliver, CompositeSubscriber, Subscriber};
