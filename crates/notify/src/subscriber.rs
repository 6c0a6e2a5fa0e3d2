//! Subscriber trait and composite subscribers

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::error::NotifyError;
use crate::event::AccountEvent;

/// Receives account events.
///
/// The name identifies a subscriber within one account's list; attaching a
/// second subscriber with the same name is a no-op.
#[async_trait]
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, event: &AccountEvent) -> Result<(), NotifyError>;
}

/// Call a subscriber, reporting a panic inside `handle` as
/// `SubscriberFailed` instead of unwinding into the publisher.
pub async fn deliver(subscriber: &dyn Subscriber, event: &AccountEvent) -> Result<(), NotifyError> {
    match AssertUnwindSafe(subscriber.handle(event)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(NotifyError::failed(
            subscriber.name(),
            format!("panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// A named group of subscribers that acts as one.
///
/// Members are called in order. A failing member does not stop the rest; the
/// composite reports every failing member name afterwards.
pub struct CompositeSubscriber {
    name: String,
    members: Vec<Arc<dyn Subscriber>>,
}

impl CompositeSubscriber {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn with(mut self, member: Arc<dyn Subscriber>) -> Self {
        self.push(member);
        self
    }

    /// Add a member unless one with the same name is already there
    pub fn push(&mut self, member: Arc<dyn Subscriber>) {
        if self.members.iter().any(|m| m.name() == member.name()) {
            return;
        }
        self.members.push(member);
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Subscriber for CompositeSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &AccountEvent) -> Result<(), NotifyError> {
        let mut failed = Vec::new();

        for member in &self.members {
            if let Err(e) = deliver(member.as_ref(), event).await {
                tracing::warn!(
                    composite = %self.name,
                    subscriber = member.name(),
                    error = %e,
                    "Composite member failed"
                );
                failed.push(member.name().to_string());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::PartialDelivery {
                name: self.name.clone(),
                failed,
            })
        }
    }
}

impl std::fmt::Debug for CompositeSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeSubscriber")
            .field("name", &self.name)
            .field("members", &self.members().collect::<Vec<_>>())
            .finish()
    }
}
