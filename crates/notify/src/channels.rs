//! Built-in subscribers: tracing log and channel outboxes

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corebank_core::AccountId;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::NotifyError;
use crate::event::AccountEvent;
use crate::subscriber::{CompositeSubscriber, Subscriber};

/// Writes every event to the log
#[derive(Debug, Default)]
pub struct LogSubscriber;

#[async_trait]
impl Subscriber for LogSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, event: &AccountEvent) -> Result<(), NotifyError> {
        if event.is_urgent() {
            tracing::warn!(
                account = %event.account,
                kind = %event.kind,
                balance = %event.new_balance,
                "{}",
                event.message
            );
        } else {
            tracing::info!(
                account = %event.account,
                kind = %event.kind,
                balance = %event.new_balance,
                "{}",
                event.message
            );
        }
        Ok(())
    }
}

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Email,
    Sms,
    InApp,
    Audit,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Sms, Channel::InApp, Channel::Audit];

    /// Render an event the way this channel would send it
    pub fn render(&self, event: &AccountEvent) -> String {
        match self {
            Channel::Email => format!(
                "Subject: {}\n\n{}\nAccount: {}",
                event.kind, event.message, event.account
            ),
            // SMS stays short
            Channel::Sms => {
                let mut text = format!("CoreBank: {}", event.message);
                if text.chars().count() > 160 {
                    text = text.chars().take(157).collect::<String>() + "...";
                }
                text
            }
            Channel::InApp => event.message.clone(),
            Channel::Audit => format!(
                "{} {} account={} tx={} amount={} {} -> {}",
                event.timestamp.to_rfc3339(),
                event.kind,
                event.account,
                event.transaction_number.as_deref().unwrap_or("-"),
                event.amount,
                event.previous_balance,
                event.new_balance
            ),
        }
    }
}

/// One rendered message waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub channel: Channel,
    pub account: AccountId,
    pub body: String,
    pub queued_at: DateTime<Utc>,
}

/// Shared in-memory outbox.
///
/// Delivery to real gateways happens elsewhere; this holds what would be sent.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Mutex<Vec<OutboxMessage>>,
}

impl Outbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, message: OutboxMessage) -> Result<(), NotifyError> {
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| NotifyError::ChannelUnavailable(message.channel.to_string()))?;
        messages.push(message);
        Ok(())
    }

    /// Copy of everything queued so far
    pub fn messages(&self) -> Vec<OutboxMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn for_channel(&self, channel: Channel) -> Vec<OutboxMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.channel == channel)
            .collect()
    }

    /// Remove and return everything queued
    pub fn drain(&self) -> Vec<OutboxMessage> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders events for one channel into an outbox
#[derive(Debug, Clone)]
pub struct OutboxSubscriber {
    name: String,
    channel: Channel,
    outbox: Arc<Outbox>,
}

impl OutboxSubscriber {
    pub fn new(channel: Channel, outbox: Arc<Outbox>) -> Self {
        Self {
            name: channel.to_string(),
            channel,
            outbox,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

#[async_trait]
impl Subscriber for OutboxSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &AccountEvent) -> Result<(), NotifyError> {
        self.outbox.push(OutboxMessage {
            channel: self.channel,
            account: event.account,
            body: self.channel.render(event),
            queued_at: Utc::now(),
        })
    }
}

/// Email, SMS and in-app
pub fn urgent_bundle(outbox: &Arc<Outbox>) -> CompositeSubscriber {
    bundle("urgent", &[Channel::Email, Channel::Sms, Channel::InApp], outbox)
}

/// Email and in-app
pub fn standard_bundle(outbox: &Arc<Outbox>) -> CompositeSubscriber {
    bundle("standard", &[Channel::Email, Channel::InApp], outbox)
}

fn bundle(name: &str, channels: &[Channel], outbox: &Arc<Outbox>) -> CompositeSubscriber {
    channels.iter().fold(CompositeSubscriber::new(name), |composite, channel| {
        composite.with(Arc::new(OutboxSubscriber::new(*channel, Arc::clone(outbox))))
    })
}

/// One outbox subscriber per channel, for use as a registry catalog
pub fn channel_catalog(outbox: &Arc<Outbox>) -> Vec<Arc<dyn Subscriber>> {
    Channel::ALL
        .iter()
        .map(|channel| {
            Arc::new(OutboxSubscriber::new(*channel, Arc::clone(outbox))) as Arc<dyn Subscriber>
        })
        .collect()
}
