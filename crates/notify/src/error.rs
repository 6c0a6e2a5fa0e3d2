//! Notification errors

use thiserror::Error;

/// Errors a subscriber can report while handling an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Subscriber '{name}' failed: {reason}")]
    SubscriberFailed { name: String, reason: String },

    #[error("Channel '{0}' is unavailable")]
    ChannelUnavailable(String),

    #[error("Composite '{name}' had failing members: {failed:?}")]
    PartialDelivery { name: String, failed: Vec<String> },
}

impl NotifyError {
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        NotifyError::SubscriberFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
