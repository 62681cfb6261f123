//! Success and failure notifications.
//!

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;

mod email;
mod webhook;

pub use email::EmailChannel;
pub use webhook::WebhookChannel;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// A cycle completed.
    #[serde(rename = "backup_success")]
    Success,

    /// A cycle failed.
    #[serde(rename = "backup_error")]
    Failure,
}

/// A notification to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// What the event is about.
    pub kind: EventKind,

    /// The subject line.
    pub subject: String,

    /// The plain text body.
    pub body: String,

    /// When the event happened.
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    /// A success event stamped now.
    pub fn success(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Success,
            subject: subject.into(),
            body: body.into(),
            timestamp: Utc::now(),
        }
    }

    /// A failure event stamped now.
    pub fn failure(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Failure,
            subject: subject.into(),
            body: body.into(),
            timestamp: Utc::now(),
        }
    }

    /// If this event reports a failure.
    pub fn is_error(&self) -> bool {
        self.kind == EventKind::Failure
    }
}

/// A way of delivering notifications.
pub trait NotificationChannel {
    /// The channel's name for logs.
    fn name(&self) -> &'static str;

    /// Deliver an event.
    fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError>;
}

/// Delivers events to every configured channel.
#[derive(Default)]
pub struct Notifier {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl Notifier {
    /// A notifier with the given channels.
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// A notifier with the channels enabled in config.
    pub fn from_config(config: &Config) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if let Some(email) = EmailChannel::from_config(config) {
            channels.push(Box::new(email));
        }

        if let Some(webhook) = WebhookChannel::from_config(&config.notifications) {
            channels.push(Box::new(webhook));
        }

        Self { channels }
    }

    /// The number of configured channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Attempt delivery on every channel.
    ///
    /// Failures are logged and never returned.
    pub fn notify(&self, event: &NotificationEvent) {
        for channel in &self.channels {
            match channel.deliver(event) {
                Ok(()) => info!("{} notification sent", channel.name()),
                Err(e) => error!("Failed to send {} notification: {e}", channel.name()),
            }
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid email address '{1}': {0}")]
    Address(#[source] lettre::address::AddressError, String),

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),

    /// For channels outside this crate that have no typed error of their own.
    #[error("{0}")]
    Other(String),
}
