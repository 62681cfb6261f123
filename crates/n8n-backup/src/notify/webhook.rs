//! Webhook notifications as JSON POST requests.
//!

use core::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;

use crate::config::NotificationConfig;

use super::{EventKind, NotificationChannel, NotificationError, NotificationEvent};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON body POSTed to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    /// `backup_success` or `backup_error`.
    pub event: EventKind,

    /// The subject line.
    pub subject: &'a str,

    /// The plain text body.
    pub body: &'a str,

    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
}

impl<'a> From<&'a NotificationEvent> for WebhookPayload<'a> {
    fn from(event: &'a NotificationEvent) -> Self {
        Self {
            event: event.kind,
            subject: &event.subject,
            body: &event.body,
            timestamp: event.timestamp.to_rfc3339(),
        }
    }
}

/// POST events as JSON to a URL.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    url: String,
}

impl WebhookChannel {
    /// A channel posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The webhook channel, if a URL is configured.
    pub fn from_config(notifications: &NotificationConfig) -> Option<Self> {
        let url = notifications.webhook_url.trim();
        (!url.is_empty()).then(|| Self::new(url))
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "Webhook"
    }

    fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;

        client
            .post(&self.url)
            .json(&WebhookPayload::from(event))
            .send()?
            .error_for_status()?;

        Ok(())
    }
}
