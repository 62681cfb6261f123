//! Email notifications over SMTP.
//!

use core::time::Duration;

use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::{Config, Secret};

use super::{NotificationChannel, NotificationError, NotificationEvent};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Plain text email over SMTP with STARTTLS.
#[derive(Debug, Clone)]
pub struct EmailChannel {
    host: String,
    port: u16,
    user: String,
    password: Secret,
    from: String,
    to: Vec<String>,
}

impl EmailChannel {
    /// The email channel, if a host and at least one recipient are configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let smtp = &config.notifications.smtp;

        let to: Vec<String> = smtp
            .to
            .split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect();

        if smtp.host.is_empty() || to.is_empty() {
            return None;
        }

        let from = if smtp.user.is_empty() {
            format!("n8n-backup@{}", config.postgres.host)
        } else {
            smtp.user.clone()
        };

        Some(Self {
            host: smtp.host.clone(),
            port: smtp.port,
            user: smtp.user.clone(),
            password: smtp.password.clone(),
            from,
            to,
        })
    }

    /// Build the email for an event.
    pub fn message(&self, event: &NotificationEvent) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .subject(event.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        for address in &self.to {
            builder = builder.to(parse_mailbox(address)?);
        }

        Ok(builder.body(event.body.clone())?)
    }

    fn transport(&self) -> Result<SmtpTransport, NotificationError> {
        let mut builder = SmtpTransport::starttls_relay(&self.host)?
            .port(self.port)
            .timeout(Some(SMTP_TIMEOUT));

        if !self.user.is_empty() && !self.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.user.clone(),
                self.password.expose().to_string(),
            ));
        }

        Ok(builder.build())
    }
}

impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "Email"
    }

    fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let message = self.message(event)?;
        self.transport()?.send(&message)?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::Address(e, address.to_string()))
}
