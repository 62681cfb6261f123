//! Backup service config
//!

use core::{fmt, time::Duration};
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retention::RetentionWindow;

/// A string that must never be written to logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// If no secret was configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "Secret(<empty>)")
        } else {
            write!(f, "Secret(<redacted>)")
        }
    }
}

/// The database to dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// The database host.
    pub host: String,

    /// The database name.
    pub database: String,

    /// The user to connect as.
    pub user: String,

    /// The user's password, passed to the dump tool through `PGPASSWORD`.
    pub password: Secret,

    /// The `pg_dump` executable.
    pub pg_dump_command: PathBuf,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "postgres".to_string(),
            database: "n8n".to_string(),
            user: "postgres".to_string(),
            password: Secret::default(),
            pg_dump_command: PathBuf::from("pg_dump"),
        }
    }
}

/// Symmetric encryption of the final archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// The passphrase, encryption is disabled if empty.
    pub key: Secret,

    /// The `gpg` executable.
    pub gpg_command: PathBuf,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key: Secret::default(),
            gpg_command: PathBuf::from("gpg"),
        }
    }
}

/// Remote destinations for the final archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// The rclone destinations, in upload order.
    pub destinations: Vec<String>,

    /// The rclone config file.
    pub rclone_config: PathBuf,

    /// The `rclone` executable.
    pub rclone_command: PathBuf,

    /// Remove the local archive once every destination has a copy.
    pub delete_local_after_upload: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            rclone_config: PathBuf::from("/config/rclone/rclone.conf"),
            rclone_command: PathBuf::from("rclone"),
            delete_local_after_upload: false,
        }
    }
}

/// SMTP settings for email notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// The SMTP relay, email is disabled if empty.
    pub host: String,

    /// The SMTP port, STARTTLS is always used.
    pub port: u16,

    /// The login user, also used as the sender address.
    pub user: String,

    /// The login password.
    pub password: Secret,

    /// Comma separated recipients.
    pub to: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            user: String::new(),
            password: Secret::default(),
            to: String::new(),
        }
    }
}

/// Notification channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// The webhook to POST events to, disabled if empty.
    pub webhook_url: String,

    /// Email settings.
    pub smtp: SmtpConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// The minimum level to log.
    pub level: String,

    /// Directory for rolling log files, stdout only if unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// The backup service's config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cron expression for backups, evaluated in UTC.
    pub schedule: String,

    /// Run a backup as soon as the service starts.
    pub run_on_start: bool,

    /// Days to keep backups for, `<= 0` keeps them forever.
    pub retention_days: i64,

    /// Where final archives and working directories are written.
    pub backup_directory: PathBuf,

    /// The data directories to archive.
    pub volume_paths: Vec<PathBuf>,

    /// Limit for each external tool invocation.
    pub subprocess_timeout_seconds: u64,

    /// The database to dump.
    pub postgres: PostgresConfig,

    /// Encryption of the final archive.
    pub encryption: EncryptionConfig,

    /// Remote destinations.
    pub remote: RemoteConfig,

    /// Notification channels.
    pub notifications: NotificationConfig,

    /// Logging.
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: "0 2 * * *".to_string(),
            run_on_start: false,
            retention_days: 30,
            backup_directory: PathBuf::from("/backups"),
            volume_paths: vec![
                PathBuf::from("/data/n8n_main"),
                PathBuf::from("/data/n8n_webhook"),
            ],
            subprocess_timeout_seconds: 600,
            postgres: PostgresConfig::default(),
            encryption: EncryptionConfig::default(),
            remote: RemoteConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile);
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Override values from environment variables.
    ///
    /// `lookup` returns the value of a variable if it is set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), LoadConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("POSTGRES_HOST") {
            self.postgres.host = value;
        }
        if let Some(value) = lookup("POSTGRES_DB") {
            self.postgres.database = value;
        }
        if let Some(value) = lookup("POSTGRES_USER") {
            self.postgres.user = value;
        }
        if let Some(value) = lookup("POSTGRES_PASSWORD") {
            self.postgres.password = Secret::new(value);
        }

        if let Some(value) = lookup("BACKUP_SCHEDULE") {
            self.schedule = value;
        }
        if let Some(value) = lookup("BACKUP_RETENTION_DAYS") {
            self.retention_days = parse_number("BACKUP_RETENTION_DAYS", &value)?;
        }
        if let Some(value) = lookup("BACKUP_ENCRYPTION_KEY") {
            self.encryption.key = Secret::new(value);
        }
        if let Some(value) = lookup("BACKUP_RCLONE_DESTINATIONS") {
            self.remote.destinations = parse_destinations(&value);
        }
        if let Some(value) = lookup("BACKUP_RUN_ON_START") {
            self.run_on_start = parse_bool(&value);
        }
        if let Some(value) = lookup("BACKUP_DELETE_LOCAL_AFTER_UPLOAD") {
            self.remote.delete_local_after_upload = parse_bool(&value);
        }
        if let Some(value) = lookup("BACKUP_WEBHOOK_URL") {
            self.notifications.webhook_url = value;
        }

        let smtp = &mut self.notifications.smtp;
        if let Some(value) = lookup("SMTP_HOST") {
            smtp.host = value;
        }
        if let Some(value) = lookup("SMTP_PORT") {
            smtp.port = parse_number("SMTP_PORT", &value)?;
        }
        if let Some(value) = lookup("SMTP_USER") {
            smtp.user = value;
        }
        if let Some(value) = lookup("SMTP_PASSWORD") {
            smtp.password = Secret::new(value);
        }
        if let Some(value) = lookup("SMTP_TO") {
            smtp.to = value;
        }

        if let Some(value) = lookup("LOG_LEVEL") {
            self.logging.level = value;
        }

        Ok(())
    }

    /// The retention window for backups.
    pub fn retention(&self) -> RetentionWindow {
        RetentionWindow::days(self.retention_days)
    }

    /// The limit for each external tool invocation.
    pub fn subprocess_timeout(&self) -> Duration {
        Duration::from_secs(self.subprocess_timeout_seconds)
    }

    /// The destinations, or `local only` if there are none.
    pub fn destinations_summary(&self) -> String {
        if self.remote.destinations.is_empty() {
            "local only".to_string()
        } else {
            self.remote.destinations.join(",")
        }
    }
}

/// Split a comma separated list of destinations, dropping blank entries.
pub fn parse_destinations(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|destination| !destination.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_number<T: core::str::FromStr>(
    name: &'static str,
    value: &str,
) -> Result<T, LoadConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| LoadConfigError::InvalidVariable(name, value.to_string()))
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file does not exist.")]
    NoFile,

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Environment variable {0} has an invalid value '{1}'")]
    InvalidVariable(&'static str, String),
}
