//! Remote storage for backups.
//!

use core::time::Duration;
use std::{
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;

use crate::{
    config::RemoteConfig,
    process::{ProcessError, run_tool},
};

/// A place backups can be copied to and pruned from.
pub trait RemoteStorage {
    /// Copy a local file to `remote`.
    fn copy_to(&self, local: &Path, remote: &str) -> Result<(), RemoteError>;

    /// Delete files under `remote` matching `include` that are at least `min_age_days` old.
    fn delete_older_than(
        &self,
        remote: &str,
        min_age_days: i64,
        include: &str,
    ) -> Result<(), RemoteError>;
}

/// Remote storage through the `rclone` CLI.
#[derive(Debug, Clone)]
pub struct Rclone {
    /// The `rclone` executable.
    pub command: PathBuf,

    /// The rclone config file.
    pub config_file: PathBuf,

    /// Limit for each invocation.
    pub timeout: Duration,
}

impl Rclone {
    /// Create from the remote config.
    pub fn new(remote: &RemoteConfig, timeout: Duration) -> Self {
        Self {
            command: remote.rclone_command.clone(),
            config_file: remote.rclone_config.clone(),
            timeout,
        }
    }

    fn command(&self, operation: &str) -> Command {
        let mut command = Command::new(&self.command);
        command.arg(operation);
        command
    }
}

impl RemoteStorage for Rclone {
    fn copy_to(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut command = self.command("copyto");
        command
            .arg(local)
            .arg(remote)
            .arg("--config")
            .arg(&self.config_file);

        run_tool(&mut command, None, self.timeout)?;
        Ok(())
    }

    fn delete_older_than(
        &self,
        remote: &str,
        min_age_days: i64,
        include: &str,
    ) -> Result<(), RemoteError> {
        let mut command = self.command("delete");
        command
            .arg(remote)
            .arg("--config")
            .arg(&self.config_file)
            .args(["--min-age", &format!("{min_age_days}d")])
            .args(["--include", include]);

        run_tool(&mut command, None, self.timeout)?;
        Ok(())
    }
}

/// Join a destination and an object name.
pub fn remote_path(destination: &str, name: &str) -> String {
    if destination.ends_with('/') || destination.ends_with(':') {
        format!("{destination}{name}")
    } else {
        format!("{destination}/{name}")
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("rclone {0}")]
    Tool(#[from] ProcessError),
}
