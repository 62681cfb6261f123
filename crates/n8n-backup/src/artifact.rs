//! Backup artifact naming.
//!

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Every final archive starts with this.
pub const ARTIFACT_PREFIX: &str = "n8n-backup-";

/// The pattern the remote sweep passes to the storage backend.
pub const ARTIFACT_PATTERN: &str = "n8n-backup-*";

/// Extension added by encryption.
pub const ENCRYPTED_EXTENSION: &str = "gpg";

/// File name of the database dump inside the working directory.
pub const DUMP_FILE_NAME: &str = "database.dump";

/// File name of the volume archive inside the working directory.
pub const VOLUMES_FILE_NAME: &str = "volumes.tar.gz";

/// Format a cycle's timestamp as `YYYYMMDD-HHMMSS`.
pub fn cycle_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// The unencrypted archive name for a cycle.
pub fn artifact_name(timestamp: &str) -> String {
    format!("{ARTIFACT_PREFIX}{timestamp}.tar.gz")
}

/// The final file produced by a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Where the artifact is.
    pub path: PathBuf,

    /// If the artifact was encrypted.
    pub encrypted: bool,
}

impl Artifact {
    /// An unencrypted artifact.
    pub fn plain(path: PathBuf) -> Self {
        Self {
            path,
            encrypted: false,
        }
    }

    /// An encrypted artifact.
    pub fn encrypted(path: PathBuf) -> Self {
        Self {
            path,
            encrypted: true,
        }
    }

    /// The artifact's file name, used as the remote object name.
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

/// The final component of a path as a string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Size in MiB for log and report lines.
#[allow(clippy::as_conversions)]
pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
