//! Removal of expired backups.
//!

use core::time::Duration;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    artifact::{ARTIFACT_PATTERN, ARTIFACT_PREFIX},
    context::Context,
    remote::RemoteStorage,
};

const SECONDS_PER_DAY: u64 = 60 * 60 * 24;

/// How many days backups are kept for.
///
/// A window of zero or less disables cleanup entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    days: i64,
}

impl RetentionWindow {
    /// A window of `days` days.
    pub fn days(days: i64) -> Self {
        Self { days }
    }

    /// The configured number of days.
    pub fn as_days(&self) -> i64 {
        self.days
    }

    /// If backups ever expire.
    pub fn is_enabled(&self) -> bool {
        self.days > 0
    }

    /// Backups modified before this instant have expired.
    ///
    /// `None` if cleanup is disabled or the cutoff is before the epoch.
    pub fn cutoff(&self, now: SystemTime) -> Option<SystemTime> {
        let days = u64::try_from(self.days).ok().filter(|days| *days > 0)?;
        let age = Duration::from_secs(days.checked_mul(SECONDS_PER_DAY)?);
        now.checked_sub(age)
    }
}

/// Remove local backups in `directory` last modified strictly before `now - window`.
///
/// A backup modified exactly at the cutoff is kept. Returns the number removed.
pub fn sweep_local(
    context: &mut Context,
    directory: &Path,
    window: RetentionWindow,
    now: SystemTime,
) -> Result<usize, RetentionError> {
    context.current_context = "Local Cleanup";

    let Some(cutoff) = window.cutoff(now) else {
        return Ok(0);
    };

    let entries = fs::read_dir(directory)
        .map_err(|e| RetentionError::ReadDirectory(e, directory.to_path_buf()))?;

    // Collect the expired backups that can be accessed.
    let expired: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!("{context}Could not read entry: {error}");
                    return None;
                }
            };

            if !entry
                .file_name()
                .to_string_lossy()
                .starts_with(ARTIFACT_PREFIX)
            {
                return None;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(error) => {
                    warn!("{context}Could not get entry '{path:?}' metadata: {error}");
                    return None;
                }
            };

            if !metadata.is_file() {
                return None;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(error) => {
                    warn!("{context}Could not get entry '{path:?}' modified time: {error}");
                    return None;
                }
            };

            (modified < cutoff).then_some(path)
        })
        .collect();

    let mut removed = 0;
    for path in expired {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("{context}Removed old backup: {path:?}");
                removed += 1;
            }
            Err(error) => warn!("{context}Could not remove old backup {path:?}: {error}"),
        }
    }

    if removed > 0 {
        info!("{context}Cleaned up {removed} old local backup(s)");
    }

    Ok(removed)
}

/// Remove expired backups from every destination.
///
/// A failing destination is logged and the rest are still swept. Returns the number of
/// destinations that failed.
pub fn sweep_remote(
    context: &mut Context,
    remote: &dyn RemoteStorage,
    destinations: &[String],
    window: RetentionWindow,
) -> usize {
    context.current_context = "Remote Cleanup";

    if !window.is_enabled() {
        return 0;
    }

    let mut failures = 0;
    for destination in destinations {
        info!("{context}Cleaning up old backups on {destination}");

        match remote.delete_older_than(destination, window.as_days(), ARTIFACT_PATTERN) {
            Ok(()) => info!("{context}Remote cleanup on {destination} complete"),
            Err(error) => {
                let error = RetentionError::Remote {
                    destination: destination.clone(),
                    source: error,
                };
                warn!("{context}{error}");
                failures += 1;
            }
        }
    }

    failures
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("Could not read backup directory {1:?}: {0}")]
    ReadDirectory(#[source] io::Error, PathBuf),

    #[error("Remote cleanup on '{destination}' failed: {source}")]
    Remote {
        destination: String,
        #[source]
        source: crate::remote::RemoteError,
    },
}
