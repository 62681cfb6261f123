//! A single backup cycle.
//!

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    archive::{ArchiveError, archive_volumes, compose_bundle},
    artifact::{
        Artifact, DUMP_FILE_NAME, VOLUMES_FILE_NAME, artifact_name, cycle_timestamp, megabytes,
    },
    config::Config,
    context::Context,
    dump::{DumpError, dump_database},
    encrypt::{EncryptionError, encrypt_archive},
    notify::{NotificationEvent, Notifier},
    remote::{Rclone, RemoteStorage},
    retention::{sweep_local, sweep_remote},
    upload::{UploadError, upload_artifact},
};

/// The outcome of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    /// The cycle's `YYYYMMDD-HHMMSS` timestamp.
    pub timestamp: String,

    /// The final artifact.
    pub artifact: Artifact,

    /// The final artifact's size in bytes.
    pub size_bytes: u64,

    /// The destinations the artifact was uploaded to.
    pub destinations: Vec<String>,

    /// If the local artifact was removed after uploading.
    pub local_deleted: bool,
}

impl BackupReport {
    fn body(&self) -> String {
        let destinations = if self.destinations.is_empty() {
            "local only".to_string()
        } else {
            self.destinations.join(",")
        };

        format!(
            "Backup completed successfully.\n\nFile: {}\nSize: {:.1} MB\nEncrypted: {}\nDestinations: {}",
            self.artifact.file_name(),
            megabytes(self.size_bytes),
            if self.artifact.encrypted { "Yes" } else { "No" },
            destinations
        )
    }
}

/// A cycle's working directory, removed with everything in it when dropped.
#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
}

impl WorkingDirectory {
    /// Create the directory.
    pub fn create(path: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// The directory's path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }

        if let Err(error) = fs::remove_dir_all(&self.path) {
            warn!(
                "Could not remove working directory {:?}: {error}",
                self.path
            );
        }
    }
}

/// Everything a cycle needs, built once at startup.
pub struct Pipeline {
    config: Config,
    remote: Box<dyn RemoteStorage>,
    notifier: Notifier,
}

impl Pipeline {
    /// A pipeline using `rclone` and the notification channels in config.
    pub fn new(config: Config) -> Self {
        let remote = Rclone::new(&config.remote, config.subprocess_timeout());
        let notifier = Notifier::from_config(&config);

        Self::with_parts(config, Box::new(remote), notifier)
    }

    /// A pipeline with explicit remote storage and notifier.
    pub fn with_parts(config: Config, remote: Box<dyn RemoteStorage>, notifier: Notifier) -> Self {
        Self {
            config,
            remote,
            notifier,
        }
    }

    /// The pipeline's config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one backup cycle and report the outcome.
    ///
    /// The working directory is removed on every exit path. A notification is sent on both
    /// success and failure.
    pub fn run_backup(&self) -> Result<BackupReport, CycleError> {
        let timestamp = cycle_timestamp(Utc::now());
        let mut context = Context::new(&timestamp);

        let result = WorkingDirectory::create(
            self.config
                .backup_directory
                .join(format!("work-{timestamp}")),
        )
        .map_err(CycleError::WorkingDirectory)
        .and_then(|work| self.execute(&mut context, &timestamp, &work));

        match result {
            Ok(report) => {
                context.current_context = "Complete";
                self.notifier.notify(&NotificationEvent::success(
                    format!("n8n Backup Successful - {timestamp}"),
                    report.body(),
                ));
                info!(
                    "{context}Backup cycle complete: {}",
                    report.artifact.file_name()
                );
                Ok(report)
            }
            Err(cycle_error) => {
                context.current_context = "Failed";
                error!("{context}Backup failed: {cycle_error}");
                self.notifier.notify(&NotificationEvent::failure(
                    format!("n8n Backup FAILED - {timestamp}"),
                    format!("Backup failed with error:\n\n{cycle_error}"),
                ));
                Err(cycle_error)
            }
        }
    }

    fn execute(
        &self,
        context: &mut Context,
        timestamp: &str,
        work: &WorkingDirectory,
    ) -> Result<BackupReport, CycleError> {
        let config = &self.config;
        let timeout = config.subprocess_timeout();

        let dump_path = work.path().join(DUMP_FILE_NAME);
        dump_database(context, &config.postgres, &dump_path, timeout)?;

        let volumes_path = work.path().join(VOLUMES_FILE_NAME);
        archive_volumes(context, &volumes_path, &config.volume_paths)?;

        let bundle_path = config.backup_directory.join(artifact_name(timestamp));
        compose_bundle(context, &bundle_path, &[&dump_path, &volumes_path])?;

        let artifact = encrypt_archive(context, &config.encryption, &bundle_path, timeout)?;

        let destinations = &config.remote.destinations;
        upload_artifact(context, self.remote.as_ref(), &artifact, destinations)?;

        let size_bytes = fs::metadata(&artifact.path)
            .map_err(CycleError::ArtifactMetadata)?
            .len();

        // Only remove the local copy if some remote has one.
        let local_deleted = config.remote.delete_local_after_upload && !destinations.is_empty();
        if local_deleted {
            fs::remove_file(&artifact.path).map_err(CycleError::DeleteLocal)?;
            info!("{context}Local backup deleted after successful remote upload");
        }

        let retention = config.retention();
        if let Err(error) = sweep_local(
            context,
            &config.backup_directory,
            retention,
            SystemTime::now(),
        ) {
            warn!("{context}{error}");
        }
        sweep_remote(context, self.remote.as_ref(), destinations, retention);

        Ok(BackupReport {
            timestamp: timestamp.to_string(),
            artifact,
            size_bytes,
            destinations: destinations.clone(),
            local_deleted,
        })
    }
}

/// Errors that end a cycle.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Could not create working directory: {0}")]
    WorkingDirectory(#[source] io::Error),

    #[error("{0}")]
    Dump(#[from] DumpError),

    #[error("{0}")]
    Archive(#[from] ArchiveError),

    #[error("{0}")]
    Encryption(#[from] EncryptionError),

    #[error("{0}")]
    Upload(#[from] UploadError),

    #[error("Could not read the final archive: {0}")]
    ArtifactMetadata(#[source] io::Error),

    #[error("Could not delete the local backup after upload: {0}")]
    DeleteLocal(#[source] io::Error),
}
