//! Symmetric encryption with `gpg`.
//!

use core::time::Duration;
use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    artifact::{Artifact, ENCRYPTED_EXTENSION, file_name, megabytes},
    config::EncryptionConfig,
    context::Context,
    process::{ProcessError, run_tool},
};

/// Encrypt `archive` with the configured passphrase.
///
/// Without a passphrase the archive is returned untouched. The plain archive is only removed
/// once `gpg` has exited successfully.
pub fn encrypt_archive(
    context: &mut Context,
    encryption: &EncryptionConfig,
    archive: &Path,
    timeout: Duration,
) -> Result<Artifact, EncryptionError> {
    if encryption.key.is_empty() {
        return Ok(Artifact::plain(archive.to_path_buf()));
    }

    context.current_context = "Encrypt";
    info!("{context}Encrypting backup archive");

    let encrypted = encrypted_path(archive);

    let mut command = Command::new(&encryption.gpg_command);
    command
        .args(["--batch", "--yes", "--symmetric"])
        .args(["--cipher-algo", "AES256"])
        .args(["--passphrase-fd", "0"])
        .arg("--output")
        .arg(&encrypted)
        .arg(archive);

    let result = run_tool(
        &mut command,
        Some(encryption.key.expose().as_bytes()),
        timeout,
    );
    if let Err(error) = result {
        // Leave only the plain archive, never a partial encrypted one.
        if encrypted.exists() {
            if let Err(remove_error) = fs::remove_file(&encrypted) {
                warn!("{context}Could not remove partial archive {encrypted:?}: {remove_error}");
            }
        }
        return Err(error.into());
    }

    let size = fs::metadata(&encrypted)
        .map_err(EncryptionError::Output)?
        .len();

    fs::remove_file(archive).map_err(EncryptionError::RemovePlain)?;

    info!(
        "{context}Encrypted archive: {} ({:.1} MB)",
        file_name(&encrypted),
        megabytes(size)
    );

    Ok(Artifact::encrypted(encrypted))
}

/// `archive` with the encrypted extension appended.
pub fn encrypted_path(archive: &Path) -> PathBuf {
    let mut path = OsString::from(archive.as_os_str());
    path.push(".");
    path.push(ENCRYPTED_EXTENSION);
    PathBuf::from(path)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("GPG encryption {0}")]
    Tool(#[from] ProcessError),

    #[error("GPG did not produce its output file: {0}")]
    Output(#[source] io::Error),

    #[error("Failed to remove the unencrypted archive: {0}")]
    RemovePlain(#[source] io::Error),
}
