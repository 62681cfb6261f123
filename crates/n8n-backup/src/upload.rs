//! Upload the final archive to each destination.
//!

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    artifact::Artifact,
    context::Context,
    remote::{RemoteError, RemoteStorage, remote_path},
};

/// Upload `artifact` to every destination in order.
///
/// The first failure stops the upload, later destinations are not attempted. With no
/// destinations the backup stays local and nothing is contacted.
pub fn upload_artifact(
    context: &mut Context,
    remote: &dyn RemoteStorage,
    artifact: &Artifact,
    destinations: &[String],
) -> Result<(), UploadError> {
    context.current_context = "Upload";

    if destinations.is_empty() {
        warn!("{context}No rclone destinations configured. Backup saved locally only.");
        return Ok(());
    }

    let name = artifact.file_name();
    for destination in destinations {
        let target = remote_path(destination, &name);
        info!("{context}Uploading to {target}");

        remote
            .copy_to(&artifact.path, &target)
            .map_err(|source| UploadError {
                destination: destination.clone(),
                source,
            })?;

        info!("{context}Upload to {destination} complete");
    }

    Ok(())
}

/// An upload to a destination failed.
#[derive(Debug, Error)]
#[error("Upload to '{destination}' failed: {source}")]
pub struct UploadError {
    /// The destination that failed.
    pub destination: String,

    /// Why it failed.
    #[source]
    pub source: RemoteError,
}
