//! Compressed tar archives.
//!

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use tar::Builder;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    artifact::{file_name, megabytes},
    context::Context,
};

/// Archive each source directory under its own name.
///
/// Directories that are missing or empty are skipped. Returns the names that were added.
pub fn archive_volumes(
    context: &mut Context,
    output: &Path,
    sources: &[PathBuf],
) -> Result<Vec<String>, ArchiveError> {
    context.current_context = "Archive";
    info!("{context}Archiving n8n volume data");

    let mut builder = create_builder(output)?;
    let mut added = Vec::new();

    for source in sources {
        let name = entry_name(source)?;

        if !has_entries(source) {
            debug!("{context}Skipping {name} (empty or missing)");
            continue;
        }

        builder
            .append_dir_all(&name, source)
            .map_err(|e| ArchiveError::Append(e, source.clone()))?;
        info!("{context}Added {name}");
        added.push(name);
    }

    let size = finish(builder, output)?;
    info!(
        "{context}Volume archive complete: {} ({:.1} MB)",
        file_name(output),
        megabytes(size)
    );

    Ok(added)
}

/// Bundle files into one archive, each as a top level entry named by its file name.
///
/// A partially written bundle is removed on failure.
pub fn compose_bundle(
    context: &mut Context,
    output: &Path,
    members: &[&Path],
) -> Result<u64, ArchiveError> {
    context.current_context = "Bundle";

    let result = write_bundle(output, members);
    if result.is_err() && output.exists() {
        if let Err(error) = fs::remove_file(output) {
            warn!("{context}Could not remove partial archive {output:?}: {error}");
        }
    }

    let size = result?;
    info!(
        "{context}Final archive: {} ({:.1} MB)",
        file_name(output),
        megabytes(size)
    );

    Ok(size)
}

fn write_bundle(output: &Path, members: &[&Path]) -> Result<u64, ArchiveError> {
    let mut builder = create_builder(output)?;

    for member in members {
        let name = entry_name(member)?;
        builder
            .append_path_with_name(member, &name)
            .map_err(|e| ArchiveError::Append(e, member.to_path_buf()))?;
    }

    finish(builder, output)
}

fn create_builder(output: &Path) -> Result<Builder<GzEncoder<File>>, ArchiveError> {
    let file = File::create(output).map_err(|e| ArchiveError::Create(e, output.to_path_buf()))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    Ok(builder)
}

fn finish(builder: Builder<GzEncoder<File>>, output: &Path) -> Result<u64, ArchiveError> {
    let encoder = builder.into_inner().map_err(ArchiveError::Finish)?;
    let file = encoder.finish().map_err(ArchiveError::Finish)?;
    file.sync_all().map_err(ArchiveError::Finish)?;

    let size = fs::metadata(output).map_err(ArchiveError::Finish)?.len();
    Ok(size)
}

fn entry_name(path: &Path) -> Result<String, ArchiveError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ArchiveError::NoName(path.to_path_buf()))
}

/// If `path` is a directory with at least one entry.
fn has_entries(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to create archive {1:?}: {0}")]
    Create(#[source] io::Error, PathBuf),

    #[error("Failed to add {1:?} to archive: {0}")]
    Append(#[source] io::Error, PathBuf),

    #[error("Failed to finish archive: {0}")]
    Finish(#[source] io::Error),

    #[error("Path {0:?} has no file name")]
    NoName(PathBuf),
}
