//! Database dumps with `pg_dump`.
//!

use core::time::Duration;
use std::{fs, io, path::Path, process::Command};

use thiserror::Error;
use tracing::info;

use crate::{
    artifact::{file_name, megabytes},
    config::PostgresConfig,
    context::Context,
    process::{ProcessError, run_tool},
};

/// Dump the configured database to `output` in `pg_dump`'s custom format.
///
/// The password is handed to the tool through `PGPASSWORD`, never as an argument. Returns the
/// size of the dump in bytes.
pub fn dump_database(
    context: &mut Context,
    postgres: &PostgresConfig,
    output: &Path,
    timeout: Duration,
) -> Result<u64, DumpError> {
    context.current_context = "Dump";
    info!(
        "{context}Starting PostgreSQL backup of database '{}' on host '{}'",
        postgres.database, postgres.host
    );

    let mut command = Command::new(&postgres.pg_dump_command);
    command
        .args(["-h", &postgres.host])
        .args(["-U", &postgres.user])
        .args(["-d", &postgres.database])
        .arg("-Fc")
        .arg("-f")
        .arg(output)
        .env("PGPASSWORD", postgres.password.expose());

    run_tool(&mut command, None, timeout)?;

    let size = fs::metadata(output).map_err(DumpError::Output)?.len();
    info!(
        "{context}PostgreSQL backup complete: {} ({:.1} MB)",
        file_name(output),
        megabytes(size)
    );

    Ok(size)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("pg_dump {0}")]
    Tool(#[from] ProcessError),

    #[error("pg_dump did not produce its output file: {0}")]
    Output(#[source] io::Error),
}
