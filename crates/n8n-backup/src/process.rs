//! Running external tools with a time limit.
//!

use core::time::Duration;
use std::{
    io::{self, ErrorKind, Read, Write},
    process::{Command, Stdio},
    thread,
};

use thiserror::Error;
use wait_timeout::ChildExt;

/// Run a tool to completion or until `timeout` passes.
///
/// Stdout is discarded and stderr is captured. If `input` is set it is written to the tool's
/// stdin, which is then closed. The tool is killed if it does not finish in time.
pub fn run_tool(
    command: &mut Command,
    input: Option<&[u8]>,
    timeout: Duration,
) -> Result<(), ProcessError> {
    let stdin = if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    };

    let mut child = command
        .stdin(stdin)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ProcessError::Spawn)?;

    // Drain stderr on its own thread so a chatty tool can't block on a full pipe.
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).trim().to_string()
        })
    });

    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        // The tool may exit without reading its input, the exit status reports that.
        match stdin.write_all(input) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::BrokenPipe => {}
            Err(error) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::WriteInput(error));
            }
        }
    }

    let status = match child.wait_timeout(timeout).map_err(ProcessError::Wait)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProcessError::TimedOut(timeout.as_secs()));
        }
    };

    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();

    if status.success() {
        return Ok(());
    }

    Err(ProcessError::Exited {
        code: status.code(),
        stderr,
    })
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not be started: {0}")]
    Spawn(#[source] io::Error),

    #[error("could not be given its input: {0}")]
    WriteInput(#[source] io::Error),

    #[error("could not be waited on: {0}")]
    Wait(#[source] io::Error),

    #[error("timed out after {0}s")]
    TimedOut(u64),

    #[error("failed (exit {}): {stderr}", exit_label(.code))]
    Exited { code: Option<i32>, stderr: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl ProcessError {
    /// The tool's exit code, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited { code, .. } => *code,
            _ => None,
        }
    }

    /// The tool's captured stderr, if it ran to completion.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exited { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
