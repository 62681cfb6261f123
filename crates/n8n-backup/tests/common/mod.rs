//! # common
//!
#![allow(dead_code)]

use std::{
    fs::{self, File},
    io::Read,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use flate2::read::GzDecoder;
use n8n_backup::{
    Config,
    notify::{NotificationChannel, NotificationError, NotificationEvent},
    process::ProcessError,
    remote::{RemoteError, RemoteStorage},
};

/// Write an executable shell script.
pub fn write_script(directory: &Path, name: &str, body: &str) -> PathBuf {
    let path = directory.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A `pg_dump` that writes a small dump and records its arguments and password.
pub fn fake_pg_dump(directory: &Path) -> PathBuf {
    write_script(
        directory,
        "pg_dump",
        r#"dir="$(dirname "$0")"
printf '%s\n' "$@" > "$dir/pg_dump.args"
printf '%s' "$PGPASSWORD" > "$dir/pg_dump.password"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-f" ]; then out="$2"; fi
  shift
done
printf 'PGDMP fake dump' > "$out""#,
    )
}

/// A `gpg` that prefixes the input, reads the passphrase from stdin and records its arguments.
pub fn fake_gpg(directory: &Path) -> PathBuf {
    write_script(
        directory,
        "gpg",
        r#"dir="$(dirname "$0")"
printf '%s\n' "$@" > "$dir/gpg.args"
IFS= read -r pass
printf '%s' "$pass" > "$dir/gpg.passphrase"
out=""
last=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  last="$1"
  shift
done
{ printf 'ENCRYPTED:'; cat "$last"; } > "$out""#,
    )
}

/// A `gpg` that writes part of its output and then runs `then`.
pub fn partial_gpg(directory: &Path, name: &str, then: &str) -> PathBuf {
    write_script(
        directory,
        name,
        &format!(
            r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  shift
done
printf 'half' > "$out"
{then}"#
        ),
    )
}

/// A tool that prints `stderr` and exits with `code`.
pub fn failing_tool(directory: &Path, name: &str, stderr: &str, code: i32) -> PathBuf {
    write_script(
        directory,
        name,
        &format!("echo \"{stderr}\" >&2\nexit {code}"),
    )
}

/// Layout of a test environment.
pub struct TestEnvironment {
    pub root: tempfile::TempDir,
    pub tools: PathBuf,
    pub backups: PathBuf,
    pub main_volume: PathBuf,
    pub webhook_volume: PathBuf,
}

impl TestEnvironment {
    /// Create the directories, with a populated main volume and an empty webhook volume.
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let tools = root.path().join("tools");
        let backups = root.path().join("backups");
        let main_volume = root.path().join("data").join("n8n_main");
        let webhook_volume = root.path().join("data").join("n8n_webhook");

        fs::create_dir_all(&tools).unwrap();
        fs::create_dir_all(main_volume.join("nodes")).unwrap();
        fs::create_dir_all(&webhook_volume).unwrap();
        fs::write(main_volume.join("config"), "{\"encryptionKey\":\"abc\"}").unwrap();
        fs::write(main_volume.join("nodes").join("package.json"), "{}").unwrap();

        Self {
            root,
            tools,
            backups,
            main_volume,
            webhook_volume,
        }
    }

    /// A config pointing at this environment with working fake tools.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.backup_directory = self.backups.clone();
        config.volume_paths = vec![self.main_volume.clone(), self.webhook_volume.clone()];
        config.subprocess_timeout_seconds = 30;
        config.postgres.pg_dump_command = fake_pg_dump(&self.tools);
        config.encryption.gpg_command = fake_gpg(&self.tools);
        config
    }

    /// Names in the backup directory.
    pub fn backup_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.backups)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Entry paths in a `.tar.gz`.
pub fn archive_entries(path: &Path) -> Vec<PathBuf> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    archive
        .entries()
        .unwrap()
        .map(|entry| entry.unwrap().path().unwrap().into_owned())
        .collect()
}

/// Extract a `.tar.gz` into `destination`.
pub fn extract(path: &Path, destination: &Path) {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    archive.unpack(destination).unwrap();
}

/// Read a whole file.
pub fn read(path: &Path) -> Vec<u8> {
    let mut contents = Vec::new();
    File::open(path)
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    contents
}

/// A call made to the recording remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CopyTo { local: PathBuf, remote: String },
    Delete {
        remote: String,
        min_age_days: i64,
        include: String,
    },
}

/// Remote storage that records calls and fails for selected destinations.
#[derive(Clone, Default)]
pub struct RecordingRemote {
    pub calls: Arc<Mutex<Vec<RemoteCall>>>,
    pub failing: Vec<String>,
}

impl RecordingRemote {
    pub fn failing(destinations: &[&str]) -> Self {
        Self {
            calls: Arc::default(),
            failing: destinations.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, remote: &str) -> Result<(), RemoteError> {
        match self.failing.iter().find(|d| remote.starts_with(d.as_str())) {
            Some(destination) => Err(RemoteError::Tool(ProcessError::Exited {
                code: Some(1),
                stderr: format!("{destination} is unreachable"),
            })),
            None => Ok(()),
        }
    }
}

impl RemoteStorage for RecordingRemote {
    fn copy_to(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(RemoteCall::CopyTo {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        self.check(remote)
    }

    fn delete_older_than(
        &self,
        remote: &str,
        min_age_days: i64,
        include: &str,
    ) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(RemoteCall::Delete {
            remote: remote.to_string(),
            min_age_days,
            include: include.to_string(),
        });
        self.check(remote)
    }
}

/// A notification channel that records events.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    pub events: Arc<Mutex<Vec<NotificationEvent>>>,
    pub fail: bool,
}

impl RecordingChannel {
    pub fn failing() -> Self {
        Self {
            events: Arc::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "Recording"
    }

    fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(NotificationError::Other("channel is down".to_string()));
        }
        Ok(())
    }
}
