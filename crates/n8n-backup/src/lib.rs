//! # n8n-backup
//! Scheduled PostgreSQL and volume backups for n8n.
//!

pub mod archive;
pub mod artifact;
pub mod config;
pub mod context;
pub mod cycle;
pub mod dump;
pub mod encrypt;
pub mod notify;
pub mod process;
pub mod remote;
pub mod retention;
pub mod schedule;
pub mod scheduler;
pub mod upload;

pub use config::Config;
pub use context::Context;
pub use cycle::{BackupReport, CycleError, Pipeline};
pub use schedule::Schedule;
pub use scheduler::Scheduler;
