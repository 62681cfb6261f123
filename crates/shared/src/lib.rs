//! # Shared
//! Logging and failure helpers shared by the backup binaries.
//!

#![warn(missing_docs)]

mod failure;
mod logger;

pub use failure::{Failure, log_and_panic};
pub use logger::{LoggerError, init_logger, parse_level};
