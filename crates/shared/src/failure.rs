use core::fmt::Display;

use tracing::error;

/// Log `error` with `message` and panic with the same text.
///
/// Used for startup failures where there is nothing to fall back to.
pub fn log_and_panic<E: Display>(error: E, message: &str) -> ! {
    let text = format!("{message}: {error}");
    error!("{text}");
    panic!("{text}");
}

/// Unwrap a startup result or log and panic.
pub trait Failure<T> {
    /// The value, or log `message` with the error and panic.
    fn or_log_and_panic(self, message: &str) -> T;
}

impl<T, E: Display> Failure<T> for Result<T, E> {
    fn or_log_and_panic(self, message: &str) -> T {
        self.unwrap_or_else(|error| log_and_panic(error, message))
    }
}
