//! Context for the current backup
//!

use core::fmt;

/// Holds the context for the current cycle. Used for prefixing logs.
#[derive(Default, Debug, Clone)]
pub struct Context {
    /// The cycle's timestamp.
    pub timestamp: Option<String>,

    /// The current step.
    pub current_context: &'static str,
}

impl Context {
    /// Context for a new cycle.
    pub fn new(timestamp: &str) -> Self {
        Self {
            timestamp: Some(timestamp.to_string()),
            current_context: "Start",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(timestamp) = &self.timestamp {
            write!(f, "[{timestamp}] ")?;
        }

        if !self.current_context.is_empty() {
            write!(f, "[{}] ", self.current_context)?;
        }

        Ok(())
    }
}
