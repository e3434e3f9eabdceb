//! Logger capability consumed by the dispenser.
//!
//! The dispenser reports recoverable trouble (unreadable sources, invalid
//! demands, engaged fallbacks) through this seam instead of calling the
//! `tracing` macros directly, so tests can assert on what got logged.

/// Two-level logging seam: hard failures and notable-but-handled events.
pub trait Logger: Sync {
    fn error(&self, message: &str, detail: &str);
    fn warning(&self, message: &str, detail: &str);
}

/// Production logger that forwards to [`tracing`].
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str, detail: &str) {
        tracing::error!(detail, "{message}");
    }

    fn warning(&self, message: &str, detail: &str) {
        tracing::warn!(detail, "{message}");
    }
}
