//! Per-entity logging handles over the [`log`] facade.
//!
//! Every settings container and digitizer owns a [`ChannelLog`] created with
//! the digitizer identity and a subsystem channel. Records are emitted with
//! the channel as the log target and the identity as a message prefix, so a
//! backend filter like `RUST_LOG=cfg=debug,dig=info` separates subsystems
//! without any process-global logger state.
//!
//! The crate never installs a backend itself; callers pick one
//! (`env_logger` works well during development).

use std::fmt;

/// Subsystem channels used by the crate.
pub mod channel {
    /// Configuration parsing and serialization.
    pub const CFG: &str = "cfg";
    /// Device programming and orchestration.
    pub const DIG: &str = "dig";
    /// Link establishment.
    pub const CONN: &str = "conn";
}

/// A logging handle bound to one digitizer and one subsystem channel.
///
/// # Example
///
/// ```
/// use digconf::logging::{channel, ChannelLog};
///
/// let log = ChannelLog::new("digi1", channel::CFG);
/// log.debug(format_args!("found key {} with value '{}'", "LinkNum", 0));
/// ```
#[derive(Debug, Clone)]
pub struct ChannelLog {
    digitizer: String,
    channel: &'static str,
}

impl ChannelLog {
    /// Creates a handle for the given digitizer identity and channel.
    pub fn new(digitizer: impl Into<String>, channel: &'static str) -> Self {
        Self {
            digitizer: digitizer.into(),
            channel,
        }
    }

    /// The digitizer identity carried by this handle.
    pub fn digitizer(&self) -> &str {
        &self.digitizer
    }

    /// Returns a handle for the same digitizer on a different channel.
    pub fn with_channel(&self, channel: &'static str) -> Self {
        Self {
            digitizer: self.digitizer.clone(),
            channel,
        }
    }

    fn emit(&self, level: log::Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.channel, level, "[{}] {}", self.digitizer, args);
    }

    /// Logs at debug severity.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Debug, args);
    }

    /// Logs at info severity.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Info, args);
    }

    /// Logs at warn severity.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Warn, args);
    }

    /// Logs at error severity.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Error, args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_switch_keeps_identity() {
        let cfg = ChannelLog::new("digi1", channel::CFG);
        let dig = cfg.with_channel(channel::DIG);
        assert_eq!(dig.digitizer(), "digi1");
    }

    #[test]
    fn test_emit_does_not_panic_without_backend() {
        let log = ChannelLog::new("digi1", channel::DIG);
        log.debug(format_args!("debug"));
        log.info(format_args!("info"));
        log.warn(format_args!("warn"));
        log.error(format_args!("error"));
    }
}
