//! Error types for configuration parsing and device programming.

use thiserror::Error;

/// Result type alias for digconf operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error raised by a device accessor call.
///
/// Carries the name of the failing accessor (`origin`) and a human-readable
/// cause from the underlying link. Accessor failures are recoverable at the
/// field level: the programming engine logs them and resets the affected
/// field to absent rather than aborting the pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("hardware error in {origin}: {message}")]
pub struct HardwareError {
    /// Name of the accessor or driver call that failed.
    pub origin: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl HardwareError {
    /// Creates a new hardware error.
    ///
    /// # Example
    ///
    /// ```
    /// use digconf::HardwareError;
    ///
    /// let err = HardwareError::new("set_record_length", "link timeout");
    /// assert_eq!(err.origin, "set_record_length");
    /// ```
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while parsing configuration or talking to a device.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory setting is missing (or failed to parse) in its section.
    #[error("missing (or invalid) non-optional setting '{setting}' in section '{section}'")]
    MissingSetting {
        /// Name of the missing key.
        setting: String,
        /// Section the key was expected in.
        section: String,
    },

    /// A channel-range expression could not be parsed.
    #[error("invalid range token '{token}': {reason}")]
    InvalidRange {
        /// The offending token.
        token: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// A line of the INI input could not be parsed.
    #[error("INI parse error at line {line}: {reason}")]
    IniParse {
        /// 1-based line number in the input.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// Opening the device link failed. Fatal for the affected digitizer.
    #[error("could not open link to digitizer '{name}': {source}")]
    Connection {
        /// Digitizer section name.
        name: String,
        /// The underlying link failure.
        source: HardwareError,
    },

    /// `configure` was called on an already configured digitizer.
    #[error("digitizer '{0}' already configured")]
    AlreadyConfigured(String),

    /// An operation requiring a configured digitizer was called too early.
    #[error("digitizer '{0}' not yet (properly) configured")]
    NotConfigured(String),

    /// A hardware error that escaped field-level containment.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl ConfigError {
    /// Creates a new `MissingSetting` error.
    ///
    /// # Example
    ///
    /// ```
    /// use digconf::ConfigError;
    ///
    /// let err = ConfigError::missing_setting("LinkType", "digi1");
    /// ```
    pub fn missing_setting(setting: impl Into<String>, section: impl Into<String>) -> Self {
        Self::MissingSetting {
            setting: setting.into(),
            section: section.into(),
        }
    }

    /// Creates a new `InvalidRange` error.
    pub fn invalid_range(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `IniParse` error.
    pub fn ini_parse(line: usize, reason: impl Into<String>) -> Self {
        Self::IniParse {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_error_display() {
        let err = HardwareError::new("set_record_length", "link timeout");
        assert_eq!(
            err.to_string(),
            "hardware error in set_record_length: link timeout"
        );
    }

    #[test]
    fn test_missing_setting_display() {
        let err = ConfigError::missing_setting("LinkType", "digi1");
        assert_eq!(
            err.to_string(),
            "missing (or invalid) non-optional setting 'LinkType' in section 'digi1'"
        );
    }

    #[test]
    fn test_invalid_range_display() {
        let err = ConfigError::invalid_range("a-2", "not a number");
        assert_eq!(err.to_string(), "invalid range token 'a-2': not a number");
    }

    #[test]
    fn test_hardware_error_converts() {
        let err: ConfigError = HardwareError::new("open", "no such device").into();
        assert!(matches!(err, ConfigError::Hardware(_)));
    }
}
