//! Error types for catalog handling, planning and block reads.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors raised by the planner, the session and block readers.
///
/// Catalog authoring problems are *not* errors; they are reported as
/// warnings (see [`crate::planner::PlanWarning`] and
/// [`crate::catalog::CatalogWarning`]) and processing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModbusError {
    /// A caller broke a precondition (unordered input, zero span, ...).
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Data returned by a device does not match what was requested.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Configuration values that cannot be used.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Transport-level connection failure.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// A read did not complete in time.
    #[error("Timeout: {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl ModbusError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Whether retrying the same read later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ModbusError::invalid_argument("max_span must be positive").to_string(),
            "Invalid argument: max_span must be positive"
        );
        assert_eq!(
            ModbusError::timeout("read block 0x0000", 1000).to_string(),
            "Timeout: read block 0x0000 after 1000ms"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(ModbusError::connection("reset").is_transient());
        assert!(ModbusError::timeout("read", 10).is_transient());
        assert!(!ModbusError::invalid_data("short").is_transient());
        assert!(!ModbusError::configuration("zero").is_transient());
    }
}
