//! Error types for tag reconnaissance and injection.

use std::io;
use thiserror::Error;

/// Result type alias for tag operations.
pub type Result<T> = std::result::Result<T, TagError>;

/// Errors that can occur while scanning or flooding a controller fleet.
#[derive(Debug, Error)]
pub enum TagError {
    /// The controller could not be reached.
    #[error("Connection to {addr} failed: {reason}")]
    Connection {
        /// Address of the controller.
        addr: String,
        /// Description of the connection failure.
        reason: String,
    },

    /// Communication timeout.
    #[error("Communication timeout")]
    Timeout,

    /// A value did not have the shape its declared type requires.
    #[error("Type mismatch for '{tag}': expected {expected}")]
    TypeMismatch {
        /// Tag (or operation) that produced the mismatch.
        tag: String,
        /// Description of the expected value shape.
        expected: String,
    },

    /// A structured buffer is shorter than its fixed layout.
    #[error("Malformed {kind} buffer: need {required} bytes, got {actual}")]
    MalformedBuffer {
        /// Structure being decoded.
        kind: &'static str,
        /// Minimum number of bytes for the layout.
        required: usize,
        /// Number of bytes actually present.
        actual: usize,
    },

    /// The controller does not expose the requested tag.
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Reconnaissance finished without a single responsive device.
    #[error("All devices are not responding, nothing to save")]
    EmptyResult,

    /// I/O error while reading or writing a workbook.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Workbook (de)serialization error.
    #[error("Workbook format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TagError {
    /// Creates a new `Connection` error.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::TagError;
    ///
    /// let err = TagError::connection("10.0.0.1", "connection refused");
    /// assert!(err.is_unresponsive());
    /// ```
    pub fn connection(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `TypeMismatch` error.
    pub fn type_mismatch(tag: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::TypeMismatch {
            tag: tag.into(),
            expected: expected.into(),
        }
    }

    /// Creates a new `MalformedBuffer` error.
    pub fn malformed_buffer(kind: &'static str, required: usize, actual: usize) -> Self {
        Self::MalformedBuffer {
            kind,
            required,
            actual,
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use tagflood::TagError;
    ///
    /// let err = TagError::invalid_parameter("interval", "must not be negative");
    /// assert!(!err.is_unresponsive());
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether the error means the device should be treated as unresponsive.
    ///
    /// A type mismatch during a read counts as unresponsive: it is what an
    /// endpoint that answers with garbage or nothing at all looks like.
    pub fn is_unresponsive(&self) -> bool {
        matches!(
            self,
            TagError::Connection { .. } | TagError::Timeout | TagError::TypeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_display() {
        let err = TagError::connection("10.0.0.1", "refused");
        assert_eq!(err.to_string(), "Connection to 10.0.0.1 failed: refused");
    }

    #[test]
    fn test_malformed_buffer_display() {
        let err = TagError::malformed_buffer("PID", 52, 12);
        assert_eq!(err.to_string(), "Malformed PID buffer: need 52 bytes, got 12");
    }

    #[test]
    fn test_timeout_display() {
        let err = TagError::Timeout;
        assert_eq!(err.to_string(), "Communication timeout");
    }

    #[test]
    fn test_unresponsive_classification() {
        assert!(TagError::Timeout.is_unresponsive());
        assert!(TagError::connection("a", "b").is_unresponsive());
        assert!(TagError::type_mismatch("T", "raw buffer").is_unresponsive());
        assert!(!TagError::malformed_buffer("Timer", 12, 4).is_unresponsive());
        assert!(!TagError::EmptyResult.is_unresponsive());
        assert!(!TagError::UnknownTag("X".into()).is_unresponsive());
    }
}
