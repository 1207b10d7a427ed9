//! Error types for link telemetry processing.
//!
//! Most failure in the link layer never becomes an error value: malformed packets
//! are counted and dropped, queue overflow shows up as gap flags on the next
//! delivered record, absent content is `None`, and waits that run out of time
//! return `false`. [`LinkError`] covers what is left: bad configuration,
//! packet sources that fail, and the decoder's own report of why a packet was
//! rejected (which the link logs before discarding it).
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use gazelink::LinkError;
//!
//! let error = LinkError::source_failed("transport stalled");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! ## Helper Constructors
//!
//! ```rust
//! use gazelink::LinkError;
//!
//! let malformed = LinkError::malformed("sample body", "truncated gaze group");
//! let config = LinkError::config_invalid("queue_capacity must be non-zero");
//! assert!(!malformed.is_retryable());
//! assert!(!config.is_retryable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Malformed record in {context}: {details}")]
    MalformedRecord { context: String, details: String },

    #[error("Unknown record type code {code:#04x}")]
    UnknownRecordType { code: u8 },

    #[error("Prescaler '{field}' must be non-zero")]
    InvalidPrescaler { field: String },

    #[error("Invalid link configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Packet source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Operation cancelled by terminal break")]
    Cancelled,

    #[error("Link is closed")]
    Closed,
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Source { .. } => true,
            LinkError::Timeout { .. } => true,
            LinkError::MalformedRecord { .. } => false,
            LinkError::UnknownRecordType { .. } => false,
            LinkError::InvalidPrescaler { .. } => false,
            LinkError::Config { .. } => false,
            LinkError::File { .. } => false,
            LinkError::Cancelled => false,
            LinkError::Closed => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::MalformedRecord { .. } => vec![
                "Check that the transport delivers whole packets",
                "Verify tracker and host agree on the link data format",
                "Inspect the malformed-packet counter in the link status",
            ],
            LinkError::UnknownRecordType { .. } => vec![
                "Check tracker firmware compatibility",
                "Verify the packet boundary reported by the transport",
            ],
            LinkError::InvalidPrescaler { .. } => vec![
                "Use a prescaler of at least 1",
                "Check the block header sent by the tracker",
            ],
            LinkError::Config { .. } => vec![
                "Review the configuration values against the documented limits",
                "Fall back to LinkConfig::default()",
            ],
            LinkError::File { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
            LinkError::Source { .. } => vec![
                "Check the transport connection to the tracker",
                "Retry after a short delay",
                "Reopen the link if failures persist",
            ],
            LinkError::Timeout { .. } => vec![
                "Increase the timeout duration",
                "Verify recording was started with link data enabled",
                "Check that both samples and events were enabled when waiting for both",
            ],
            LinkError::Cancelled => vec![
                "Call reset_break() before waiting again",
                "Check what requested the terminal break",
            ],
            LinkError::Closed => vec!["Open a new link connection"],
        }
    }

    /// Helper constructor for malformed packet reports.
    pub fn malformed(context: impl Into<String>, details: impl Into<String>) -> Self {
        LinkError::MalformedRecord { context: context.into(), details: details.into() }
    }

    /// Helper constructor for packet source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        LinkError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for packet source failures with an underlying cause.
    pub fn source_failed_with(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::Source { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_invalid(reason: impl Into<String>) -> Self {
        LinkError::Config { reason: reason.into() }
    }

    /// Helper constructor for zero prescalers.
    pub fn invalid_prescaler(field: impl Into<String>) -> Self {
        LinkError::InvalidPrescaler { field: field.into() }
    }

    /// Helper constructor for configuration file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        LinkError::File { path, source }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for LinkError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        LinkError::Config { reason: err.to_string() }
    }
}
