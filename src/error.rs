//! Error handling for the effects engine
//!
//! Processing entry points report one of the four input/resource errors;
//! configuration and CLI paths add parameter, I/O and serialization errors.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DspError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum DspError {
    // Processing Errors
    #[error("Null pointer: a required buffer or state is missing")]
    NullPointer,

    #[error("Invalid frame count: {frames} (must be at least 1)")]
    InvalidFrameCount { frames: usize },

    #[error("Invalid channel count: {channels} (must be at least 1)")]
    InvalidChannelCount { channels: usize },

    #[error("Allocation failure: could not allocate {requested} samples")]
    AllocationFailure { requested: usize },

    // Configuration Errors
    #[error("Invalid parameter {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DspError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DspError::NullPointer => "NULL_POINTER",
            DspError::InvalidFrameCount { .. } => "INVALID_FRAME_COUNT",
            DspError::InvalidChannelCount { .. } => "INVALID_CHANNEL_COUNT",
            DspError::AllocationFailure { .. } => "ALLOCATION_FAILURE",
            DspError::InvalidParameter { .. } => "INVALID_PARAMETER",
            DspError::Config { .. } => "CONFIG_ERROR",
            DspError::Io(_) => "IO_ERROR",
            DspError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Processing errors leave effect state intact, so the host can skip the
    /// block and keep the stream running.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DspError::NullPointer
                | DspError::InvalidFrameCount { .. }
                | DspError::InvalidChannelCount { .. }
                | DspError::AllocationFailure { .. }
        )
    }

    /// Shorthand for building an `InvalidParameter` error
    pub(crate) fn invalid_param(param: &str, value: impl ToString, expected: &str) -> Self {
        DspError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}
