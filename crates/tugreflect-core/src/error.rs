//! Error types and error code constants for tugreflect.
//!
//! This module provides a unified error type (`EngineError`) that bridges
//! domain-specific errors from different subsystems (codec, config, tree
//! loading, chain parsing) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad config, unreadable tree, malformed chain)
//! - `3`: Metadata missing (a dependency artifact is absent)
//! - `4`: Metadata corrupt (a dependency artifact fails to decode)
//! - `10`: Internal errors (IO failures, bugs)
//!
//! Recoverable problems (scan degradation, malformed call-sites) are never
//! errors; they are reported as diagnostics.

use std::fmt;

use thiserror::Error;

use crate::chain::ChainError;
use crate::codec::MetadataError;
use crate::config::ConfigError;
use crate::tree::TreeError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// A dependency's metadata artifact is absent.
    MetadataMissing = 3,
    /// A dependency's metadata artifact cannot be decoded.
    MetadataCorrupt = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// Every variant is fatal for the resolution pass that raised it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Dependency metadata is absent.
    #[error("metadata missing: {path}")]
    MetadataMissing { path: String },

    /// Dependency metadata cannot be decoded.
    #[error("metadata corrupt at {path}: {reason}")]
    MetadataCorrupt { path: String, reason: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&EngineError> for OutputErrorCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            EngineError::MetadataMissing { .. } => OutputErrorCode::MetadataMissing,
            EngineError::MetadataCorrupt { .. } => OutputErrorCode::MetadataCorrupt,
            EngineError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<EngineError> for OutputErrorCode {
    fn from(err: EngineError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<MetadataError> for EngineError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Missing { path } => EngineError::MetadataMissing {
                path: path.display().to_string(),
            },
            MetadataError::Corrupt { path, reason } => EngineError::MetadataCorrupt { path, reason },
            MetadataError::Encode(e) => EngineError::InternalError {
                message: format!("metadata encoding failed: {}", e),
            },
            MetadataError::Io(e) => EngineError::InternalError {
                message: format!("IO error: {}", e),
            },
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { ref path } | ConfigError::Invalid { ref path, .. } => {
                let details = serde_json::json!({ "path": path.display().to_string() });
                EngineError::invalid_args_with_details(err.to_string(), details)
            }
            ConfigError::InvalidEnv { ref var, .. } => {
                let details = serde_json::json!({ "var": var });
                EngineError::invalid_args_with_details(err.to_string(), details)
            }
            ConfigError::Io(e) => EngineError::InternalError {
                message: format!("IO error: {}", e),
            },
        }
    }
}

impl From<TreeError> for EngineError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NotFound { ref path } | TreeError::Invalid { ref path, .. } => {
                let details = serde_json::json!({ "path": path.display().to_string() });
                EngineError::invalid_args_with_details(err.to_string(), details)
            }
            TreeError::Io(e) => EngineError::InternalError {
                message: format!("IO error: {}", e),
            },
        }
    }
}

impl From<ChainError> for EngineError {
    fn from(err: ChainError) -> Self {
        EngineError::invalid_args(err.to_string())
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl EngineError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        EngineError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        EngineError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
