//! Error types and error code constants for ember-data-codemod.
//!
//! `CodemodError` is the single error type the CLI renders. Per-file
//! problems (unmapped globals, parse failures) are *not* errors at this level;
//! they are diagnostics and only show up in the run report.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Project errors (no package.json, not an Ember project, missing paths)
//! - `4`: Apply errors (failed to write files or the report)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::mapping::MappingError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output; they double as process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad flag value, unreadable mapping data).
    InvalidArguments = 2,
    /// The working directory is not a processable project.
    ProjectError = 3,
    /// Failed to write changes.
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
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

/// Run-level error.
#[derive(Debug, Error)]
pub enum CodemodError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("invalid mapping data: {0}")]
    Mapping(#[from] MappingError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The working directory does not look like an Ember project.
    #[error("It doesn't look like you're inside an Ember app. {reason}")]
    NotAnEmberProject { reason: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("failed to write {path}: {message}")]
    ApplyError { path: String, message: String },

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl CodemodError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        CodemodError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn not_ember_project(reason: impl Into<String>) -> Self {
        CodemodError::NotAnEmberProject {
            reason: reason.into(),
        }
    }

    pub fn apply(path: impl Into<String>, message: impl Into<String>) -> Self {
        CodemodError::ApplyError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CodemodError::InternalError {
            message: message.into(),
        }
    }
}

impl From<&CodemodError> for OutputErrorCode {
    fn from(err: &CodemodError) -> Self {
        match err {
            CodemodError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            CodemodError::Mapping(_) => OutputErrorCode::InvalidArguments,
            CodemodError::Config(_) => OutputErrorCode::InvalidArguments,
            CodemodError::NotAnEmberProject { .. } => OutputErrorCode::ProjectError,
            CodemodError::PathNotFound { .. } => OutputErrorCode::ProjectError,
            CodemodError::ApplyError { .. } => OutputErrorCode::ApplyError,
            CodemodError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<CodemodError> for OutputErrorCode {
    fn from(err: CodemodError) -> Self {
        OutputErrorCode::from(&err)
    }
}
