//! JSON output types for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response has `status` as its first field
//! 2. **Deterministic:** files and diagnostics are sorted by path
//! 3. **Versioned:** the schema version lets consumers detect changes

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::error::{CodemodError, OutputErrorCode};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// The file was rewritten (or would be, in a dry run).
    Changed,
    /// Nothing to rewrite.
    Unchanged,
    /// The transform failed; the file was left as is.
    Failed,
}

/// Per-file entry of a run response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: String,
    pub status: FileStatus,
    /// Number of diagnostics recorded for this file.
    pub diagnostics: usize,
}

/// Aggregate counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub files_failed: usize,
    pub diagnostics: usize,
}

/// Response for a codemod run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub dry_run: bool,
    pub summary: RunSummary,
    pub files: Vec<FileOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    /// Path of the written report, if one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl RunResponse {
    pub fn new(
        dry_run: bool,
        files: Vec<FileOutcome>,
        diagnostics: Vec<Diagnostic>,
        report: Option<String>,
    ) -> Self {
        let summary = RunSummary {
            files_scanned: files.len(),
            files_changed: files
                .iter()
                .filter(|f| f.status == FileStatus::Changed)
                .count(),
            files_failed: files
                .iter()
                .filter(|f| f.status == FileStatus::Failed)
                .count(),
            diagnostics: diagnostics.len(),
        };
        RunResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            dry_run,
            summary,
            files,
            diagnostics,
            report,
        }
    }
}

/// Error information for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the exit code).
    pub code: u8,
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &CodemodError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &CodemodError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
