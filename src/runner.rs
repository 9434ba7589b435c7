//! Runs the transform over a project.
//!
//! ```text
//! collect files -> transform in parallel -> write changed files
//!               -> sort diagnostics -> write report
//! ```
//!
//! Files are independent: each worker reads, transforms and writes its own
//! file, sharing only the mapping table. A file whose transform fails is
//! never written.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use ember_data_codemod_core::config::{CodemodConfig, TransformOptions, DEFAULT_GLOBAL};
use ember_data_codemod_core::diagnostic::{Diagnostic, DiagnosticLog};
use ember_data_codemod_core::error::CodemodError;
use ember_data_codemod_core::mapping::MappingTable;
use ember_data_codemod_core::output::{FileOutcome, FileStatus, RunResponse};
use ember_data_codemod_js::transform_file;

use crate::files::collect_source_files;
use crate::report::write_report;

/// Per-run switches that are not part of the layered configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Compute everything but write nothing.
    pub dry_run: bool,
    /// The paths came from the command line, so missing ones are errors.
    pub explicit_paths: bool,
}

/// Load the mapping table the configuration points at.
///
/// Without a configured file the bundled data is used; its globals are
/// rooted at `DS` whatever the file-level namespace name is.
pub fn load_mappings(root: &Path, config: &CodemodConfig) -> Result<MappingTable, CodemodError> {
    let table = match &config.mappings {
        Some(mappings) => {
            let path = root.join(&mappings.value);
            debug!(path = %path.display(), source = ?mappings.source, "loading mappings");
            MappingTable::load(DEFAULT_GLOBAL, &path)?
        }
        None => MappingTable::bundled()?,
    };
    debug!(
        entries = table.len(),
        namespace = table.namespace(),
        "mapping table ready"
    );
    Ok(table)
}

/// Result of one file, before aggregation.
struct FileResult {
    outcome: FileOutcome,
    diagnostics: Vec<Diagnostic>,
}

/// Transform every source file under the configured paths.
pub fn run(
    root: &Path,
    config: &CodemodConfig,
    table: &MappingTable,
    options: &RunOptions,
) -> Result<RunResponse, CodemodError> {
    let files = collect_source_files(root, &config.paths.value, options.explicit_paths)?;
    info!(files = files.len(), dry_run = options.dry_run, "running codemod");

    let transform_options = config.transform_options();
    let results = files
        .par_iter()
        .map(|rel| process_file(root, rel, table, &transform_options, options.dry_run))
        .collect::<Result<Vec<_>, _>>()?;

    let mut log = DiagnosticLog::new();
    let mut outcomes = Vec::with_capacity(results.len());
    for result in results {
        log.extend(result.diagnostics);
        outcomes.push(result.outcome);
    }
    log.sort();

    let report = if log.is_empty() || options.dry_run {
        None
    } else {
        let path = root.join(&config.report.value);
        write_report(&path, &log, &config.global.value)?;
        Some(config.report.value.display().to_string())
    };

    Ok(RunResponse::new(
        options.dry_run,
        outcomes,
        log.into_records(),
        report,
    ))
}

fn process_file(
    root: &Path,
    rel: &Path,
    table: &MappingTable,
    options: &TransformOptions,
    dry_run: bool,
) -> Result<FileResult, CodemodError> {
    let label = rel.display().to_string();
    let path = root.join(rel);

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            warn!(file = %label, error = %err, "failed to read file");
            return Ok(FileResult {
                outcome: FileOutcome {
                    path: label.clone(),
                    status: FileStatus::Failed,
                    diagnostics: 1,
                },
                diagnostics: vec![Diagnostic::TransformError {
                    file: label,
                    original_source: String::new(),
                    error_detail: err.to_string(),
                }],
            });
        }
    };

    let output = transform_file(&label, &source, table, options);
    let failed = output
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::TransformError { .. }));

    let status = if failed {
        FileStatus::Failed
    } else if output.changed {
        FileStatus::Changed
    } else {
        FileStatus::Unchanged
    };

    if status == FileStatus::Changed && !dry_run {
        fs::write(&path, &output.source).map_err(|e| CodemodError::apply(&label, e.to_string()))?;
        info!(file = %label, "updated");
    }

    Ok(FileResult {
        outcome: FileOutcome {
            path: label,
            status,
            diagnostics: output.diagnostics.len(),
        },
        diagnostics: output.diagnostics,
    })
}
