//! Binary entry point for the ember-data-codemod CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Rewrite the default directories of the Ember app in the current directory
//! ember-data-codemod
//!
//! # Preview a single directory, JSON output
//! ember-data-codemod app/models --dry-run --format json
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use ember_data_codemod::project::Project;
use ember_data_codemod::runner::{load_mappings, run, RunOptions};
use ember_data_codemod_core::config::{CliOverrides, CodemodConfig, QuoteStyle};
use ember_data_codemod_core::error::{CodemodError, OutputErrorCode};
use ember_data_codemod_core::output::{emit_response, ErrorResponse, FileStatus, RunResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Rewrites uses of the `DS` global into @ember-data module imports.
#[derive(Parser, Debug)]
#[command(name = "ember-data-codemod", version, about)]
struct Cli {
    /// Files or directories to process (default: app, addon,
    /// addon-test-support, tests, test-support, lib).
    paths: Vec<PathBuf>,

    /// Mapping data file to use instead of the bundled one.
    #[arg(long)]
    mappings: Option<PathBuf>,

    /// Module whose default export is the namespace.
    #[arg(long)]
    namespace_module: Option<String>,

    /// Namespace identifier assumed when a file does not import it.
    #[arg(long)]
    global: Option<String>,

    /// Quote style for module literals the codemod prints.
    #[arg(long, value_enum)]
    quote: Option<QuoteArg>,

    /// Report what would change without writing any file.
    #[arg(long)]
    dry_run: bool,

    /// Run even if the working directory is not an Ember project.
    #[arg(long)]
    no_project_check: bool,

    /// Where to write the report (default: MODULE_REPORT.md).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Project root (default: current directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit log records as JSON lines.
    #[arg(long)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum QuoteArg {
    Single,
    Double,
}

impl From<QuoteArg> for QuoteStyle {
    fn from(arg: QuoteArg) -> Self {
        match arg {
            QuoteArg::Single => QuoteStyle::Single,
            QuoteArg::Double => QuoteStyle::Double,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level, cli.log_json);

    let format = cli.format;
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            match format {
                OutputFormat::Json => {
                    let _ = emit_response(&ErrorResponse::from_error(&err), &mut io::stdout());
                    let _ = io::stdout().flush();
                }
                OutputFormat::Text => eprintln!("{}", err),
            }
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn execute(cli: Cli) -> Result<(), CodemodError> {
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()
            .map_err(|e| CodemodError::internal(format!("failed to get current directory: {}", e)))?,
    };

    let project = Project::load(&root, !cli.no_project_check)?;
    let overrides = CliOverrides {
        mappings: cli.mappings,
        global: cli.global,
        namespace_module: cli.namespace_module,
        quote: cli.quote.map(QuoteStyle::from),
        paths: cli.paths.clone(),
        report: cli.report,
    };
    let config = CodemodConfig::resolve(project.config(), &overrides)?;
    if !is_identifier(&config.global.value) {
        return Err(CodemodError::invalid_args(format!(
            "namespace name '{}' is not an identifier",
            config.global.value
        )));
    }
    let table = load_mappings(&root, &config)?;

    let options = RunOptions {
        dry_run: cli.dry_run,
        explicit_paths: !cli.paths.is_empty(),
    };
    let response = run(&root, &config, &table, &options)?;

    match cli.format {
        OutputFormat::Json => {
            emit_response(&response, &mut io::stdout())
                .map_err(|e| CodemodError::internal(e.to_string()))?;
        }
        OutputFormat::Text => print_summary(&response, &config.global.value),
    }
    let _ = io::stdout().flush();
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Print a human-readable summary of a run.
fn print_summary(response: &RunResponse, global: &str) {
    let verb = if response.dry_run { "Would update" } else { "Updated" };
    for file in &response.files {
        match file.status {
            FileStatus::Changed => println!("{} {}", verb, file.path),
            FileStatus::Failed => println!("Failed {}", file.path),
            FileStatus::Unchanged => {}
        }
    }
    for diagnostic in &response.diagnostics {
        match diagnostic.line() {
            0 => println!("  {} {}", diagnostic.code(), diagnostic.file()),
            line => println!("  {} {}:{}", diagnostic.code(), diagnostic.file(), line),
        }
    }

    let summary = &response.summary;
    println!(
        "\n{} files scanned, {} changed, {} failed, {} diagnostics",
        summary.files_scanned, summary.files_changed, summary.files_failed, summary.diagnostics
    );

    match &response.report {
        Some(report) => println!(
            "Done! Some files could not be upgraded automatically. See {}.",
            report
        ),
        None if summary.diagnostics > 0 => {
            println!("Done! Some files could not be upgraded automatically (dry run, no report written).")
        }
        None => println!(
            "Done! All uses of the {} global and Ember Data imports have been updated.",
            global
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn defaults() {
            let cli = Cli::try_parse_from(["ember-data-codemod"]).unwrap();
            assert!(cli.paths.is_empty());
            assert!(!cli.dry_run);
            assert!(!cli.no_project_check);
            assert_eq!(cli.format, OutputFormat::Text);
            assert!(matches!(cli.log_level, LogLevel::Warn));
        }

        #[test]
        fn paths_and_flags() {
            let cli = Cli::try_parse_from([
                "ember-data-codemod",
                "app/models",
                "addon",
                "--dry-run",
                "--quote",
                "double",
                "--format",
                "json",
                "--global",
                "Data",
            ])
            .unwrap();
            assert_eq!(cli.paths, vec![PathBuf::from("app/models"), PathBuf::from("addon")]);
            assert!(cli.dry_run);
            assert_eq!(cli.quote, Some(QuoteArg::Double));
            assert_eq!(cli.format, OutputFormat::Json);
            assert_eq!(cli.global.as_deref(), Some("Data"));
        }

        #[test]
        fn invalid_quote_is_rejected() {
            let result = Cli::try_parse_from(["ember-data-codemod", "--quote", "backtick"]);
            assert!(result.is_err());
        }
    }

    mod log_level {
        use super::*;

        #[test]
        fn converts_to_tracing_level() {
            assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
            assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
            assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        }
    }

    #[test]
    fn namespace_names_must_be_identifiers() {
        assert!(is_identifier("DS"));
        assert!(is_identifier("$data_1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1DS"));
        assert!(!is_identifier("D.S"));
    }

    #[test]
    fn quote_arg_maps_to_style() {
        assert_eq!(QuoteStyle::from(QuoteArg::Single), QuoteStyle::Single);
        assert_eq!(QuoteStyle::from(QuoteArg::Double), QuoteStyle::Double);
    }
}
