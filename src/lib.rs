//! ember-data-codemod: rewrites uses of the `DS` global into
//! `@ember-data/*` module imports.
//!
//! The per-file engine lives in `ember-data-codemod-js`; this crate is the
//! runner around it.
//!
//! ## Modules
//!
//! - `project` - package.json checks and project configuration
//! - `files` - source file discovery
//! - `runner` - parallel transform and write-back
//! - `report` - the markdown run report

pub mod files;
pub mod project;
pub mod report;
pub mod runner;

// Re-export core types for convenience
pub use ember_data_codemod_core::config::{CliOverrides, CodemodConfig, ProjectConfig, TransformOptions};
pub use ember_data_codemod_core::diagnostic::{Diagnostic, DiagnosticLog};
pub use ember_data_codemod_core::error::{CodemodError, OutputErrorCode};
pub use ember_data_codemod_core::mapping::MappingTable;
pub use ember_data_codemod_core::output::{ErrorResponse, RunResponse, SCHEMA_VERSION};
pub use ember_data_codemod_js::{transform_file, transform_source, TransformError, TransformOutput};
