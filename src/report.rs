//! The markdown run report (`MODULE_REPORT.md`).
//!
//! One section per diagnostic, in the order of the sorted log:
//!
//! ```text
//! ## Module Report
//! ### Unknown Global
//! **Global**: `DS.unknownThing`
//! **Location**: `app/models/shoe.js` at line 4
//! ```

use std::fs;
use std::path::Path;

use ember_data_codemod_core::diagnostic::{Diagnostic, DiagnosticLog};
use ember_data_codemod_core::error::CodemodError;

const HEADER: &str = "## Module Report\n";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Render the report for `log`. `global` names the namespace in
/// diagnostics that come without one.
pub fn render_report(log: &DiagnosticLog, global: &str) -> String {
    let sections: Vec<String> = log
        .records()
        .iter()
        .map(|d| render_section(d, global))
        .collect();
    let report = format!("{}{}", HEADER, sections.join("\n"));
    normalize_line_endings(&report, LINE_ENDING)
}

/// Render and write the report to `path`.
pub fn write_report(path: &Path, log: &DiagnosticLog, global: &str) -> Result<(), CodemodError> {
    fs::write(path, render_report(log, global))
        .map_err(|e| CodemodError::apply(path.display().to_string(), e.to_string()))
}

fn render_section(diagnostic: &Diagnostic, global: &str) -> String {
    match diagnostic {
        Diagnostic::UnmappedGlobal {
            namespace,
            dotted_path,
            line,
            file,
            source_context,
        } => {
            let namespace = if namespace.is_empty() { global } else { namespace };
            format!(
                "### Unknown Global\n**Global**: `{}.{}`\n**Location**: `{}` at line {}\n```js\n{}\n```\n",
                namespace, dotted_path, file, line, source_context
            )
        }
        Diagnostic::TransformError {
            file,
            original_source,
            error_detail,
        } => format!(
            "### Runtime Error\n**Path**: `{}`\n**Error**:\n```\n{}\n```\n**Source**:\n```js\n{}\n```\n",
            file, error_detail, original_source
        ),
        Diagnostic::AmbiguousLocalName {
            file,
            line,
            local_name,
            module,
            export_name,
            existing,
        } => format!(
            "### Ambiguous Local Name\n**Name**: `{}` for `{}` from `{}`\n**Location**: `{}` at line {}\n**Conflict**: {}\n",
            local_name, export_name, module, file, line, existing
        ),
    }
}

fn normalize_line_endings(text: &str, ending: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', ending)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(records: Vec<Diagnostic>) -> DiagnosticLog {
        let mut log = DiagnosticLog::new();
        log.extend(records);
        log
    }

    #[test]
    fn unknown_global_section() {
        let report = render_report(
            &log(vec![Diagnostic::UnmappedGlobal {
                namespace: "DS".to_string(),
                dotted_path: "unknownThing".to_string(),
                line: 4,
                file: "app/models/shoe.js".to_string(),
                source_context: "  thing: DS.unknownThing".to_string(),
            }]),
            "DS",
        );
        let report = normalize_line_endings(&report, "\n");
        assert_eq!(
            report,
            "## Module Report\n### Unknown Global\n**Global**: `DS.unknownThing`\n**Location**: `app/models/shoe.js` at line 4\n```js\n  thing: DS.unknownThing\n```\n"
        );
    }

    #[test]
    fn runtime_error_and_ambiguous_sections() {
        let report = render_report(
            &log(vec![
                Diagnostic::TransformError {
                    file: "a.js".to_string(),
                    original_source: "const = ;".to_string(),
                    error_detail: "parse error: Expected ident (1:7)".to_string(),
                },
                Diagnostic::AmbiguousLocalName {
                    file: "b.js".to_string(),
                    line: 9,
                    local_name: "Model".to_string(),
                    module: "@ember-data/model".to_string(),
                    export_name: "default".to_string(),
                    existing: "a declaration in an enclosing scope".to_string(),
                },
            ]),
            "DS",
        );
        let report = normalize_line_endings(&report, "\n");
        assert!(report.contains("### Runtime Error\n**Path**: `a.js`\n**Error**:\n```\nparse error"));
        assert!(report.contains("**Source**:\n```js\nconst = ;\n```\n"));
        assert!(report.contains(
            "\n### Ambiguous Local Name\n**Name**: `Model` for `default` from `@ember-data/model`\n**Location**: `b.js` at line 9\n"
        ));
    }

    #[test]
    fn line_endings_are_normalized() {
        assert_eq!(normalize_line_endings("a\r\nb\nc", "\r\n"), "a\r\nb\r\nc");
        assert_eq!(normalize_line_endings("a\r\nb\nc", "\n"), "a\nb\nc");
    }
}
