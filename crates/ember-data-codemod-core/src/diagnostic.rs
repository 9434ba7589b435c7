//! Structured diagnostics collected while transforming files.
//!
//! Diagnostics never abort a file on their own: an unmapped global or an
//! ambiguous local name leaves the offending site untouched and is recorded
//! here for the run report. A `TransformError` records a file that was left
//! unchanged as a whole.

use serde::{Deserialize, Serialize};

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A namespace member with no entry in the mapping table.
    UnmappedGlobal {
        /// Local name of the namespace in the file (`DS`).
        namespace: String,
        /// Dotted path below the namespace.
        dotted_path: String,
        line: u32,
        file: String,
        /// The offending lines plus two lines either side.
        source_context: String,
    },

    /// The file could not be transformed and was left unchanged.
    TransformError {
        file: String,
        original_source: String,
        error_detail: String,
    },

    /// A rewrite needed a local name that is already taken or shadowed.
    AmbiguousLocalName {
        file: String,
        line: u32,
        local_name: String,
        module: String,
        export_name: String,
        /// What already holds the name.
        existing: String,
    },
}

impl Diagnostic {
    /// File the diagnostic belongs to.
    pub fn file(&self) -> &str {
        match self {
            Diagnostic::UnmappedGlobal { file, .. }
            | Diagnostic::TransformError { file, .. }
            | Diagnostic::AmbiguousLocalName { file, .. } => file,
        }
    }

    /// Line the diagnostic points at (0 for whole-file diagnostics).
    pub fn line(&self) -> u32 {
        match self {
            Diagnostic::UnmappedGlobal { line, .. } | Diagnostic::AmbiguousLocalName { line, .. } => {
                *line
            }
            Diagnostic::TransformError { .. } => 0,
        }
    }

    /// Stable short code, used in text output.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::UnmappedGlobal { .. } => "unmapped_global",
            Diagnostic::TransformError { .. } => "transform_error",
            Diagnostic::AmbiguousLocalName { .. } => "ambiguous_local_name",
        }
    }
}

/// Append-only diagnostic sink.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    records: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        DiagnosticLog::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.records.extend(diagnostics);
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Order records by file, then line. The sort is stable, so records of
    /// the same line keep their discovery order.
    pub fn sort(&mut self) {
        self.records
            .sort_by(|a, b| (a.file(), a.line()).cmp(&(b.file(), b.line())));
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unmapped(file: &str, line: u32) -> Diagnostic {
        Diagnostic::UnmappedGlobal {
            namespace: "DS".to_string(),
            dotted_path: "unknownThing".to_string(),
            line,
            file: file.to_string(),
            source_context: "DS.unknownThing".to_string(),
        }
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(unmapped("app/a.js", 3)).unwrap();
        assert_eq!(json["kind"], "unmapped_global");
        assert_eq!(json["dotted_path"], "unknownThing");
        assert_eq!(json["line"], 3);
    }

    #[test]
    fn sort_orders_by_file_then_line() {
        let mut log = DiagnosticLog::new();
        log.push(unmapped("b.js", 1));
        log.push(unmapped("a.js", 9));
        log.push(unmapped("a.js", 2));
        log.sort();
        let order: Vec<_> = log
            .records()
            .iter()
            .map(|d| (d.file().to_string(), d.line()))
            .collect();
        assert_eq!(
            order,
            [
                ("a.js".to_string(), 2),
                ("a.js".to_string(), 9),
                ("b.js".to_string(), 1)
            ]
        );
    }
}
