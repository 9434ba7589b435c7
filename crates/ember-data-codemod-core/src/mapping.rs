//! Mapping table: legacy dotted paths to canonical module exports.
//!
//! The table is built from the RFC 395 data file (one JSON array of entries):
//!
//! ```json
//! {
//!   "global": "DS.Model",
//!   "module": "ember-data/model",
//!   "export": "default",
//!   "localName": "Model",
//!   "deprecated": false,
//!   "replacement": { "module": "@ember-data/model", "export": "default" }
//! }
//! ```
//!
//! `replacement` names the canonical module/export. When it is absent the
//! entry's own `module`/`export` are canonical. When both exist and differ,
//! the pre-canonical pair is kept as the entry's *legacy module* so that
//! existing imports such as `import attr from 'ember-data/attr'` can be
//! rewritten to their canonical path.
//!
//! The table is built once per run and shared read-only across files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The mapping data bundled with the crate.
pub const BUNDLED_MAPPINGS: &str = include_str!("../data/mappings.json");

/// Namespace prefix used by the bundled data.
pub const DEFAULT_NAMESPACE: &str = "DS";

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while loading a mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The data file could not be read.
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file is not valid JSON of the expected shape.
    #[error("invalid mapping data: {0}")]
    Json(#[from] serde_json::Error),

    /// Two entries share the same global.
    #[error("duplicate mapping for global '{global}'")]
    DuplicateGlobal { global: String },

    /// An entry's global is not rooted at the table's namespace.
    #[error("global '{global}' is not a member of namespace '{namespace}'")]
    ForeignGlobal { global: String, namespace: String },
}

// ============================================================================
// Data Types
// ============================================================================

/// A module path and one of its exports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleExport {
    pub module: String,
    #[serde(rename = "export")]
    pub export_name: String,
}

impl ModuleExport {
    pub fn new(module: impl Into<String>, export_name: impl Into<String>) -> Self {
        ModuleExport {
            module: module.into(),
            export_name: export_name.into(),
        }
    }
}

/// One entry of the mapping data file, as written on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    pub global: String,
    pub module: String,
    pub export: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    /// Informational only; deprecated globals are rewritten like any other.
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<ModuleExport>,
}

/// A resolved mapping from a dotted legacy path to a canonical export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPathMapping {
    /// Dotted path below the namespace (`Model`, `Transform`, `attr`).
    pub legacy_path: String,
    /// Canonical module path.
    pub module: String,
    /// Canonical export name (`default` for default exports).
    pub export_name: String,
    /// Preferred local identifier.
    pub preferred_local_name: Option<String>,
    /// The pre-canonical module/export this value used to be imported from.
    pub legacy_module: Option<ModuleExport>,
}

impl LegacyPathMapping {
    /// Create a mapping with no preferred local and no legacy module.
    pub fn new(
        legacy_path: impl Into<String>,
        module: impl Into<String>,
        export_name: impl Into<String>,
    ) -> Self {
        LegacyPathMapping {
            legacy_path: legacy_path.into(),
            module: module.into(),
            export_name: export_name.into(),
            preferred_local_name: None,
            legacy_module: None,
        }
    }

    /// Set the preferred local identifier.
    pub fn with_local_name(mut self, local: impl Into<String>) -> Self {
        self.preferred_local_name = Some(local.into());
        self
    }

    /// Last segment of the dotted legacy path.
    pub fn last_segment(&self) -> &str {
        self.legacy_path
            .rsplit('.')
            .next()
            .unwrap_or(&self.legacy_path)
    }

    /// The local name to bind when the caller has no preference.
    pub fn default_local_name(&self) -> &str {
        self.preferred_local_name
            .as_deref()
            .unwrap_or_else(|| self.last_segment())
    }

    fn from_record(record: MappingRecord, namespace: &str) -> Result<Self, MappingError> {
        let legacy_path = record
            .global
            .strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| MappingError::ForeignGlobal {
                global: record.global.clone(),
                namespace: namespace.to_string(),
            })?
            .to_string();

        let own = ModuleExport::new(record.module, record.export);
        let (target, legacy_module) = match record.replacement {
            Some(replacement) if replacement != own => (replacement, Some(own)),
            Some(replacement) => (replacement, None),
            None => (own, None),
        };

        let mut mapping = LegacyPathMapping::new(legacy_path, target.module, target.export_name);
        mapping.legacy_module = legacy_module;
        if let Some(local) = record.local_name {
            mapping = mapping.with_local_name(local);
        }
        Ok(mapping)
    }
}

// ============================================================================
// Mapping Table
// ============================================================================

/// Lookup structure over all legacy path mappings.
#[derive(Debug, Clone)]
pub struct MappingTable {
    namespace: String,
    entries: Vec<LegacyPathMapping>,
    by_path: HashMap<String, usize>,
    by_legacy: HashMap<(String, String), usize>,
}

impl MappingTable {
    /// Build a table from already resolved entries.
    pub fn from_entries(
        namespace: impl Into<String>,
        entries: Vec<LegacyPathMapping>,
    ) -> Result<Self, MappingError> {
        let namespace = namespace.into();
        let mut by_path = HashMap::with_capacity(entries.len());
        let mut by_legacy = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            if by_path.insert(entry.legacy_path.clone(), idx).is_some() {
                return Err(MappingError::DuplicateGlobal {
                    global: format!("{}.{}", namespace, entry.legacy_path),
                });
            }
            if let Some(legacy) = &entry.legacy_module {
                let key = (legacy.module.clone(), legacy.export_name.clone());
                if by_legacy.contains_key(&key) {
                    debug!(
                        module = %legacy.module,
                        export = %legacy.export_name,
                        "legacy import already mapped, keeping first entry"
                    );
                } else {
                    by_legacy.insert(key, idx);
                }
            }
        }

        Ok(MappingTable {
            namespace,
            entries,
            by_path,
            by_legacy,
        })
    }

    /// Parse a table from RFC 395 JSON data.
    pub fn from_json(namespace: &str, text: &str) -> Result<Self, MappingError> {
        let records: Vec<MappingRecord> = serde_json::from_str(text)?;
        let entries = records
            .into_iter()
            .map(|record| LegacyPathMapping::from_record(record, namespace))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_entries(namespace, entries)
    }

    /// Load a table from a JSON data file.
    pub fn load(namespace: &str, path: &Path) -> Result<Self, MappingError> {
        let text = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(namespace, &text)
    }

    /// The table built from the bundled data file.
    pub fn bundled() -> Result<Self, MappingError> {
        Self::from_json(DEFAULT_NAMESPACE, BUNDLED_MAPPINGS)
    }

    /// Namespace the legacy paths are rooted at.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Exact lookup by dotted legacy path (namespace prefix stripped).
    pub fn lookup(&self, dotted_path: &str) -> Option<&LegacyPathMapping> {
        self.by_path.get(dotted_path).map(|&idx| &self.entries[idx])
    }

    /// Find the mapping whose pre-canonical import is `module`/`export_name`.
    pub fn lookup_legacy_module(&self, module: &str, export_name: &str) -> Option<&LegacyPathMapping> {
        self.by_legacy
            .get(&(module.to_string(), export_name.to_string()))
            .map(|&idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
