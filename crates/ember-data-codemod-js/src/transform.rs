// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Per-file transform pipeline.
//!
//! ```text
//! parse -> scope tree -> import scan -> alias resolution
//!       -> usage resolution -> namespace cleanup -> import synthesis
//!       -> batch edit
//! ```
//!
//! Every stage only *computes* edits; the source is rewritten once at the
//! end by [`BatchSpanEditor`], so a failure anywhere leaves the input as is.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use ember_data_codemod_core::config::TransformOptions;
use ember_data_codemod_core::diagnostic::Diagnostic;
use ember_data_codemod_core::mapping::MappingTable;
use ember_data_codemod_core::patch::{BatchEditError, BatchSpanEditor, EditPrimitive, Span};
use ember_data_codemod_core::registry::ModuleRegistry;

use crate::alias::AliasScan;
use crate::imports::scan_imports;
use crate::parse::{parse_module, ParseError};
use crate::scope::{ScopeId, ScopeTree};
use crate::synth::synthesize_imports;
use crate::usage::resolve_usages;

/// Failure that leaves a file unchanged.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to apply edits: {0}")]
    Edit(#[from] BatchEditError),
}

/// Result of transforming one file.
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutput {
    /// The rewritten source, or the input when nothing changed.
    pub source: String,
    pub changed: bool,
    /// Diagnostics in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformOutput {
    fn unchanged(source: &str, diagnostics: Vec<Diagnostic>) -> Self {
        TransformOutput {
            source: source.to_string(),
            changed: false,
            diagnostics,
        }
    }
}

/// Transform one file's source.
///
/// `file` only labels diagnostics and parse errors.
pub fn transform_source(
    file: &str,
    source: &str,
    table: &MappingTable,
    options: &TransformOptions,
) -> Result<TransformOutput, TransformError> {
    let parsed = parse_module(file, source)?;
    let tree = ScopeTree::build(&parsed);
    let mut registry = ModuleRegistry::new();
    let imports = scan_imports(&parsed, table, options, &mut registry);

    // Without its import, a namespace name the file declares itself is not
    // the namespace.
    let namespace = match &imports.namespace {
        Some(ns) => Some(ns.local.clone()),
        None if tree.module_declares(&options.default_global) => None,
        None => Some(options.default_global.clone()),
    };

    let mut edits: Vec<EditPrimitive> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut drop_namespace = false;

    if let Some(namespace) = &namespace {
        let aliases = AliasScan::discover(&parsed, &tree, namespace);
        reserve_names(&mut registry, &tree, &imports.locals().collect(), &aliases);

        let alias = aliases.resolve(&parsed, &tree, table, &mut registry, file);
        for local in &alias.kept_module_locals {
            registry.reserve(local.clone());
        }

        let usage = resolve_usages(
            &parsed,
            &tree,
            table,
            &mut registry,
            namespace,
            &alias.removed,
            file,
        );

        let replaced: Vec<Span> = usage.references.iter().map(|r| r.span).collect();
        drop_namespace = imports.namespace.is_some()
            && !namespace_still_used(&tree, namespace, &alias.removed, &replaced);

        edits.extend(alias.edits);
        edits.extend(usage.references.iter().map(|r| EditPrimitive::Replace {
            span: r.span,
            new_text: registry.get(r.binding).local_name.clone(),
        }));
        diagnostics.extend(alias.diagnostics);
        diagnostics.extend(usage.diagnostics);
    }

    edits.extend(synthesize_imports(
        &parsed,
        &imports,
        &registry,
        drop_namespace,
        options,
    ));
    diagnostics.sort_by_key(Diagnostic::line);

    if edits.is_empty() {
        return Ok(TransformOutput::unchanged(source, diagnostics));
    }

    let mut editor = BatchSpanEditor::new(source);
    editor.add_all(edits);
    let rewritten = editor.apply()?;
    let changed = rewritten != source;

    debug!(
        file,
        changed,
        bindings = registry.len(),
        diagnostics = diagnostics.len(),
        "transformed"
    );

    Ok(TransformOutput {
        source: rewritten,
        changed,
        diagnostics,
    })
}

/// Transform one file, turning a failure into a `TransformError` diagnostic
/// and the unmodified source.
pub fn transform_file(
    file: &str,
    source: &str,
    table: &MappingTable,
    options: &TransformOptions,
) -> TransformOutput {
    match transform_source(file, source, table, options) {
        Ok(output) => output,
        Err(err) => {
            warn!(file, error = %err, "leaving file unchanged");
            TransformOutput::unchanged(
                source,
                vec![Diagnostic::TransformError {
                    file: file.to_string(),
                    original_source: source.to_string(),
                    error_detail: err.to_string(),
                }],
            )
        }
    }
}

/// Reserve every name a new import must not take: module-scope
/// declarations other than imports and aliases of the namespace, plus
/// free identifiers.
fn reserve_names(
    registry: &mut ModuleRegistry,
    tree: &ScopeTree,
    import_locals: &HashSet<&str>,
    aliases: &AliasScan,
) {
    let alias_locals: HashSet<&str> = aliases.module_locals().collect();
    for name in tree.module_names() {
        if !import_locals.contains(name) && !alias_locals.contains(name) {
            registry.reserve(name);
        }
    }
    for name in tree.free_names() {
        registry.reserve(name);
    }
}

/// True if an unshadowed reference to the namespace survives the edits.
fn namespace_still_used(tree: &ScopeTree, namespace: &str, removed: &[Span], replaced: &[Span]) -> bool {
    tree.references_to(namespace).any(|r| {
        tree.resolve(namespace, r.span.start).unwrap_or(ScopeId::MODULE) == ScopeId::MODULE
            && !removed.iter().chain(replaced).any(|span| span.contains(&r.span))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_data_codemod_core::mapping::LegacyPathMapping;

    fn table() -> MappingTable {
        MappingTable::from_entries(
            "DS",
            vec![
                LegacyPathMapping::new("Model", "models", "default"),
                LegacyPathMapping::new("attr", "models", "attr"),
            ],
        )
        .unwrap()
    }

    fn options() -> TransformOptions {
        TransformOptions {
            namespace_module: "legacy".to_string(),
            ..TransformOptions::default()
        }
    }

    #[test]
    fn rewrites_namespace_into_imports() {
        let source = "import NS from \"legacy\";\nconst { attr } = NS;\nexport default NS.Model.extend({ shoe: attr('number') });\n";
        let output = transform_source("model.js", source, &table(), &options()).unwrap();
        assert!(output.changed);
        assert_eq!(
            output.source,
            "import Model, { attr } from 'models';\nexport default Model.extend({ shoe: attr('number') });\n"
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn namespace_import_survives_unmapped_reference() {
        let source = "import NS from 'legacy';\nNS.Model.extend();\nNS.unknownThing();\n";
        let output = transform_source("a.js", source, &table(), &options()).unwrap();
        assert_eq!(
            output.source,
            "import Model from 'models';\nimport NS from 'legacy';\nModel.extend();\nNS.unknownThing();\n"
        );
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn file_declaring_the_global_name_is_untouched() {
        let source = "const DS = makeStore();\nDS.Model.extend();\n";
        let output = transform_source("a.js", source, &table(), &options()).unwrap();
        assert!(!output.changed);
        assert_eq!(output.source, source);
    }

    #[test]
    fn parse_failure_becomes_diagnostic() {
        let source = "import NS from 'legacy';\nconst = ;\n";
        let output = transform_file("broken.js", source, &table(), &options());
        assert!(!output.changed);
        assert_eq!(output.source, source);
        match &output.diagnostics[..] {
            [Diagnostic::TransformError {
                file,
                original_source,
                error_detail,
            }] => {
                assert_eq!(file, "broken.js");
                assert_eq!(original_source, source);
                assert!(error_detail.starts_with("parse error"));
            }
            other => panic!("unexpected diagnostics: {:?}", other),
        }
    }

    #[test]
    fn output_serializes() {
        let output = transform_file("a.js", "NS.Model;\n", &table(), &options());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["changed"], false);
    }
}
