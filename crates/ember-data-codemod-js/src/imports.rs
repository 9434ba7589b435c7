// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Scanner for the import declarations a file already has.
//!
//! Every default or named specifier is recorded in the [`ModuleRegistry`]
//! under its *canonical* module, so later requests for the same export reuse
//! the developer's local name instead of importing it twice. A declaration
//! whose literal is a legacy module path (`ember-data/model`) is canonical
//! when every one of its specifiers maps to the same new module; the
//! synthesizer then rewrites its literal.
//!
//! Namespace (`* as x`) and side-effect imports are left alone.

use swc_ecma_ast::{ImportDecl, ImportSpecifier, ModuleDecl, ModuleExportName, ModuleItem};
use tracing::trace;

use ember_data_codemod_core::config::TransformOptions;
use ember_data_codemod_core::mapping::MappingTable;
use ember_data_codemod_core::patch::Span;
use ember_data_codemod_core::registry::ModuleRegistry;

use crate::parse::ParsedModule;

/// One default or named specifier of an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Export name as written (`default` for default specifiers).
    pub export_name: String,
    pub local_name: String,
    /// Export name in the canonical module.
    pub canonical_export: String,
}

/// An import declaration of the file.
#[derive(Debug, Clone)]
pub struct ImportDeclInfo {
    /// Span of the declaration node.
    pub span: Span,
    /// Span of the module literal, quotes included.
    pub source_span: Span,
    /// Module path as written.
    pub source: String,
    /// Module path after legacy-literal canonicalization.
    pub canonical_source: String,
    pub specifiers: Vec<ImportSpec>,
    /// False for namespace and side-effect imports.
    pub consolidatable: bool,
}

impl ImportDeclInfo {
    pub fn needs_literal_rewrite(&self) -> bool {
        self.consolidatable && self.canonical_source != self.source
    }
}

/// The namespace's own default import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceImport {
    /// Index into [`ImportScan::decls`].
    pub decl: usize,
    pub local: String,
}

/// Result of scanning a module's import declarations.
#[derive(Debug, Clone, Default)]
pub struct ImportScan {
    pub decls: Vec<ImportDeclInfo>,
    pub namespace: Option<NamespaceImport>,
}

impl ImportScan {
    /// Local name of every specifier of every declaration.
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.decls
            .iter()
            .flat_map(|decl| decl.specifiers.iter().map(|spec| spec.local_name.as_str()))
    }
}

/// Scan import declarations and seed `registry` with their bindings.
pub fn scan_imports(
    parsed: &ParsedModule<'_>,
    table: &MappingTable,
    options: &TransformOptions,
    registry: &mut ModuleRegistry,
) -> ImportScan {
    let mut scan = ImportScan::default();

    for item in &parsed.module.body {
        let ModuleItem::ModuleDecl(ModuleDecl::Import(decl)) = item else {
            continue;
        };
        let info = describe(parsed, table, decl);
        let idx = scan.decls.len();

        if scan.namespace.is_none() && info.source == options.namespace_module {
            if let Some(spec) = info.specifiers.iter().find(|spec| spec.export_name == "default") {
                scan.namespace = Some(NamespaceImport {
                    decl: idx,
                    local: spec.local_name.clone(),
                });
            }
        }

        if info.consolidatable {
            for spec in &info.specifiers {
                registry.record_existing(
                    &info.canonical_source,
                    &spec.canonical_export,
                    &spec.local_name,
                    idx,
                );
            }
        }

        trace!(
            source = %info.source,
            canonical = %info.canonical_source,
            specifiers = info.specifiers.len(),
            "scanned import"
        );
        scan.decls.push(info);
    }

    scan
}

fn describe(parsed: &ParsedModule<'_>, table: &MappingTable, decl: &ImportDecl) -> ImportDeclInfo {
    let source_span = parsed.span_of(&*decl.src);
    let source = unquote(parsed.text(source_span)).to_string();

    let mut has_namespace = false;
    let mut specifiers = Vec::new();
    for specifier in &decl.specifiers {
        match specifier {
            ImportSpecifier::Default(default) => specifiers.push(ImportSpec {
                export_name: "default".to_string(),
                local_name: default.local.sym.to_string(),
                canonical_export: "default".to_string(),
            }),
            ImportSpecifier::Named(named) => {
                let local_name = named.local.sym.to_string();
                let export_name = match &named.imported {
                    Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
                    Some(ModuleExportName::Str(s)) => unquote(parsed.text(parsed.span_of(s))).to_string(),
                    None => local_name.clone(),
                };
                specifiers.push(ImportSpec {
                    canonical_export: export_name.clone(),
                    export_name,
                    local_name,
                });
            }
            ImportSpecifier::Namespace(_) => has_namespace = true,
        }
    }

    let consolidatable = !has_namespace && !specifiers.is_empty();
    let mut canonical_source = source.clone();
    if consolidatable {
        if let Some((module, exports)) = canonicalize(table, &source, &specifiers) {
            canonical_source = module;
            for (spec, export) in specifiers.iter_mut().zip(exports) {
                spec.canonical_export = export;
            }
        }
    }

    ImportDeclInfo {
        span: parsed.span_of(decl),
        source_span,
        source,
        canonical_source,
        specifiers,
        consolidatable,
    }
}

/// The canonical module of a legacy literal, if every specifier maps to the
/// same one, with each specifier's canonical export.
fn canonicalize(
    table: &MappingTable,
    source: &str,
    specifiers: &[ImportSpec],
) -> Option<(String, Vec<String>)> {
    let mut module: Option<&str> = None;
    let mut exports = Vec::with_capacity(specifiers.len());
    for spec in specifiers {
        let mapping = table.lookup_legacy_module(source, &spec.export_name)?;
        match module {
            Some(existing) if existing != mapping.module => return None,
            _ => module = Some(&mapping.module),
        }
        exports.push(mapping.export_name.clone());
    }
    module.map(|module| (module.to_string(), exports))
}

fn unquote(literal: &str) -> &str {
    let inner = literal
        .strip_prefix(['\'', '"'])
        .unwrap_or(literal);
    inner.strip_suffix(['\'', '"']).unwrap_or(inner)
}
