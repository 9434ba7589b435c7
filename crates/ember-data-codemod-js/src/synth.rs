// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Import synthesis: one declaration per module.
//!
//! Declarations are grouped by canonical module in order of first
//! appearance; bindings the resolvers created join the group of their
//! module, or form a new group after all existing ones. Each group then
//! prints as a single declaration, default specifier first:
//!
//! ```text
//! import Model, { attr, hasMany as many } from '@ember-data/model';
//! ```
//!
//! A group that needs no change keeps its declaration byte for byte. A
//! changed group rewrites its first declaration in place and deletes the
//! others. New groups go at the top of the file, above the first module
//! item and below any leading comment block. When that first item is an
//! import the file loses entirely, the new groups print in its place.

use std::collections::HashMap;

use tracing::trace;

use ember_data_codemod_core::config::TransformOptions;
use ember_data_codemod_core::patch::EditPrimitive;
use ember_data_codemod_core::registry::ModuleRegistry;
use ember_data_codemod_core::text::{
    absorb_semicolon, detect_line_terminator, line_start, statement_removal_span,
};

use crate::imports::ImportScan;
use crate::parse::ParsedModule;

#[derive(Debug, Default)]
struct Group {
    module: String,
    /// Existing declarations, by index into the import scan.
    members: Vec<usize>,
    /// `(export, local)` pairs with no declaration yet.
    additions: Vec<(String, String)>,
}

/// Compute the edits that bring the file's imports in line with `registry`.
///
/// With `drop_namespace` the namespace's own default specifier is left out.
pub fn synthesize_imports(
    parsed: &ParsedModule<'_>,
    imports: &ImportScan,
    registry: &ModuleRegistry,
    drop_namespace: bool,
    options: &TransformOptions,
) -> Vec<EditPrimitive> {
    let source = parsed.source();
    let groups = group_declarations(imports, registry);

    let mut edits = Vec::new();
    let mut deleted: Vec<usize> = Vec::new();
    let mut new_lines: Vec<String> = Vec::new();

    for group in &groups {
        let mut dropped_namespace = false;
        let mut specs: Vec<(String, String)> = Vec::new();
        for &member in &group.members {
            for spec in &imports.decls[member].specifiers {
                let is_namespace = imports.namespace.as_ref().is_some_and(|ns| {
                    ns.decl == member && spec.export_name == "default" && spec.local_name == ns.local
                });
                if drop_namespace && is_namespace {
                    dropped_namespace = true;
                    continue;
                }
                specs.push((spec.canonical_export.clone(), spec.local_name.clone()));
            }
        }
        specs.extend(group.additions.iter().cloned());
        let specs = order_specifiers(specs);

        let rewrite_literal = group
            .members
            .iter()
            .any(|&m| imports.decls[m].needs_literal_rewrite());
        let changed = !group.additions.is_empty()
            || group.members.len() > 1
            || dropped_namespace
            || rewrite_literal;
        if !changed {
            continue;
        }

        trace!(module = %group.module, specifiers = specs.len(), "rewriting import group");

        let Some((&anchor, rest)) = group.members.split_first() else {
            new_lines.push(print_import(&specs, &options.quote.quote(&group.module)));
            continue;
        };
        if specs.is_empty() {
            deleted.extend(&group.members);
            continue;
        }

        let decl = &imports.decls[anchor];
        let literal = if decl.canonical_source == decl.source {
            parsed.text(decl.source_span).to_string()
        } else {
            options.quote.quote(&group.module)
        };
        edits.push(EditPrimitive::Replace {
            span: absorb_semicolon(source, decl.span),
            new_text: print_import(&specs, &literal),
        });
        deleted.extend(rest);
    }

    deleted.sort_unstable();
    let mut deleted = deleted.into_iter().peekable();
    if !new_lines.is_empty() {
        let terminator = detect_line_terminator(source);
        let text = new_lines.join(terminator);
        let top = top_of_module(parsed);
        match deleted.next_if(|&first| imports.decls[first].span.start == top) {
            Some(first) => edits.push(EditPrimitive::Replace {
                span: absorb_semicolon(source, imports.decls[first].span),
                new_text: text,
            }),
            None => edits.push(EditPrimitive::InsertAt {
                position: line_start_if_indented(source, top),
                text: format!("{}{}", text, terminator),
            }),
        }
    }
    for idx in deleted {
        let span = absorb_semicolon(source, imports.decls[idx].span);
        edits.push(EditPrimitive::Delete {
            span: statement_removal_span(source, span),
        });
    }

    edits
}

/// Start of the first module item. Leading comments stay above it.
fn top_of_module(parsed: &ParsedModule<'_>) -> usize {
    parsed
        .module
        .body
        .first()
        .map(|item| parsed.span_of(item).start)
        .unwrap_or(0)
}

fn line_start_if_indented(source: &str, offset: usize) -> usize {
    let start = line_start(source, offset);
    if source[start..offset].trim().is_empty() {
        start
    } else {
        offset
    }
}

fn group_declarations(imports: &ImportScan, registry: &ModuleRegistry) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut by_module: HashMap<String, usize> = HashMap::new();
    let mut group_for = |module: &str, groups: &mut Vec<Group>| -> usize {
        *by_module.entry(module.to_string()).or_insert_with(|| {
            groups.push(Group {
                module: module.to_string(),
                ..Group::default()
            });
            groups.len() - 1
        })
    };

    for (idx, decl) in imports.decls.iter().enumerate() {
        if decl.consolidatable {
            let g = group_for(&decl.canonical_source, &mut groups);
            groups[g].members.push(idx);
        }
    }
    for (_, binding) in registry.iter() {
        if binding.declaration.is_none() {
            let g = group_for(&binding.module, &mut groups);
            groups[g]
                .additions
                .push((binding.export_name.clone(), binding.local_name.clone()));
        }
    }
    groups
}

/// Deduplicate `(export, local)` pairs and move default exports first,
/// keeping the relative order otherwise.
fn order_specifiers(specs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut unique: Vec<(String, String)> = Vec::with_capacity(specs.len());
    for spec in specs {
        if !unique.contains(&spec) {
            unique.push(spec);
        }
    }
    let (mut ordered, named): (Vec<_>, Vec<_>) =
        unique.into_iter().partition(|(export, _)| export == "default");
    ordered.extend(named);
    ordered
}

/// Print an import declaration. `specs` must already be ordered.
fn print_import(specs: &[(String, String)], literal: &str) -> String {
    let mut default: Option<&str> = None;
    let mut named: Vec<String> = Vec::new();
    for (export, local) in specs {
        if export == "default" && default.is_none() {
            default = Some(local.as_str());
        } else if export == local {
            named.push(export.clone());
        } else {
            named.push(format!("{} as {}", export, local));
        }
    }

    let mut clause = default.unwrap_or_default().to_string();
    if !named.is_empty() {
        if !clause.is_empty() {
            clause.push_str(", ");
        }
        clause.push_str(&format!("{{ {} }}", named.join(", ")));
    }
    format!("import {} from {};", clause, literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(export: &str, local: &str) -> (String, String) {
        (export.to_string(), local.to_string())
    }

    #[test]
    fn default_specifier_prints_first() {
        let specs = order_specifiers(vec![spec("attr", "attr"), spec("default", "Model")]);
        assert_eq!(
            print_import(&specs, "'@ember-data/model'"),
            "import Model, { attr } from '@ember-data/model';"
        );
    }

    #[test]
    fn renamed_and_extra_default_specifiers() {
        let specs = order_specifiers(vec![
            spec("default", "Model"),
            spec("attr", "thing"),
            spec("default", "Other"),
            spec("attr", "thing"),
        ]);
        assert_eq!(
            print_import(&specs, "\"m\""),
            "import Model, { default as Other, attr as thing } from \"m\";"
        );
    }

    #[test]
    fn named_only() {
        let specs = order_specifiers(vec![spec("hasMany", "hasMany"), spec("belongsTo", "belongsTo")]);
        assert_eq!(
            print_import(&specs, "'@ember-data/model'"),
            "import { hasMany, belongsTo } from '@ember-data/model';"
        );
    }
}
