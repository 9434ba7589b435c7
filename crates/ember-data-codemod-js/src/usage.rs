// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Usage resolver: direct member accesses rooted at the namespace.
//!
//! For `DS.a.b.c` the candidate paths are tried longest first (`a.b.c`,
//! `a.b`, `a`) and the first one present in the mapping table wins. The
//! member node that ends at the matched segment is what gets replaced, so
//! `DS.Model.extend` becomes `Model.extend`.
//!
//! A site is skipped when the namespace identifier is shadowed at that
//! point, when it lies inside text the alias resolver already removes, or
//! when the matched node is an assignment target.

use swc_common::Spanned;
use swc_ecma_ast::{AssignExpr, Expr, MemberProp};
use swc_ecma_visit::{Visit, VisitWith};
use tracing::debug;

use ember_data_codemod_core::diagnostic::Diagnostic;
use ember_data_codemod_core::mapping::MappingTable;
use ember_data_codemod_core::patch::Span;
use ember_data_codemod_core::registry::{BindingId, ModuleRegistry};
use ember_data_codemod_core::text::{line_of, source_context};

use crate::parse::ParsedModule;
use crate::scope::ScopeTree;

/// A source site to be replaced with a binding's local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedReference {
    pub span: Span,
    pub binding: BindingId,
}

#[derive(Debug, Default)]
pub struct UsageOutcome {
    pub references: Vec<ResolvedReference>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A pure identifier member chain: `root.seg1.seg2`.
///
/// Each segment carries the span of the member node ending at it.
#[derive(Debug, Clone)]
pub(crate) struct MemberChain {
    pub root: String,
    pub root_span: swc_common::Span,
    pub segments: Vec<(String, swc_common::Span)>,
}

/// Decompose `expr` into an identifier chain; `None` when any link is
/// computed or the root is not an identifier.
pub(crate) fn member_chain(expr: &Expr) -> Option<MemberChain> {
    match expr {
        Expr::Ident(ident) => Some(MemberChain {
            root: ident.sym.to_string(),
            root_span: ident.span,
            segments: Vec::new(),
        }),
        Expr::Member(member) => {
            let MemberProp::Ident(prop) = &member.prop else {
                return None;
            };
            let mut chain = member_chain(&member.obj)?;
            chain.segments.push((prop.sym.to_string(), member.span));
            Some(chain)
        }
        _ => None,
    }
}

/// Resolve every namespace member access outside `removed`.
pub fn resolve_usages(
    parsed: &ParsedModule<'_>,
    tree: &ScopeTree,
    table: &MappingTable,
    registry: &mut ModuleRegistry,
    namespace: &str,
    removed: &[Span],
    file: &str,
) -> UsageOutcome {
    let mut finder = SiteFinder {
        namespace,
        sites: Vec::new(),
        assign_targets: Vec::new(),
    };
    parsed.module.visit_with(&mut finder);

    let source = parsed.source();
    let inside_removed = |span: Span| removed.iter().any(|r| r.contains(&span));
    let assign_targets: Vec<Span> = finder
        .assign_targets
        .iter()
        .map(|span| parsed.span(*span))
        .collect();

    let mut outcome = UsageOutcome::default();
    for chain in finder.sites {
        let root_span = parsed.span(chain.root_span);
        if inside_removed(root_span) || tree.is_shadowed(namespace, root_span.start) {
            continue;
        }

        let segments: Vec<&str> = chain.segments.iter().map(|(name, _)| name.as_str()).collect();
        let matched = (1..=segments.len())
            .rev()
            .find_map(|len| table.lookup(&segments[..len].join(".")).map(|m| (len, m)));

        let Some((len, mapping)) = matched else {
            let site = parsed.span(chain.segments[0].1);
            let line = line_of(source, site.start);
            outcome.diagnostics.push(Diagnostic::UnmappedGlobal {
                namespace: namespace.to_string(),
                dotted_path: segments[0].to_string(),
                line,
                file: file.to_string(),
                source_context: source_context(source, line, line_of(source, site.end)),
            });
            continue;
        };

        let span = parsed.span(chain.segments[len - 1].1);
        if assign_targets.contains(&span) {
            debug!(path = %mapping.legacy_path, "skipping assignment to namespace member");
            continue;
        }

        let local = registry.local_name_for(mapping, None);
        let line = line_of(source, span.start);
        if tree.is_shadowed_except(&local, span.start, inside_removed) {
            outcome.diagnostics.push(Diagnostic::AmbiguousLocalName {
                file: file.to_string(),
                line,
                local_name: local,
                module: mapping.module.clone(),
                export_name: mapping.export_name.clone(),
                existing: "a declaration in an enclosing scope".to_string(),
            });
            continue;
        }

        match registry.binding_for_mapping(mapping, None) {
            Ok(binding) => outcome.references.push(ResolvedReference { span, binding }),
            Err(conflict) => outcome.diagnostics.push(Diagnostic::AmbiguousLocalName {
                file: file.to_string(),
                line,
                local_name: conflict.local_name,
                module: conflict.module,
                export_name: conflict.export_name,
                existing: conflict.existing,
            }),
        }
    }

    outcome
}

struct SiteFinder<'a> {
    namespace: &'a str,
    sites: Vec<MemberChain>,
    assign_targets: Vec<swc_common::Span>,
}

impl Visit for SiteFinder<'_> {
    fn visit_expr(&mut self, n: &Expr) {
        if let Expr::Member(_) = n {
            if let Some(chain) = member_chain(n) {
                if chain.root == self.namespace {
                    self.sites.push(chain);
                }
                return;
            }
        }
        n.visit_children_with(self);
    }

    fn visit_assign_expr(&mut self, n: &AssignExpr) {
        self.assign_targets.push(n.left.span());
        n.visit_children_with(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_module;
    use ember_data_codemod_core::mapping::LegacyPathMapping;

    fn table() -> MappingTable {
        MappingTable::from_entries(
            "DS",
            vec![
                LegacyPathMapping::new("Model", "@ember-data/model", "default"),
                LegacyPathMapping::new("computed", "@ember/object", "computed"),
                LegacyPathMapping::new("computed.or", "@ember/object/computed", "or"),
                LegacyPathMapping::new("a.b.c", "deep", "c"),
                LegacyPathMapping::new("a", "shallow", "default").with_local_name("A"),
            ],
        )
        .unwrap()
    }

    fn resolve(source: &str) -> (UsageOutcome, ModuleRegistry) {
        let parsed = parse_module("test.js", source).unwrap();
        let tree = ScopeTree::build(&parsed);
        let mut registry = ModuleRegistry::new();
        let outcome = resolve_usages(&parsed, &tree, &table(), &mut registry, "DS", &[], "test.js");
        (outcome, registry)
    }

    fn replaced<'a>(source: &'a str, outcome: &UsageOutcome) -> Vec<&'a str> {
        outcome
            .references
            .iter()
            .map(|r| &source[r.span.start..r.span.end])
            .collect()
    }

    #[test]
    fn outermost_matched_node_is_replaced() {
        let source = "DS.Model.extend({});\n";
        let (outcome, registry) = resolve(source);
        assert_eq!(replaced(source, &outcome), ["DS.Model"]);
        assert_eq!(registry.get(outcome.references[0].binding).local_name, "Model");
    }

    #[test]
    fn longest_path_wins() {
        let source = "DS.computed.or('a', 'b');\nDS.computed('x');\n";
        let (outcome, registry) = resolve(source);
        assert_eq!(replaced(source, &outcome), ["DS.computed.or", "DS.computed"]);
        assert_eq!(registry.get(outcome.references[0].binding).module, "@ember/object/computed");
    }

    #[test]
    fn three_segment_paths_resolve() {
        let source = "DS.a.b.c.d();\nDS.a.b.x;\n";
        let (outcome, registry) = resolve(source);
        assert_eq!(replaced(source, &outcome), ["DS.a.b.c", "DS.a"]);
        assert_eq!(registry.get(outcome.references[1].binding).local_name, "A");
    }

    #[test]
    fn unmapped_reports_least_specific_path() {
        let source = "\n\nDS.unknownThing.more;\n";
        let (outcome, _) = resolve(source);
        assert!(outcome.references.is_empty());
        match &outcome.diagnostics[..] {
            [Diagnostic::UnmappedGlobal {
                dotted_path, line, ..
            }] => {
                assert_eq!(dotted_path, "unknownThing");
                assert_eq!(*line, 3);
            }
            other => panic!("unexpected diagnostics: {:?}", other),
        }
    }

    #[test]
    fn shadowed_and_non_root_uses_are_ignored() {
        let source = "foo.DS.Model;\nfunction f(DS) { DS.Model; }\n";
        let (outcome, _) = resolve(source);
        assert!(outcome.references.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn shadowed_local_name_is_ambiguous() {
        let source = "function f() { const Model = 1; return DS.Model; }\n";
        let (outcome, _) = resolve(source);
        assert!(outcome.references.is_empty());
        assert!(matches!(
            &outcome.diagnostics[..],
            [Diagnostic::AmbiguousLocalName { local_name, .. }] if local_name == "Model"
        ));
    }

    #[test]
    fn assignment_targets_are_left_alone() {
        let source = "DS.Model = null;\nDS.Model.x = 1;\n";
        let (outcome, _) = resolve(source);
        assert_eq!(replaced(source, &outcome), ["DS.Model"]);
        assert_eq!(outcome.references[0].span.start, source.find("DS.Model.x").unwrap());
    }

    #[test]
    fn computed_links_stop_the_chain() {
        let source = "DS.Model[key].x;\n";
        let (outcome, _) = resolve(source);
        assert_eq!(replaced(source, &outcome), ["DS.Model"]);
    }
}
