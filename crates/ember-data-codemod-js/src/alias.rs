// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Alias resolver: variable declarations that peel members off the namespace.
//!
//! Three initializer shapes introduce aliases:
//!
//! ```text
//! const { Model, attr: thing } = DS;          // the namespace itself
//! const Adapter = DS.Adapter;                 // a namespace member chain
//! const { computed } = DS;
//! const { oneWay } = computed;                // an alias found earlier
//! ```
//!
//! Every bound identifier becomes a *leaf* carrying its dotted path below
//! the namespace. Discovery runs to a fixed point, so a declaration whose
//! initializer is an alias is found wherever it sits in the file.
//!
//! Resolution then happens in two phases:
//!
//! 1. Each leaf whose path is in the mapping table binds its local name in
//!    the registry. A leaf without a mapping stays *pending*.
//! 2. A pending leaf is cleared when it is only an intermediate step: it
//!    has at least one dependent declaration, every dependent declaration
//!    disappears entirely, and nothing else reads it. Pending leaves that
//!    are not cleared are reported as unmapped.
//!
//! Resolved and cleared leaves are removed from their patterns; a pattern
//! that loses every property removes its declarator, and a declaration that
//! loses every declarator is removed as a statement.

use swc_ecma_ast::{
    Decl, Expr, ObjectPat, ObjectPatProp, Pat, PropName, Stmt, VarDecl, VarDeclarator,
};
use swc_ecma_visit::{Visit, VisitWith};
use tracing::{debug, trace};

use ember_data_codemod_core::diagnostic::Diagnostic;
use ember_data_codemod_core::mapping::MappingTable;
use ember_data_codemod_core::patch::{EditPrimitive, Span};
use ember_data_codemod_core::registry::ModuleRegistry;
use ember_data_codemod_core::text::{
    absorb_leading_line_comments, absorb_semicolon, coalesce_line_removals, line_of,
    list_removal_spans, source_context, statement_removal_span,
};

use crate::parse::ParsedModule;
use crate::scope::{ScopeId, ScopeTree};
use crate::usage::member_chain;

// ============================================================================
// Discovered structure
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    /// A property of a destructuring pattern.
    Destructured,
    /// The whole declarator: `const Adapter = DS.Adapter`.
    Whole,
}

#[derive(Debug, Clone)]
struct Leaf {
    local: String,
    /// Span of the binding identifier.
    binding: Span,
    /// Span reported in diagnostics.
    site: Span,
    path: String,
    scope: Option<ScopeId>,
    kind: LeafKind,
    /// Candidates whose initializer is this leaf.
    children: Vec<usize>,
}

#[derive(Debug, Clone)]
enum PatNode {
    Leaf(usize),
    Object(Vec<PatProp>),
    /// Computed keys, defaults, rest elements: never removed.
    Opaque,
}

#[derive(Debug, Clone)]
struct PatProp {
    span: Span,
    node: PatNode,
}

#[derive(Debug, Clone)]
struct Candidate {
    init: Span,
    pattern: PatNode,
}

#[derive(Debug, Clone)]
struct AliasStatement {
    span: Span,
    declarators: Vec<Span>,
    candidates: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafState {
    Pending,
    Resolved,
    Kept,
}

/// Edits and findings produced by alias resolution.
#[derive(Debug, Default)]
pub struct AliasOutcome {
    pub edits: Vec<EditPrimitive>,
    /// Every span the edits delete.
    pub removed: Vec<Span>,
    pub diagnostics: Vec<Diagnostic>,
    /// Module-scope aliases that stay in the file.
    pub kept_module_locals: Vec<String>,
}

/// Namespace aliases discovered in one module.
#[derive(Debug)]
pub struct AliasScan {
    namespace: String,
    statements: Vec<AliasStatement>,
    candidates: Vec<Candidate>,
    leaves: Vec<Leaf>,
}

impl AliasScan {
    /// Find every alias-introducing declaration of the module.
    pub fn discover(parsed: &ParsedModule<'_>, tree: &ScopeTree, namespace: &str) -> AliasScan {
        let mut collector = VarDeclCollector::default();
        parsed.module.visit_with(&mut collector);

        let mut scan = AliasScan {
            namespace: namespace.to_string(),
            statements: Vec::with_capacity(collector.found.len()),
            candidates: Vec::new(),
            leaves: Vec::new(),
        };
        for decl in &collector.found {
            scan.statements.push(AliasStatement {
                span: absorb_semicolon(parsed.source(), parsed.span_of(decl)),
                declarators: decl.decls.iter().map(|d| parsed.span_of(d)).collect(),
                candidates: vec![None; decl.decls.len()],
            });
        }

        loop {
            let mut progressed = false;
            for (s, decl) in collector.found.iter().enumerate() {
                for (d, declarator) in decl.decls.iter().enumerate() {
                    if scan.statements[s].candidates[d].is_some() {
                        continue;
                    }
                    if let Some(candidate) = scan.classify(parsed, tree, declarator) {
                        scan.statements[s].candidates[d] = Some(candidate);
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        trace!(
            candidates = scan.candidates.len(),
            leaves = scan.leaves.len(),
            "alias discovery finished"
        );
        scan
    }

    /// Local names of module-scope aliases.
    pub fn module_locals(&self) -> impl Iterator<Item = &str> {
        self.leaves
            .iter()
            .filter(|leaf| leaf.scope == Some(ScopeId::MODULE))
            .map(|leaf| leaf.local.as_str())
    }

    fn classify(
        &mut self,
        parsed: &ParsedModule<'_>,
        tree: &ScopeTree,
        declarator: &VarDeclarator,
    ) -> Option<usize> {
        let init = declarator.init.as_deref()?;
        let init_span = parsed.span_of(init);

        let (parent, base) = match init {
            Expr::Ident(ident) => {
                let Pat::Object(_) = &declarator.name else {
                    return None;
                };
                if &*ident.sym == self.namespace {
                    if tree.is_shadowed(&self.namespace, init_span.start) {
                        return None;
                    }
                    (None, String::new())
                } else {
                    let scope = tree.resolve(&ident.sym, init_span.start)?;
                    let parent = self
                        .leaves
                        .iter()
                        .position(|leaf| leaf.local == *ident.sym && leaf.scope == Some(scope))?;
                    (Some(parent), self.leaves[parent].path.clone())
                }
            }
            Expr::Member(_) => {
                let chain = member_chain(init)?;
                if chain.root != self.namespace
                    || tree.is_shadowed(&self.namespace, init_span.start)
                {
                    return None;
                }
                let segments: Vec<&str> = chain.segments.iter().map(|(s, _)| s.as_str()).collect();
                (None, segments.join("."))
            }
            _ => return None,
        };

        let pattern = match &declarator.name {
            Pat::Object(object) => self.object_pattern(parsed, tree, object, &base),
            Pat::Ident(binding) if !base.is_empty() => self.push_leaf(
                parsed,
                tree,
                &binding.id.sym,
                binding.id.span,
                parsed.span_of(&declarator.name),
                base,
                LeafKind::Whole,
            ),
            _ => return None,
        };

        let idx = self.candidates.len();
        self.candidates.push(Candidate {
            init: init_span,
            pattern,
        });
        if let Some(parent) = parent {
            self.leaves[parent].children.push(idx);
        }
        Some(idx)
    }

    fn object_pattern(
        &mut self,
        parsed: &ParsedModule<'_>,
        tree: &ScopeTree,
        object: &ObjectPat,
        base: &str,
    ) -> PatNode {
        let mut props = Vec::with_capacity(object.props.len());
        for prop in &object.props {
            let span = parsed.span_of(prop);
            let node = match prop {
                ObjectPatProp::KeyValue(kv) => match prop_key(parsed, &kv.key) {
                    Some(key) => {
                        let path = join_path(base, &key);
                        match &*kv.value {
                            Pat::Ident(binding) => self.push_leaf(
                                parsed,
                                tree,
                                &binding.id.sym,
                                binding.id.span,
                                span,
                                path,
                                LeafKind::Destructured,
                            ),
                            Pat::Object(inner) => self.object_pattern(parsed, tree, inner, &path),
                            _ => PatNode::Opaque,
                        }
                    }
                    None => PatNode::Opaque,
                },
                ObjectPatProp::Assign(assign) if assign.value.is_none() => {
                    let path = join_path(base, &assign.key.sym);
                    self.push_leaf(
                        parsed,
                        tree,
                        &assign.key.sym,
                        assign.key.span,
                        span,
                        path,
                        LeafKind::Destructured,
                    )
                }
                _ => PatNode::Opaque,
            };
            props.push(PatProp { span, node });
        }
        PatNode::Object(props)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_leaf(
        &mut self,
        parsed: &ParsedModule<'_>,
        tree: &ScopeTree,
        local: &str,
        binding: swc_common::Span,
        site: Span,
        path: String,
        kind: LeafKind,
    ) -> PatNode {
        let binding = parsed.span(binding);
        let idx = self.leaves.len();
        self.leaves.push(Leaf {
            local: local.to_string(),
            binding,
            site,
            path,
            scope: tree.resolve(local, binding.start),
            kind,
            children: Vec::new(),
        });
        PatNode::Leaf(idx)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Bind resolvable aliases in `registry` and compute the edits that
    /// remove them.
    pub fn resolve(
        &self,
        parsed: &ParsedModule<'_>,
        tree: &ScopeTree,
        table: &MappingTable,
        registry: &mut ModuleRegistry,
        file: &str,
    ) -> AliasOutcome {
        let source = parsed.source();
        let mut outcome = AliasOutcome::default();

        let mut states = vec![LeafState::Pending; self.leaves.len()];
        for (idx, leaf) in self.leaves.iter().enumerate() {
            let Some(mapping) = table.lookup(&leaf.path) else {
                continue;
            };
            let line = line_of(source, leaf.site.start);
            let ambiguous = |existing: String| Diagnostic::AmbiguousLocalName {
                file: file.to_string(),
                line,
                local_name: leaf.local.clone(),
                module: mapping.module.clone(),
                export_name: mapping.export_name.clone(),
                existing,
            };

            // A whole-declarator alias that cannot be bound keeps its
            // initializer, which the usage resolver rewrites instead.
            let report = leaf.kind == LeafKind::Destructured;

            if let Some(id) = registry.find(&mapping.module, &mapping.export_name) {
                let binding = registry.get(id);
                if binding.local_name != leaf.local {
                    if report {
                        outcome.diagnostics.push(ambiguous(format!(
                            "the existing binding '{}'",
                            binding.local_name
                        )));
                    }
                    states[idx] = LeafState::Kept;
                    continue;
                }
            }

            if !self.rebinds_cleanly(tree, leaf) {
                if report {
                    outcome
                        .diagnostics
                        .push(ambiguous("a declaration in an enclosing scope".to_string()));
                }
                states[idx] = LeafState::Kept;
                continue;
            }

            match registry.get_or_create(&mapping.module, &mapping.export_name, &leaf.local) {
                Ok(_) => {
                    debug!(path = %leaf.path, local = %leaf.local, "resolved alias");
                    states[idx] = LeafState::Resolved;
                }
                Err(conflict) => {
                    if report {
                        outcome.diagnostics.push(ambiguous(conflict.existing));
                    }
                    states[idx] = LeafState::Kept;
                }
            }
        }

        let mut memo = vec![None; self.leaves.len()];
        let removed: Vec<bool> = (0..self.leaves.len())
            .map(|idx| self.leaf_removed(idx, tree, &states, &mut memo))
            .collect();

        for (idx, leaf) in self.leaves.iter().enumerate() {
            if states[idx] == LeafState::Pending && !removed[idx] && leaf.kind == LeafKind::Destructured
            {
                let line = line_of(source, leaf.site.start);
                outcome.diagnostics.push(Diagnostic::UnmappedGlobal {
                    namespace: self.namespace.clone(),
                    dotted_path: leaf.path.clone(),
                    line,
                    file: file.to_string(),
                    source_context: source_context(source, line, line_of(source, leaf.site.end)),
                });
            }
            if !removed[idx] && leaf.scope == Some(ScopeId::MODULE) {
                outcome.kept_module_locals.push(leaf.local.clone());
            }
        }

        // Comments above the first item belong to the file header.
        let first_item = parsed.module.body.first().map(|item| parsed.span_of(item).start);
        let mut statement_spans = Vec::new();
        for statement in &self.statements {
            let flags: Vec<bool> = statement
                .candidates
                .iter()
                .map(|c| c.is_some_and(|c| pattern_removed(&self.candidates[c].pattern, &removed)))
                .collect();

            if !flags.is_empty() && flags.iter().all(|f| *f) {
                let span = statement_removal_span(source, statement.span);
                statement_spans.push(if first_item == Some(statement.span.start) {
                    span
                } else {
                    absorb_leading_line_comments(source, span)
                });
                continue;
            }

            for span in list_removal_spans(&statement.declarators, &flags) {
                outcome.edits.push(EditPrimitive::Delete { span });
                outcome.removed.push(span);
            }
            for (candidate, removed_declarator) in statement.candidates.iter().zip(&flags) {
                if let (Some(c), false) = (candidate, removed_declarator) {
                    prune_pattern(&self.candidates[*c].pattern, &removed, &mut outcome);
                }
            }
        }
        for span in coalesce_line_removals(source, statement_spans) {
            outcome.edits.push(EditPrimitive::Delete { span });
            outcome.removed.push(span);
        }

        outcome
    }

    /// After the leaf's declaration is removed, every read of it must land
    /// on the module-level import.
    fn rebinds_cleanly(&self, tree: &ScopeTree, leaf: &Leaf) -> bool {
        tree.references_to(&leaf.local)
            .filter(|r| tree.resolve(&leaf.local, r.span.start) == leaf.scope)
            .all(|r| {
                tree.resolve_except(&leaf.local, r.span.start, |span| span == leaf.binding)
                    .is_none()
            })
    }

    fn leaf_removed(
        &self,
        idx: usize,
        tree: &ScopeTree,
        states: &[LeafState],
        memo: &mut [Option<bool>],
    ) -> bool {
        match states[idx] {
            LeafState::Resolved => return true,
            LeafState::Kept => return false,
            LeafState::Pending => {}
        }
        if let Some(known) = memo[idx] {
            return known;
        }
        memo[idx] = Some(false);

        let leaf = &self.leaves[idx];
        let cleared = !leaf.children.is_empty()
            && leaf.children.iter().all(|&c| {
                self.subtree_removed(&self.candidates[c].pattern, tree, states, memo)
            })
            && self.only_read_by_children(tree, leaf);

        memo[idx] = Some(cleared);
        cleared
    }

    fn subtree_removed(
        &self,
        node: &PatNode,
        tree: &ScopeTree,
        states: &[LeafState],
        memo: &mut [Option<bool>],
    ) -> bool {
        match node {
            PatNode::Leaf(idx) => self.leaf_removed(*idx, tree, states, memo),
            PatNode::Object(props) => {
                !props.is_empty()
                    && props
                        .iter()
                        .all(|p| self.subtree_removed(&p.node, tree, states, memo))
            }
            PatNode::Opaque => false,
        }
    }

    fn only_read_by_children(&self, tree: &ScopeTree, leaf: &Leaf) -> bool {
        tree.references_to(&leaf.local)
            .filter(|r| tree.resolve(&leaf.local, r.span.start) == leaf.scope)
            .all(|r| leaf.children.iter().any(|&c| self.candidates[c].init == r.span))
    }
}

fn pattern_removed(node: &PatNode, removed: &[bool]) -> bool {
    match node {
        PatNode::Leaf(idx) => removed[*idx],
        PatNode::Object(props) => {
            !props.is_empty() && props.iter().all(|p| pattern_removed(&p.node, removed))
        }
        PatNode::Opaque => false,
    }
}

/// Delete removed properties of a surviving pattern, recursing into
/// surviving nested patterns.
fn prune_pattern(node: &PatNode, removed: &[bool], outcome: &mut AliasOutcome) {
    let PatNode::Object(props) = node else {
        return;
    };
    let spans: Vec<Span> = props.iter().map(|p| p.span).collect();
    let flags: Vec<bool> = props.iter().map(|p| pattern_removed(&p.node, removed)).collect();
    for span in list_removal_spans(&spans, &flags) {
        outcome.edits.push(EditPrimitive::Delete { span });
        outcome.removed.push(span);
    }
    for (prop, gone) in props.iter().zip(flags) {
        if !gone {
            prune_pattern(&prop.node, removed, outcome);
        }
    }
}

fn prop_key(parsed: &ParsedModule<'_>, key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => {
            let raw = parsed.text(parsed.span_of(s));
            Some(raw.trim_matches(['\'', '"']).to_string())
        }
        _ => None,
    }
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

/// Collects variable declarations that are statements of their own.
///
/// Exported declarations and loop heads are not statements and are skipped.
#[derive(Default)]
struct VarDeclCollector {
    found: Vec<VarDecl>,
}

impl Visit for VarDeclCollector {
    fn visit_stmt(&mut self, n: &Stmt) {
        if let Stmt::Decl(Decl::Var(decl)) = n {
            self.found.push((**decl).clone());
        }
        n.visit_children_with(self);
    }
}
