// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Lexical scope tree for shadowing checks.
//!
//! One pass over the module records every scope (module, function, block,
//! catch clause, named function/class expression) with its source span and
//! declared names, plus every identifier *reference*:
//!
//! - identifier expressions (`DS`, `attr(...)`)
//! - shorthand object properties (`{ Model }`)
//! - local export specifiers (`export { DS }`)
//!
//! `var` declarations land in the nearest function (or module) scope;
//! `let`, `const`, classes and function declarations land in the scope they
//! appear in. Positions are looked up by byte offset: the innermost scope
//! containing an offset is the last-created scope whose span contains it.

use std::collections::{BTreeSet, HashMap};

use swc_ecma_ast::{
    ArrowExpr, BlockStmt, CatchClause, ClassDecl, ClassExpr, Constructor, ExportSpecifier, Expr,
    FnDecl, FnExpr, ForInStmt, ForOfStmt, ForStmt, Function, GetterProp, ImportDecl,
    ImportSpecifier, ModuleExportName, NamedExport, ObjectPatProp, ParamOrTsParamProp, Pat, Prop,
    SetterProp, SwitchStmt, VarDecl, VarDeclKind,
};
use swc_ecma_visit::{Visit, VisitWith};

use ember_data_codemod_core::patch::Span;

use crate::parse::ParsedModule;

/// Index of a scope in its tree. The module scope is always `ScopeId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

impl ScopeId {
    pub const MODULE: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Function,
    Block,
    Catch,
    /// Holds the name of a named function or class expression.
    Name,
}

#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    span: Span,
    parent: Option<ScopeId>,
    /// Declared name -> spans of its binding identifiers.
    declarations: HashMap<String, Vec<Span>>,
}

/// An identifier reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentRef {
    pub name: String,
    pub span: Span,
}

/// Scopes and identifier references of one module.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    references: Vec<IdentRef>,
}

impl ScopeTree {
    /// Build the tree for a parsed module.
    pub fn build(parsed: &ParsedModule<'_>) -> ScopeTree {
        let mut builder = ScopeBuilder {
            parsed,
            scopes: vec![Scope {
                kind: ScopeKind::Module,
                span: Span::new(0, parsed.source().len()),
                parent: None,
                declarations: HashMap::new(),
            }],
            stack: vec![ScopeId::MODULE],
            references: Vec::new(),
        };
        parsed.module.visit_with(&mut builder);
        ScopeTree {
            scopes: builder.scopes,
            references: builder.references,
        }
    }

    /// Innermost scope containing `offset`.
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        self.scopes
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, scope)| scope.span.contains_offset(offset))
            .map(|(idx, _)| ScopeId(idx))
            .unwrap_or(ScopeId::MODULE)
    }

    /// The scope a reference to `name` at `offset` resolves to, or `None`
    /// for a free (global) name.
    pub fn resolve(&self, name: &str, offset: usize) -> Option<ScopeId> {
        self.resolve_except(name, offset, |_| false)
    }

    /// Like [`ScopeTree::resolve`], but declarations whose binding span
    /// satisfies `ignore` do not count.
    pub fn resolve_except(
        &self,
        name: &str,
        offset: usize,
        ignore: impl Fn(Span) -> bool,
    ) -> Option<ScopeId> {
        let mut current = Some(self.scope_at(offset));
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(spans) = scope.declarations.get(name) {
                if spans.iter().any(|span| !ignore(*span)) {
                    return Some(id);
                }
            }
            current = scope.parent;
        }
        None
    }

    /// True if a non-module scope enclosing `offset` declares `name`.
    pub fn is_shadowed(&self, name: &str, offset: usize) -> bool {
        self.is_shadowed_except(name, offset, |_| false)
    }

    pub fn is_shadowed_except(&self, name: &str, offset: usize, ignore: impl Fn(Span) -> bool) -> bool {
        matches!(self.resolve_except(name, offset, ignore), Some(id) if id != ScopeId::MODULE)
    }

    /// Binding spans of `name` in the module scope.
    pub fn module_declarations(&self, name: &str) -> &[Span] {
        self.scopes[0]
            .declarations
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn module_declares(&self, name: &str) -> bool {
        !self.module_declarations(name).is_empty()
    }

    /// Names declared in the module scope.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.scopes[0].declarations.keys().map(String::as_str)
    }

    pub fn references_to<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a IdentRef> + 'a {
        self.references.iter().filter(move |r| r.name == name)
    }

    /// Names referenced somewhere without any enclosing declaration.
    pub fn free_names(&self) -> BTreeSet<String> {
        self.references
            .iter()
            .filter(|r| self.resolve(&r.name, r.span.start).is_none())
            .map(|r| r.name.clone())
            .collect()
    }
}

// ============================================================================
// Builder
// ============================================================================

struct ScopeBuilder<'a, 'src> {
    parsed: &'a ParsedModule<'src>,
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
    references: Vec<IdentRef>,
}

impl ScopeBuilder<'_, '_> {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::MODULE)
    }

    fn nearest_function(&self) -> ScopeId {
        self.stack
            .iter()
            .rev()
            .copied()
            .find(|id| {
                matches!(
                    self.scopes[id.0].kind,
                    ScopeKind::Function | ScopeKind::Module
                )
            })
            .unwrap_or(ScopeId::MODULE)
    }

    fn push(&mut self, kind: ScopeKind, span: swc_common::Span) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            span: self.parsed.span(span),
            parent: Some(self.current()),
            declarations: HashMap::new(),
        });
        self.stack.push(id);
        id
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn declare(&mut self, scope: ScopeId, name: &str, span: swc_common::Span) {
        let span = self.parsed.span(span);
        self.scopes[scope.0]
            .declarations
            .entry(name.to_string())
            .or_default()
            .push(span);
    }

    fn declare_pat(&mut self, scope: ScopeId, pat: &Pat) {
        let mut names = Vec::new();
        binding_idents(pat, &mut names);
        for (name, span) in names {
            self.declare(scope, &name, span);
        }
    }

    fn reference(&mut self, name: &str, span: swc_common::Span) {
        self.references.push(IdentRef {
            name: name.to_string(),
            span: self.parsed.span(span),
        });
    }
}

/// Collect every identifier a binding pattern introduces.
pub(crate) fn binding_idents(pat: &Pat, out: &mut Vec<(String, swc_common::Span)>) {
    match pat {
        Pat::Ident(binding) => out.push((binding.id.sym.to_string(), binding.id.span)),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                binding_idents(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => binding_idents(&kv.value, out),
                    ObjectPatProp::Assign(assign) => {
                        out.push((assign.key.sym.to_string(), assign.key.span))
                    }
                    ObjectPatProp::Rest(rest) => binding_idents(&rest.arg, out),
                }
            }
        }
        Pat::Rest(rest) => binding_idents(&rest.arg, out),
        Pat::Assign(assign) => binding_idents(&assign.left, out),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

impl Visit for ScopeBuilder<'_, '_> {
    fn visit_import_decl(&mut self, n: &ImportDecl) {
        for specifier in &n.specifiers {
            let local = match specifier {
                ImportSpecifier::Named(named) => &named.local,
                ImportSpecifier::Default(default) => &default.local,
                ImportSpecifier::Namespace(namespace) => &namespace.local,
            };
            self.declare(ScopeId::MODULE, &local.sym, local.span);
        }
    }

    fn visit_var_decl(&mut self, n: &VarDecl) {
        let target = if n.kind == VarDeclKind::Var {
            self.nearest_function()
        } else {
            self.current()
        };
        for declarator in &n.decls {
            self.declare_pat(target, &declarator.name);
        }
        n.visit_children_with(self);
    }

    fn visit_fn_decl(&mut self, n: &FnDecl) {
        let scope = self.current();
        self.declare(scope, &n.ident.sym, n.ident.span);
        n.function.visit_with(self);
    }

    fn visit_class_decl(&mut self, n: &ClassDecl) {
        let scope = self.current();
        self.declare(scope, &n.ident.sym, n.ident.span);
        n.class.visit_with(self);
    }

    fn visit_fn_expr(&mut self, n: &FnExpr) {
        match &n.ident {
            Some(ident) => {
                let scope = self.push(ScopeKind::Name, n.function.span);
                self.declare(scope, &ident.sym, ident.span);
                n.function.visit_with(self);
                self.pop();
            }
            None => n.function.visit_with(self),
        }
    }

    fn visit_class_expr(&mut self, n: &ClassExpr) {
        match &n.ident {
            Some(ident) => {
                let scope = self.push(ScopeKind::Name, n.class.span);
                self.declare(scope, &ident.sym, ident.span);
                n.class.visit_with(self);
                self.pop();
            }
            None => n.class.visit_with(self),
        }
    }

    fn visit_function(&mut self, n: &Function) {
        let scope = self.push(ScopeKind::Function, n.span);
        for param in &n.params {
            self.declare_pat(scope, &param.pat);
        }
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_arrow_expr(&mut self, n: &ArrowExpr) {
        let scope = self.push(ScopeKind::Function, n.span);
        for param in &n.params {
            self.declare_pat(scope, param);
        }
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_constructor(&mut self, n: &Constructor) {
        let scope = self.push(ScopeKind::Function, n.span);
        for param in &n.params {
            if let ParamOrTsParamProp::Param(param) = param {
                self.declare_pat(scope, &param.pat);
            }
        }
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_getter_prop(&mut self, n: &GetterProp) {
        self.push(ScopeKind::Function, n.span);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_setter_prop(&mut self, n: &SetterProp) {
        let scope = self.push(ScopeKind::Function, n.span);
        self.declare_pat(scope, &n.param);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_block_stmt(&mut self, n: &BlockStmt) {
        self.push(ScopeKind::Block, n.span);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_catch_clause(&mut self, n: &CatchClause) {
        let scope = self.push(ScopeKind::Catch, n.span);
        if let Some(param) = &n.param {
            self.declare_pat(scope, param);
        }
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_for_stmt(&mut self, n: &ForStmt) {
        self.push(ScopeKind::Block, n.span);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_for_in_stmt(&mut self, n: &ForInStmt) {
        self.push(ScopeKind::Block, n.span);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_for_of_stmt(&mut self, n: &ForOfStmt) {
        self.push(ScopeKind::Block, n.span);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_switch_stmt(&mut self, n: &SwitchStmt) {
        self.push(ScopeKind::Block, n.span);
        n.visit_children_with(self);
        self.pop();
    }

    fn visit_expr(&mut self, n: &Expr) {
        if let Expr::Ident(ident) = n {
            self.reference(&ident.sym, ident.span);
        }
        n.visit_children_with(self);
    }

    fn visit_prop(&mut self, n: &Prop) {
        if let Prop::Shorthand(ident) = n {
            self.reference(&ident.sym, ident.span);
        }
        n.visit_children_with(self);
    }

    fn visit_named_export(&mut self, n: &NamedExport) {
        if n.src.is_some() {
            return;
        }
        for specifier in &n.specifiers {
            if let ExportSpecifier::Named(named) = specifier {
                if let ModuleExportName::Ident(ident) = &named.orig {
                    self.reference(&ident.sym, ident.span);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_module;

    fn tree(source: &str) -> ScopeTree {
        let parsed = parse_module("test.js", source).unwrap();
        ScopeTree::build(&parsed)
    }

    fn offset_of(source: &str, needle: &str) -> usize {
        source.find(needle).unwrap()
    }

    #[test]
    fn module_level_names_do_not_shadow() {
        let source = "import DS from 'ember-data';\nDS.Model;\n";
        let tree = tree(source);
        assert!(tree.module_declares("DS"));
        assert!(!tree.is_shadowed("DS", offset_of(source, "DS.Model")));
        assert_eq!(tree.resolve("DS", offset_of(source, "DS.Model")), Some(ScopeId::MODULE));
    }

    #[test]
    fn function_local_shadows() {
        let source = "(function() {\n  let DS = {};\n  DS.Model = 1;\n})();\nDS.attr;\n";
        let tree = tree(source);
        assert!(tree.is_shadowed("DS", offset_of(source, "DS.Model")));
        assert!(!tree.is_shadowed("DS", offset_of(source, "DS.attr")));
    }

    #[test]
    fn params_and_catch_bindings_shadow() {
        let source = "function f(DS) { return DS.a; }\ntry {} catch (DS) { DS.b; }\nconst g = (DS) => DS.c;\n";
        let tree = tree(source);
        assert!(tree.is_shadowed("DS", offset_of(source, "DS.a")));
        assert!(tree.is_shadowed("DS", offset_of(source, "DS.b")));
        assert!(tree.is_shadowed("DS", offset_of(source, "DS.c")));
    }

    #[test]
    fn var_hoists_to_function_scope() {
        let source = "function f() {\n  DS.a;\n  if (x) { var DS = 1; }\n}\n";
        let tree = tree(source);
        assert!(tree.is_shadowed("DS", offset_of(source, "DS.a")));
    }

    #[test]
    fn let_in_block_does_not_leak() {
        let source = "function f() {\n  DS.a;\n  if (x) { let DS = 1; }\n}\n";
        let tree = tree(source);
        assert!(!tree.is_shadowed("DS", offset_of(source, "DS.a")));
    }

    #[test]
    fn named_function_expression_binds_its_name_inside() {
        let source = "const a = function DS() { return DS.x; };\nDS.y;\n";
        let tree = tree(source);
        assert!(tree.is_shadowed("DS", offset_of(source, "DS.x")));
        assert!(!tree.is_shadowed("DS", offset_of(source, "DS.y")));
    }

    #[test]
    fn destructured_bindings_are_declared() {
        let source = "function f() {\n  const { attr, computed: { oneWay }, ...rest } = DS;\n  attr; oneWay; rest;\n}\n";
        let tree = tree(source);
        let at = offset_of(source, "attr; oneWay");
        assert!(tree.is_shadowed("attr", at));
        assert!(tree.is_shadowed("oneWay", at));
        assert!(tree.is_shadowed("rest", at));
        assert!(!tree.is_shadowed("computed", at));
    }

    #[test]
    fn ignored_declarations_do_not_shadow() {
        let source = "function f() {\n  const { attr } = DS;\n  attr();\n}\n";
        let tree = tree(source);
        let decl = offset_of(source, "attr }");
        let removed = Span::new(decl, decl + 4);
        let at = offset_of(source, "attr();");
        assert!(tree.is_shadowed("attr", at));
        assert!(!tree.is_shadowed_except("attr", at, |span| removed.contains(&span)));
    }

    #[test]
    fn references_include_shorthand_and_exports() {
        let source = "const o = { Model };\nexport { DS };\nfoo.DS.bar;\n";
        let tree = tree(source);
        assert_eq!(tree.references_to("Model").count(), 1);
        assert_eq!(tree.references_to("foo").count(), 1);
        // `DS` in `foo.DS` is a property, not a reference.
        assert_eq!(tree.references_to("DS").count(), 1);
    }

    #[test]
    fn free_names_exclude_declared() {
        let source = "import Model from '@ember-data/model';\nconst x = 1;\nModel; x; Ember; window;\n";
        let tree = tree(source);
        let free = tree.free_names();
        assert!(free.contains("Ember"));
        assert!(free.contains("window"));
        assert!(!free.contains("Model"));
        assert!(!free.contains("x"));
    }
}
