//! Module registry: per-file bookkeeping of imported bindings.
//!
//! The registry answers "which local name refers to export `E` of module
//! `M` in this file?". It is seeded from the file's existing import
//! declarations and grows as namespace references are resolved.
//!
//! ## Invariants
//!
//! - At most one binding exists per `(module, export_name)` pair.
//! - Two bindings never share a local name.
//! - A new binding never takes a name that a module-scope declaration or a
//!   free identifier of the file already uses (the *reserved* set).
//!
//! A request that would break the last two invariants fails with
//! [`LocalNameConflict`]; the registry never renames silently.

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::mapping::LegacyPathMapping;

/// Index of a binding in its registry. Stable for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub usize);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding_{}", self.0)
    }
}

/// Association of a module export with the local identifier bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBinding {
    /// Module path.
    pub module: String,
    /// Exported name (`default` for default exports).
    pub export_name: String,
    /// Local identifier.
    pub local_name: String,
    /// Index of the existing import declaration providing this binding, if any.
    pub declaration: Option<usize>,
}

/// A binding request that would reuse a local name already taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot bind '{local_name}' to {export_name} of '{module}': name already used by {existing}")]
pub struct LocalNameConflict {
    pub local_name: String,
    pub module: String,
    pub export_name: String,
    /// Human-readable description of the current holder of the name.
    pub existing: String,
}

/// Per-file registry of module bindings.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    bindings: Vec<ModuleBinding>,
    by_key: HashMap<(String, String), usize>,
    by_local: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry::default()
    }

    /// Binding for `(module, export_name)`, if one exists.
    pub fn find(&self, module: &str, export_name: &str) -> Option<BindingId> {
        self.by_key
            .get(&(module.to_string(), export_name.to_string()))
            .map(|&idx| BindingId(idx))
    }

    pub fn get(&self, id: BindingId) -> &ModuleBinding {
        &self.bindings[id.0]
    }

    /// Record a binding that an existing import declaration already provides.
    ///
    /// The first declaration of a `(module, export_name)` pair wins; later
    /// ones return the original binding unchanged.
    pub fn record_existing(
        &mut self,
        module: &str,
        export_name: &str,
        local_name: &str,
        declaration: usize,
    ) -> BindingId {
        if let Some(id) = self.find(module, export_name) {
            return id;
        }
        self.insert(ModuleBinding {
            module: module.to_string(),
            export_name: export_name.to_string(),
            local_name: local_name.to_string(),
            declaration: Some(declaration),
        })
    }

    /// Return the binding for `(module, export_name)`, creating it with
    /// `local_name` when missing.
    ///
    /// An existing binding is returned as is, even if its local differs from
    /// `local_name`; callers that care compare the locals themselves.
    pub fn get_or_create(
        &mut self,
        module: &str,
        export_name: &str,
        local_name: &str,
    ) -> Result<BindingId, LocalNameConflict> {
        if let Some(id) = self.find(module, export_name) {
            return Ok(id);
        }

        let conflict = |existing: String| LocalNameConflict {
            local_name: local_name.to_string(),
            module: module.to_string(),
            export_name: export_name.to_string(),
            existing,
        };
        if let Some(&holder) = self.by_local.get(local_name) {
            let holder = &self.bindings[holder];
            return Err(conflict(format!(
                "the import of {} from '{}'",
                holder.export_name, holder.module
            )));
        }
        if self.reserved.contains(local_name) {
            return Err(conflict("another declaration in this file".to_string()));
        }

        Ok(self.insert(ModuleBinding {
            module: module.to_string(),
            export_name: export_name.to_string(),
            local_name: local_name.to_string(),
            declaration: None,
        }))
    }

    /// The local name a request for `mapping` would bind, without creating anything.
    ///
    /// An existing binding's local wins, then `suggested`, then the mapping's
    /// preferred local name, then the last segment of its legacy path.
    pub fn local_name_for(&self, mapping: &LegacyPathMapping, suggested: Option<&str>) -> String {
        if let Some(id) = self.find(&mapping.module, &mapping.export_name) {
            return self.get(id).local_name.clone();
        }
        suggested
            .unwrap_or_else(|| mapping.default_local_name())
            .to_string()
    }

    /// Obtain the binding that satisfies `mapping`.
    pub fn binding_for_mapping(
        &mut self,
        mapping: &LegacyPathMapping,
        suggested: Option<&str>,
    ) -> Result<BindingId, LocalNameConflict> {
        let local = self.local_name_for(mapping, suggested);
        self.get_or_create(&mapping.module, &mapping.export_name, &local)
    }

    /// Mark a name as taken by something other than a managed import.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    /// Bindings in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &ModuleBinding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(idx, binding)| (BindingId(idx), binding))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn insert(&mut self, binding: ModuleBinding) -> BindingId {
        let idx = self.bindings.len();
        self.by_key
            .insert((binding.module.clone(), binding.export_name.clone()), idx);
        self.by_local.entry(binding.local_name.clone()).or_insert(idx);
        self.bindings.push(binding);
        BindingId(idx)
    }
}
