//! Host import system.
//!
//! Stands in for the host's module machinery: a table of loaded modules and
//! an ordered chain of resolvers consulted for every name not yet loaded.
//!
//! ```text
//! import(name)
//!   ├── loaded?           → return it
//!   └── resolvers, in order
//!         ├── Resolved(m)       → publish m, link into parent, return
//!         ├── Declined          → next resolver
//!         └── DeclinedWith(err) → next resolver, remember err
//!   nobody resolved → remembered err, else NotFound
//! ```
//!
//! A resolver that declines with a reason (a transport failure, a refused
//! self-dependency) still lets later resolvers try. The reason only surfaces
//! if nobody else can satisfy the name, so "peer unreachable" is not
//! reported as a plain "no module named".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};
use tether_ir::{ModuleName, ModuleRef, Value};

use crate::error::ImportError;
use crate::policy::LocalProbe;

/// Identifies one installed resolver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolverId(u64);

/// Outcome of asking one resolver about one name.
#[derive(Debug)]
pub enum Resolution {
    Resolved(ModuleRef),
    Declined,
    /// Declined, with the failure to report if no later resolver succeeds.
    DeclinedWith(ImportError),
}

/// One entry in the host's resolver chain.
pub trait Resolver: Send + Sync {
    /// Short name for logs.
    fn label(&self) -> &str;

    /// Resolve `name` or decline. `Err` aborts the import.
    fn resolve(&self, name: &ModuleName, cx: &ResolveContext<'_>)
        -> Result<Resolution, ImportError>;

    /// Could `resolve` succeed for `name`? Must not import anything.
    fn probe(&self, _name: &ModuleName) -> bool {
        false
    }
}

/// What a resolver sees while resolving: the system, and which resolver it
/// is.
pub struct ResolveContext<'a> {
    system: &'a ImportSystem,
    resolver: ResolverId,
}

impl ResolveContext<'_> {
    pub fn system(&self) -> &ImportSystem {
        self.system
    }

    pub fn resolver(&self) -> ResolverId {
        self.resolver
    }

    /// Import through the full chain (ancestors, dependencies).
    pub fn import(&self, name: &ModuleName) -> Result<ModuleRef, ImportError> {
        self.system.import(name)
    }
}

/// Local availability as seen by one resolver: everything the *other*
/// resolvers could satisfy, plus what is already loaded.
impl LocalProbe for ResolveContext<'_> {
    fn exists_locally(&self, name: &ModuleName) -> bool {
        self.system.probe_except(name, self.resolver)
    }
}

pub struct ImportSystem {
    modules: DashMap<ModuleName, ModuleRef, FxBuildHasher>,
    resolvers: RwLock<Vec<(ResolverId, Arc<dyn Resolver>)>>,
    next_id: AtomicU64,
}

impl Default for ImportSystem {
    fn default() -> Self {
        ImportSystem {
            modules: DashMap::with_hasher(FxBuildHasher),
            resolvers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl ImportSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a system whose only resolver is `local`.
    pub fn with_local(local: Arc<LocalModules>) -> Self {
        let system = Self::new();
        system.install_last(local);
        system
    }

    fn next_id(&self) -> ResolverId {
        ResolverId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert ahead of every installed resolver.
    pub fn install_first(&self, resolver: Arc<dyn Resolver>) -> ResolverId {
        let id = self.next_id();
        tracing::debug!(resolver = resolver.label(), ?id, "installed first");
        self.resolvers.write().insert(0, (id, resolver));
        id
    }

    pub fn install_last(&self, resolver: Arc<dyn Resolver>) -> ResolverId {
        let id = self.next_id();
        tracing::debug!(resolver = resolver.label(), ?id, "installed last");
        self.resolvers.write().push((id, resolver));
        id
    }

    /// Remove a resolver. Returns `false` if it was not installed.
    pub fn uninstall(&self, id: ResolverId) -> bool {
        let mut resolvers = self.resolvers.write();
        let before = resolvers.len();
        resolvers.retain(|(rid, _)| *rid != id);
        let removed = resolvers.len() != before;
        if removed {
            tracing::debug!(?id, "uninstalled");
        }
        removed
    }

    pub fn is_installed(&self, id: ResolverId) -> bool {
        self.resolvers.read().iter().any(|(rid, _)| *rid == id)
    }

    /// Labels of installed resolvers, in consultation order.
    pub fn resolver_labels(&self) -> Vec<String> {
        self.resolvers
            .read()
            .iter()
            .map(|(_, r)| r.label().to_owned())
            .collect()
    }

    pub fn get(&self, name: &ModuleName) -> Option<ModuleRef> {
        self.modules.get(name).map(|entry| entry.value().clone())
    }

    pub fn is_loaded(&self, name: &ModuleName) -> bool {
        self.modules.contains_key(name)
    }

    /// Loaded module names, sorted.
    pub fn loaded_names(&self) -> Vec<ModuleName> {
        let mut names: Vec<_> = self.modules.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Record a loaded module. The first module published for a name wins
    /// and is returned; it is also linked into its parent if the parent is
    /// loaded.
    pub fn publish(&self, name: &ModuleName, module: ModuleRef) -> ModuleRef {
        let stored = self
            .modules
            .entry(name.clone())
            .or_insert(module)
            .value()
            .clone();
        if let Some(parent) = name.parent().and_then(|p| self.get(&p)) {
            parent.set_if_absent(name.leaf(), Value::Module(stored.clone()));
        }
        stored
    }

    /// Whether any resolver other than `except` could satisfy `name`.
    pub fn probe_except(&self, name: &ModuleName, except: ResolverId) -> bool {
        if self.is_loaded(name) {
            return true;
        }
        self.resolvers
            .read()
            .iter()
            .any(|(id, r)| *id != except && r.probe(name))
    }

    /// `import name`.
    #[tracing::instrument(level = "debug", skip(self), fields(module = %name))]
    pub fn import(&self, name: &ModuleName) -> Result<ModuleRef, ImportError> {
        if let Some(module) = self.get(name) {
            return Ok(module);
        }

        // Snapshot the chain so resolvers can re-enter `import` (ancestors,
        // dependencies) without holding the lock.
        let chain: Vec<_> = self.resolvers.read().clone();
        let mut deferred = None;

        for (id, resolver) in &chain {
            let cx = ResolveContext {
                system: self,
                resolver: *id,
            };
            match resolver.resolve(name, &cx)? {
                Resolution::Resolved(module) => {
                    tracing::debug!(resolver = resolver.label(), "resolved");
                    return Ok(self.publish(name, module));
                }
                Resolution::Declined => {}
                Resolution::DeclinedWith(reason) => {
                    tracing::debug!(resolver = resolver.label(), %reason, "declined with reason");
                    deferred.get_or_insert(reason);
                }
            }
        }

        Err(deferred.unwrap_or_else(|| ImportError::not_found(name)))
    }

    /// `import a.b.c` given as a string.
    pub fn import_str(&self, dotted: &str) -> Result<ModuleRef, ImportError> {
        self.import(&ModuleName::parse(dotted)?)
    }

    /// `from name import attr`.
    ///
    /// Falls back to importing `name.attr` as a sub-module when `attr` is not
    /// an attribute yet.
    pub fn import_from(&self, name: &ModuleName, attr: &str) -> Result<Value, ImportError> {
        let module = self.import(name)?;
        if let Some(value) = module.get(attr) {
            return Ok(value);
        }
        let missing = || ImportError::MissingAttribute {
            module: name.clone(),
            attr: attr.to_owned(),
        };
        let Ok(sub) = name.child(attr) else {
            return Err(missing());
        };
        match self.import(&sub) {
            Ok(sub_module) => Ok(Value::Module(sub_module)),
            Err(ImportError::NotFound { .. }) => Err(missing()),
            Err(other) => Err(other),
        }
    }
}

/// The default resolver: modules defined in-process.
#[derive(Default)]
pub struct LocalModules {
    modules: RwLock<FxHashMap<ModuleName, ModuleRef>>,
}

impl LocalModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a module under its own name. Redefining replaces the
    /// definition but not an already imported module.
    pub fn define(&self, module: ModuleRef) {
        self.modules.write().insert(module.name().clone(), module);
    }

    pub fn contains(&self, name: &ModuleName) -> bool {
        self.modules.read().contains_key(name)
    }
}

impl Resolver for LocalModules {
    fn label(&self) -> &str {
        "local"
    }

    fn resolve(
        &self,
        name: &ModuleName,
        cx: &ResolveContext<'_>,
    ) -> Result<Resolution, ImportError> {
        let Some(module) = self.modules.read().get(name).cloned() else {
            return Ok(Resolution::Declined);
        };
        // Importing `a.b` imports `a` first.
        if let Some(parent) = name.parent() {
            cx.import(&parent)?;
        }
        Ok(Resolution::Resolved(module))
    }

    fn probe(&self, name: &ModuleName) -> bool {
        self.contains(name)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
