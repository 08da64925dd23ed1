//! In-process module objects.
//!
//! A `Module` is a named attribute namespace. Remote proxies, local modules
//! and synthesized namespace packages are all `Module`s; `Origin` records
//! which one. Attributes are behind a lock because a package gains its
//! sub-modules as attributes after it has been published.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{ModuleName, Value};

/// Shared handle to a module. Identity is the allocation.
pub type ModuleRef = Arc<Module>;

/// Where a module's contents came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Provided by a local resolver.
    Local,
    /// Snapshot of a module exported by the remote peer.
    Remote,
    /// Empty package synthesized so a remote sub-module has a parent.
    Namespace,
}

pub struct Module {
    name: ModuleName,
    origin: Origin,
    is_package: bool,
    attrs: RwLock<FxHashMap<Arc<str>, Value>>,
}

impl Module {
    pub fn new(name: ModuleName, origin: Origin, is_package: bool) -> Self {
        Module {
            name,
            origin,
            is_package,
            attrs: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn builder(name: ModuleName) -> ModuleBuilder {
        ModuleBuilder {
            module: Module::new(name, Origin::Local, false),
        }
    }

    /// Pointer identity.
    #[inline]
    pub fn same(a: &ModuleRef, b: &ModuleRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[inline]
    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Packages may contain sub-modules.
    #[inline]
    pub fn is_package(&self) -> bool {
        self.is_package
    }

    /// Human-readable source descriptor, e.g. `<proxy for pkg.sub>`.
    pub fn descriptor(&self) -> String {
        match self.origin {
            Origin::Local => format!("<local {}>", self.name),
            Origin::Remote => format!("<proxy for {}>", self.name),
            Origin::Namespace => format!("<namespace {}>", self.name),
        }
    }

    pub fn get(&self, attr: &str) -> Option<Value> {
        self.attrs.read().get(attr).cloned()
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.attrs.read().contains_key(attr)
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&self, attr: &str, value: Value) {
        self.attrs.write().insert(Arc::from(attr), value);
    }

    /// Set an attribute only if it is not already present.
    ///
    /// Returns the value that ends up stored.
    pub fn set_if_absent(&self, attr: &str, value: Value) -> Value {
        self.attrs
            .write()
            .entry(Arc::from(attr))
            .or_insert(value)
            .clone()
    }

    /// Attribute names, sorted.
    pub fn attr_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.attrs.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.attrs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.read().is_empty()
    }

    /// Follow a dotted attribute path (`sub.value`) through nested modules.
    pub fn lookup_path(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.as_module()?.get(segment)?;
        }
        Some(current)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("is_package", &self.is_package)
            .field("attrs", &self.attr_names())
            .finish()
    }
}

/// Builder for modules defined in-process.
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    #[must_use]
    pub fn package(mut self) -> Self {
        self.module.is_package = true;
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: Origin) -> Self {
        self.module.origin = origin;
        self
    }

    #[must_use]
    pub fn attr(self, name: &str, value: impl Into<Value>) -> Self {
        self.module.set(name, value.into());
        self
    }

    pub fn build(self) -> ModuleRef {
        Arc::new(self.module)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
