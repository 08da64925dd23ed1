//! Registry of remote function and class descriptors.
//!
//! Each bridge owns one registry. Materialization interns every function and
//! class member by fully qualified name, so the same remote object imported
//! twice (or through two modules that share a descriptor name) is the same
//! `RemoteRef`. The registry also answers type questions about objects the
//! peer reports by type name.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tether_ir::{ModuleName, RemoteItem, RemoteKind, RemoteRef};

pub struct RemoteTypes {
    items: DashMap<Arc<str>, RemoteRef, FxBuildHasher>,
}

impl Default for RemoteTypes {
    fn default() -> Self {
        RemoteTypes {
            items: DashMap::with_hasher(FxBuildHasher),
        }
    }
}

impl RemoteTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor for `module.qualname`. The first registration of a
    /// name wins.
    pub fn intern(&self, kind: RemoteKind, module: &ModuleName, qualname: &str) -> RemoteRef {
        let item = RemoteItem::new(kind, module.clone(), qualname);
        if let Some(existing) = self.items.get(item.fqn()) {
            return existing.value().clone();
        }
        let key: Arc<str> = Arc::from(item.fqn());
        self.items
            .entry(key)
            .or_insert_with(|| Arc::new(item))
            .value()
            .clone()
    }

    pub fn get(&self, fqn: &str) -> Option<RemoteRef> {
        self.items.get(fqn).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Registered fully qualified names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.items.iter().map(|e| e.key().to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Whether a remote object whose type is `type_module.type_qualname` is
    /// an instance of `class`.
    ///
    /// `class` must be a class descriptor from this registry. A match is the
    /// exact qualified name, a qualified name ending in it at a dot boundary,
    /// or the same bare class name.
    pub fn is_instance(&self, type_module: &str, type_qualname: &str, class: &RemoteItem) -> bool {
        if class.kind() != RemoteKind::Class {
            return false;
        }
        let Some(registered) = self.get(class.fqn()) else {
            return false;
        };
        if *registered != *class {
            return false;
        }

        let remote_fqn = if type_module.is_empty() {
            type_qualname.to_owned()
        } else {
            format!("{type_module}.{type_qualname}")
        };
        let expected = class.fqn();
        if remote_fqn == expected
            || remote_fqn
                .strip_suffix(expected)
                .is_some_and(|prefix| prefix.ends_with('.'))
        {
            return true;
        }

        let type_name = type_qualname.rsplit('.').next().unwrap_or(type_qualname);
        let matched = type_name == class.name();
        if !matched {
            tracing::trace!(expected, actual = %remote_fqn, "instance check failed");
        }
        matched
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
