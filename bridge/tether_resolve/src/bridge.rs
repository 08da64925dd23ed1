//! The import bridge.
//!
//! `ImportBridge` is a `Resolver` that sits at the front of the host chain
//! and decides, per name, whether to step aside or fetch the module from the
//! remote peer. Fetched modules are materialized once and cached under their
//! full dotted name; every later import returns the same `ModuleRef`.
//!
//! # Per-name state
//!
//! ```text
//!            claim                     complete
//!   (none) ────────► Resolving(thread) ─────────► Resolved(module)
//!                         │
//!                         └── failure: slot removed, waiters retry
//! ```
//!
//! A second request for a `Resolving` name from the owning thread is a
//! re-entrant cycle and fails fast. From any other thread it waits for the
//! owner to finish.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tether_channel::RemoteChannel;
use tether_ir::{Module, ModuleName, ModuleRef, Origin};

use crate::config::{BridgeConfig, ConfigError};
use crate::error::{BridgeError, ErrorKind, GuardReason, ImportError};
use crate::host::{ImportSystem, ResolveContext, Resolution, Resolver, ResolverId};
use crate::materialize::materialize;
use crate::policy::{decide, Decision};
use crate::remote_types::RemoteTypes;

/// Packages the bridge itself is built from. Resolving any of them remotely
/// would need the bridge to already be loaded.
const BRIDGE_PACKAGES: &[&str] = &["tether", "tether_ir", "tether_channel", "tether_resolve"];

enum Slot {
    Resolving(ThreadId),
    Resolved(ModuleRef),
}

enum SlotState {
    Done(ModuleRef),
    Busy(ThreadId),
    Free,
}

enum Claim<'a> {
    Done(ModuleRef),
    Owned(ClaimGuard<'a>),
}

/// Ownership of one `Resolving` slot. Dropping without `complete` releases
/// the slot so waiters can retry.
struct ClaimGuard<'a> {
    bridge: &'a ImportBridge,
    name: ModuleName,
    completed: bool,
}

impl ClaimGuard<'_> {
    fn complete(mut self, module: ModuleRef) -> ModuleRef {
        self.bridge
            .cache
            .lock()
            .insert(self.name.clone(), Slot::Resolved(module.clone()));
        self.completed = true;
        self.bridge.settled.notify_all();
        module
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.bridge.cache.lock().remove(&self.name);
            self.bridge.settled.notify_all();
        }
    }
}

pub struct ImportBridge {
    channel: Arc<dyn RemoteChannel>,
    config: BridgeConfig,
    protected: Vec<ModuleName>,
    cache: Mutex<FxHashMap<ModuleName, Slot>>,
    settled: Condvar,
    remote_calls: AtomicUsize,
    types: RemoteTypes,
}

impl ImportBridge {
    /// Build a bridge forcing `forced` prefixes remote.
    pub fn new<I, S>(channel: Arc<dyn RemoteChannel>, forced: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::with_config(channel, BridgeConfig::new(forced)?))
    }

    /// Build a bridge configured from the environment.
    pub fn from_env(channel: Arc<dyn RemoteChannel>) -> Result<Self, ConfigError> {
        Ok(Self::with_config(channel, BridgeConfig::from_env()?))
    }

    pub fn with_config(channel: Arc<dyn RemoteChannel>, config: BridgeConfig) -> Self {
        let mut protected: Vec<ModuleName> = BRIDGE_PACKAGES
            .iter()
            .filter_map(|pkg| ModuleName::parse(pkg).ok())
            .collect();
        for dep in channel.dependencies() {
            if !protected.contains(dep) {
                protected.push(dep.clone());
            }
        }
        ImportBridge {
            channel,
            config,
            protected,
            cache: Mutex::new(FxHashMap::default()),
            settled: Condvar::new(),
            remote_calls: AtomicUsize::new(0),
            types: RemoteTypes::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether `name` must always be left to local resolution.
    pub fn is_protected(&self, name: &ModuleName) -> bool {
        self.protected.iter().any(|p| name.starts_with(p))
    }

    /// Names of modules this bridge has produced, sorted.
    pub fn cached_names(&self) -> Vec<ModuleName> {
        let cache = self.cache.lock();
        let mut names: Vec<_> = cache
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Resolved(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Descriptors of the remote functions and classes this bridge has
    /// materialized.
    pub fn remote_types(&self) -> &RemoteTypes {
        &self.types
    }

    /// `import_module` calls issued so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::Relaxed)
    }

    pub fn verify_connection(&self) -> bool {
        let connected = self.channel.is_connected();
        if !connected {
            tracing::warn!("remote peer is not reachable");
        }
        connected
    }

    /// Put the bridge at the front of `system`'s resolver chain.
    ///
    /// The bridge is consumed, so one bridge is installed at most once. It
    /// stays installed until the returned guard is dropped or uninstalled.
    pub fn install(self, system: &Arc<ImportSystem>) -> InstalledBridge {
        let bridge = Arc::new(self);
        let id = system.install_first(bridge.clone());
        InstalledBridge {
            bridge,
            system: Arc::downgrade(system),
            id,
            active: AtomicBool::new(true),
        }
    }

    fn claim(&self, name: &ModuleName) -> Result<Claim<'_>, BridgeError> {
        let me = thread::current().id();
        let mut cache = self.cache.lock();
        loop {
            let state = match cache.get(name) {
                Some(Slot::Resolved(module)) => SlotState::Done(module.clone()),
                Some(Slot::Resolving(owner)) => SlotState::Busy(*owner),
                None => SlotState::Free,
            };
            match state {
                SlotState::Done(module) => return Ok(Claim::Done(module)),
                SlotState::Busy(owner) if owner == me => {
                    return Err(BridgeError::guard(name, GuardReason::Reentrant));
                }
                SlotState::Busy(_) => self.settled.wait(&mut cache),
                SlotState::Free => {
                    cache.insert(name.clone(), Slot::Resolving(me));
                    return Ok(Claim::Owned(ClaimGuard {
                        bridge: self,
                        name: name.clone(),
                        completed: false,
                    }));
                }
            }
        }
    }

    fn cached(&self, name: &ModuleName) -> Option<ModuleRef> {
        match self.cache.lock().get(name) {
            Some(Slot::Resolved(module)) => Some(module.clone()),
            _ => None,
        }
    }

    fn remember(&self, module: &ModuleRef) {
        self.cache
            .lock()
            .entry(module.name().clone())
            .or_insert_with(|| Slot::Resolved(module.clone()));
    }

    fn fetch(
        &self,
        name: &ModuleName,
        forced: bool,
        claim: ClaimGuard<'_>,
        cx: &ResolveContext<'_>,
    ) -> Result<Resolution, ImportError> {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        let handle = match self.channel.import_module(name) {
            Ok(handle) => handle,
            Err(err) => {
                let err = BridgeError::from_channel(name, err);
                tracing::debug!(forced, error = %err, "remote import failed");
                if forced {
                    return Err(err.into());
                }
                return Ok(match err {
                    // Plain "no module named", reported by the host.
                    BridgeError::RemoteNotFound { .. } => Resolution::Declined,
                    err => Resolution::DeclinedWith(err.into()),
                });
            }
        };

        // Parents load only for a module that materialized, so a rejected
        // handle leaves no namespace behind.
        let built =
            materialize(&handle, &self.types).map_err(|source| BridgeError::Materialization {
                name: name.clone(),
                source,
            })?;

        if let Some(parent) = name.parent() {
            self.ensure_parent(&parent, cx)?;
        }
        // Importing the parent may have produced this module as a member.
        if let Some(existing) = cx.system().get(name) {
            return Ok(Resolution::Resolved(claim.complete(existing)));
        }

        for sub in &built.nested {
            self.remember(sub);
            cx.system().publish(sub.name(), sub.clone());
        }
        tracing::debug!(submodules = built.nested.len(), "remote module materialized");
        Ok(Resolution::Resolved(claim.complete(built.root)))
    }

    /// Make sure `parent` is loaded, synthesizing an empty namespace package
    /// when nobody has it.
    fn ensure_parent(
        &self,
        parent: &ModuleName,
        cx: &ResolveContext<'_>,
    ) -> Result<ModuleRef, ImportError> {
        if let Some(module) = cx.system().get(parent) {
            return Ok(module);
        }
        match cx.import(parent) {
            Ok(module) => Ok(module),
            Err(err) if is_missing(&err, parent) => {
                if let Some(grandparent) = parent.parent() {
                    self.ensure_parent(&grandparent, cx)?;
                }
                tracing::debug!(module = %parent, "synthesizing namespace package");
                let namespace: ModuleRef =
                    Arc::new(Module::new(parent.clone(), Origin::Namespace, true));
                let stored = cx.system().publish(parent, namespace);
                self.remember(&stored);
                Ok(stored)
            }
            Err(err) => Err(err),
        }
    }
}

fn is_missing(err: &ImportError, name: &ModuleName) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::RemoteNotFound) && err.module() == Some(name)
}

impl Resolver for ImportBridge {
    fn label(&self) -> &str {
        "remote-bridge"
    }

    #[tracing::instrument(level = "debug", skip(self, cx), fields(module = %name))]
    fn resolve(
        &self,
        name: &ModuleName,
        cx: &ResolveContext<'_>,
    ) -> Result<Resolution, ImportError> {
        if let Some(module) = self.cached(name) {
            return Ok(Resolution::Resolved(module));
        }
        if self.is_protected(name) {
            tracing::debug!("bridge dependency, leaving to local resolution");
            return Ok(Resolution::DeclinedWith(
                BridgeError::guard(name, GuardReason::SelfDependency).into(),
            ));
        }

        let forced = match decide(name, &self.config, cx) {
            Decision::Local => return Ok(Resolution::Declined),
            Decision::Remote { forced } => forced,
        };

        match self.claim(name)? {
            Claim::Done(module) => Ok(Resolution::Resolved(module)),
            Claim::Owned(claim) => self.fetch(name, forced, claim, cx),
        }
    }
}

/// An installed bridge. Dropping it removes the bridge from the host chain;
/// modules it already produced stay loaded.
pub struct InstalledBridge {
    bridge: Arc<ImportBridge>,
    system: Weak<ImportSystem>,
    id: ResolverId,
    active: AtomicBool,
}

impl InstalledBridge {
    pub fn id(&self) -> ResolverId {
        self.id
    }

    pub fn bridge(&self) -> &Arc<ImportBridge> {
        &self.bridge
    }

    pub fn is_installed(&self) -> bool {
        self.active.load(Ordering::Acquire)
            && self
                .system
                .upgrade()
                .is_some_and(|system| system.is_installed(self.id))
    }

    /// Remove the bridge from the chain. Later calls do nothing and return
    /// `false`.
    pub fn uninstall(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.system
            .upgrade()
            .is_some_and(|system| system.uninstall(self.id))
    }
}

impl Deref for InstalledBridge {
    type Target = ImportBridge;

    fn deref(&self) -> &ImportBridge {
        &self.bridge
    }
}

impl Drop for InstalledBridge {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
