//! In-process peer: a table-backed provider and a channel that talks to it
//! without a socket.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tether_ir::{HandleValue, ModuleHandle, ModuleName};

use crate::wire::{self, Reply, Request};
use crate::{ChannelError, ModuleProvider, RemoteChannel};

/// Modules the peer is willing to export, keyed by full name.
///
/// A name missing from the table is also looked up inside an
/// exported ancestor, so exporting `pkg` with a nested `sub` handle answers
/// requests for `pkg.sub` too.
#[derive(Default)]
pub struct ModuleTable {
    modules: RwLock<FxHashMap<ModuleName, ModuleHandle>>,
    failures: RwLock<FxHashMap<ModuleName, String>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: ModuleHandle) {
        self.modules.write().insert(handle.name.clone(), handle);
    }

    /// Make importing `name` raise `message` on the peer.
    pub fn insert_failure(&self, name: ModuleName, message: impl Into<String>) {
        self.failures.write().insert(name, message.into());
    }

    fn find_nested(&self, name: &ModuleName) -> Option<ModuleHandle> {
        let modules = self.modules.read();
        let root = name.ancestors().find_map(|anc| modules.get(&anc))?;
        let rest = name.as_str().strip_prefix(root.name.as_str())?.strip_prefix('.')?;

        let mut current = root;
        for segment in rest.split('.') {
            match current.member(segment) {
                Some(HandleValue::Module(sub)) => current = sub,
                _ => return None,
            }
        }
        Some(current.clone())
    }
}

impl ModuleProvider for ModuleTable {
    fn export(&self, name: &ModuleName) -> Result<Option<ModuleHandle>, String> {
        if let Some(message) = self.failures.read().get(name) {
            return Err(message.clone());
        }
        if let Some(handle) = self.modules.read().get(name) {
            return Ok(Some(handle.clone()));
        }
        Ok(self.find_nested(name))
    }
}

/// Channel whose peer lives in the same process.
///
/// Every reply is still encoded and decoded, so handles that would not
/// survive the wire fail here the same way.
pub struct LoopbackChannel<P> {
    provider: P,
    calls: AtomicUsize,
}

impl<P: ModuleProvider> LoopbackChannel<P> {
    pub fn new(provider: P) -> Self {
        LoopbackChannel {
            provider,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of `import_module` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<P: ModuleProvider> RemoteChannel for LoopbackChannel<P> {
    fn import_module(&self, name: &ModuleName) -> Result<ModuleHandle, ChannelError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let reply = wire::answer(&self.provider, Request::ImportModule { name: name.clone() });
        let decoded: Reply = wire::decode(&wire::encode(&reply)?)?;
        wire::expect_module(name, decoded)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
