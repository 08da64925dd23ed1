use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tether_channel::ChannelError;
use tether_ir::ModuleHandle;
use tether_resolve::{
    BridgeConfig, ErrorKind, GuardReason, ImportBridge, ImportError, ImportSystem, ModuleName,
    Origin, RemoteChannel, TransportKind,
};

use crate::common::{host, name, peer};

/// A channel whose "remote" side imports the requested name again through
/// the same host before answering.
#[derive(Default)]
struct Echo {
    system: OnceLock<Weak<ImportSystem>>,
    inner: Mutex<Option<ImportError>>,
    calls: AtomicUsize,
}

impl RemoteChannel for Echo {
    fn import_module(&self, name: &ModuleName) -> Result<ModuleHandle, ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system = self
            .system
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ChannelError::transport(TransportKind::Unreachable, "host gone"))?;
        match system.import(name) {
            Ok(_) => Ok(ModuleHandle::new(name.clone())),
            Err(err) => {
                let message = err.to_string();
                *self.inner.lock() = Some(err);
                Err(ChannelError::transport(TransportKind::Remote, message))
            }
        }
    }
}

#[test]
fn reentrant_resolution_fails_fast() {
    let echo = Arc::new(Echo::default());
    let system = host(&[]);
    echo.system.set(Arc::downgrade(&system)).unwrap();
    let _bridge = ImportBridge::new(echo.clone(), ["loop"])
        .unwrap()
        .install(&system);

    let err = system.import_str("loop").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(echo.calls.load(Ordering::SeqCst), 1);

    let inner = echo.inner.lock().clone().unwrap();
    assert_eq!(inner.kind(), ErrorKind::RecursionGuardTripped);
    assert_eq!(inner.module(), Some(&name("loop")));
    assert!(!system.is_loaded(&name("loop")));
}

#[test]
fn bridge_packages_resolve_locally_under_wildcard() {
    let channel = peer(Vec::new());
    let system = host(&["tether_ir"]);
    let _bridge = ImportBridge::new(channel.clone(), ["*"])
        .unwrap()
        .install(&system);

    let ir = system.import_str("tether_ir").unwrap();
    assert_eq!(ir.origin(), Origin::Local);
    assert_eq!(channel.calls(), 0);
}

#[test]
fn bridge_package_missing_locally_reports_the_guard() {
    let channel = peer(Vec::new());
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(channel.clone(), BridgeConfig::local_first())
        .install(&system);

    let err = system.import_str("tether_channel.wire").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecursionGuardTripped);
    assert!(matches!(
        err.as_bridge(),
        Some(tether_resolve::BridgeError::RecursionGuard {
            reason: GuardReason::SelfDependency,
            ..
        })
    ));
    assert_eq!(channel.calls(), 0);
}
