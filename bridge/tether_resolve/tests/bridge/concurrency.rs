use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tether_channel::{ChannelError, LoopbackChannel, ModuleTable};
use tether_ir::{HandleValue, ModuleHandle};
use tether_resolve::{BridgeConfig, ImportBridge, Module, ModuleName, RemoteChannel};

use crate::common::{host, name, peer};

/// Holds every request long enough for other threads to pile up behind it.
struct Slow {
    inner: Arc<LoopbackChannel<ModuleTable>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RemoteChannel for Slow {
    fn import_module(&self, name: &ModuleName) -> Result<ModuleHandle, ChannelError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        let result = self.inner.import_module(name);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

const THREADS: usize = 8;

#[test]
fn concurrent_imports_share_one_remote_call() {
    let inner = peer([ModuleHandle::new(name("shared")).with("n", HandleValue::Int(1))]);
    let slow = Arc::new(Slow {
        inner: inner.clone(),
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(slow.clone(), BridgeConfig::local_first())
        .install(&system);

    let barrier = Barrier::new(THREADS);
    let modules: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    system.import_str("shared").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(inner.calls(), 1);
    assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(modules.iter().all(|m| Module::same(m, &modules[0])));
}

#[test]
fn distinct_names_resolve_in_parallel() {
    let handles: Vec<_> = (0..THREADS)
        .map(|i| ModuleHandle::new(name(&format!("mod_{i}"))))
        .collect();
    let inner = peer(handles);
    let slow = Arc::new(Slow {
        inner: inner.clone(),
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });
    let system = host(&[]);
    let _bridge = ImportBridge::with_config(slow.clone(), BridgeConfig::local_first())
        .install(&system);

    let barrier = Barrier::new(THREADS);
    thread::scope(|s| {
        for i in 0..THREADS {
            let barrier = &barrier;
            let system = &system;
            s.spawn(move || {
                barrier.wait();
                system.import_str(&format!("mod_{i}")).unwrap();
            });
        }
    });

    assert_eq!(inner.calls(), THREADS);
    assert_eq!(system.loaded_names().len(), THREADS);
    // Different names never wait on each other.
    assert!(slow.max_in_flight.load(Ordering::SeqCst) > 1);
}
