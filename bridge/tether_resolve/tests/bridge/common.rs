use std::sync::Arc;

use tether_channel::{LoopbackChannel, ModuleTable};
use tether_ir::ModuleHandle;
use tether_resolve::{ImportSystem, LocalModules, Module, ModuleName};

pub fn name(s: &str) -> ModuleName {
    ModuleName::parse(s).unwrap()
}

/// A peer exporting `handles`, reachable in-process.
pub fn peer(handles: impl IntoIterator<Item = ModuleHandle>) -> Arc<LoopbackChannel<ModuleTable>> {
    let table = ModuleTable::new();
    for handle in handles {
        table.insert(handle);
    }
    Arc::new(LoopbackChannel::new(table))
}

/// A host whose local resolver knows exactly `names`.
pub fn host(names: &[&str]) -> Arc<ImportSystem> {
    let local = Arc::new(LocalModules::new());
    for n in names {
        local.define(Module::builder(name(n)).attr("local", true).build());
    }
    tether_resolve::init_tracing();
    Arc::new(ImportSystem::with_local(local))
}
