//! Tether Resolve - Transparent Remote Import Bridge
//!
//! Lets code running in one process `import` modules that only exist in a
//! remote peer, as if they were local. The bridge hooks into the host's
//! resolver chain, decides per name whether to step aside or fetch remotely,
//! and turns the fetched handle into an ordinary local module.
//!
//! # Architecture
//!
//! ```text
//! ImportSystem::import(name)
//!   │
//!   ├── ImportBridge (installed first)
//!   │     ├── cached?           → done
//!   │     ├── protected name?   → decline (bridge must load it locally)
//!   │     ├── policy::decide    → Local: decline
//!   │     ├── claim slot        → cached: done / same thread: cycle error
//!   │     ├── RemoteChannel::import_module(name)
//!   │     ├── materialize       → ModuleRef, descriptors interned
//!   │     └── ensure parent     → import it, or synthesize a namespace
//!   │
//!   └── LocalModules (and any other host resolvers)
//! ```
//!
//! # Modules
//!
//! - `config`: forced-remote prefixes, from code or `TETHER_FORCE_REMOTE`
//! - `policy`: the pure local/remote decision
//! - `materialize`: `ModuleHandle` to `Module`
//! - `remote_types`: interned function and class descriptors, instance checks
//! - `host`: the import system and resolver chain
//! - `bridge`: the resolver that ties the others together
//! - `error`: failure taxonomy
//!
//! # Logging
//!
//! Everything logs through `tracing`. Call [`init_tracing`] once to print
//! events when `RUST_LOG` is set, e.g. `RUST_LOG=tether_resolve=debug`.

mod bridge;
mod config;
mod error;
mod host;
mod materialize;
mod policy;
mod remote_types;

pub use bridge::{ImportBridge, InstalledBridge};
pub use config::{BridgeConfig, ConfigError, ForcedPrefix, FORCE_REMOTE_ENV};
pub use error::{BridgeError, ErrorKind, GuardReason, ImportError, Stage};
pub use host::{ImportSystem, LocalModules, ResolveContext, Resolution, Resolver, ResolverId};
pub use materialize::{materialize, MaterializeError, Materialized};
pub use policy::{decide, should_resolve_remotely, Decision, LocalProbe};
pub use remote_types::RemoteTypes;

pub use tether_channel::{ChannelError, RemoteChannel, TransportKind};
pub use tether_ir::{Module, ModuleName, ModuleRef, Origin, RemoteItem, RemoteKind, RemoteRef, Value};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
