//! Tether Channel - Remote Call Channel Contract
//!
//! The bridge talks to the remote peer through exactly one operation:
//! `import_module(name) -> ModuleHandle`. This crate defines that contract
//! (`RemoteChannel`), its failure taxonomy (`ChannelError`), the remote-side
//! contract (`ModuleProvider`) and reference implementations of both ends.
//!
//! # Architecture
//!
//! ```text
//! ImportBridge ──► RemoteChannel::import_module(name)
//!                     │
//!                     ├── StreamChannel<S>   (framed bincode over Read + Write)
//!                     │        │
//!                     │        ▼
//!                     │   serve_connection(stream, provider)
//!                     │
//!                     └── LoopbackChannel<P> (in-process, still encodes)
//!                              │
//!                              ▼
//!                      ModuleProvider::export(name)
//! ```
//!
//! Timeouts belong here, not in the bridge: `StreamChannel::connect` sets
//! read/write timeouts on the socket and a timed-out call surfaces as
//! `TransportKind::Timeout`.

mod error;
mod loopback;
mod stream;
pub mod wire;

pub use error::{ChannelError, TransportKind};
pub use loopback::{LoopbackChannel, ModuleTable};
pub use stream::{serve_connection, StreamChannel};

use tether_ir::{ModuleHandle, ModuleName};

/// Client side of the remote peer.
pub trait RemoteChannel: Send + Sync {
    /// Ask the peer for a module. Blocks until the peer answers or the
    /// channel gives up.
    fn import_module(&self, name: &ModuleName) -> Result<ModuleHandle, ChannelError>;

    /// Best-effort liveness check.
    fn is_connected(&self) -> bool {
        true
    }

    /// Modules this channel needs in-process to operate. The bridge always
    /// leaves these to local resolution.
    fn dependencies(&self) -> &[ModuleName] {
        &[]
    }
}

/// Remote side: turns a module name into its transferable form.
pub trait ModuleProvider: Send + Sync {
    /// `Ok(None)` means the peer does not have the module. `Err` carries
    /// the message of a failure raised while importing it remotely.
    fn export(&self, name: &ModuleName) -> Result<Option<ModuleHandle>, String>;
}
