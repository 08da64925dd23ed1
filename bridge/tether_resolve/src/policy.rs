//! Resolution policy: local or remote.
//!
//! Pure decision logic. The only input besides the name and configuration
//! is a `LocalProbe`, a non-destructive "could this be resolved locally?"
//! check. Probing never imports anything, so it is safe to call repeatedly
//! and speculatively.

use tether_ir::ModuleName;

use crate::config::BridgeConfig;

/// Non-destructive existence check for local modules.
pub trait LocalProbe {
    fn exists_locally(&self, name: &ModuleName) -> bool;
}

impl<F: Fn(&ModuleName) -> bool> LocalProbe for F {
    fn exists_locally(&self, name: &ModuleName) -> bool {
        self(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Step aside; the host's other resolvers handle it.
    Local,
    /// Fetch from the peer. `forced` means there is no legitimate local
    /// fallback, so remote failures become import errors.
    Remote { forced: bool },
}

impl Decision {
    pub fn is_remote(self) -> bool {
        matches!(self, Decision::Remote { .. })
    }
}

/// Decide how `name` is resolved.
///
/// Forced prefixes win over local availability. Otherwise the name goes
/// remote only when the probe says it is not available locally.
pub fn decide<P: LocalProbe + ?Sized>(name: &ModuleName, config: &BridgeConfig, probe: &P) -> Decision {
    if config.forces(name) {
        Decision::Remote { forced: true }
    } else if probe.exists_locally(name) {
        Decision::Local
    } else {
        Decision::Remote { forced: false }
    }
}

pub fn should_resolve_remotely<P: LocalProbe + ?Sized>(
    name: &ModuleName,
    config: &BridgeConfig,
    probe: &P,
) -> bool {
    decide(name, config, probe).is_remote()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
