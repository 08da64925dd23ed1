//! Import failures.
//!
//! Every failure names the module it happened for and the stage that
//! produced it, so callers can tell "genuinely missing" apart from "peer
//! unreachable" apart from "the bridge refused to recurse".

use std::fmt;

use tether_channel::ChannelError;
use tether_ir::{ModuleName, NameError};

use crate::materialize::MaterializeError;

/// Which step of a bridged import failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Recursion guard, before any remote traffic.
    Guard,
    /// The `import_module` round trip.
    Fetch,
    /// Turning the handle into a local module.
    Materialize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Guard => "guard",
            Stage::Fetch => "fetch",
            Stage::Materialize => "materialize",
        })
    }
}

/// Why the recursion guard refused a name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GuardReason {
    /// The name belongs to the bridge or its channel.
    SelfDependency,
    /// The name is already being resolved on this thread.
    Reentrant,
}

impl fmt::Display for GuardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GuardReason::SelfDependency => "the bridge depends on it and must load it locally",
            GuardReason::Reentrant => "it is already being resolved on this thread",
        })
    }
}

/// Failure inside the import bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("module `{name}` is forced remote but the peer does not have it")]
    RemoteNotFound { name: ModuleName },
    #[error("cannot fetch module `{name}`: {source}")]
    Transport {
        name: ModuleName,
        #[source]
        source: ChannelError,
    },
    #[error("refusing to resolve `{name}` remotely: {reason}")]
    RecursionGuard {
        name: ModuleName,
        reason: GuardReason,
    },
    #[error("cannot materialize module `{name}`: {source}")]
    Materialization {
        name: ModuleName,
        #[source]
        source: MaterializeError,
    },
}

impl BridgeError {
    #[cold]
    pub fn from_channel(name: &ModuleName, err: ChannelError) -> Self {
        match err {
            ChannelError::NotFound { .. } => BridgeError::RemoteNotFound { name: name.clone() },
            source @ ChannelError::Transport { .. } => BridgeError::Transport {
                name: name.clone(),
                source,
            },
        }
    }

    #[cold]
    pub fn guard(name: &ModuleName, reason: GuardReason) -> Self {
        BridgeError::RecursionGuard {
            name: name.clone(),
            reason,
        }
    }

    pub fn module(&self) -> &ModuleName {
        match self {
            BridgeError::RemoteNotFound { name }
            | BridgeError::Transport { name, .. }
            | BridgeError::RecursionGuard { name, .. }
            | BridgeError::Materialization { name, .. } => name,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            BridgeError::RemoteNotFound { .. } | BridgeError::Transport { .. } => Stage::Fetch,
            BridgeError::RecursionGuard { .. } => Stage::Guard,
            BridgeError::Materialization { .. } => Stage::Materialize,
        }
    }
}

/// Flat classification of import failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No resolver had the module.
    NotFound,
    /// `from m import x` where `m` has no `x`.
    MissingAttribute,
    InvalidName,
    RemoteNotFound,
    TransportFailure,
    RecursionGuardTripped,
    MaterializationFailure,
}

/// Failure of an import statement, as seen by the importing code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("no module named `{name}`")]
    NotFound { name: ModuleName },
    #[error("cannot import name `{attr}` from `{module}`")]
    MissingAttribute { module: ModuleName, attr: String },
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ImportError {
    #[cold]
    pub fn not_found(name: &ModuleName) -> Self {
        ImportError::NotFound { name: name.clone() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::NotFound { .. } => ErrorKind::NotFound,
            ImportError::MissingAttribute { .. } => ErrorKind::MissingAttribute,
            ImportError::InvalidName(_) => ErrorKind::InvalidName,
            ImportError::Bridge(err) => match err {
                BridgeError::RemoteNotFound { .. } => ErrorKind::RemoteNotFound,
                BridgeError::Transport { .. } => ErrorKind::TransportFailure,
                BridgeError::RecursionGuard { .. } => ErrorKind::RecursionGuardTripped,
                BridgeError::Materialization { .. } => ErrorKind::MaterializationFailure,
            },
        }
    }

    /// The module the failure is about, if the name was valid.
    pub fn module(&self) -> Option<&ModuleName> {
        match self {
            ImportError::NotFound { name } => Some(name),
            ImportError::MissingAttribute { module, .. } => Some(module),
            ImportError::InvalidName(_) => None,
            ImportError::Bridge(err) => Some(err.module()),
        }
    }

    pub fn as_bridge(&self) -> Option<&BridgeError> {
        match self {
            ImportError::Bridge(err) => Some(err),
            _ => None,
        }
    }
}
