//! Descriptors for remote callables.
//!
//! A function or class exported by a remote module has no local body. The
//! local side keeps a descriptor naming it: what kind of object it is, the
//! module it was imported through and its qualified name. Descriptors are
//! interned per fully qualified name, so two imports of the same remote
//! function yield the same `RemoteRef`.

use std::fmt;
use std::sync::Arc;

use crate::ModuleName;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    Function,
    Class,
}

impl RemoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteKind::Function => "function",
            RemoteKind::Class => "class",
        }
    }
}

pub type RemoteRef = Arc<RemoteItem>;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RemoteItem {
    kind: RemoteKind,
    module: ModuleName,
    qualname: Arc<str>,
    fqn: Arc<str>,
}

impl RemoteItem {
    pub fn new(kind: RemoteKind, module: ModuleName, qualname: &str) -> Self {
        let fqn = Arc::from(format!("{module}.{qualname}"));
        RemoteItem {
            kind,
            module,
            qualname: Arc::from(qualname),
            fqn,
        }
    }

    pub fn kind(&self) -> RemoteKind {
        self.kind
    }

    pub fn module(&self) -> &ModuleName {
        &self.module
    }

    /// Qualified name inside the module, e.g. `Outer.Inner`.
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Last segment of the qualified name.
    pub fn name(&self) -> &str {
        self.qualname.rsplit('.').next().unwrap_or(&self.qualname)
    }

    /// `module.qualname`.
    pub fn fqn(&self) -> &str {
        &self.fqn
    }
}

impl fmt::Debug for RemoteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<remote {} {}>", self.kind.as_str(), self.fqn)
    }
}

impl fmt::Display for RemoteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqn)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
