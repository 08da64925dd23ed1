//! Remote module materializer.
//!
//! Turns a `ModuleHandle` into local `Module` objects. The result is a
//! snapshot: after this returns, every attribute access is local and the
//! handle is dropped. Sub-module members are materialized eagerly and
//! returned alongside the root so the bridge can cache each one under its
//! full dotted name. Remote functions and classes become descriptors
//! interned in the bridge's [`RemoteTypes`].
//!
//! The whole tree is validated before anything is built, so a rejected
//! handle registers no descriptors.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tether_ir::{
    HandleValue, Module, ModuleHandle, ModuleName, ModuleRef, Origin, RemoteKind, Value,
};

use crate::remote_types::RemoteTypes;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterializeError {
    #[error("member `{path}` is a remote-only `{type_name}` with no local form")]
    Unrepresentable { path: String, type_name: String },
    #[error("member `{path}` is a module named `{found}`, expected `{expected}`")]
    MisnamedSubmodule {
        path: String,
        expected: ModuleName,
        found: ModuleName,
    },
    #[error("member name `{member}` of `{module}` is not an identifier")]
    InvalidMember { module: ModuleName, member: String },
    #[error("member `{member}` appears more than once in `{module}`")]
    DuplicateMember { module: ModuleName, member: String },
}

impl MaterializeError {
    /// Dotted path of the member that failed.
    pub fn member_path(&self) -> String {
        match self {
            MaterializeError::Unrepresentable { path, .. }
            | MaterializeError::MisnamedSubmodule { path, .. } => path.clone(),
            MaterializeError::InvalidMember { module, member }
            | MaterializeError::DuplicateMember { module, member } => format!("{module}.{member}"),
        }
    }
}

/// A materialized module tree.
pub struct Materialized {
    pub root: ModuleRef,
    /// Every sub-module below `root`, children before their parents.
    pub nested: Vec<ModuleRef>,
}

pub fn materialize(
    handle: &ModuleHandle,
    types: &RemoteTypes,
) -> Result<Materialized, MaterializeError> {
    validate_module(handle)?;

    let mut nested = Vec::new();
    let root = build_module(handle, types, &mut nested);
    tracing::trace!(
        module = %handle.name,
        members = handle.members.len(),
        submodules = nested.len(),
        "materialized"
    );
    Ok(Materialized { root, nested })
}

fn validate_module(handle: &ModuleHandle) -> Result<(), MaterializeError> {
    let mut seen = FxHashSet::default();
    for (member, value) in &handle.members {
        let Ok(expected) = handle.name.child(member) else {
            return Err(MaterializeError::InvalidMember {
                module: handle.name.clone(),
                member: member.clone(),
            });
        };
        if !seen.insert(member.as_str()) {
            return Err(MaterializeError::DuplicateMember {
                module: handle.name.clone(),
                member: member.clone(),
            });
        }

        match value {
            HandleValue::Module(sub) => {
                if sub.name != expected {
                    return Err(MaterializeError::MisnamedSubmodule {
                        path: expected.to_string(),
                        expected,
                        found: sub.name.clone(),
                    });
                }
                validate_module(sub)?;
            }
            other => validate_value(other, expected.as_str())?,
        }
    }
    Ok(())
}

fn validate_value(value: &HandleValue, path: &str) -> Result<(), MaterializeError> {
    match value {
        HandleValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                validate_value(item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        HandleValue::Map(entries) => {
            for (key, item) in entries {
                validate_value(item, &format!("{path}[{key:?}]"))?;
            }
            Ok(())
        }
        // A module inside a container has no name-addressable identity.
        HandleValue::Module(_) => Err(MaterializeError::Unrepresentable {
            path: path.to_owned(),
            type_name: "module".to_owned(),
        }),
        HandleValue::Opaque { type_name } => Err(MaterializeError::Unrepresentable {
            path: path.to_owned(),
            type_name: type_name.clone(),
        }),
        _ => Ok(()),
    }
}

fn build_module(
    handle: &ModuleHandle,
    types: &RemoteTypes,
    nested: &mut Vec<ModuleRef>,
) -> ModuleRef {
    let module = Module::new(handle.name.clone(), Origin::Remote, handle.is_package);

    for (member, value) in &handle.members {
        let value = match value {
            HandleValue::Module(sub) => {
                let sub_module = build_module(sub, types, nested);
                nested.push(sub_module.clone());
                Value::Module(sub_module)
            }
            other => convert(other, &handle.name, types),
        };
        module.set(member, value);
    }

    Arc::new(module)
}

/// Convert a validated value. Descriptors are owned by `module`.
fn convert(value: &HandleValue, module: &ModuleName, types: &RemoteTypes) -> Value {
    match value {
        HandleValue::None => Value::None,
        HandleValue::Bool(b) => Value::Bool(*b),
        HandleValue::Int(n) => Value::Int(*n),
        HandleValue::Float(x) => Value::Float(*x),
        HandleValue::Str(s) => Value::Str(Arc::from(s.as_str())),
        HandleValue::Bytes(b) => Value::Bytes(Arc::from(b.as_slice())),
        HandleValue::List(items) => Value::List(
            items
                .iter()
                .map(|item| convert(item, module, types))
                .collect(),
        ),
        HandleValue::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, item)| (Arc::from(key.as_str()), convert(item, module, types)))
                .collect(),
        ),
        HandleValue::Function { qualname } => {
            Value::Remote(types.intern(RemoteKind::Function, module, qualname))
        }
        HandleValue::Class { qualname } => {
            Value::Remote(types.intern(RemoteKind::Class, module, qualname))
        }
        // Rejected by validation.
        HandleValue::Module(_) | HandleValue::Opaque { .. } => Value::None,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
