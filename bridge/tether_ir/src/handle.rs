//! Transferable module representation.
//!
//! A `ModuleHandle` is what the remote peer sends back for one module: its
//! name, whether it is a package, and its exported members in export order.
//! Members may be nested module handles (sub-packages), descriptors of
//! remote functions and classes, or values the local side cannot represent
//! (`Opaque`), which the materializer rejects.

use crate::ModuleName;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleHandle {
    pub name: ModuleName,
    pub is_package: bool,
    pub members: Vec<(String, HandleValue)>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "wire", derive(serde::Serialize, serde::Deserialize))]
pub enum HandleValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<HandleValue>),
    Map(Vec<(String, HandleValue)>),
    /// A sub-module. Its name must be `<parent>.<member>`.
    Module(ModuleHandle),
    /// A function defined remotely, by qualified name within the module.
    Function { qualname: String },
    Class { qualname: String },
    /// A remote-only resource (open file, live object, ...).
    Opaque { type_name: String },
}

impl ModuleHandle {
    pub fn new(name: ModuleName) -> Self {
        ModuleHandle {
            name,
            is_package: false,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn package(mut self) -> Self {
        self.is_package = true;
        self
    }

    #[must_use]
    pub fn with(mut self, member: &str, value: HandleValue) -> Self {
        self.members.push((member.to_owned(), value));
        self
    }

    /// Attach a sub-module under its leaf name. Marks `self` as a package.
    #[must_use]
    pub fn with_submodule(mut self, sub: ModuleHandle) -> Self {
        self.is_package = true;
        let leaf = sub.name.leaf().to_owned();
        self.members.push((leaf, HandleValue::Module(sub)));
        self
    }

    pub fn member(&self, member: &str) -> Option<&HandleValue> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, value)| value)
    }
}
