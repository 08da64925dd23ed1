//! Tether IR - Shared Module Types
//!
//! This crate contains the data structures every other tether crate speaks:
//! - `ModuleName` for validated dotted module names
//! - `Value` for snapshot attribute values
//! - `Module` / `ModuleRef` for in-process module objects
//! - `ModuleHandle` for the transferable form of a remote module
//! - `RemoteItem` for descriptors of remote functions and classes
//!
//! # Identity
//!
//! A `ModuleRef` is an `Arc<Module>`. Two imports of the same name must yield
//! the same allocation, so module equality is pointer identity
//! (`Module::same`), never structural.
//!
//! # Features
//!
//! - `wire`: derives `serde` traits for `ModuleName`, `ModuleHandle` and
//!   `HandleValue` so the channel crate can encode them.

mod handle;
mod module;
mod name;
mod remote;
mod value;

pub use handle::{HandleValue, ModuleHandle};
pub use module::{Module, ModuleBuilder, ModuleRef, Origin};
pub use name::{ModuleName, NameError};
pub use remote::{RemoteItem, RemoteKind, RemoteRef};
pub use value::Value;
