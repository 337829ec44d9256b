//! Script-side proxies for native objects, classes and namespaces.
//!
//! ## Key Types
//!
//! - [`RuntimeClassProxy`]: one native identity, resolving members across
//!   all of its projected interfaces
//! - [`InterfaceInstance`]: one interface descriptor bound to a native handle
//! - [`CompositeMethod`] / [`CompositeConstructor`]: arity dispatch across
//!   interfaces
//! - [`StaticsObject`], [`NamespaceObject`]: class and namespace surfaces

mod class;
mod composite;
mod instance;
mod interface_instance;
mod namespace;
mod surface;

pub use class::StaticsObject;
pub(crate) use class::project_class;
pub use composite::{CompositeConstructor, CompositeMethod};
pub use instance::RuntimeClassProxy;
pub use interface_instance::InterfaceInstance;
pub use namespace::NamespaceObject;
