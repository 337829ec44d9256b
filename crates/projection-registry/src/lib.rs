//! Projection registry crate.
//!
//! Descriptor tables for projected interfaces and runtime classes:
//!
//! - [`InterfaceRegistry`]: interface identity to lazily built [`InterfaceDescriptor`]
//! - [`MethodDescriptor`] / [`Overload`]: arity-based overload resolution
//! - [`PropertyDescriptor`], [`EventDescriptor`]: property and event accessors
//! - [`ClassRegistry`] / [`RuntimeClassDescriptor`]: construction and static surfaces

pub mod class;
pub mod descriptor;
mod error;
pub mod registry;

pub use class::{ClassRegistry, ConstructorRef, FactoryAccessor, RuntimeClassDescriptor};
pub use descriptor::{
    EventDescriptor, InterfaceDescriptor, InterfaceDescriptorBuilder, MemberKinds,
    MethodDescriptor, Overload, OverloadGenerator, OverloadTable, ParamAdapter, ParamDirection,
    PropertyDescriptor, RETURN_VALUE,
};
pub use error::RegistrationError;
pub use registry::{
    GlobalTable, InterfaceGenerator, InterfaceRegistration, InterfaceRegistry,
    install_global_table,
};
