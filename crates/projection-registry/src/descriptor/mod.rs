//! Descriptor types for projected interfaces.
//!
//! ## Key Types
//!
//! - [`InterfaceDescriptor`]: methods, properties and events of one interface
//! - [`MethodDescriptor`]: a named method, overloads resolved by arity
//! - [`Overload`]: one native call with its parameter adapters
//! - [`PropertyDescriptor`]: getter and optional setter
//! - [`EventDescriptor`]: add/remove accessors for a native event

mod event;
mod interface;
mod method;
mod overload;
mod property;

pub use event::EventDescriptor;
pub use interface::{InterfaceDescriptor, InterfaceDescriptorBuilder, MemberKinds};
pub use method::{MethodDescriptor, OverloadGenerator, OverloadTable};
pub use overload::{Overload, ParamAdapter, ParamDirection, RETURN_VALUE};
pub use property::PropertyDescriptor;
