//! Dynamic projection of interface-based native objects into a scripting engine.
//!
//! Native objects expose their functionality through interfaces identified by
//! GUIDs. This crate turns them into script objects on demand: properties
//! become accessors, overloaded methods dispatch on argument count, events
//! become listener registrations and asynchronous operations become promises.
//!
//! ## Key Types
//!
//! - [`Context`]: one projection session, built with [`ContextBuilder`]
//! - [`ProjectionModule`]: a bundle of interface and class descriptors to install
//! - [`RuntimeClassProxy`]: the script face of a native object
//! - [`PromiseObject`] / [`AsyncOperationProxy`]: the asynchronous bridge
//! - [`Invoker`]: marshals native callbacks onto the scripting thread
//! - [`EventRegistrar`]: bookkeeping for script listeners on native events
//!
//! ## Example
//!
//! ```ignore
//! let (invoker, queue) = ThreadInvoker::for_current_thread();
//! let ctx = Context::builder()
//!     .install(widgets_module())
//!     .with_invoker(invoker)
//!     .build()?;
//!
//! let widget = ctx.project(native_widget);
//! widget.get("name")?;
//! queue.run_pending();
//! ```

pub mod config;
pub mod context;
mod delegate;
pub mod engine;
pub mod events;
pub mod instance_cache;
pub mod invoker;
pub mod module;
pub mod promise;
pub mod proxy;

pub use config::ProjectionConfig;
pub use context::{Context, ContextBuilder, ContextError};
pub use engine::{LoggingEngine, ScriptEngine};
pub use events::{EventKey, EventRegistrar, EventSource, ListenerTable};
pub use instance_cache::{CacheHandle, InstanceCache};
pub use invoker::{DispatchQueue, Invoker, Task, ThreadInvoker};
pub use module::ProjectionModule;
pub use promise::{AsyncOperationProxy, Continuation, Outcome, PromiseObject};
pub use proxy::{
    CompositeConstructor, CompositeMethod, InterfaceInstance, NamespaceObject, RuntimeClassProxy,
    StaticsObject,
};

pub use projection_core::{
    AsyncOperation, AsyncRef, AsyncStatus, Guid, HostObject, InterfaceId, NativeDelegate,
    NativeError, NativeObject, NativeRef, NativeValue, ObjectId, ProjectionError, ScriptError,
    ScriptFunction, ScriptResult, ScriptValue,
};
pub use projection_registry::{
    ClassRegistry, InterfaceDescriptor, InterfaceRegistration, InterfaceRegistry,
    RegistrationError, RuntimeClassDescriptor,
};

/// Re-exports for writing modules and native object bindings.
pub mod prelude {
    pub use crate::{Context, ContextBuilder, ProjectionConfig, ProjectionModule, ThreadInvoker};
    pub use projection_core::*;
    pub use projection_registry::*;
}
