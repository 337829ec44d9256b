//! One interface of one projected object.

use std::fmt;
use std::sync::Arc;

use projection_core::{
    InterfaceId, NativeRef, ObjectId, ProjectionError, ProjectionResult, ScriptFunction,
    ScriptValue,
};
use projection_registry::{EventDescriptor, InterfaceDescriptor};

use crate::Context;
use crate::events::EventSource;

/// An interface descriptor bound to an interface-typed native handle.
#[derive(Clone)]
pub struct InterfaceInstance {
    descriptor: Arc<InterfaceDescriptor>,
    target: NativeRef,
    identity: ObjectId,
    context: Arc<Context>,
}

impl InterfaceInstance {
    /// Bind `descriptor` to `target`.
    ///
    /// `identity` is the identity of the projected object, which may differ
    /// from the identity of an interface tear-off.
    pub fn new(
        descriptor: Arc<InterfaceDescriptor>,
        target: NativeRef,
        identity: ObjectId,
        context: Arc<Context>,
    ) -> Self {
        Self {
            descriptor,
            target,
            identity,
            context,
        }
    }

    pub fn id(&self) -> InterfaceId {
        self.descriptor.id()
    }

    pub fn descriptor(&self) -> &Arc<InterfaceDescriptor> {
        &self.descriptor
    }

    pub fn target(&self) -> &NativeRef {
        &self.target
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.descriptor.property(name).is_some()
    }

    /// Check if `name` is a property with a setter.
    pub fn has_writable_property(&self, name: &str) -> bool {
        self.descriptor
            .property(name)
            .is_some_and(|p| !p.is_read_only())
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.descriptor.method(name).is_some()
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.descriptor.event(name).is_some()
    }

    /// Read a property.
    pub fn get(&self, name: &str) -> ProjectionResult<ScriptValue> {
        let property = self
            .descriptor
            .property(name)
            .ok_or_else(|| self.missing("property", name))?;
        property.get(&self.target, &*self.context)
    }

    /// Write a property.
    ///
    /// # Panics
    ///
    /// Panics if the property is read-only.
    pub fn set(&self, name: &str, value: &ScriptValue) -> ProjectionResult<()> {
        let property = self
            .descriptor
            .property(name)
            .ok_or_else(|| self.missing("property", name))?;
        property.set(&self.target, value, &*self.context)
    }

    /// Check if method `name` has an overload taking `arity` arguments.
    pub fn can_invoke(&self, name: &str, arity: usize) -> bool {
        self.descriptor
            .method(name)
            .is_some_and(|m| m.can_invoke(arity))
    }

    /// Invoke a method.
    pub fn invoke(&self, name: &str, args: &[ScriptValue]) -> ProjectionResult<ScriptValue> {
        let method = self.descriptor.method(name).ok_or_else(|| self.missing("method", name))?;
        let _span = tracing::debug_span!(
            "invoke",
            interface = %self.descriptor.name(),
            method = name,
            arity = args.len()
        )
        .entered();
        method.invoke(&self.target, args, &*self.context)
    }

    /// Register a script listener for an event.
    pub fn add_listener(&self, event: &str, handler: ScriptFunction) -> ProjectionResult<()> {
        let descriptor = self.descriptor.event(event).ok_or_else(|| self.missing("event", event))?;
        self.context
            .event_registrar()
            .add_listener(self.source(descriptor), handler)
    }

    /// Remove a script listener. Unknown events and handlers are ignored.
    pub fn remove_listener(&self, event: &str, handler: &ScriptFunction) -> ProjectionResult<()> {
        let Some(descriptor) = self.descriptor.event(event) else {
            return Ok(());
        };
        self.context
            .event_registrar()
            .remove_listener(self.source(descriptor), handler)
    }

    /// Number of script listeners on an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.descriptor
            .event(event)
            .map_or(0, |d| self.context.event_registrar().listener_count(self.source(d)))
    }

    fn source<'a>(&'a self, event: &'a EventDescriptor) -> EventSource<'a> {
        EventSource {
            context: &self.context,
            identity: self.identity,
            interface: self.descriptor.id(),
            target: &self.target,
            event,
        }
    }

    fn missing(&self, kind: &str, name: &str) -> ProjectionError {
        ProjectionError::InvalidOperation(format!(
            "{} has no {} '{}'",
            self.descriptor.name(),
            kind,
            name
        ))
    }
}

impl fmt::Debug for InterfaceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceInstance")
            .field("interface", &self.descriptor.name())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
