//! Composite dispatch across interfaces.
//!
//! A method name declared by several interfaces of one object, or a class
//! constructible through several factory interfaces, dispatches on argument
//! count: the first contributor (in order) with a matching overload wins.

use std::fmt;
use std::sync::Arc;

use projection_core::{
    NativeError, ProjectionError, ProjectionResult, ScriptValue, codes, query_interface,
};
use projection_registry::RuntimeClassDescriptor;

use super::InterfaceInstance;
use crate::Context;

/// A method contributed by more than one interface.
pub struct CompositeMethod {
    name: String,
    contributors: Vec<InterfaceInstance>,
}

impl CompositeMethod {
    /// Create a composite over `contributors`, tried in order.
    pub fn new(name: impl Into<String>, contributors: Vec<InterfaceInstance>) -> Self {
        Self {
            name: name.into(),
            contributors,
        }
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every arity some contributor accepts, sorted.
    pub fn arities(&self) -> Vec<usize> {
        let mut arities: Vec<usize> = self
            .contributors
            .iter()
            .filter_map(|c| c.descriptor().method(&self.name))
            .flat_map(|m| m.arities())
            .collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }

    /// Invoke the first contributor accepting `args.len()` arguments.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(&self, args: &[ScriptValue]) -> ProjectionResult<ScriptValue> {
        let arity = args.len();
        let contributor = self
            .contributors
            .iter()
            .find(|c| c.can_invoke(&self.name, arity))
            .ok_or_else(|| ProjectionError::unknown_overload(&self.name, arity))?;
        contributor.invoke(&self.name, args)
    }
}

impl fmt::Debug for CompositeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeMethod")
            .field("name", &self.name)
            .field("contributors", &self.contributors.len())
            .finish()
    }
}

/// Construction through a class's factory interfaces.
pub struct CompositeConstructor {
    context: Arc<Context>,
    class: Arc<RuntimeClassDescriptor>,
}

impl CompositeConstructor {
    pub fn new(context: Arc<Context>, class: Arc<RuntimeClassDescriptor>) -> Self {
        Self { context, class }
    }

    /// Construct with the first factory method accepting `args.len()`
    /// arguments, in registration order.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::NoMatchingConstructor`] when no construction
    /// interface accepts the argument count.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn construct(&self, args: &[ScriptValue]) -> ProjectionResult<ScriptValue> {
        let arity = args.len();
        let registry = self.context.interfaces();
        for ctor in self.class.constructors() {
            let Some(descriptor) = registry.get(ctor.interface) else {
                continue;
            };
            let Some(method) = descriptor.method(&ctor.method) else {
                continue;
            };
            if !method.can_invoke(arity) {
                continue;
            }

            let factory = self.class.factory()?;
            let target = query_interface(&factory, ctor.interface).ok_or_else(|| {
                NativeError::new(
                    codes::E_NOINTERFACE,
                    format!(
                        "factory of {} does not implement {}",
                        self.class.name(),
                        descriptor.name()
                    ),
                )
            })?;
            tracing::debug!(
                class = self.class.name(),
                interface = %descriptor.name(),
                arity,
                "constructing runtime class"
            );
            return method.invoke(&target, args, &*self.context);
        }
        Err(ProjectionError::NoMatchingConstructor {
            class: self.class.name().to_string(),
            arity,
        })
    }
}

impl fmt::Debug for CompositeConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeConstructor")
            .field("class", &self.class.name())
            .finish_non_exhaustive()
    }
}
