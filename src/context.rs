//! Projection context - the process-scoped hub of the bridge.
//!
//! A `Context` owns the sealed interface and class registries, the instance
//! cache, and the services the bridge calls out to (engine, invoker, event
//! registrar). Everything projected from it holds an `Arc<Context>`.
//!
//! # Example
//!
//! ```ignore
//! let (invoker, queue) = ThreadInvoker::for_current_thread();
//! let ctx = Context::builder()
//!     .install(sample_module())
//!     .with_invoker(invoker)
//!     .build()?;
//!
//! let widget = ctx.project(native_widget);
//! let ns = ctx.namespace("Sample");
//! queue.run_pending();
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use thiserror::Error;

use projection_core::{
    AsyncRef, AsyncSignature, ConversionError, ConversionHost, DelegateSignature, NativeDelegate,
    NativeRef, ScriptError, ScriptFunction, ScriptResult, ScriptValue,
};
use projection_registry::{ClassRegistry, InterfaceRegistry, RegistrationError};

use crate::config::ProjectionConfig;
use crate::delegate;
use crate::engine::{LoggingEngine, ScriptEngine};
use crate::events::{EventRegistrar, ListenerTable};
use crate::instance_cache::InstanceCache;
use crate::invoker::Invoker;
use crate::module::ProjectionModule;
use crate::promise::{AsyncOperationProxy, PromiseObject};
use crate::proxy::{NamespaceObject, RuntimeClassProxy, project_class};

/// Errors that can occur when building a context.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    /// No invoker was supplied.
    #[error("a context needs an invoker")]
    MissingInvoker,

    /// Registrations conflicted.
    #[error("failed to build registries: {} error(s)", .0.len())]
    RegistryBuildFailed(Vec<RegistrationError>),
}

impl ContextError {
    /// Get the registration errors, if any.
    pub fn into_errors(self) -> Vec<RegistrationError> {
        match self {
            ContextError::RegistryBuildFailed(errors) => errors,
            ContextError::MissingInvoker => Vec::new(),
        }
    }

    /// Get the first registration error, if any.
    pub fn first_error(&self) -> Option<&RegistrationError> {
        match self {
            ContextError::RegistryBuildFailed(errors) => errors.first(),
            ContextError::MissingInvoker => None,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects modules and services, then seals them into a [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    modules: Vec<ProjectionModule>,
    engine: Option<Arc<dyn ScriptEngine>>,
    invoker: Option<Arc<dyn Invoker>>,
    events: Option<Arc<dyn EventRegistrar>>,
    config: ProjectionConfig,
}

impl ContextBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a module.
    pub fn install(mut self, module: ProjectionModule) -> Self {
        self.modules.push(module);
        self
    }

    /// Set the scripting engine. Defaults to [`LoggingEngine`].
    pub fn with_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the invoker. Required.
    pub fn with_invoker(mut self, invoker: Arc<dyn Invoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Set the event registrar. Defaults to [`ListenerTable`].
    pub fn with_event_registrar(mut self, events: Arc<dyn EventRegistrar>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ProjectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Seal the installed modules into a context.
    ///
    /// # Errors
    ///
    /// Returns every duplicate registration across all modules, or
    /// [`ContextError::MissingInvoker`].
    pub fn build(self) -> Result<Arc<Context>, ContextError> {
        let invoker = self.invoker.ok_or(ContextError::MissingInvoker)?;

        let mut interfaces = InterfaceRegistry::new();
        let mut classes = ClassRegistry::new();
        let mut errors = Vec::new();
        for module in self.modules {
            errors.extend(module.install_into(&mut interfaces, &mut classes));
        }
        if !errors.is_empty() {
            return Err(ContextError::RegistryBuildFailed(errors));
        }

        tracing::debug!(
            interfaces = interfaces.len(),
            classes = classes.len(),
            "projection context sealed"
        );

        let engine = self.engine.unwrap_or_else(|| Arc::new(LoggingEngine));
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(ListenerTable::new()));
        let config = self.config;

        Ok(Arc::new_cyclic(|self_ref| Context {
            self_ref: self_ref.clone(),
            interfaces,
            classes,
            instances: InstanceCache::new(),
            invoker,
            engine,
            events,
            config,
        }))
    }
}

// ============================================================================
// Context
// ============================================================================

/// Shared state of one projection.
pub struct Context {
    self_ref: Weak<Context>,
    interfaces: InterfaceRegistry,
    classes: ClassRegistry,
    instances: InstanceCache<RuntimeClassProxy>,
    invoker: Arc<dyn Invoker>,
    engine: Arc<dyn ScriptEngine>,
    events: Arc<dyn EventRegistrar>,
    config: ProjectionConfig,
}

impl Context {
    /// Start building a context.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Project a native object.
    ///
    /// Returns the live proxy for the object's identity, creating one if
    /// none is alive.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn project(self: &Arc<Self>, object: NativeRef) -> ScriptValue {
        let identity = object.identity();
        let proxy = self.instances.get_or_insert_with(identity, |handle| {
            Arc::new(RuntimeClassProxy::new(Arc::clone(self), object, handle))
        });
        ScriptValue::Host(proxy)
    }

    /// Project a runtime class by full name.
    ///
    /// # Errors
    ///
    /// Fails with a type error for unknown classes, and with the native error
    /// when the class's factory cannot be obtained.
    pub fn project_class(self: &Arc<Self>, name: &str) -> ScriptResult<ScriptValue> {
        let class = self
            .classes
            .get(name)
            .ok_or_else(|| ScriptError::type_error(format!("unknown runtime class '{name}'")))?;
        project_class(self, &class)
    }

    /// The namespace object for a dotted path (empty for the root).
    pub fn namespace(self: &Arc<Self>, path: &str) -> ScriptValue {
        ScriptValue::Host(Arc::new(NamespaceObject::new(Arc::clone(self), path)))
    }

    /// Materialize every descriptor and check class declarations.
    ///
    /// Returns a list of all validation errors found.
    pub fn validate(&self) -> Vec<RegistrationError> {
        let mut errors = self.interfaces.validate();
        errors.extend(self.classes.validate(&self.interfaces));
        errors
    }

    /// Interface registry.
    pub fn interfaces(&self) -> &InterfaceRegistry {
        &self.interfaces
    }

    /// Class registry.
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Invoker.
    pub fn invoker(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    /// Event registrar.
    pub fn event_registrar(&self) -> &Arc<dyn EventRegistrar> {
        &self.events
    }

    /// Configuration.
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Number of live proxies.
    pub fn live_proxies(&self) -> usize {
        self.instances.len()
    }

    pub(crate) fn instances(&self) -> &InstanceCache<RuntimeClassProxy> {
        &self.instances
    }

    /// Report an error nobody handled to the engine.
    pub(crate) fn raise_unhandled(&self, error: ScriptError) {
        tracing::warn!(%error, "unhandled error raised to the engine");
        self.engine.raise_unhandled(error);
    }

    fn arc(&self) -> Result<Arc<Context>, ConversionError> {
        self.self_ref
            .upgrade()
            .ok_or_else(|| ConversionError::Custom("projection context was dropped".into()))
    }
}

impl ConversionHost for Context {
    fn project_object(&self, object: NativeRef) -> Result<ScriptValue, ConversionError> {
        Ok(self.arc()?.project(object))
    }

    fn project_async(
        &self,
        operation: AsyncRef,
        signature: &Arc<AsyncSignature>,
    ) -> Result<ScriptValue, ConversionError> {
        let proxy =
            AsyncOperationProxy::from_operation(self.arc()?, operation, Arc::clone(signature));
        Ok(ScriptValue::Host(PromiseObject::new(proxy)))
    }

    fn project_delegate(
        &self,
        delegate: NativeDelegate,
        signature: &Arc<DelegateSignature>,
    ) -> Result<ScriptValue, ConversionError> {
        let function = delegate::project_delegate(self.arc()?, delegate, Arc::clone(signature));
        Ok(ScriptValue::Function(function))
    }

    fn wrap_script_function(
        &self,
        function: ScriptFunction,
        signature: &Arc<DelegateSignature>,
    ) -> Result<NativeDelegate, ConversionError> {
        Ok(delegate::wrap_script_function(
            self.arc()?,
            function,
            Arc::clone(signature),
        ))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("interfaces", &self.interfaces.len())
            .field("classes", &self.classes.len())
            .field("instances", &self.instances)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use projection_core::{Guid, NativeError};
    use projection_registry::{InterfaceDescriptor, InterfaceRegistration, RuntimeClassDescriptor};

    use super::*;
    use crate::invoker::ThreadInvoker;

    const IA: Guid = Guid(0xA);

    fn module(name: &str) -> ProjectionModule {
        ProjectionModule::new(name)
            .interface(InterfaceRegistration::new(IA, "IA", || {
                InterfaceDescriptor::builder(IA, "IA")
            }))
            .class(RuntimeClassDescriptor::new("Sample.A", || {
                Err(NativeError::fail("no factory"))
            }))
    }

    #[test]
    fn build_needs_invoker() {
        let err = Context::builder().install(module("m")).build().unwrap_err();
        assert_eq!(err, ContextError::MissingInvoker);
        assert!(err.first_error().is_none());
    }

    #[test]
    fn build_seals_modules() {
        let (invoker, _queue) = ThreadInvoker::for_current_thread();
        let ctx = Context::builder()
            .install(module("m"))
            .with_invoker(invoker)
            .build()
            .unwrap();
        assert!(ctx.interfaces().contains(IA));
        assert!(ctx.classes().get("Sample.A").is_some());
        assert!(ctx.validate().is_empty());
        assert_eq!(ctx.live_proxies(), 0);
    }

    #[test]
    fn duplicates_across_modules_fail_build() {
        let (invoker, _queue) = ThreadInvoker::for_current_thread();
        let err = Context::builder()
            .install(module("first"))
            .install(module("second"))
            .with_invoker(invoker)
            .build()
            .unwrap_err();
        assert_eq!(
            err.first_error(),
            Some(&RegistrationError::DuplicateInterface(IA))
        );
        assert_eq!(err.into_errors().len(), 2);
    }

    #[test]
    fn unknown_class_is_type_error() {
        let (invoker, _queue) = ThreadInvoker::for_current_thread();
        let ctx = Context::builder().with_invoker(invoker).build().unwrap();
        assert!(ctx.project_class("Sample.Missing").unwrap_err().is_type_error());
    }

    #[test]
    fn factory_failure_surfaces_when_class_needs_it() {
        let (invoker, _queue) = ThreadInvoker::for_current_thread();
        let ctx = Context::builder()
            .install(ProjectionModule::new("m").class(
                RuntimeClassDescriptor::new("Sample.Statics", || Err(NativeError::fail("gone")))
                    .statics(IA),
            ))
            .with_invoker(invoker)
            .build()
            .unwrap();
        assert!(matches!(
            ctx.project_class("Sample.Statics"),
            Err(ScriptError::Native { .. })
        ));
    }
}
