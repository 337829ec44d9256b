//! RuntimeClassProxy - the script face of one native object.
//!
//! A proxy starts uninitialized and materializes its interface list on the
//! first member access: every interface the native object reports, in the
//! order reported, that the context's registry knows how to project. The
//! transition is one-way. Dropping the proxy deregisters it from the
//! instance cache and releases its event listeners, so the next projection
//! of the same identity builds a new one from a clean state.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use projection_core::{
    HostObject, InterfaceId, NativeRef, ObjectId, ScriptResult, ScriptValue, query_interface,
};

use super::InterfaceInstance;
use super::surface::MemberSurface;
use crate::Context;
use crate::instance_cache::CacheHandle;

/// Host object projecting one native identity.
pub struct RuntimeClassProxy {
    context: Arc<Context>,
    object: NativeRef,
    identity: ObjectId,
    handle: CacheHandle,
    class_name: String,
    surface: OnceLock<MemberSurface>,
}

impl RuntimeClassProxy {
    pub(crate) fn new(context: Arc<Context>, object: NativeRef, handle: CacheHandle) -> Self {
        let identity = object.identity();
        let class_name = object.runtime_class_name().unwrap_or("Object").to_string();
        Self {
            context,
            object,
            identity,
            handle,
            class_name,
            surface: OnceLock::new(),
        }
    }

    /// Native identity.
    pub fn identity(&self) -> ObjectId {
        self.identity
    }

    /// The projected native object.
    pub fn object(&self) -> &NativeRef {
        &self.object
    }

    /// Check if the interface list has been built.
    pub fn is_materialized(&self) -> bool {
        self.surface.get().is_some()
    }

    /// Projected interfaces in native enumeration order.
    pub fn interface_ids(&self) -> Vec<InterfaceId> {
        self.surface().interfaces().iter().map(InterfaceInstance::id).collect()
    }

    fn surface(&self) -> &MemberSurface {
        self.surface.get_or_init(|| self.materialize())
    }

    fn materialize(&self) -> MemberSurface {
        let _span = tracing::debug_span!(
            "materialize",
            class = %self.class_name,
            identity = self.identity.0
        )
        .entered();

        let registry = self.context.interfaces();
        let interfaces: Vec<InterfaceInstance> = self
            .object
            .interfaces()
            .into_iter()
            .filter_map(|iid| {
                let descriptor = registry.get(iid)?;
                let Some(target) = query_interface(&self.object, iid) else {
                    tracing::debug!(
                        interface = %descriptor.name(),
                        "reported interface not queryable"
                    );
                    return None;
                };
                Some(InterfaceInstance::new(
                    descriptor,
                    target,
                    self.identity,
                    Arc::clone(&self.context),
                ))
            })
            .collect();

        tracing::debug!(interfaces = interfaces.len(), "materialized proxy");
        MemberSurface::new(Arc::clone(&self.context), self.class_name.clone(), interfaces)
    }
}

impl HostObject for RuntimeClassProxy {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn get_property(&self, name: &str) -> ScriptResult<ScriptValue> {
        self.surface().get(name)
    }

    fn set_property(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        self.surface().set(name, value)
    }

    fn property_names(&self) -> Vec<String> {
        self.surface().names()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn native_object(&self) -> Option<NativeRef> {
        Some(Arc::clone(&self.object))
    }
}

impl Drop for RuntimeClassProxy {
    fn drop(&mut self) {
        // A stale handle means a newer proxy owns the identity and its listeners.
        let current = self.context.instances().remove(self.handle);
        if current && self.is_materialized() {
            self.context.event_registrar().release(self.identity);
        }
    }
}

impl fmt::Debug for RuntimeClassProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeClassProxy")
            .field("class", &self.class_name)
            .field("identity", &self.identity)
            .field("materialized", &self.is_materialized())
            .finish_non_exhaustive()
    }
}
