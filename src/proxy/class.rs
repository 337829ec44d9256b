//! Runtime class projection.
//!
//! | Constructors | Statics | Projects as                                      |
//! |--------------|---------|--------------------------------------------------|
//! | yes          | yes     | sealed constructor with static members attached  |
//! | yes          | no      | sealed constructor                               |
//! | no           | yes     | [`StaticsObject`] host object                    |
//! | no           | no      | sealed callable that throws a type error         |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use projection_core::{
    AccessorGet, AccessorSet, FunctionMember, HostObject, NativeRef, ScriptError, ScriptFunction,
    ScriptResult, ScriptValue, query_interface,
};
use projection_registry::RuntimeClassDescriptor;

use super::surface::MemberSurface;
use super::{CompositeConstructor, InterfaceInstance};
use crate::Context;

/// Project `class` into its script shape.
pub(crate) fn project_class(
    context: &Arc<Context>,
    class: &Arc<RuntimeClassDescriptor>,
) -> ScriptResult<ScriptValue> {
    let _span = tracing::debug_span!("project_class", class = class.name()).entered();

    let statics = if class.has_statics() {
        Some(static_surface(context, class)?)
    } else {
        None
    };

    if !class.is_constructible() {
        return Ok(match statics {
            Some((factory, surface)) => ScriptValue::Host(Arc::new(StaticsObject {
                name: class.name().to_string(),
                factory,
                surface,
            })),
            None => ScriptValue::Function(not_constructible(class)),
        });
    }

    let constructor = CompositeConstructor::new(Arc::clone(context), Arc::clone(class));
    let function = ScriptFunction::new(class.short_name(), move |args| {
        Ok(constructor.construct(args)?)
    });
    if let Some((_, surface)) = statics {
        attach_statics(&function, &surface)?;
    }
    function.seal();
    Ok(ScriptValue::Function(function))
}

fn static_surface(
    context: &Arc<Context>,
    class: &RuntimeClassDescriptor,
) -> ScriptResult<(NativeRef, MemberSurface)> {
    let factory = class.factory()?;
    let registry = context.interfaces();
    let interfaces = class
        .static_interfaces()
        .iter()
        .filter_map(|&iid| {
            let descriptor = registry.get(iid)?;
            let target = query_interface(&factory, iid)?;
            Some(InterfaceInstance::new(
                descriptor,
                target,
                factory.identity(),
                Arc::clone(context),
            ))
        })
        .collect();
    let surface = MemberSurface::new(Arc::clone(context), class.name(), interfaces);
    Ok((factory, surface))
}

/// Define every static member of `surface` on the constructor.
fn attach_statics(function: &ScriptFunction, surface: &MemberSurface) -> ScriptResult<()> {
    for name in surface.names() {
        if let Some(owner) = surface.property_owner(&name) {
            function.define(name.clone(), accessor(owner, &name))?;
        } else if let Some(member) = surface.function(&name) {
            function.define(name, FunctionMember::Value(ScriptValue::Function(member)))?;
        }
    }
    Ok(())
}

fn accessor(owner: &InterfaceInstance, name: &str) -> FunctionMember {
    let get: AccessorGet = {
        let owner = owner.clone();
        let name = name.to_string();
        Arc::new(move || -> ScriptResult<ScriptValue> { Ok(owner.get(&name)?) })
    };
    // Read-only statics ignore writes, the same as instance properties.
    let set: AccessorSet = {
        let owner = owner.clone();
        let name = name.to_string();
        let writable = owner.has_writable_property(&name);
        Arc::new(move |value: ScriptValue| -> ScriptResult<()> {
            if !writable {
                tracing::warn!(property = %name, "write to read-only static property ignored");
                return Ok(());
            }
            Ok(owner.set(&name, &value)?)
        })
    };
    FunctionMember::Accessor { get, set: Some(set) }
}

fn not_constructible(class: &RuntimeClassDescriptor) -> ScriptFunction {
    let name = class.name().to_string();
    let function = ScriptFunction::new(class.short_name(), move |_| {
        Err(ScriptError::type_error(format!("{name} cannot be constructed")))
    });
    function.seal();
    function
}

/// Host object exposing the static members of a class without constructors.
pub struct StaticsObject {
    name: String,
    factory: NativeRef,
    surface: MemberSurface,
}

impl HostObject for StaticsObject {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, name: &str) -> ScriptResult<ScriptValue> {
        self.surface.get(name)
    }

    fn set_property(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        self.surface.set(name, value)
    }

    fn property_names(&self) -> Vec<String> {
        self.surface.names()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn native_object(&self) -> Option<NativeRef> {
        Some(Arc::clone(&self.factory))
    }
}

impl fmt::Debug for StaticsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticsObject")
            .field("name", &self.name)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}
