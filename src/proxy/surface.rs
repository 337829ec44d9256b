//! The member surface shared by instance proxies and static class objects.
//!
//! A surface is an ordered list of [`InterfaceInstance`]s and resolves
//! script-visible names against them:
//!
//! | Name resolves to               | Read                  | Write                     |
//! |--------------------------------|-----------------------|---------------------------|
//! | property (first interface)     | property value        | first writable interface  |
//! | method (one or more interfaces)| plain or composite fn | ignored                   |
//! | listener method (with events)  | listener fn           | ignored                   |
//! | anything else                  | `undefined`           | ignored (configurable)    |

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use projection_core::{ScriptError, ScriptFunction, ScriptResult, ScriptValue};

use super::{CompositeMethod, InterfaceInstance};
use crate::Context;

pub(crate) struct MemberSurface {
    context: Arc<Context>,
    owner: String,
    interfaces: Vec<InterfaceInstance>,
    functions: Mutex<FxHashMap<String, ScriptFunction>>,
}

impl MemberSurface {
    pub(crate) fn new(
        context: Arc<Context>,
        owner: impl Into<String>,
        interfaces: Vec<InterfaceInstance>,
    ) -> Self {
        Self {
            context,
            owner: owner.into(),
            interfaces,
            functions: Mutex::new(FxHashMap::default()),
        }
    }

    pub(crate) fn interfaces(&self) -> &[InterfaceInstance] {
        &self.interfaces
    }

    pub(crate) fn has_events(&self) -> bool {
        self.interfaces.iter().any(|i| i.descriptor().has_events())
    }

    /// First interface declaring property `name`.
    pub(crate) fn property_owner(&self, name: &str) -> Option<&InterfaceInstance> {
        self.interfaces.iter().find(|i| i.has_property(name))
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn get(&self, name: &str) -> ScriptResult<ScriptValue> {
        if let Some(owner) = self.property_owner(name) {
            return Ok(owner.get(name)?);
        }
        Ok(self
            .function(name)
            .map_or(ScriptValue::Undefined, ScriptValue::Function))
    }

    pub(crate) fn set(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        if let Some(owner) = self.interfaces.iter().find(|i| i.has_writable_property(name)) {
            return Ok(owner.set(name, &value)?);
        }
        if self.property_owner(name).is_some() {
            tracing::warn!(
                owner = %self.owner,
                property = name,
                "write to read-only property ignored"
            );
            return Ok(());
        }
        if self.context.config().ignore_unknown_writes {
            tracing::debug!(owner = %self.owner, name, "write to undeclared name ignored");
            return Ok(());
        }
        Err(ScriptError::type_error(format!(
            "{} has no writable property '{}'",
            self.owner, name
        )))
    }

    /// Properties, then methods, then the listener pair, without duplicates.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for instance in &self.interfaces {
            for property in instance.descriptor().properties() {
                if seen.insert(property.name()) {
                    names.push(property.name().to_string());
                }
            }
        }
        for instance in &self.interfaces {
            for method in instance.descriptor().methods() {
                if seen.insert(method.name()) {
                    names.push(method.name().to_string());
                }
            }
        }
        if self.has_events() {
            let config = self.context.config();
            names.push(config.add_listener_name.clone());
            names.push(config.remove_listener_name.clone());
        }
        names
    }

    /// The callable behind `name`, if it names a method or listener method.
    pub(crate) fn function(&self, name: &str) -> Option<ScriptFunction> {
        let cache = self.context.config().cache_method_functions;
        if cache && let Some(function) = self.functions.lock().get(name) {
            return Some(function.clone());
        }
        let function = self
            .method_function(name)
            .or_else(|| self.listener_function(name))?;
        if cache {
            let mut functions = self.functions.lock();
            return Some(functions.entry(name.to_string()).or_insert(function).clone());
        }
        Some(function)
    }

    fn method_function(&self, name: &str) -> Option<ScriptFunction> {
        let mut contributors: Vec<InterfaceInstance> = self
            .interfaces
            .iter()
            .filter(|i| i.has_method(name))
            .cloned()
            .collect();
        let method = name.to_string();
        match contributors.len() {
            0 => None,
            1 => {
                let instance = contributors.remove(0);
                Some(ScriptFunction::new(name, move |args| {
                    Ok(instance.invoke(&method, args)?)
                }))
            }
            _ => {
                tracing::debug!(
                    owner = %self.owner,
                    method = name,
                    contributors = contributors.len(),
                    "composite method"
                );
                let composite = CompositeMethod::new(method, contributors);
                Some(ScriptFunction::new(name, move |args| Ok(composite.invoke(args)?)))
            }
        }
    }

    fn listener_function(&self, name: &str) -> Option<ScriptFunction> {
        let config = self.context.config();
        if !config.is_listener_method(name) || !self.has_events() {
            return None;
        }
        let adding = name == config.add_listener_name;
        let owner = self.owner.clone();
        let function_name = name.to_string();
        let sources: Vec<InterfaceInstance> = self
            .interfaces
            .iter()
            .filter(|i| i.descriptor().has_events())
            .cloned()
            .collect();

        Some(ScriptFunction::new(name, move |args| {
            let (event, handler) = listener_args(&function_name, args)?;
            let mut found = false;
            for source in sources.iter().filter(|s| s.has_event(event)) {
                found = true;
                if adding {
                    source.add_listener(event, handler.clone())?;
                } else {
                    source.remove_listener(event, handler)?;
                }
            }
            if !found && adding {
                return Err(ScriptError::type_error(format!(
                    "{owner} has no event '{event}'"
                )));
            }
            Ok(ScriptValue::Undefined)
        }))
    }
}

fn listener_args<'a>(
    function: &str,
    args: &'a [ScriptValue],
) -> ScriptResult<(&'a str, &'a ScriptFunction)> {
    match args {
        [ScriptValue::String(event), ScriptValue::Function(handler)] => {
            Ok((event.as_str(), handler))
        }
        _ => Err(ScriptError::type_error(format!(
            "{function} expects (event name, handler function), got {} argument(s)",
            args.len()
        ))),
    }
}

impl fmt::Debug for MemberSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberSurface")
            .field("owner", &self.owner)
            .field("interfaces", &self.interfaces)
            .finish_non_exhaustive()
    }
}
