//! PromiseObject - the script face of an [`AsyncOperationProxy`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use projection_core::{HostObject, ScriptFunction, ScriptResult, ScriptValue};

use super::{AsyncOperationProxy, Continuation};

const METHODS: [&str; 5] = ["then", "catch", "finally", "done", "cancel"];

/// Host object exposing `then`, `catch`, `finally`, `done` and `cancel`.
pub struct PromiseObject {
    proxy: Arc<AsyncOperationProxy>,
}

impl PromiseObject {
    /// Wrap a proxy.
    pub fn new(proxy: Arc<AsyncOperationProxy>) -> Arc<Self> {
        Arc::new(Self { proxy })
    }

    /// The state machine behind this object.
    pub fn proxy(&self) -> &Arc<AsyncOperationProxy> {
        &self.proxy
    }

    /// The proxy behind `value`, if it is a bridge promise.
    pub fn proxy_of(value: &ScriptValue) -> Option<Arc<AsyncOperationProxy>> {
        value
            .as_host()?
            .as_any()
            .downcast_ref::<PromiseObject>()
            .map(|p| Arc::clone(&p.proxy))
    }

    fn method(&self, name: &str) -> Option<ScriptFunction> {
        let proxy = Arc::clone(&self.proxy);
        let function = match name {
            "then" => ScriptFunction::new(name, move |args| {
                Ok(chain(&proxy, |output| {
                    Continuation::then(handler(args, 0), handler(args, 1), handler(args, 2), output)
                }))
            }),
            "catch" => ScriptFunction::new(name, move |args| {
                Ok(chain(&proxy, |output| {
                    Continuation::then(None, handler(args, 0), None, output)
                }))
            }),
            "finally" => ScriptFunction::new(name, move |args| {
                Ok(chain(&proxy, |output| Continuation::finally(handler(args, 0), output)))
            }),
            "done" => ScriptFunction::new(name, move |args| {
                proxy.attach(Continuation::done(
                    handler(args, 0),
                    handler(args, 1),
                    handler(args, 2),
                ));
                Ok(ScriptValue::Undefined)
            }),
            "cancel" => ScriptFunction::new(name, move |_| {
                proxy.cancel();
                Ok(ScriptValue::Undefined)
            }),
            _ => return None,
        };
        Some(function)
    }
}

/// Attach a continuation settling a fresh promise, and return that promise.
fn chain(
    proxy: &Arc<AsyncOperationProxy>,
    continuation: impl FnOnce(Arc<AsyncOperationProxy>) -> Continuation,
) -> ScriptValue {
    let output = AsyncOperationProxy::pending(Arc::clone(proxy.context()));
    proxy.attach(continuation(Arc::clone(&output)));
    ScriptValue::Host(PromiseObject::new(output))
}

/// Non-function arguments count as absent handlers.
fn handler(args: &[ScriptValue], index: usize) -> Option<ScriptFunction> {
    args.get(index).and_then(ScriptValue::as_function).cloned()
}

impl HostObject for PromiseObject {
    fn class_name(&self) -> &str {
        "Promise"
    }

    fn get_property(&self, name: &str) -> ScriptResult<ScriptValue> {
        Ok(self
            .method(name)
            .map_or(ScriptValue::Undefined, ScriptValue::Function))
    }

    fn set_property(&self, name: &str, _value: ScriptValue) -> ScriptResult<()> {
        tracing::debug!(name, "write to promise ignored");
        Ok(())
    }

    fn property_names(&self) -> Vec<String> {
        METHODS.iter().map(|m| m.to_string()).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for PromiseObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PromiseObject").field(&self.proxy).finish()
    }
}
