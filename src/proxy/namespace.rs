//! Namespace objects - dotted class names as nested script objects.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use projection_core::{HostObject, ScriptError, ScriptResult, ScriptValue};

use super::project_class;
use crate::Context;

/// One level of the runtime class namespace tree.
///
/// Members resolve lazily to sub-namespaces or projected classes. Resolved
/// members are cached, so reading a class twice yields the same object.
pub struct NamespaceObject {
    context: Arc<Context>,
    path: String,
    members: Mutex<FxHashMap<String, ScriptValue>>,
}

impl NamespaceObject {
    /// Create the namespace object for `path` (empty for the root).
    pub fn new(context: Arc<Context>, path: impl Into<String>) -> Self {
        Self {
            context,
            path: path.into(),
            members: Mutex::new(FxHashMap::default()),
        }
    }

    /// Dotted path of this namespace.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn qualify(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn resolve(&self, name: &str) -> ScriptResult<Option<ScriptValue>> {
        let full = self.qualify(name);
        let classes = self.context.classes();
        if let Some(class) = classes.get(&full) {
            return project_class(&self.context, &class).map(Some);
        }
        if classes.has_namespace(&full) {
            let child = NamespaceObject::new(Arc::clone(&self.context), full);
            return Ok(Some(ScriptValue::Host(Arc::new(child))));
        }
        Ok(None)
    }
}

impl HostObject for NamespaceObject {
    fn class_name(&self) -> &str {
        "Namespace"
    }

    fn get_property(&self, name: &str) -> ScriptResult<ScriptValue> {
        if let Some(member) = self.members.lock().get(name) {
            return Ok(member.clone());
        }
        // Resolved unlocked: class projection may call into native factories.
        let Some(member) = self.resolve(name)? else {
            return Ok(ScriptValue::Undefined);
        };
        let mut members = self.members.lock();
        Ok(members.entry(name.to_string()).or_insert(member).clone())
    }

    fn set_property(&self, name: &str, _value: ScriptValue) -> ScriptResult<()> {
        if self.context.config().ignore_unknown_writes {
            tracing::debug!(namespace = %self.path, name, "write to namespace ignored");
            return Ok(());
        }
        Err(ScriptError::type_error(format!(
            "namespace '{}' is read-only",
            self.path
        )))
    }

    fn property_names(&self) -> Vec<String> {
        self.context.classes().children(&self.path)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for NamespaceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceObject")
            .field("path", &self.path)
            .field("resolved", &self.members.lock().len())
            .finish_non_exhaustive()
    }
}
