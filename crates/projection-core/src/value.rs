//! Script-side values.
//!
//! [`ScriptValue`] is the bridge's view of the scripting engine's dynamic value
//! space. Engine-owned plain objects (struct values, out-parameter records) are
//! [`PlainObject`]s; objects whose behavior is supplied by the bridge are
//! [`HostObjectRef`]s; callables are [`ScriptFunction`]s.

use std::fmt;
use std::sync::Arc;

use crate::host::{HostObjectRef, ScriptFunction};

/// A dynamically typed script value.
#[derive(Clone, Default)]
pub enum ScriptValue {
    /// The "no value" sentinel.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Number (all numerics are doubles on the script side).
    Number(f64),
    /// String value.
    String(String),
    /// Array of values.
    Array(Vec<ScriptValue>),
    /// Engine-owned plain object.
    Object(PlainObject),
    /// Host object implemented by the bridge.
    Host(HostObjectRef),
    /// Callable value.
    Function(ScriptFunction),
}

impl ScriptValue {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(_) => "object",
            ScriptValue::Host(_) => "object",
            ScriptValue::Function(_) => "function",
        }
    }

    /// Check if this is the "no value" sentinel.
    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    /// Check if this is `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    /// Get as boolean if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as callable if this is a function.
    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            ScriptValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as host object if this is one.
    pub fn as_host(&self) -> Option<&HostObjectRef> {
        match self {
            ScriptValue::Host(h) => Some(h),
            _ => None,
        }
    }

    /// Get as plain object if this is one.
    pub fn as_object(&self) -> Option<&PlainObject> {
        match self {
            ScriptValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Script truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => false,
            ScriptValue::Bool(b) => *b,
            ScriptValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ScriptValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Read a named member from any object-like value.
    ///
    /// Plain objects return their own field, host objects and functions run
    /// their property hooks. Everything else yields `Undefined`.
    pub fn get(&self, name: &str) -> Result<ScriptValue, crate::ScriptError> {
        match self {
            ScriptValue::Object(o) => Ok(o.get(name).cloned().unwrap_or_default()),
            ScriptValue::Host(h) => h.get_property(name),
            ScriptValue::Function(f) => f.get(name),
            _ => Ok(ScriptValue::Undefined),
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "Undefined"),
            ScriptValue::Null => write!(f, "Null"),
            ScriptValue::Bool(v) => write!(f, "Bool({})", v),
            ScriptValue::Number(v) => write!(f, "Number({})", v),
            ScriptValue::String(s) => write!(f, "String({:?})", s),
            ScriptValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            ScriptValue::Object(o) => f.debug_tuple("Object").field(o).finish(),
            ScriptValue::Host(h) => write!(f, "Host({})", h.class_name()),
            ScriptValue::Function(func) => write!(f, "Function({})", func.name()),
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "undefined"),
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(v) => write!(f, "{}", v),
            ScriptValue::Number(v) => write!(f, "{}", v),
            ScriptValue::String(s) => write!(f, "{}", s),
            ScriptValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            ScriptValue::Object(_) => write!(f, "[object Object]"),
            ScriptValue::Host(h) => write!(f, "[object {}]", h.class_name()),
            ScriptValue::Function(func) => {
                write!(f, "function {}() {{ [native code] }}", func.name())
            }
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a == b,
            (ScriptValue::Object(a), ScriptValue::Object(b)) => a == b,
            // Objects and functions compare by identity
            (ScriptValue::Host(a), ScriptValue::Host(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Number(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Number(v as f64)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::String(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::String(v)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(v: Vec<ScriptValue>) -> Self {
        ScriptValue::Array(v)
    }
}

impl From<PlainObject> for ScriptValue {
    fn from(v: PlainObject) -> Self {
        ScriptValue::Object(v)
    }
}

impl From<ScriptFunction> for ScriptValue {
    fn from(v: ScriptFunction) -> Self {
        ScriptValue::Function(v)
    }
}

/// An engine-owned object with ordered named fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlainObject {
    fields: Vec<(String, ScriptValue)>,
}

impl PlainObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&ScriptValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Set a field, replacing an existing one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: ScriptValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Check if a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ScriptValue)> for PlainObject {
    fn from_iter<I: IntoIterator<Item = (K, ScriptValue)>>(iter: I) -> Self {
        let mut object = PlainObject::new();
        for (k, v) in iter {
            object.insert(k, v);
        }
        object
    }
}
