//! Scripting engine primitives the bridge builds on.
//!
//! The bridge never owns a real engine object model. It talks to the engine
//! through two shapes:
//!
//! - [`HostObject`]: an object whose property reads, writes and enumeration are
//!   answered by Rust code (proxies, namespaces, promises).
//! - [`ScriptFunction`]: a callable backed by a Rust closure, which can carry
//!   named members (statics on a constructor) and be sealed afterwards.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ScriptError, ScriptResult};
use crate::native::NativeRef;
use crate::value::ScriptValue;

// ============================================================================
// Host Objects
// ============================================================================

/// An object whose behavior is implemented on the Rust side.
pub trait HostObject: Send + Sync + Any {
    /// Class name shown when the object is printed.
    fn class_name(&self) -> &str;

    /// Read a named member. Unknown names should yield `Undefined`.
    fn get_property(&self, name: &str) -> ScriptResult<ScriptValue>;

    /// Write a named member.
    fn set_property(&self, name: &str, value: ScriptValue) -> ScriptResult<()>;

    /// Names reported when the object is enumerated.
    fn property_names(&self) -> Vec<String>;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;

    /// The native object this host object stands for, if any.
    fn native_object(&self) -> Option<NativeRef> {
        None
    }
}

/// Shared handle to a host object.
pub type HostObjectRef = Arc<dyn HostObject>;

// ============================================================================
// Script Functions
// ============================================================================

/// Body of a script function.
pub type FunctionBody = dyn Fn(&[ScriptValue]) -> ScriptResult<ScriptValue> + Send + Sync;

/// Getter half of an accessor member.
pub type AccessorGet = Arc<dyn Fn() -> ScriptResult<ScriptValue> + Send + Sync>;

/// Setter half of an accessor member.
pub type AccessorSet = Arc<dyn Fn(ScriptValue) -> ScriptResult<()> + Send + Sync>;

/// A named member attached to a function object.
#[derive(Clone)]
pub enum FunctionMember {
    /// Plain data member.
    Value(ScriptValue),
    /// Accessor pair. A missing setter makes the member read-only.
    Accessor {
        /// Read hook.
        get: AccessorGet,
        /// Write hook.
        set: Option<AccessorSet>,
    },
}

impl fmt::Debug for FunctionMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionMember::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FunctionMember::Accessor { set, .. } => f
                .debug_struct("Accessor")
                .field("writable", &set.is_some())
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Default)]
struct Members {
    entries: Vec<(String, FunctionMember)>,
    sealed: bool,
}

struct FunctionInner {
    name: String,
    body: Box<FunctionBody>,
    members: RwLock<Members>,
}

/// A callable script value backed by a Rust closure.
///
/// Cloning shares the same function object; equality is identity.
#[derive(Clone)]
pub struct ScriptFunction {
    inner: Arc<FunctionInner>,
}

impl ScriptFunction {
    /// Create a function from a closure.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> ScriptResult<ScriptValue> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(FunctionInner {
                name: name.into(),
                body: Box::new(body),
                members: RwLock::new(Members::default()),
            }),
        }
    }

    /// Function name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Call the function.
    pub fn call(&self, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
        (self.inner.body)(args)
    }

    /// Define a named member.
    ///
    /// Fails with a type error once the function is sealed.
    pub fn define(&self, name: impl Into<String>, member: FunctionMember) -> ScriptResult<()> {
        let name = name.into();
        let mut members = self.inner.members.write();
        if members.sealed {
            return Err(ScriptError::type_error(format!(
                "cannot define property '{}' on sealed function {}",
                name, self.inner.name
            )));
        }
        match members.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = member,
            None => members.entries.push((name, member)),
        }
        Ok(())
    }

    /// Read a named member. Unknown names yield `Undefined`.
    pub fn get(&self, name: &str) -> ScriptResult<ScriptValue> {
        // Clone out of the lock so the accessor may touch this function again
        let member = self
            .inner
            .members
            .read()
            .entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, m)| m.clone());
        match member {
            Some(FunctionMember::Value(v)) => Ok(v),
            Some(FunctionMember::Accessor { get, .. }) => get(),
            None => Ok(ScriptValue::Undefined),
        }
    }

    /// Write a named member.
    ///
    /// Writing a read-only accessor is a type error. Unknown names are added
    /// as data members, or ignored once the function is sealed.
    pub fn set(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        let member = self
            .inner
            .members
            .read()
            .entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, m)| m.clone());
        match member {
            Some(FunctionMember::Accessor { set: Some(set), .. }) => set(value),
            Some(FunctionMember::Accessor { set: None, .. }) => {
                Err(ScriptError::type_error(format!(
                    "cannot assign to read only property '{}' of function {}",
                    name, self.inner.name
                )))
            }
            Some(FunctionMember::Value(_)) => {
                let mut members = self.inner.members.write();
                if let Some((_, slot)) = members.entries.iter_mut().find(|(k, _)| k == name) {
                    *slot = FunctionMember::Value(value);
                }
                Ok(())
            }
            None => {
                let mut members = self.inner.members.write();
                if !members.sealed {
                    members
                        .entries
                        .push((name.to_string(), FunctionMember::Value(value)));
                }
                Ok(())
            }
        }
    }

    /// Prevent further member definitions.
    pub fn seal(&self) {
        self.inner.members.write().sealed = true;
    }

    /// Check if the function is sealed.
    pub fn is_sealed(&self) -> bool {
        self.inner.members.read().sealed
    }

    /// Names of all defined members.
    pub fn member_names(&self) -> Vec<String> {
        self.inner
            .members
            .read()
            .entries
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Check if both handles refer to the same function object.
    pub fn ptr_eq(&self, other: &ScriptFunction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn add() -> ScriptFunction {
        ScriptFunction::new("add", |args| {
            let a = args.first().and_then(ScriptValue::as_number).unwrap_or(0.0);
            let b = args.get(1).and_then(ScriptValue::as_number).unwrap_or(0.0);
            Ok(ScriptValue::Number(a + b))
        })
    }

    #[test]
    fn call_runs_body() {
        let f = add();
        assert_eq!(f.name(), "add");
        assert_eq!(f.call(&[1.into(), 2.into()]).unwrap(), ScriptValue::Number(3.0));
    }

    #[test]
    fn data_members() {
        let f = add();
        f.define("version", FunctionMember::Value(2.into())).unwrap();
        assert_eq!(f.get("version").unwrap(), ScriptValue::Number(2.0));
        f.set("version", 3.into()).unwrap();
        assert_eq!(f.get("version").unwrap(), ScriptValue::Number(3.0));
        assert_eq!(f.get("missing").unwrap(), ScriptValue::Undefined);
    }

    #[test]
    fn accessor_members() {
        let store = Arc::new(AtomicI32::new(5));
        let (r, w) = (store.clone(), store.clone());
        let f = add();
        f.define(
            "count",
            FunctionMember::Accessor {
                get: Arc::new(move || Ok(ScriptValue::from(r.load(Ordering::SeqCst)))),
                set: Some(Arc::new(move |v| {
                    w.store(v.as_number().unwrap_or(0.0) as i32, Ordering::SeqCst);
                    Ok(())
                })),
            },
        )
        .unwrap();
        assert_eq!(f.get("count").unwrap(), ScriptValue::Number(5.0));
        f.set("count", 9.into()).unwrap();
        assert_eq!(store.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn read_only_accessor_rejects_writes() {
        let f = add();
        f.define(
            "fixed",
            FunctionMember::Accessor {
                get: Arc::new(|| Ok(ScriptValue::Null)),
                set: None,
            },
        )
        .unwrap();
        assert!(f.set("fixed", 1.into()).unwrap_err().is_type_error());
    }

    #[test]
    fn sealed_function_rejects_definitions_and_ignores_new_writes() {
        let f = add();
        f.define("a", FunctionMember::Value(1.into())).unwrap();
        f.seal();
        assert!(f.is_sealed());
        assert!(f.define("b", FunctionMember::Value(1.into())).is_err());
        f.set("c", 1.into()).unwrap();
        assert_eq!(f.get("c").unwrap(), ScriptValue::Undefined);
        assert_eq!(f.member_names(), vec!["a".to_string()]);
    }
}
