//! Runtime classes: construction and static surfaces.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use projection_core::{InterfaceId, NativeError, NativeRef};

use crate::{InterfaceRegistry, RegistrationError};

/// Returns the activation factory of a runtime class.
pub type FactoryAccessor = Arc<dyn Fn() -> Result<NativeRef, NativeError> + Send + Sync>;

/// One construction entry: a method on a factory interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorRef {
    /// Factory interface.
    pub interface: InterfaceId,
    /// Construction method on that interface.
    pub method: String,
}

/// Everything the bridge needs to project a runtime class.
#[derive(Clone)]
pub struct RuntimeClassDescriptor {
    name: String,
    factory: FactoryAccessor,
    constructors: Vec<ConstructorRef>,
    statics: Vec<InterfaceId>,
}

impl RuntimeClassDescriptor {
    /// Create a class with no construction or static interfaces.
    ///
    /// `name` is the full dotted class name.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<NativeRef, NativeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            constructors: Vec::new(),
            statics: Vec::new(),
        }
    }

    /// Add a construction interface. Tried in the order added.
    pub fn constructor(mut self, interface: InterfaceId, method: impl Into<String>) -> Self {
        self.constructors.push(ConstructorRef {
            interface,
            method: method.into(),
        });
        self
    }

    /// Add a static interface.
    pub fn statics(mut self, interface: InterfaceId) -> Self {
        self.statics.push(interface);
        self
    }

    /// Full dotted class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of the class name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Namespace part of the class name (empty for the root).
    pub fn namespace(&self) -> &str {
        self.name.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }

    /// Obtain the activation factory.
    pub fn factory(&self) -> Result<NativeRef, NativeError> {
        (self.factory)()
    }

    /// Construction interfaces in registration order.
    pub fn constructors(&self) -> &[ConstructorRef] {
        &self.constructors
    }

    /// Static interfaces in registration order.
    pub fn static_interfaces(&self) -> &[InterfaceId] {
        &self.statics
    }

    /// Check if the class can be constructed.
    pub fn is_constructible(&self) -> bool {
        !self.constructors.is_empty()
    }

    /// Check if the class has static members.
    pub fn has_statics(&self) -> bool {
        !self.statics.is_empty()
    }
}

impl fmt::Debug for RuntimeClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeClassDescriptor")
            .field("name", &self.name)
            .field("constructors", &self.constructors)
            .field("statics", &self.statics)
            .finish_non_exhaustive()
    }
}

/// Registry of runtime classes by full name.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, Arc<RuntimeClassDescriptor>>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class.
    pub fn register(&mut self, class: RuntimeClassDescriptor) -> Result<(), RegistrationError> {
        if self.classes.contains_key(class.name()) {
            return Err(RegistrationError::DuplicateClass(class.name().to_string()));
        }
        if class.name().is_empty() || class.name().split('.').any(str::is_empty) {
            return Err(RegistrationError::InvalidDeclaration(format!(
                "runtime class name '{}'",
                class.name()
            )));
        }
        self.classes.insert(class.name().to_string(), Arc::new(class));
        Ok(())
    }

    /// Get a class by full name.
    pub fn get(&self, name: &str) -> Option<Arc<RuntimeClassDescriptor>> {
        self.classes.get(name).cloned()
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check if any class lives in `namespace` or below it.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        if namespace.is_empty() {
            return !self.classes.is_empty();
        }
        self.classes.keys().any(|name| {
            name.strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Direct child names of `namespace`: sub-namespaces and class short names.
    pub fn children(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes
            .keys()
            .filter_map(|name| {
                let rest = if namespace.is_empty() {
                    name.as_str()
                } else {
                    name.strip_prefix(namespace)?.strip_prefix('.')?
                };
                rest.split('.').next().map(str::to_string)
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Check every class against the interface registry.
    ///
    /// Returns a list of all validation errors found.
    pub fn validate(&self, interfaces: &InterfaceRegistry) -> Vec<RegistrationError> {
        let mut errors = Vec::new();
        let mut classes: Vec<_> = self.classes.values().collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));

        for class in classes {
            for ctor in class.constructors() {
                if !interfaces.contains(ctor.interface) {
                    errors.push(RegistrationError::InterfaceNotFound {
                        class: class.name().to_string(),
                        interface: ctor.interface,
                    });
                    continue;
                }
                if let Some(descriptor) = interfaces.get(ctor.interface)
                    && descriptor.method(&ctor.method).is_none()
                {
                    errors.push(RegistrationError::MethodNotFound {
                        class: class.name().to_string(),
                        interface: ctor.interface,
                        method: ctor.method.clone(),
                    });
                }
            }
            for &iid in class.static_interfaces() {
                if !interfaces.contains(iid) {
                    errors.push(RegistrationError::InterfaceNotFound {
                        class: class.name().to_string(),
                        interface: iid,
                    });
                }
            }
        }
        errors
    }
}
