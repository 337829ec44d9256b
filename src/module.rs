//! Projection modules - bundles of generated registrations.
//!
//! A code generator emits one [`ProjectionModule`] per metadata file (or per
//! namespace). Modules are installed into a
//! [`ContextBuilder`](crate::ContextBuilder) and only become usable once the
//! builder seals them into a [`Context`](crate::Context).

use std::fmt;

use projection_registry::{
    ClassRegistry, InterfaceRegistration, InterfaceRegistry, RegistrationError,
    RuntimeClassDescriptor,
};

/// A bundle of interface and runtime class registrations.
pub struct ProjectionModule {
    name: String,
    interfaces: Vec<InterfaceRegistration>,
    classes: Vec<RuntimeClassDescriptor>,
}

impl ProjectionModule {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Add an interface registration.
    pub fn interface(mut self, registration: InterfaceRegistration) -> Self {
        self.interfaces.push(registration);
        self
    }

    /// Add several interface registrations.
    pub fn interfaces(mut self, table: impl IntoIterator<Item = InterfaceRegistration>) -> Self {
        self.interfaces.extend(table);
        self
    }

    /// Add a runtime class.
    pub fn class(mut self, class: RuntimeClassDescriptor) -> Self {
        self.classes.push(class);
        self
    }

    /// Module name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of interface and class registrations.
    pub fn item_count(&self) -> usize {
        self.interfaces.len() + self.classes.len()
    }

    /// Move every registration into the given registries.
    ///
    /// Collects all duplicate errors instead of stopping at the first.
    pub(crate) fn install_into(
        self,
        interfaces: &mut InterfaceRegistry,
        classes: &mut ClassRegistry,
    ) -> Vec<RegistrationError> {
        let mut errors = Vec::new();
        tracing::debug!(
            module = %self.name,
            interfaces = self.interfaces.len(),
            classes = self.classes.len(),
            "installing projection module"
        );
        for registration in self.interfaces {
            if let Err(err) = interfaces.register(registration) {
                errors.push(err);
            }
        }
        for class in self.classes {
            if let Err(err) = classes.register(class) {
                errors.push(err);
            }
        }
        errors
    }
}

impl fmt::Debug for ProjectionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionModule")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces.len())
            .field("classes", &self.classes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use projection_core::{Guid, NativeError};
    use projection_registry::InterfaceDescriptor;

    use super::*;

    const IA: Guid = Guid(0xA);

    fn registration() -> InterfaceRegistration {
        InterfaceRegistration::new(IA, "IA", || InterfaceDescriptor::builder(IA, "IA"))
    }

    fn class(name: &str) -> RuntimeClassDescriptor {
        RuntimeClassDescriptor::new(name, || Err(NativeError::fail("no factory")))
    }

    #[test]
    fn install_moves_everything() {
        let module = ProjectionModule::new("sample")
            .interface(registration())
            .class(class("Sample.A"));
        assert_eq!(module.item_count(), 2);

        let mut interfaces = InterfaceRegistry::new();
        let mut classes = ClassRegistry::new();
        assert!(module.install_into(&mut interfaces, &mut classes).is_empty());
        assert!(interfaces.contains(IA));
        assert!(classes.get("Sample.A").is_some());
    }

    #[test]
    fn install_collects_duplicates() {
        let module = ProjectionModule::new("dup")
            .interfaces([registration(), registration()])
            .class(class("Sample.A"))
            .class(class("Sample.A"));
        let mut interfaces = InterfaceRegistry::new();
        let mut classes = ClassRegistry::new();
        assert_eq!(
            module.install_into(&mut interfaces, &mut classes),
            vec![
                RegistrationError::DuplicateInterface(IA),
                RegistrationError::DuplicateClass("Sample.A".into()),
            ]
        );
    }
}
