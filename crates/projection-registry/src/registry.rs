//! InterfaceRegistry - lazily materialized interface descriptors.
//!
//! The registry maps every projected [`InterfaceId`] to the generator that
//! builds its [`InterfaceDescriptor`].
//!
//! # Storage Model
//!
//! - **Key set**: built eagerly from the registration table, so membership
//!   checks never run a generator
//! - **Descriptors**: built on first [`get`](InterfaceRegistry::get) and kept
//!   for the life of the registry; repeated lookups return the same `Arc`
//!
//! Unknown identities are simply "not projected". Entries are never removed.
//!
//! # Process-wide Registry
//!
//! Generated code installs its table with [`install_global_table`]; the table
//! is read the first time [`InterfaceRegistry::global`] is called. The global
//! registry is leaked and lives until process exit.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use projection_core::InterfaceId;

use crate::RegistrationError;
use crate::descriptor::{InterfaceDescriptor, InterfaceDescriptorBuilder};

/// Produces the builder for one interface.
pub type InterfaceGenerator = Box<dyn Fn() -> InterfaceDescriptorBuilder + Send + Sync>;

/// One row of a generated registration table.
pub struct InterfaceRegistration {
    id: InterfaceId,
    name: String,
    generator: InterfaceGenerator,
}

impl InterfaceRegistration {
    /// Create a registration row.
    pub fn new<F>(id: InterfaceId, name: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> InterfaceDescriptorBuilder + Send + Sync + 'static,
    {
        Self {
            id,
            name: name.into(),
            generator: Box::new(generator),
        }
    }

    /// Interface identity.
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Interface name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for InterfaceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

struct Entry {
    registration: InterfaceRegistration,
    descriptor: OnceLock<Result<Arc<InterfaceDescriptor>, RegistrationError>>,
}

impl Entry {
    fn materialize(&self) -> Result<&Arc<InterfaceDescriptor>, &RegistrationError> {
        self.descriptor
            .get_or_init(|| {
                let builder = (self.registration.generator)();
                if builder.id() != self.registration.id {
                    return Err(RegistrationError::IdentityMismatch {
                        expected: self.registration.id,
                        actual: builder.id(),
                    });
                }
                let descriptor = builder.build()?;
                tracing::debug!(
                    interface = %self.registration.name,
                    id = %self.registration.id,
                    "materialized interface descriptor"
                );
                Ok(Arc::new(descriptor))
            })
            .as_ref()
    }
}

/// Registry of projected interfaces.
#[derive(Default)]
pub struct InterfaceRegistry {
    entries: FxHashMap<InterfaceId, Entry>,
}

impl InterfaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a registration table.
    pub fn from_table(
        table: impl IntoIterator<Item = InterfaceRegistration>,
    ) -> Result<Self, RegistrationError> {
        let mut registry = Self::new();
        for registration in table {
            registry.register(registration)?;
        }
        Ok(registry)
    }

    /// Add one registration.
    pub fn register(
        &mut self,
        registration: InterfaceRegistration,
    ) -> Result<(), RegistrationError> {
        let id = registration.id;
        if self.entries.contains_key(&id) {
            return Err(RegistrationError::DuplicateInterface(id));
        }
        self.entries.insert(
            id,
            Entry {
                registration,
                descriptor: OnceLock::new(),
            },
        );
        Ok(())
    }

    /// Get the descriptor for an interface, building it on first use.
    ///
    /// Returns `None` for interfaces that are not projected.
    ///
    /// # Panics
    ///
    /// Panics if the generated descriptor is malformed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get(&self, id: InterfaceId) -> Option<Arc<InterfaceDescriptor>> {
        let entry = self.entries.get(&id)?;
        match entry.materialize() {
            Ok(descriptor) => Some(Arc::clone(descriptor)),
            Err(err) => panic!("malformed generated table: {}", err),
        }
    }

    /// Check if an interface is projected.
    pub fn contains(&self, id: InterfaceId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Name an interface was registered under.
    pub fn name_of(&self, id: InterfaceId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.registration.name())
    }

    /// Number of registered interfaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities of all registered interfaces.
    pub fn ids(&self) -> impl Iterator<Item = InterfaceId> + '_ {
        self.entries.keys().copied()
    }

    /// Materialize every descriptor and method table.
    ///
    /// Returns a list of all validation errors found.
    pub fn validate(&self) -> Vec<RegistrationError> {
        let mut errors = Vec::new();
        for entry in self.entries.values() {
            match entry.materialize() {
                Ok(descriptor) => errors.extend(descriptor.validate()),
                Err(err) => errors.push(err.clone()),
            }
        }
        errors
    }

    /// The process-wide registry.
    ///
    /// Built on first call from the table passed to [`install_global_table`],
    /// or empty if none was installed. Never torn down.
    pub fn global() -> &'static InterfaceRegistry {
        static GLOBAL: OnceLock<InterfaceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let table = GLOBAL_TABLE.get().map(|f| f()).unwrap_or_default();
            match InterfaceRegistry::from_table(table) {
                Ok(registry) => registry,
                Err(err) => panic!("malformed generated table: {}", err),
            }
        })
    }
}

impl fmt::Debug for InterfaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceRegistry")
            .field("interfaces", &self.entries.len())
            .finish_non_exhaustive()
    }
}

/// Generated function producing the process-wide registration table.
pub type GlobalTable = fn() -> Vec<InterfaceRegistration>;

static GLOBAL_TABLE: OnceLock<GlobalTable> = OnceLock::new();

/// Install the table the process-wide registry is built from.
///
/// Returns `false` if a table was already installed.
pub fn install_global_table(table: GlobalTable) -> bool {
    GLOBAL_TABLE.set(table).is_ok()
}
