//! Interface descriptors and their builder.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use projection_core::InterfaceId;

use super::{EventDescriptor, MethodDescriptor, Overload, PropertyDescriptor};
use crate::RegistrationError;

bitflags! {
    /// Kinds of members an interface declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemberKinds: u8 {
        /// At least one method.
        const METHODS = 1 << 0;
        /// At least one property.
        const PROPERTIES = 1 << 1;
        /// At least one event.
        const EVENTS = 1 << 2;
    }
}

/// Everything the bridge knows about one native interface.
///
/// Immutable once built. Members are kept in declaration order.
#[derive(Debug)]
pub struct InterfaceDescriptor {
    id: InterfaceId,
    name: String,
    methods: Vec<MethodDescriptor>,
    properties: Vec<PropertyDescriptor>,
    events: Vec<EventDescriptor>,
    index: FxHashMap<String, Member>,
    kinds: MemberKinds,
}

#[derive(Debug, Clone, Copy)]
enum Member {
    Method(usize),
    Property(usize),
    Event(usize),
}

impl Member {
    fn kind(self) -> &'static str {
        match self {
            Member::Method(_) => "method",
            Member::Property(_) => "property",
            Member::Event(_) => "event",
        }
    }
}

impl InterfaceDescriptor {
    /// Start building a descriptor.
    pub fn builder(id: InterfaceId, name: impl Into<String>) -> InterfaceDescriptorBuilder {
        InterfaceDescriptorBuilder {
            id,
            name: name.into(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
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

    /// Member kinds this interface declares.
    pub fn kinds(&self) -> MemberKinds {
        self.kinds
    }

    /// Check if the interface declares any event.
    pub fn has_events(&self) -> bool {
        self.kinds.contains(MemberKinds::EVENTS)
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        match self.index.get(name)? {
            Member::Method(i) => self.methods.get(*i),
            _ => None,
        }
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        match self.index.get(name)? {
            Member::Property(i) => self.properties.get(*i),
            _ => None,
        }
    }

    /// Look up an event by name.
    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        match self.index.get(name)? {
            Member::Event(i) => self.events.get(*i),
            _ => None,
        }
    }

    /// All methods in declaration order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// All properties in declaration order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// All events in declaration order.
    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// Force every method table and collect the errors.
    pub fn validate(&self) -> Vec<RegistrationError> {
        self.methods
            .iter()
            .filter_map(|m| m.try_table().err().cloned())
            .collect()
    }
}

/// Builder for [`InterfaceDescriptor`].
pub struct InterfaceDescriptorBuilder {
    id: InterfaceId,
    name: String,
    methods: Vec<MethodDescriptor>,
    properties: Vec<PropertyDescriptor>,
    events: Vec<EventDescriptor>,
}

impl InterfaceDescriptorBuilder {
    /// Identity the descriptor will carry.
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Add a method whose overloads are generated on first use.
    pub fn method<F>(mut self, name: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> Vec<Overload> + Send + Sync + 'static,
    {
        self.methods.push(MethodDescriptor::new(name, generator));
        self
    }

    /// Add a property.
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Add an event.
    pub fn event(mut self, event: EventDescriptor) -> Self {
        self.events.push(event);
        self
    }

    /// Finish the descriptor. Member names must be unique across kinds.
    pub fn build(self) -> Result<InterfaceDescriptor, RegistrationError> {
        let mut index = FxHashMap::default();
        let names = self
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name(), Member::Method(i)))
            .chain(
                self.properties
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.name(), Member::Property(i))),
            )
            .chain(
                self.events
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (e.name(), Member::Event(i))),
            );
        for (name, member) in names {
            if let Some(existing) = index.insert(name.to_string(), member) {
                return Err(RegistrationError::DuplicateMember {
                    interface: self.name.clone(),
                    name: name.to_string(),
                    kind: existing.kind(),
                });
            }
        }

        let mut kinds = MemberKinds::empty();
        kinds.set(MemberKinds::METHODS, !self.methods.is_empty());
        kinds.set(MemberKinds::PROPERTIES, !self.properties.is_empty());
        kinds.set(MemberKinds::EVENTS, !self.events.is_empty());

        Ok(InterfaceDescriptor {
            id: self.id,
            name: self.name,
            methods: self.methods,
            properties: self.properties,
            events: self.events,
            index,
            kinds,
        })
    }
}
