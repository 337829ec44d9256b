//! Registration errors.

use projection_core::Guid;
use thiserror::Error;

/// Errors found while registering or materializing generated tables.
///
/// Materializing a malformed table at dispatch time is an invariant violation
/// and panics; [`InterfaceRegistry::validate`](crate::InterfaceRegistry::validate)
/// reports the same problems as values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Two overloads of one method take the same number of arguments.
    #[error("ambiguous overload: '{method}' declares more than one overload with {arity} argument(s)")]
    AmbiguousOverload {
        /// Method name.
        method: String,
        /// Shared arity.
        arity: usize,
    },

    /// An interface identity was registered twice.
    #[error("duplicate interface: {0}")]
    DuplicateInterface(Guid),

    /// A runtime class name was registered twice.
    #[error("duplicate runtime class: {0}")]
    DuplicateClass(String),

    /// A member name appears twice on one interface.
    #[error("duplicate registration: {name} already registered as {kind} on {interface}")]
    DuplicateMember {
        /// Interface name.
        interface: String,
        /// Member name.
        name: String,
        /// Kind of the existing member ("method", "property", "event").
        kind: &'static str,
    },

    /// A generator produced a descriptor for a different identity.
    #[error("interface generator for {expected} produced {actual}")]
    IdentityMismatch {
        /// Identity the generator was registered under.
        expected: Guid,
        /// Identity of the produced descriptor.
        actual: Guid,
    },

    /// A class refers to an interface that is not registered.
    #[error("runtime class '{class}' refers to unregistered interface {interface}")]
    InterfaceNotFound {
        /// Runtime class name.
        class: String,
        /// Missing interface.
        interface: Guid,
    },

    /// A class construction entry names a method its interface lacks.
    #[error("runtime class '{class}': interface {interface} has no method '{method}'")]
    MethodNotFound {
        /// Runtime class name.
        class: String,
        /// Construction interface.
        interface: Guid,
        /// Missing method name.
        method: String,
    },

    /// The declaration is invalid.
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),
}
