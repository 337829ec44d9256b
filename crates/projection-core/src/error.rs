//! Error types for the projection runtime.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ScriptError            - what a scripting caller can catch
//! └── ProjectionError    - dispatch failures inside the bridge
//!     ├── ConversionError  - value could not be converted to/from a native shape
//!     ├── NativeError      - the native call itself failed (HRESULT-style code)
//!     └── ScriptError      - a script callback threw while called from the bridge
//! ```
//!
//! `ProjectionError` converts into `ScriptError` at every scripting boundary:
//! overload and conversion failures become type errors, native failures keep
//! their code, and errors thrown by script callbacks pass through unchanged.
//!
//! Invariant violations (thread affinity, writing a read-only descriptor,
//! malformed generated tables) are not represented here. They panic.

use thiserror::Error;

use crate::{Guid, PlainObject, ScriptValue};

// ============================================================================
// Conversion Errors
// ============================================================================

/// A value could not be converted between its script and native shapes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value has the wrong type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: String,
        /// Actual type name.
        actual: String,
    },

    /// A numeric value does not fit the target type.
    #[error("value {value} is out of range for {target}")]
    OutOfRange {
        /// Rendered source value.
        value: String,
        /// Target type name.
        target: &'static str,
    },

    /// A struct conversion is missing a field.
    #[error("struct '{type_name}' is missing field '{field}'")]
    MissingField {
        /// Struct type name.
        type_name: String,
        /// Field name.
        field: String,
    },

    /// The object does not implement the interface the parameter requires.
    #[error("object does not implement interface {interface}")]
    InterfaceNotImplemented {
        /// Required interface.
        interface: Guid,
    },

    /// The value kind has no conversion in this direction.
    #[error("{0} cannot be converted in this direction")]
    NotConvertible(String),

    /// A pluggable converter failed.
    #[error("{0}")]
    Custom(String),
}

impl ConversionError {
    /// Build a type mismatch error.
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

// ============================================================================
// Native Errors
// ============================================================================

/// HRESULT-style codes used by the native object model.
pub mod codes {
    /// Unspecified failure.
    pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;
    /// Not implemented.
    pub const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32;
    /// Interface not supported.
    pub const E_NOINTERFACE: i32 = 0x8000_4002_u32 as i32;
    /// Invalid argument.
    pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;
    /// Index out of bounds.
    pub const E_BOUNDS: i32 = 0x8000_000B_u32 as i32;
    /// Method called at an unexpected time.
    pub const E_ILLEGAL_METHOD_CALL: i32 = 0x8000_000E_u32 as i32;
    /// The operation was canceled.
    pub const ERROR_CANCELLED: i32 = 0x8007_04C7_u32 as i32;
}

/// A native operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("native error {code:#010X}: {message}")]
pub struct NativeError {
    /// HRESULT-style failure code.
    pub code: i32,
    /// Failure description.
    pub message: String,
}

impl NativeError {
    /// Create a native error with an explicit code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an unspecified failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(codes::E_FAIL, message)
    }

    /// Create an invalid argument failure.
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        Self::new(codes::E_INVALIDARG, message)
    }

    /// Create a cancellation failure.
    pub fn canceled() -> Self {
        Self::new(codes::ERROR_CANCELLED, "the operation was canceled")
    }

    /// Check if this error reports a cancellation.
    pub fn is_canceled(&self) -> bool {
        self.code == codes::ERROR_CANCELLED
    }
}

impl From<ConversionError> for NativeError {
    fn from(err: ConversionError) -> Self {
        NativeError::invalid_arg(err.to_string())
    }
}

// ============================================================================
// Script Errors
// ============================================================================

/// An error a scripting caller can catch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// A `TypeError` raised by the bridge.
    #[error("TypeError: {0}")]
    Type(String),

    /// A translated native failure.
    #[error("Error: {message} ({code:#010X})")]
    Native {
        /// HRESULT-style failure code.
        code: i32,
        /// Failure description.
        message: String,
    },

    /// An arbitrary value thrown by script code.
    #[error("Uncaught {0}")]
    Thrown(ScriptValue),
}

impl ScriptError {
    /// Build a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        ScriptError::Type(message.into())
    }

    /// Check if this is a type error.
    pub fn is_type_error(&self) -> bool {
        matches!(self, ScriptError::Type(_))
    }

    /// Convert the error into the value a `catch` clause would observe.
    ///
    /// Bridge errors become error records with `name` and `message`; native
    /// errors also carry their code as `number`.
    pub fn into_value(self) -> ScriptValue {
        match self {
            ScriptError::Thrown(value) => value,
            ScriptError::Type(message) => ScriptValue::Object(
                PlainObject::new()
                    .with("name", "TypeError")
                    .with("message", message),
            ),
            ScriptError::Native { code, message } => ScriptValue::Object(
                PlainObject::new()
                    .with("name", "Error")
                    .with("message", message)
                    .with("number", code),
            ),
        }
    }
}

impl From<NativeError> for ScriptError {
    fn from(err: NativeError) -> Self {
        ScriptError::Native {
            code: err.code,
            message: err.message,
        }
    }
}

// ============================================================================
// Projection Errors
// ============================================================================

/// Failures raised while dispatching through the bridge.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// No overload accepts the supplied argument count.
    #[error("{name}: no overload accepts {arity} argument(s)")]
    UnknownOverload {
        /// Operation name.
        name: String,
        /// Supplied argument count.
        arity: usize,
    },

    /// No construction interface accepts the supplied argument count.
    #[error("{class}: no constructor accepts {arity} argument(s)")]
    NoMatchingConstructor {
        /// Runtime class name.
        class: String,
        /// Supplied argument count.
        arity: usize,
    },

    /// An argument could not be converted.
    #[error("{operation}: argument {index}: {source}")]
    Argument {
        /// Operation name.
        operation: String,
        /// Zero-based argument index.
        index: usize,
        /// Underlying conversion failure.
        #[source]
        source: ConversionError,
    },

    /// A result or property value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The native call failed.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// A script callback threw.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The call was well-formed but cannot be honoured.
    #[error("{0}")]
    InvalidOperation(String),
}

impl ProjectionError {
    /// Build an unknown-overload error.
    pub fn unknown_overload(name: impl Into<String>, arity: usize) -> Self {
        ProjectionError::UnknownOverload {
            name: name.into(),
            arity,
        }
    }

    /// Check if this is an unknown-overload error.
    pub fn is_unknown_overload(&self) -> bool {
        matches!(self, ProjectionError::UnknownOverload { .. })
    }
}

impl From<ProjectionError> for ScriptError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::Native(native) => native.into(),
            ProjectionError::Script(script) => script,
            other => ScriptError::Type(other.to_string()),
        }
    }
}

/// Result type for bridge operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Result type for script-facing operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_overload_becomes_type_error() {
        let err: ScriptError = ProjectionError::unknown_overload("Widget.resize", 3).into();
        assert!(err.is_type_error());
        assert_eq!(
            err.to_string(),
            "TypeError: Widget.resize: no overload accepts 3 argument(s)"
        );
    }

    #[test]
    fn argument_error_names_operation_and_type() {
        let err = ProjectionError::Argument {
            operation: "Widget.resize".into(),
            index: 1,
            source: ConversionError::mismatch("i32", "string"),
        };
        let script: ScriptError = err.into();
        assert_eq!(
            script.to_string(),
            "TypeError: Widget.resize: argument 1: type mismatch: expected i32, got string"
        );
    }

    #[test]
    fn native_error_keeps_code() {
        let err: ScriptError =
            ProjectionError::Native(NativeError::new(codes::E_BOUNDS, "index")).into();
        assert_eq!(
            err,
            ScriptError::Native {
                code: codes::E_BOUNDS,
                message: "index".into()
            }
        );
        assert!(err.to_string().contains("0x8000000B"));
    }

    #[test]
    fn thrown_values_pass_through() {
        let thrown = ScriptError::Thrown(ScriptValue::Number(7.0));
        let err: ScriptError = ProjectionError::Script(thrown.clone()).into();
        assert_eq!(err, thrown);
        assert_eq!(err.into_value(), ScriptValue::Number(7.0));
    }

    #[test]
    fn bridge_errors_become_error_records() {
        let value = ScriptError::Native {
            code: codes::E_FAIL,
            message: "boom".into(),
        }
        .into_value();
        assert_eq!(value.get("name").unwrap(), ScriptValue::from("Error"));
        assert_eq!(value.get("message").unwrap(), ScriptValue::from("boom"));
        assert_eq!(value.get("number").unwrap(), ScriptValue::Number(codes::E_FAIL as f64));

        let value = ScriptError::type_error("bad").into_value();
        assert_eq!(value.get("name").unwrap(), ScriptValue::from("TypeError"));
    }

    #[test]
    fn canceled_native_error() {
        assert!(NativeError::canceled().is_canceled());
        assert!(!NativeError::fail("x").is_canceled());
    }

    #[test]
    fn conversion_into_native_is_invalid_arg() {
        let native: NativeError = ConversionError::NotConvertible("promise".into()).into();
        assert_eq!(native.code, codes::E_INVALIDARG);
    }
}
