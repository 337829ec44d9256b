//! Descriptor-level value converters.

use std::fmt;
use std::sync::Arc;

use crate::error::ConversionError;
use crate::guid::{Guid, InterfaceId};
use crate::native::query_interface;
use crate::native_value::{NativeValue, PrimitiveKind};
use crate::value::{PlainObject, ScriptValue};

use super::{ConversionHost, FromScript};

/// Field layout of a native struct.
#[derive(Debug, Clone)]
pub struct StructLayout {
    /// Struct type name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<(String, Converter)>,
}

/// Signature of a native delegate type.
#[derive(Debug, Clone)]
pub struct DelegateSignature {
    /// Delegate type name.
    pub name: String,
    /// Parameter converters.
    pub params: Vec<Converter>,
    /// Result converter (`Void` for none).
    pub result: Converter,
}

/// Result and progress shapes of a native asynchronous operation.
#[derive(Debug, Clone)]
pub struct AsyncSignature {
    /// Converter for the completion result.
    pub result: Converter,
    /// Converter for progress reports, if the operation reports progress.
    pub progress: Option<Converter>,
}

/// A pluggable converter for types outside the standard set.
pub trait ValueConverter: Send + Sync {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Convert a native value into its script shape.
    fn to_script(
        &self,
        value: NativeValue,
        host: &dyn ConversionHost,
    ) -> Result<ScriptValue, ConversionError>;

    /// Convert a script value into its native shape.
    fn to_native(
        &self,
        value: &ScriptValue,
        host: &dyn ConversionHost,
    ) -> Result<NativeValue, ConversionError>;

    /// Value an unset output slot starts with.
    fn default_native(&self) -> NativeValue {
        NativeValue::Empty
    }
}

/// Conversion strategy for one parameter, result, field or element.
#[derive(Clone)]
pub enum Converter {
    /// No value.
    Void,
    /// Primitive value.
    Primitive(PrimitiveKind),
    /// String value.
    String,
    /// GUID, projected as its registry-format string.
    Guid,
    /// Enumeration, projected as a number.
    Enum {
        /// Enumeration type name.
        name: Arc<str>,
    },
    /// Struct, projected as a plain object.
    Struct(Arc<StructLayout>),
    /// Array of one element type.
    Array(Arc<Converter>),
    /// Interface reference, optionally required to implement one interface.
    Object(Option<InterfaceId>),
    /// Delegate of a known signature.
    Delegate(Arc<DelegateSignature>),
    /// Asynchronous operation, projected as a promise.
    Async(Arc<AsyncSignature>),
    /// Best-effort structural conversion with no declared type.
    Passthrough,
    /// Pluggable converter.
    Custom(Arc<dyn ValueConverter>),
}

impl Converter {
    /// `i32` converter.
    pub const I32: Converter = Converter::Primitive(PrimitiveKind::I32);
    /// `u32` converter.
    pub const U32: Converter = Converter::Primitive(PrimitiveKind::U32);
    /// `f64` converter.
    pub const F64: Converter = Converter::Primitive(PrimitiveKind::F64);
    /// `bool` converter.
    pub const BOOL: Converter = Converter::Primitive(PrimitiveKind::Bool);

    /// Array converter for the given element type.
    pub fn array(element: Converter) -> Self {
        Converter::Array(Arc::new(element))
    }

    /// Enumeration converter.
    pub fn enumeration(name: &str) -> Self {
        Converter::Enum { name: name.into() }
    }

    /// Struct converter.
    pub fn structure(name: impl Into<String>, fields: Vec<(String, Converter)>) -> Self {
        Converter::Struct(Arc::new(StructLayout {
            name: name.into(),
            fields,
        }))
    }

    /// Delegate converter.
    pub fn delegate(name: impl Into<String>, params: Vec<Converter>, result: Converter) -> Self {
        Converter::Delegate(Arc::new(DelegateSignature {
            name: name.into(),
            params,
            result,
        }))
    }

    /// Asynchronous operation converter.
    pub fn async_operation(result: Converter, progress: Option<Converter>) -> Self {
        Converter::Async(Arc::new(AsyncSignature { result, progress }))
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Converter::Void => "void".to_string(),
            Converter::Primitive(kind) => kind.name().to_string(),
            Converter::String => "string".to_string(),
            Converter::Guid => "guid".to_string(),
            Converter::Enum { name } => name.to_string(),
            Converter::Struct(layout) => layout.name.clone(),
            Converter::Array(element) => format!("array<{}>", element.type_name()),
            Converter::Object(Some(iid)) => format!("object {}", iid),
            Converter::Object(None) => "object".to_string(),
            Converter::Delegate(sig) => sig.name.clone(),
            Converter::Async(sig) => format!("async<{}>", sig.result.type_name()),
            Converter::Passthrough => "any".to_string(),
            Converter::Custom(custom) => custom.type_name().to_string(),
        }
    }

    /// Value an unset output slot starts with.
    pub fn default_native(&self) -> NativeValue {
        match self {
            Converter::Primitive(kind) => kind.default_value(),
            Converter::String => NativeValue::String(String::new()),
            Converter::Guid => NativeValue::Guid(Guid::EMPTY),
            Converter::Enum { .. } => NativeValue::Enum(0),
            Converter::Struct(layout) => NativeValue::Struct(
                layout.fields.iter().map(|(_, c)| c.default_native()).collect(),
            ),
            Converter::Array(_) => NativeValue::Array(Vec::new()),
            Converter::Object(_) => NativeValue::Object(None),
            Converter::Delegate(_) => NativeValue::Delegate(None),
            Converter::Custom(custom) => custom.default_native(),
            Converter::Void | Converter::Async(_) | Converter::Passthrough => NativeValue::Empty,
        }
    }

    /// Convert a native value into its script shape.
    pub fn to_script(
        &self,
        value: NativeValue,
        host: &dyn ConversionHost,
    ) -> Result<ScriptValue, ConversionError> {
        match self {
            Converter::Void => Ok(ScriptValue::Undefined),
            Converter::Primitive(kind) => primitive_to_script(*kind, &value),
            Converter::String => match value {
                NativeValue::String(s) => Ok(ScriptValue::String(s)),
                other => Err(ConversionError::mismatch("string", other.type_name())),
            },
            Converter::Guid => match value {
                NativeValue::Guid(g) => Ok(ScriptValue::String(g.to_string())),
                other => Err(ConversionError::mismatch("guid", other.type_name())),
            },
            Converter::Enum { name } => value
                .as_integer()
                .map(|i| ScriptValue::Number(i as f64))
                .ok_or_else(|| ConversionError::mismatch(name.to_string(), value.type_name())),
            Converter::Struct(layout) => match value {
                NativeValue::Struct(fields) if fields.len() == layout.fields.len() => {
                    let mut object = PlainObject::new();
                    for ((name, converter), field) in layout.fields.iter().zip(fields) {
                        object.insert(name.clone(), converter.to_script(field, host)?);
                    }
                    Ok(ScriptValue::Object(object))
                }
                NativeValue::Struct(fields) => Err(ConversionError::Custom(format!(
                    "struct '{}' has {} fields, got {}",
                    layout.name,
                    layout.fields.len(),
                    fields.len()
                ))),
                other => Err(ConversionError::mismatch(layout.name.clone(), other.type_name())),
            },
            Converter::Array(element) => match value {
                NativeValue::Array(items) => items
                    .into_iter()
                    .map(|item| element.to_script(item, host))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ScriptValue::Array),
                other => Err(ConversionError::mismatch("array", other.type_name())),
            },
            Converter::Object(_) => match value {
                NativeValue::Object(Some(object)) => host.project_object(object),
                NativeValue::Object(None) | NativeValue::Empty => Ok(ScriptValue::Null),
                other => Err(ConversionError::mismatch("object", other.type_name())),
            },
            Converter::Delegate(sig) => match value {
                NativeValue::Delegate(Some(delegate)) => host.project_delegate(delegate, sig),
                NativeValue::Delegate(None) | NativeValue::Empty => Ok(ScriptValue::Null),
                other => Err(ConversionError::mismatch(sig.name.clone(), other.type_name())),
            },
            Converter::Async(sig) => match value {
                NativeValue::Async(operation) => host.project_async(operation, sig),
                NativeValue::Empty => Ok(ScriptValue::Null),
                other => Err(ConversionError::mismatch("async", other.type_name())),
            },
            Converter::Passthrough => passthrough_to_script(value, host),
            Converter::Custom(custom) => custom.to_script(value, host),
        }
    }

    /// Convert a script value into its native shape.
    pub fn to_native(
        &self,
        value: &ScriptValue,
        host: &dyn ConversionHost,
    ) -> Result<NativeValue, ConversionError> {
        match self {
            Converter::Void => Ok(NativeValue::Empty),
            Converter::Primitive(kind) => primitive_to_native(*kind, value),
            Converter::String => String::from_script(value).map(NativeValue::String),
            Converter::Guid => Guid::from_script(value).map(NativeValue::Guid),
            Converter::Enum { name } => match value {
                ScriptValue::Number(_) => i64::from_script(value).map(NativeValue::Enum),
                other => Err(ConversionError::mismatch(name.to_string(), other.type_name())),
            },
            Converter::Struct(layout) => match value {
                ScriptValue::Object(object) => layout
                    .fields
                    .iter()
                    .map(|(name, converter)| {
                        let field = object.get(name).ok_or_else(|| ConversionError::MissingField {
                            type_name: layout.name.clone(),
                            field: name.clone(),
                        })?;
                        converter.to_native(field, host)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(NativeValue::Struct),
                other => Err(ConversionError::mismatch(layout.name.clone(), other.type_name())),
            },
            Converter::Array(element) => match value {
                ScriptValue::Array(items) => items
                    .iter()
                    .map(|item| element.to_native(item, host))
                    .collect::<Result<Vec<_>, _>>()
                    .map(NativeValue::Array),
                other => Err(ConversionError::mismatch("array", other.type_name())),
            },
            Converter::Object(iid) => match value {
                ScriptValue::Null | ScriptValue::Undefined => Ok(NativeValue::Object(None)),
                ScriptValue::Host(h) => {
                    let object = h
                        .native_object()
                        .ok_or_else(|| ConversionError::mismatch("object", h.class_name()))?;
                    match iid {
                        Some(iid) => query_interface(&object, *iid)
                            .map(|o| NativeValue::Object(Some(o)))
                            .ok_or(ConversionError::InterfaceNotImplemented { interface: *iid }),
                        None => Ok(NativeValue::Object(Some(object))),
                    }
                }
                other => Err(ConversionError::mismatch("object", other.type_name())),
            },
            Converter::Delegate(sig) => match value {
                ScriptValue::Null | ScriptValue::Undefined => Ok(NativeValue::Delegate(None)),
                ScriptValue::Function(f) => host
                    .wrap_script_function(f.clone(), sig)
                    .map(|d| NativeValue::Delegate(Some(d))),
                other => Err(ConversionError::mismatch(sig.name.clone(), other.type_name())),
            },
            Converter::Async(_) => Err(ConversionError::NotConvertible("async operation".into())),
            Converter::Passthrough => passthrough_to_native(value),
            Converter::Custom(custom) => custom.to_native(value, host),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter({})", self.type_name())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn primitive_to_script(
    kind: PrimitiveKind,
    value: &NativeValue,
) -> Result<ScriptValue, ConversionError> {
    match (kind, value) {
        (PrimitiveKind::Bool, NativeValue::Bool(b)) => Ok(ScriptValue::Bool(*b)),
        (PrimitiveKind::Char16, NativeValue::Char16(unit)) => Ok(ScriptValue::String(
            char::decode_utf16([*unit])
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        )),
        (PrimitiveKind::Bool | PrimitiveKind::Char16, other) => {
            Err(ConversionError::mismatch(kind.name(), other.type_name()))
        }
        (_, other) => other
            .as_f64()
            .map(ScriptValue::Number)
            .ok_or_else(|| ConversionError::mismatch(kind.name(), other.type_name())),
    }
}

fn primitive_to_native(
    kind: PrimitiveKind,
    value: &ScriptValue,
) -> Result<NativeValue, ConversionError> {
    Ok(match kind {
        PrimitiveKind::Bool => NativeValue::Bool(bool::from_script(value)?),
        PrimitiveKind::Char16 => {
            let s = value
                .as_str()
                .ok_or_else(|| ConversionError::mismatch("char16", value.type_name()))?;
            let mut units = s.encode_utf16();
            match (units.next(), units.next()) {
                (Some(unit), None) => NativeValue::Char16(unit),
                _ => {
                    return Err(ConversionError::OutOfRange {
                        value: format!("{:?}", s),
                        target: "char16",
                    });
                }
            }
        }
        PrimitiveKind::I8 => NativeValue::I8(i8::from_script(value)?),
        PrimitiveKind::I16 => NativeValue::I16(i16::from_script(value)?),
        PrimitiveKind::I32 => NativeValue::I32(i32::from_script(value)?),
        PrimitiveKind::I64 => NativeValue::I64(i64::from_script(value)?),
        PrimitiveKind::U8 => NativeValue::U8(u8::from_script(value)?),
        PrimitiveKind::U16 => NativeValue::U16(u16::from_script(value)?),
        PrimitiveKind::U32 => NativeValue::U32(u32::from_script(value)?),
        PrimitiveKind::U64 => NativeValue::U64(u64::from_script(value)?),
        PrimitiveKind::F32 => NativeValue::F32(f32::from_script(value)?),
        PrimitiveKind::F64 => NativeValue::F64(f64::from_script(value)?),
    })
}

fn passthrough_to_script(
    value: NativeValue,
    host: &dyn ConversionHost,
) -> Result<ScriptValue, ConversionError> {
    match value {
        NativeValue::Empty => Ok(ScriptValue::Undefined),
        NativeValue::Bool(b) => Ok(ScriptValue::Bool(b)),
        NativeValue::Char16(_) => primitive_to_script(PrimitiveKind::Char16, &value),
        NativeValue::String(s) => Ok(ScriptValue::String(s)),
        NativeValue::Guid(g) => Ok(ScriptValue::String(g.to_string())),
        NativeValue::Struct(items) | NativeValue::Array(items) => items
            .into_iter()
            .map(|item| passthrough_to_script(item, host))
            .collect::<Result<Vec<_>, _>>()
            .map(ScriptValue::Array),
        NativeValue::Object(Some(object)) => host.project_object(object),
        NativeValue::Object(None) | NativeValue::Delegate(None) => Ok(ScriptValue::Null),
        NativeValue::Delegate(Some(_)) => {
            Err(ConversionError::NotConvertible("untyped delegate".into()))
        }
        NativeValue::Async(_) => Err(ConversionError::NotConvertible(
            "untyped async operation".into(),
        )),
        other => other
            .as_f64()
            .map(ScriptValue::Number)
            .ok_or_else(|| ConversionError::mismatch("any", other.type_name())),
    }
}

fn passthrough_to_native(value: &ScriptValue) -> Result<NativeValue, ConversionError> {
    match value {
        ScriptValue::Undefined => Ok(NativeValue::Empty),
        ScriptValue::Null => Ok(NativeValue::Object(None)),
        ScriptValue::Bool(b) => Ok(NativeValue::Bool(*b)),
        ScriptValue::Number(n) => Ok(NativeValue::F64(*n)),
        ScriptValue::String(s) => Ok(NativeValue::String(s.clone())),
        ScriptValue::Array(items) => items
            .iter()
            .map(passthrough_to_native)
            .collect::<Result<Vec<_>, _>>()
            .map(NativeValue::Array),
        ScriptValue::Host(h) => h
            .native_object()
            .map(|o| NativeValue::Object(Some(o)))
            .ok_or_else(|| ConversionError::NotConvertible(h.class_name().to_string())),
        other => Err(ConversionError::NotConvertible(other.type_name().to_string())),
    }
}
