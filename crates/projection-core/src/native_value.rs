//! Native-side values held in call frame slots.

use std::fmt;
use std::sync::Arc;

use crate::guid::Guid;
use crate::native::{AsyncRef, NativeDelegate, NativeRef};

/// Primitive native types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Char16,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// Type name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char16 => "char16",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
        }
    }

    /// Zero value of this kind.
    pub fn default_value(self) -> NativeValue {
        match self {
            PrimitiveKind::Bool => NativeValue::Bool(false),
            PrimitiveKind::Char16 => NativeValue::Char16(0),
            PrimitiveKind::I8 => NativeValue::I8(0),
            PrimitiveKind::I16 => NativeValue::I16(0),
            PrimitiveKind::I32 => NativeValue::I32(0),
            PrimitiveKind::I64 => NativeValue::I64(0),
            PrimitiveKind::U8 => NativeValue::U8(0),
            PrimitiveKind::U16 => NativeValue::U16(0),
            PrimitiveKind::U32 => NativeValue::U32(0),
            PrimitiveKind::U64 => NativeValue::U64(0),
            PrimitiveKind::F32 => NativeValue::F32(0.0),
            PrimitiveKind::F64 => NativeValue::F64(0.0),
        }
    }
}

/// A native value.
#[derive(Clone, Default)]
pub enum NativeValue {
    /// No value (void results, unset out slots).
    #[default]
    Empty,
    Bool(bool),
    /// One UTF-16 code unit.
    Char16(u16),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Guid(Guid),
    /// Enumeration value by its underlying integer.
    Enum(i64),
    /// Struct fields in declaration order.
    Struct(Vec<NativeValue>),
    Array(Vec<NativeValue>),
    /// Interface pointer; `None` is a null reference.
    Object(Option<NativeRef>),
    /// Delegate; `None` is a null delegate.
    Delegate(Option<NativeDelegate>),
    /// Asynchronous operation handle.
    Async(AsyncRef),
}

impl NativeValue {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Empty => "empty",
            NativeValue::Bool(_) => "bool",
            NativeValue::Char16(_) => "char16",
            NativeValue::I8(_) => "i8",
            NativeValue::I16(_) => "i16",
            NativeValue::I32(_) => "i32",
            NativeValue::I64(_) => "i64",
            NativeValue::U8(_) => "u8",
            NativeValue::U16(_) => "u16",
            NativeValue::U32(_) => "u32",
            NativeValue::U64(_) => "u64",
            NativeValue::F32(_) => "f32",
            NativeValue::F64(_) => "f64",
            NativeValue::String(_) => "string",
            NativeValue::Guid(_) => "guid",
            NativeValue::Enum(_) => "enum",
            NativeValue::Struct(_) => "struct",
            NativeValue::Array(_) => "array",
            NativeValue::Object(_) => "object",
            NativeValue::Delegate(_) => "delegate",
            NativeValue::Async(_) => "async",
        }
    }

    /// Integer payload of any integral variant (including enums and chars).
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            NativeValue::Char16(v) => Some(v as i128),
            NativeValue::I8(v) => Some(v as i128),
            NativeValue::I16(v) => Some(v as i128),
            NativeValue::I32(v) => Some(v as i128),
            NativeValue::I64(v) => Some(v as i128),
            NativeValue::U8(v) => Some(v as i128),
            NativeValue::U16(v) => Some(v as i128),
            NativeValue::U32(v) => Some(v as i128),
            NativeValue::U64(v) => Some(v as i128),
            NativeValue::Enum(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Numeric payload of any numeric variant as a double.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            NativeValue::F32(v) => Some(v as f64),
            NativeValue::F64(v) => Some(v),
            _ => self.as_integer().map(|i| i as f64),
        }
    }

    /// Get the object reference if this is a non-null object.
    pub fn as_object(&self) -> Option<&NativeRef> {
        match self {
            NativeValue::Object(Some(obj)) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Empty => write!(f, "Empty"),
            NativeValue::Bool(v) => write!(f, "Bool({})", v),
            NativeValue::Char16(v) => write!(f, "Char16({:#06x})", v),
            NativeValue::I8(v) => write!(f, "I8({})", v),
            NativeValue::I16(v) => write!(f, "I16({})", v),
            NativeValue::I32(v) => write!(f, "I32({})", v),
            NativeValue::I64(v) => write!(f, "I64({})", v),
            NativeValue::U8(v) => write!(f, "U8({})", v),
            NativeValue::U16(v) => write!(f, "U16({})", v),
            NativeValue::U32(v) => write!(f, "U32({})", v),
            NativeValue::U64(v) => write!(f, "U64({})", v),
            NativeValue::F32(v) => write!(f, "F32({})", v),
            NativeValue::F64(v) => write!(f, "F64({})", v),
            NativeValue::String(s) => write!(f, "String({:?})", s),
            NativeValue::Guid(g) => write!(f, "Guid({})", g),
            NativeValue::Enum(v) => write!(f, "Enum({})", v),
            NativeValue::Struct(fields) => f.debug_tuple("Struct").field(fields).finish(),
            NativeValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            NativeValue::Object(None) => write!(f, "Object(null)"),
            NativeValue::Object(Some(obj)) => write!(f, "Object({:?})", obj.identity()),
            NativeValue::Delegate(d) => f.debug_tuple("Delegate").field(d).finish(),
            NativeValue::Async(op) => write!(f, "Async({:?})", op.status()),
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        use NativeValue::*;
        match (self, other) {
            (Empty, Empty) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char16(a), Char16(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (F32(a), F32(b)) => a == b,
            (F64(a), F64(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Guid(a), Guid(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Struct(a), Struct(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Object(a), Object(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.identity() == b.identity(),
                _ => false,
            },
            (Delegate(a), Delegate(b)) => a == b,
            (Async(a), Async(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl From<NativeRef> for NativeValue {
    fn from(obj: NativeRef) -> Self {
        NativeValue::Object(Some(obj))
    }
}

impl From<NativeDelegate> for NativeValue {
    fn from(d: NativeDelegate) -> Self {
        NativeValue::Delegate(Some(d))
    }
}

impl From<AsyncRef> for NativeValue {
    fn from(op: AsyncRef) -> Self {
        NativeValue::Async(op)
    }
}
