//! Value conversion layer.
//!
//! Two pairs of conversion traits cover Rust primitives:
//! - [`FromScript`] / [`IntoScript`]: between Rust values and [`ScriptValue`]s
//! - [`FromNative`] / [`IntoNative`]: between Rust values and [`NativeValue`]
//!   slots, used by generated thunks through [`CallFrame`](crate::CallFrame)
//!
//! Descriptor tables describe their parameter and result shapes with a
//! [`Converter`], which converts whole values (including objects, delegates
//! and asynchronous operations) through a [`ConversionHost`].
//!
//! ## Supported Primitive Types
//!
//! - Integers: `i8`, `i16`, `i32`, `i64`, `u8`, `u16`, `u32`, `u64`
//! - Floats: `f32`, `f64`
//! - Boolean: `bool`
//! - Strings and [`Guid`]
//!
//! Script numbers are doubles. Integer targets truncate toward zero and reject
//! non-finite or out-of-range values.

mod converter;
mod host;

pub use converter::{AsyncSignature, Converter, DelegateSignature, StructLayout, ValueConverter};
pub use host::ConversionHost;

use crate::error::ConversionError;
use crate::guid::Guid;
use crate::native_value::NativeValue;
use crate::value::ScriptValue;

/// Extract a Rust value from a script value.
pub trait FromScript: Sized {
    /// Convert the value, failing on incompatible types.
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError>;
}

/// Convert a Rust value into a script value.
pub trait IntoScript {
    /// Convert this value.
    fn into_script(self) -> ScriptValue;
}

/// Extract a Rust value from a native slot.
pub trait FromNative: Sized {
    /// Convert the slot value, failing on incompatible types.
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError>;
}

/// Convert a Rust value into a native slot value.
pub trait IntoNative {
    /// Convert this value.
    fn into_native(self) -> NativeValue;
}

// ============================================================================
// Integer implementations
// ============================================================================

fn script_integer(value: &ScriptValue, target: &'static str) -> Result<f64, ConversionError> {
    match value {
        ScriptValue::Number(n) if n.is_finite() => Ok(n.trunc()),
        ScriptValue::Number(n) => Err(ConversionError::OutOfRange {
            value: n.to_string(),
            target,
        }),
        other => Err(ConversionError::mismatch(target, other.type_name())),
    }
}

macro_rules! impl_int {
    ($($ty:ty => $variant:ident),*) => {
        $(
            impl FromScript for $ty {
                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    let n = script_integer(value, stringify!($ty))?;
                    // Bounds as f64 are exact for every type up to 32 bits;
                    // 64-bit bounds round up, so compare with `<` on the max
                    if n >= <$ty>::MIN as f64 && n < (<$ty>::MAX as f64) + 1.0 {
                        Ok(n as $ty)
                    } else {
                        Err(ConversionError::OutOfRange {
                            value: n.to_string(),
                            target: stringify!($ty),
                        })
                    }
                }
            }

            impl IntoScript for $ty {
                fn into_script(self) -> ScriptValue {
                    ScriptValue::Number(self as f64)
                }
            }

            impl FromNative for $ty {
                fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
                    match value {
                        NativeValue::$variant(v) => Ok(*v),
                        other => match other.as_integer() {
                            Some(i) => {
                                <$ty>::try_from(i).map_err(|_| ConversionError::OutOfRange {
                                    value: i.to_string(),
                                    target: stringify!($ty),
                                })
                            }
                            None => Err(ConversionError::mismatch(
                                stringify!($ty),
                                other.type_name(),
                            )),
                        },
                    }
                }
            }

            impl IntoNative for $ty {
                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }
            }
        )*
    };
}

impl_int!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64
);

// ============================================================================
// Float implementations
// ============================================================================

macro_rules! impl_float {
    ($($ty:ty => $variant:ident),*) => {
        $(
            impl FromScript for $ty {
                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    match value {
                        ScriptValue::Number(n) => Ok(*n as $ty),
                        other => Err(ConversionError::mismatch(stringify!($ty), other.type_name())),
                    }
                }
            }

            impl IntoScript for $ty {
                fn into_script(self) -> ScriptValue {
                    ScriptValue::Number(self as f64)
                }
            }

            impl FromNative for $ty {
                fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
                    value.as_f64().map(|v| v as $ty).ok_or_else(|| {
                        ConversionError::mismatch(stringify!($ty), value.type_name())
                    })
                }
            }

            impl IntoNative for $ty {
                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }
            }
        )*
    };
}

impl_float!(f32 => F32, f64 => F64);

// ============================================================================
// Other primitives
// ============================================================================

impl FromScript for bool {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        value
            .as_bool()
            .ok_or_else(|| ConversionError::mismatch("bool", value.type_name()))
    }
}

impl IntoScript for bool {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Bool(self)
    }
}

impl FromNative for bool {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Bool(b) => Ok(*b),
            other => Err(ConversionError::mismatch("bool", other.type_name())),
        }
    }
}

impl IntoNative for bool {
    fn into_native(self) -> NativeValue {
        NativeValue::Bool(self)
    }
}

impl FromScript for String {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ConversionError::mismatch("string", value.type_name()))
    }
}

impl IntoScript for String {
    fn into_script(self) -> ScriptValue {
        ScriptValue::String(self)
    }
}

impl IntoScript for &str {
    fn into_script(self) -> ScriptValue {
        ScriptValue::String(self.to_string())
    }
}

impl FromNative for String {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::String(s) => Ok(s.clone()),
            other => Err(ConversionError::mismatch("string", other.type_name())),
        }
    }
}

impl IntoNative for String {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self)
    }
}

impl IntoNative for &str {
    fn into_native(self) -> NativeValue {
        NativeValue::String(self.to_string())
    }
}

impl FromScript for Guid {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::String(s) => s
                .parse()
                .map_err(|e: crate::guid::GuidParseError| ConversionError::Custom(e.to_string())),
            other => Err(ConversionError::mismatch("guid", other.type_name())),
        }
    }
}

impl IntoScript for Guid {
    fn into_script(self) -> ScriptValue {
        ScriptValue::String(self.to_string())
    }
}

impl FromNative for Guid {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Guid(g) => Ok(*g),
            other => Err(ConversionError::mismatch("guid", other.type_name())),
        }
    }
}

impl IntoNative for Guid {
    fn into_native(self) -> NativeValue {
        NativeValue::Guid(self)
    }
}

impl IntoScript for () {
    fn into_script(self) -> ScriptValue {
        ScriptValue::Undefined
    }
}

impl IntoNative for () {
    fn into_native(self) -> NativeValue {
        NativeValue::Empty
    }
}

impl FromScript for ScriptValue {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoScript for ScriptValue {
    fn into_script(self) -> ScriptValue {
        self
    }
}

impl FromNative for NativeValue {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoNative for NativeValue {
    fn into_native(self) -> NativeValue {
        self
    }
}

impl<T: FromScript> FromScript for Option<T> {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        if value.is_nullish() {
            Ok(None)
        } else {
            T::from_script(value).map(Some)
        }
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    fn into_script(self) -> ScriptValue {
        match self {
            Some(v) => v.into_script(),
            None => ScriptValue::Null,
        }
    }
}

impl<T: IntoNative> IntoNative for Vec<T> {
    fn into_native(self) -> NativeValue {
        NativeValue::Array(self.into_iter().map(IntoNative::into_native).collect())
    }
}

impl<T: FromNative> FromNative for Vec<T> {
    fn from_native(value: &NativeValue) -> Result<Self, ConversionError> {
        match value {
            NativeValue::Array(items) => items.iter().map(T::from_native).collect(),
            other => Err(ConversionError::mismatch("array", other.type_name())),
        }
    }
}
