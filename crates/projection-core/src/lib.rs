//! Core types for projecting native component objects into a scripting engine.
//!
//! This crate holds everything both sides of the bridge agree on:
//!
//! - [`Guid`]: interface and class identity
//! - [`ScriptValue`], [`HostObject`], [`ScriptFunction`]: the scripting engine's value space
//! - [`NativeObject`], [`NativeValue`], [`AsyncOperation`]: the native object model
//! - [`NativeThunk`], [`CallFrame`]: generated call thunks and their frames
//! - [`Converter`] and the conversion traits in [`convert`]
//! - The error hierarchy in [`error`]

pub mod convert;
pub mod error;
pub mod guid;
pub mod host;
pub mod native;
pub mod native_value;
pub mod runtime;
pub mod value;

pub use convert::{
    AsyncSignature, ConversionHost, Converter, DelegateSignature, FromNative, FromScript,
    IntoNative, IntoScript, StructLayout, ValueConverter,
};
pub use error::{
    ConversionError, NativeError, ProjectionError, ProjectionResult, ScriptError, ScriptResult,
    codes,
};
pub use guid::{Guid, GuidParseError, InterfaceId, guid_constants};
pub use host::{AccessorGet, AccessorSet, FunctionMember, HostObject, HostObjectRef, ScriptFunction};
pub use native::{
    AsyncOperation, AsyncRef, AsyncStatus, CompletionHandler, EventToken, NativeDelegate,
    NativeObject, NativeRef, ObjectId, ProgressHandler, query_interface,
};
pub use native_value::{NativeValue, PrimitiveKind};
pub use runtime::{CallFrame, NativeCallable, NativeThunk};
pub use value::{PlainObject, ScriptValue};
