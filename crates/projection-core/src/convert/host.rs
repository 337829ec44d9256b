//! Services a converter needs from the surrounding projection context.

use std::sync::Arc;

use crate::error::ConversionError;
use crate::host::ScriptFunction;
use crate::native::{AsyncRef, NativeDelegate, NativeRef};
use crate::value::ScriptValue;

use super::converter::{AsyncSignature, DelegateSignature};

/// Identity-preserving projection services used by [`Converter`](super::Converter).
///
/// Implemented by the projection context. Converters stay free of any cache
/// or engine state; everything stateful goes through this trait.
pub trait ConversionHost {
    /// Project a native object, returning the cached proxy for its identity.
    fn project_object(&self, object: NativeRef) -> Result<ScriptValue, ConversionError>;

    /// Project a native asynchronous operation as a promise-like value.
    fn project_async(
        &self,
        operation: AsyncRef,
        signature: &Arc<AsyncSignature>,
    ) -> Result<ScriptValue, ConversionError>;

    /// Wrap a native delegate as a script callable.
    fn project_delegate(
        &self,
        delegate: NativeDelegate,
        signature: &Arc<DelegateSignature>,
    ) -> Result<ScriptValue, ConversionError>;

    /// Wrap a script callable as a native delegate.
    fn wrap_script_function(
        &self,
        function: ScriptFunction,
        signature: &Arc<DelegateSignature>,
    ) -> Result<NativeDelegate, ConversionError>;
}
