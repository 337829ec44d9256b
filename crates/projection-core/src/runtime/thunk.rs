//! Native thunk storage and callable trait.

use std::fmt;
use std::sync::Arc;

use crate::error::NativeError;

use super::CallFrame;

/// Type-erased native call thunk.
///
/// Generated tables hold one thunk per overload, property accessor and event
/// accessor. The callable is shared through an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct NativeThunk {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeThunk {
    /// Create a thunk from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallFrame<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Create a thunk from any callable.
    pub fn from_callable<C>(callable: C) -> Self
    where
        C: NativeCallable + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callable),
        }
    }

    /// Call the thunk with the given frame.
    #[inline]
    pub fn call(&self, frame: &mut CallFrame<'_>) -> Result<(), NativeError> {
        self.inner.call(frame)
    }
}

impl fmt::Debug for NativeThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeThunk").finish_non_exhaustive()
    }
}

/// Trait for callable native thunks.
pub trait NativeCallable {
    /// Call this thunk with the given frame.
    fn call(&self, frame: &mut CallFrame<'_>) -> Result<(), NativeError>;
}

// Implement NativeCallable for closures that take a CallFrame
impl<F> NativeCallable for F
where
    F: Fn(&mut CallFrame<'_>) -> Result<(), NativeError>,
{
    fn call(&self, frame: &mut CallFrame<'_>) -> Result<(), NativeError> {
        (self)(frame)
    }
}
