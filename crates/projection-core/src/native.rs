//! Native component object model.
//!
//! A native object implements one or more interfaces, each identified by an
//! [`InterfaceId`]. Objects are reference counted through `Arc`; the bridge
//! never assumes anything about the concrete type behind a [`NativeRef`].
//!
//! ## Key Types
//!
//! - [`NativeObject`]: interface enumeration, interface lookup and identity
//! - [`NativeDelegate`]: a native callback (event handler, completion handler)
//! - [`AsyncOperation`]: a native future with completion and progress
//! - [`EventToken`]: registration cookie returned by an event's add thunk

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::NativeError;
use crate::guid::InterfaceId;
use crate::native_value::NativeValue;

// ============================================================================
// Objects
// ============================================================================

/// Identity of one native object.
///
/// Two handles to the same object (including tear-offs for different
/// interfaces) report the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// A native object as seen by the bridge.
pub trait NativeObject: Send + Sync + Any {
    /// Implemented interfaces, in the object's own enumeration order.
    fn interfaces(&self) -> Vec<InterfaceId>;

    /// Hand out a distinct handle for one interface.
    ///
    /// `None` means the object itself serves the interface. Only consulted for
    /// interfaces listed by [`interfaces`](Self::interfaces).
    fn tear_off(&self, _iid: InterfaceId) -> Option<NativeRef> {
        None
    }

    /// Stable identity of the underlying object.
    fn identity(&self) -> ObjectId {
        ObjectId(self as *const Self as *const () as usize)
    }

    /// Name of the runtime class this object is an instance of.
    fn runtime_class_name(&self) -> Option<&str> {
        None
    }

    /// Downcast support for generated thunks.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a native object.
pub type NativeRef = Arc<dyn NativeObject>;

/// Obtain the interface-typed handle for `iid`.
///
/// Returns `None` when the object does not implement the interface.
pub fn query_interface(object: &NativeRef, iid: InterfaceId) -> Option<NativeRef> {
    if !object.interfaces().contains(&iid) {
        return None;
    }
    Some(object.tear_off(iid).unwrap_or_else(|| Arc::clone(object)))
}

// ============================================================================
// Delegates
// ============================================================================

/// Body of a native delegate.
pub type DelegateBody = dyn Fn(&[NativeValue]) -> Result<NativeValue, NativeError> + Send + Sync;

/// A native callback.
///
/// Equality is identity, which is what event removal relies on.
#[derive(Clone)]
pub struct NativeDelegate(Arc<DelegateBody>);

impl NativeDelegate {
    /// Create a delegate from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[NativeValue]) -> Result<NativeValue, NativeError> + Send + Sync + 'static,
    {
        NativeDelegate(Arc::new(f))
    }

    /// Invoke the delegate.
    pub fn invoke(&self, args: &[NativeValue]) -> Result<NativeValue, NativeError> {
        (self.0)(args)
    }

    /// Check if both handles refer to the same delegate.
    pub fn ptr_eq(&self, other: &NativeDelegate) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for NativeDelegate {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for NativeDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeDelegate({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Registration cookie returned when a handler is added to a native event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventToken(pub i64);

// ============================================================================
// Asynchronous Operations
// ============================================================================

/// Status of a native asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStatus {
    /// Still running.
    Started,
    /// Finished successfully.
    Completed,
    /// Canceled before completion.
    Canceled,
    /// Finished with an error.
    Error,
}

impl AsyncStatus {
    /// Check if the operation reached a terminal status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AsyncStatus::Started)
    }
}

/// One-shot completion callback.
pub type CompletionHandler = Box<dyn FnOnce(AsyncStatus) + Send>;

/// Progress callback.
pub type ProgressHandler = Arc<dyn Fn(NativeValue) + Send + Sync>;

/// A native future.
///
/// Callbacks may be invoked on any thread. An operation that is already
/// complete when [`on_completed`](Self::on_completed) is called invokes the
/// handler immediately.
///
/// The completion handler owns the script-side promise until it runs. An
/// operation must drop it after invoking it (and may drop it when it is
/// itself dropped), otherwise the promise and the operation keep each
/// other alive.
pub trait AsyncOperation: Send + Sync {
    /// Current status.
    fn status(&self) -> AsyncStatus;

    /// Subscribe to completion. Called at most once per operation.
    fn on_completed(&self, handler: CompletionHandler);

    /// Subscribe to progress. Returns `false` when progress is not reported.
    fn on_progress(&self, _handler: ProgressHandler) -> bool {
        false
    }

    /// Result of a completed operation, or its failure.
    fn results(&self) -> Result<NativeValue, NativeError>;

    /// Request cancellation.
    fn cancel(&self);
}

/// Shared handle to a native asynchronous operation.
pub type AsyncRef = Arc<dyn AsyncOperation>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Guid;

    const IA: Guid = Guid(0xA);
    const IB: Guid = Guid(0xB);

    struct Plain;

    impl NativeObject for Plain {
        fn interfaces(&self) -> Vec<InterfaceId> {
            vec![IA]
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn query_interface_returns_self_by_default() {
        let obj: NativeRef = Arc::new(Plain);
        let ia = query_interface(&obj, IA).unwrap();
        assert!(Arc::ptr_eq(&obj, &ia));
        assert!(query_interface(&obj, IB).is_none());
    }

    #[test]
    fn identity_is_stable() {
        let obj: NativeRef = Arc::new(Plain);
        let again = Arc::clone(&obj);
        assert_eq!(obj.identity(), again.identity());
    }

    #[test]
    fn delegates_compare_by_identity() {
        let d = NativeDelegate::new(|_| Ok(NativeValue::Empty));
        let e = NativeDelegate::new(|_| Ok(NativeValue::Empty));
        assert_eq!(d, d.clone());
        assert_ne!(d, e);
        assert_eq!(d.invoke(&[]).unwrap(), NativeValue::Empty);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AsyncStatus::Started.is_terminal());
        assert!(AsyncStatus::Completed.is_terminal());
        assert!(AsyncStatus::Canceled.is_terminal());
        assert!(AsyncStatus::Error.is_terminal());
    }
}
