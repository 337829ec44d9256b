//! Call frame bridging the dispatcher and native thunks.

use std::any::Any;
use std::fmt;

use crate::convert::{FromNative, IntoNative};
use crate::error::NativeError;
use crate::native::NativeRef;
use crate::native_value::NativeValue;

/// Frame for one native call.
///
/// The dispatcher converts script arguments straight into `slots` (one slot
/// per declared parameter, inputs and outputs in declaration order) and the
/// frame lives until the thunk returns.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let width: u32 = frame.arg(0)?;
/// frame.set_out(1, width * 2);
/// frame.set_return(true);
/// ```
pub struct CallFrame<'a> {
    /// Interface-typed handle the call targets
    target: &'a NativeRef,
    /// Parameter slots
    slots: &'a mut [NativeValue],
    /// Return value slot
    return_slot: &'a mut NativeValue,
}

impl<'a> CallFrame<'a> {
    /// Create a new call frame.
    pub fn new(
        target: &'a NativeRef,
        slots: &'a mut [NativeValue],
        return_slot: &'a mut NativeValue,
    ) -> Self {
        Self {
            target,
            slots,
            return_slot,
        }
    }

    /// The target object.
    pub fn target(&self) -> &NativeRef {
        self.target
    }

    /// Downcast the target to its concrete type.
    pub fn this<T: Any>(&self) -> Result<&T, NativeError> {
        self.target.as_any().downcast_ref::<T>().ok_or_else(|| {
            NativeError::new(
                crate::error::codes::E_NOINTERFACE,
                format!("call target is not a {}", std::any::type_name::<T>()),
            )
        })
    }

    /// Number of parameter slots.
    pub fn arg_count(&self) -> usize {
        self.slots.len()
    }

    /// Get a raw reference to a parameter slot.
    pub fn arg_slot(&self, index: usize) -> Result<&NativeValue, NativeError> {
        self.slots.get(index).ok_or_else(|| {
            NativeError::new(
                crate::error::codes::E_BOUNDS,
                format!("argument index {} out of bounds ({} slots)", index, self.slots.len()),
            )
        })
    }

    /// Get a typed argument value.
    pub fn arg<T: FromNative>(&self, index: usize) -> Result<T, NativeError> {
        let slot = self.arg_slot(index)?;
        T::from_native(slot).map_err(NativeError::from)
    }

    /// Write an output parameter slot.
    ///
    /// Writes past the last slot are ignored.
    pub fn set_out<T: IntoNative>(&mut self, index: usize, value: T) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = value.into_native();
        }
    }

    /// Set the return value from a raw slot.
    pub fn set_return_slot(&mut self, value: NativeValue) {
        *self.return_slot = value;
    }

    /// Set a typed return value.
    pub fn set_return<T: IntoNative>(&mut self, value: T) {
        *self.return_slot = value.into_native();
    }
}

impl fmt::Debug for CallFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("target", &self.target.identity())
            .field("slots", &self.slots)
            .field("return_slot", &self.return_slot)
            .finish()
    }
}
