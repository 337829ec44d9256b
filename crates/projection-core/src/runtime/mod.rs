//! Native call infrastructure.
//!
//! ## Key Types
//!
//! - [`NativeThunk`]: Type-erased callable wrapper for generated native calls
//! - [`CallFrame`]: Bridge between the dispatcher and a thunk for one call

mod call_frame;
mod thunk;

pub use call_frame::CallFrame;
pub use thunk::{NativeCallable, NativeThunk};

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use super::*;
    use crate::error::{NativeError, codes};
    use crate::guid::InterfaceId;
    use crate::native::{NativeObject, NativeRef};
    use crate::native_value::NativeValue;

    struct Counter {
        step: i32,
    }

    impl NativeObject for Counter {
        fn interfaces(&self) -> Vec<InterfaceId> {
            Vec::new()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Other;

    impl NativeObject for Other {
        fn interfaces(&self) -> Vec<InterfaceId> {
            Vec::new()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn scale() -> NativeThunk {
        NativeThunk::new(|frame| {
            let step = frame.this::<Counter>()?.step;
            let base: i32 = frame.arg(0)?;
            frame.set_out(1, base * step);
            frame.set_return(base + step);
            Ok(())
        })
    }

    #[test]
    fn thunk_reads_args_and_writes_outputs() {
        let target: NativeRef = Arc::new(Counter { step: 3 });
        let mut slots = vec![NativeValue::I32(4), NativeValue::I32(0)];
        let mut ret = NativeValue::Empty;
        let mut frame = CallFrame::new(&target, &mut slots, &mut ret);
        scale().call(&mut frame).unwrap();
        assert_eq!(slots[1], NativeValue::I32(12));
        assert_eq!(ret, NativeValue::I32(7));
    }

    #[test]
    fn wrong_target_type() {
        let target: NativeRef = Arc::new(Other);
        let mut slots = vec![NativeValue::I32(4), NativeValue::I32(0)];
        let mut ret = NativeValue::Empty;
        let mut frame = CallFrame::new(&target, &mut slots, &mut ret);
        let err = scale().call(&mut frame).unwrap_err();
        assert_eq!(err.code, codes::E_NOINTERFACE);
    }

    #[test]
    fn missing_argument_slot() {
        let target: NativeRef = Arc::new(Counter { step: 1 });
        let mut slots = Vec::new();
        let mut ret = NativeValue::Empty;
        let frame = CallFrame::new(&target, &mut slots, &mut ret);
        let err: NativeError = frame.arg::<i32>(0).unwrap_err();
        assert_eq!(err.code, codes::E_BOUNDS);
    }

    #[test]
    fn argument_conversion_failure_is_invalid_arg() {
        let target: NativeRef = Arc::new(Counter { step: 1 });
        let mut slots = vec![NativeValue::String("x".into())];
        let mut ret = NativeValue::Empty;
        let frame = CallFrame::new(&target, &mut slots, &mut ret);
        assert_eq!(frame.arg::<i32>(0).unwrap_err().code, codes::E_INVALIDARG);
    }

    #[test]
    fn cloned_thunks_share_callable() {
        let thunk = scale();
        let copy = thunk.clone();
        let target: NativeRef = Arc::new(Counter { step: 2 });
        let mut slots = vec![NativeValue::I32(1), NativeValue::I32(0)];
        let mut ret = NativeValue::Empty;
        copy.call(&mut CallFrame::new(&target, &mut slots, &mut ret)).unwrap();
        assert_eq!(ret, NativeValue::I32(3));
    }
}
