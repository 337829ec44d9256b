//! Native events.
//!
//! The descriptor only knows how to add and remove one native delegate.
//! Fanning a single native subscription out to many script listeners is the
//! event registrar's job.

use std::sync::Arc;

use projection_core::{
    CallFrame, DelegateSignature, EventToken, FromNative, NativeDelegate, NativeRef, NativeThunk,
    NativeValue, ProjectionResult,
};

/// A named native event.
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    name: String,
    handler: Arc<DelegateSignature>,
    add: NativeThunk,
    remove: NativeThunk,
}

impl EventDescriptor {
    /// Create an event.
    ///
    /// `add` receives the delegate in slot 0 and returns the registration
    /// token as an `i64`; `remove` receives that token in slot 0.
    pub fn new(
        name: impl Into<String>,
        handler: DelegateSignature,
        add: NativeThunk,
        remove: NativeThunk,
    ) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            add,
            remove,
        }
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signature of the handler delegate.
    pub fn handler_signature(&self) -> &Arc<DelegateSignature> {
        &self.handler
    }

    /// Subscribe a native delegate.
    pub fn add(
        &self,
        target: &NativeRef,
        delegate: NativeDelegate,
    ) -> ProjectionResult<EventToken> {
        let mut slots = [NativeValue::Delegate(Some(delegate))];
        let mut ret = NativeValue::Empty;
        self.add.call(&mut CallFrame::new(target, &mut slots, &mut ret))?;
        Ok(EventToken(i64::from_native(&ret)?))
    }

    /// Unsubscribe a previously added delegate.
    pub fn remove(&self, target: &NativeRef, token: EventToken) -> ProjectionResult<()> {
        let mut slots = [NativeValue::I64(token.0)];
        let mut ret = NativeValue::Empty;
        self.remove.call(&mut CallFrame::new(target, &mut slots, &mut ret))?;
        Ok(())
    }
}
