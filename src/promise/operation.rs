//! AsyncOperationProxy - the promise state machine.
//!
//! ```text
//! Pending ──complete──► Completed(Ok | Err)     (terminal, exactly once)
//! ```
//!
//! Continuations attached while pending are queued; completion moves the
//! queue out and dispatches each entry once. Continuations attached after
//! completion are scheduled through the invoker and never run synchronously.
//! Everything here is bound to the thread that created the proxy; native
//! callbacks reach it through the invoker.

use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use projection_core::{
    AsyncRef, AsyncSignature, AsyncStatus, NativeError, ProjectionError, ScriptError, ScriptValue,
};

use super::PromiseObject;
use super::continuation::{Continuation, ContinuationKind, Outcome};
use crate::Context;

#[derive(Default)]
struct PromiseState {
    outcome: Option<Outcome>,
    continuations: Vec<Continuation>,
}

/// Script-side state of one asynchronous operation.
///
/// Backed either by a native operation or, for the futures returned by
/// `then` and friends, by nothing but this state machine.
pub struct AsyncOperationProxy {
    context: Arc<Context>,
    owner: ThreadId,
    operation: Option<AsyncRef>,
    state: Mutex<PromiseState>,
}

impl AsyncOperationProxy {
    /// Create a bridge-owned pending promise on the current thread.
    pub fn pending(context: Arc<Context>) -> Arc<Self> {
        Arc::new(Self {
            context,
            owner: thread::current().id(),
            operation: None,
            state: Mutex::new(PromiseState::default()),
        })
    }

    /// Wrap a native operation and subscribe to its completion and progress.
    pub fn from_operation(
        context: Arc<Context>,
        operation: AsyncRef,
        signature: Arc<AsyncSignature>,
    ) -> Arc<Self> {
        let proxy = Arc::new(Self {
            context,
            owner: thread::current().id(),
            operation: Some(Arc::clone(&operation)),
            state: Mutex::new(PromiseState::default()),
        });

        if let Some(converter) = signature.progress.clone() {
            let weak: Weak<Self> = Arc::downgrade(&proxy);
            let supported = operation.on_progress(Arc::new(move |value| {
                let Some(proxy) = weak.upgrade() else {
                    return;
                };
                let converter = converter.clone();
                let invoker = Arc::clone(proxy.context.invoker());
                invoker.call(Box::new(move || {
                    match converter.to_script(value, &*proxy.context) {
                        Ok(value) => proxy.report_progress(value),
                        Err(err) => tracing::warn!(%err, "dropping unconvertible progress report"),
                    }
                }));
            }));
            if !supported {
                tracing::debug!("operation does not report progress");
            }
        }

        // The pending operation owns the promise until it completes, so a
        // chain whose script handle was dropped still settles. Operations drop
        // the handler once it ran, which breaks the cycle.
        let completed = Arc::clone(&proxy);
        operation.on_completed(Box::new(move |status| {
            let invoker = Arc::clone(completed.context.invoker());
            invoker.call(Box::new(move || completed.complete_native(status, &signature)));
        }));
        proxy
    }

    /// Context this promise reports into.
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Check if the operation has settled.
    pub fn is_completed(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    /// The settled outcome, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        self.state.lock().outcome.clone()
    }

    /// Number of continuations waiting for completion.
    pub fn pending_continuations(&self) -> usize {
        self.state.lock().continuations.len()
    }

    /// Check if a native operation backs this proxy.
    pub fn is_native(&self) -> bool {
        self.operation.is_some()
    }

    /// Attach a continuation.
    ///
    /// # Panics
    ///
    /// Panics off the creating thread when thread affinity is strict.
    pub fn attach(self: &Arc<Self>, continuation: Continuation) {
        self.assert_owner("attach");
        let mut state = self.state.lock();
        let Some(outcome) = state.outcome.clone() else {
            state.continuations.push(continuation);
            return;
        };
        drop(state);
        let this = Arc::clone(self);
        self.context
            .invoker()
            .queue(Box::new(move || this.dispatch(continuation, outcome)));
    }

    /// Settle the promise. Later calls are ignored.
    ///
    /// # Panics
    ///
    /// Panics off the creating thread when thread affinity is strict.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn complete(self: &Arc<Self>, outcome: Outcome) {
        self.assert_owner("complete");
        let continuations = {
            let mut state = self.state.lock();
            if state.outcome.is_some() {
                tracing::debug!("promise already settled, ignoring completion");
                return;
            }
            state.outcome = Some(outcome.clone());
            mem::take(&mut state.continuations)
        };
        tracing::trace!(
            continuations = continuations.len(),
            success = outcome.is_ok(),
            "promise settled"
        );
        for continuation in continuations {
            self.dispatch(continuation, outcome.clone());
        }
    }

    /// Settle with `outcome`, adopting it when it is itself a promise.
    pub fn resolve(self: &Arc<Self>, outcome: Outcome) {
        if let Ok(value) = &outcome
            && let Some(adopted) = PromiseObject::proxy_of(value)
        {
            if Arc::ptr_eq(&adopted, self) {
                self.complete(Err(ScriptError::type_error("promise resolved with itself")));
            } else {
                adopted.attach(Continuation::forward(Arc::clone(self)));
            }
            return;
        }
        self.complete(outcome);
    }

    /// Deliver a progress report to the continuations attached right now.
    ///
    /// Continuations without a progress handler forward the value to their
    /// output promise.
    pub fn report_progress(&self, value: ScriptValue) {
        self.assert_owner("report_progress");
        let routes: Vec<_> = self
            .state
            .lock()
            .continuations
            .iter()
            .map(Continuation::progress_route)
            .collect();
        for route in routes {
            match route {
                (Some(handler), _) => {
                    if let Err(err) = handler.call(std::slice::from_ref(&value)) {
                        tracing::warn!(%err, "progress handler failed");
                    }
                }
                (None, Some(output)) => output.report_progress(value.clone()),
                (None, None) => {}
            }
        }
    }

    /// Cancel the native operation. No-op for bridge-owned promises.
    pub fn cancel(&self) {
        match &self.operation {
            Some(operation) => operation.cancel(),
            None => tracing::debug!("cancel on a bridge-owned promise ignored"),
        }
    }

    fn complete_native(self: &Arc<Self>, status: AsyncStatus, signature: &AsyncSignature) {
        let Some(operation) = &self.operation else {
            return;
        };
        let outcome = match status {
            AsyncStatus::Completed => operation
                .results()
                .map_err(ScriptError::from)
                .and_then(|value| {
                    signature
                        .result
                        .to_script(value, &*self.context)
                        .map_err(|err| ProjectionError::from(err).into())
                }),
            AsyncStatus::Error => Err(match operation.results() {
                Err(err) => err.into(),
                Ok(_) => NativeError::fail("the operation failed").into(),
            }),
            AsyncStatus::Canceled => Err(NativeError::canceled().into()),
            AsyncStatus::Started => {
                tracing::warn!("completion reported with status Started, ignoring");
                return;
            }
        };
        self.complete(outcome);
    }

    fn dispatch(self: &Arc<Self>, continuation: Continuation, outcome: Outcome) {
        self.assert_owner("dispatch");
        let Continuation {
            on_resolved,
            on_rejected,
            output,
            kind,
            ..
        } = continuation;
        let report_unhandled = matches!(kind, ContinuationKind::Done);

        let result = match kind {
            ContinuationKind::Then | ContinuationKind::Done => match outcome {
                Ok(value) => match &on_resolved {
                    Some(handler) => handler.call(&[value]),
                    None => Ok(value),
                },
                Err(err) => match &on_rejected {
                    Some(handler) => handler.call(&[err.into_value()]),
                    None => Err(err),
                },
            },
            ContinuationKind::Finally => match on_resolved.as_ref().map(|h| h.call(&[])) {
                Some(Err(err)) => Err(err),
                Some(Ok(returned)) => {
                    if let Some(pending) = PromiseObject::proxy_of(&returned)
                        && let Some(output) = &output
                    {
                        pending.attach(Continuation::restore(outcome, Arc::clone(output)));
                        return;
                    }
                    outcome
                }
                None => outcome,
            },
            ContinuationKind::Restore(original) => outcome.and(original),
        };

        match output {
            Some(output) => output.resolve(result),
            None => {
                if let Err(err) = result
                    && report_unhandled
                {
                    self.context.raise_unhandled(err);
                }
            }
        }
    }

    fn assert_owner(&self, operation: &str) {
        if thread::current().id() == self.owner {
            return;
        }
        if self.context.config().strict_thread_affinity {
            panic!("promise {operation} called off its creating thread");
        }
        tracing::warn!(operation, "promise used off its creating thread");
    }
}

impl fmt::Debug for AsyncOperationProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AsyncOperationProxy")
            .field("native", &self.operation.is_some())
            .field("completed", &state.outcome.is_some())
            .field("continuations", &state.continuations.len())
            .finish_non_exhaustive()
    }
}
