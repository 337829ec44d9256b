//! Continuations attached to a pending operation.

use std::fmt;
use std::sync::Arc;

use projection_core::{ScriptError, ScriptFunction, ScriptValue};

use super::AsyncOperationProxy;

/// Result an operation settles with.
pub type Outcome = Result<ScriptValue, ScriptError>;

/// How a continuation turns the operation's outcome into its own.
#[derive(Clone)]
pub(crate) enum ContinuationKind {
    /// `then` / `catch`: handlers map the outcome.
    Then,
    /// `finally`: the handler runs, the outcome passes through.
    Finally,
    /// `done`: like `then`, but an unhandled failure goes to the engine.
    Done,
    /// Waits on a `finally` handler's promise, then restores the original outcome.
    Restore(Outcome),
}

/// One registered set of handlers.
///
/// Each continuation is dispatched exactly once.
pub struct Continuation {
    pub(crate) on_resolved: Option<ScriptFunction>,
    pub(crate) on_rejected: Option<ScriptFunction>,
    pub(crate) on_progress: Option<ScriptFunction>,
    pub(crate) output: Option<Arc<AsyncOperationProxy>>,
    pub(crate) kind: ContinuationKind,
}

impl Continuation {
    /// Handlers settling `output`.
    pub fn then(
        on_resolved: Option<ScriptFunction>,
        on_rejected: Option<ScriptFunction>,
        on_progress: Option<ScriptFunction>,
        output: Arc<AsyncOperationProxy>,
    ) -> Self {
        Self {
            on_resolved,
            on_rejected,
            on_progress,
            output: Some(output),
            kind: ContinuationKind::Then,
        }
    }

    /// Run `handler` on either outcome, then settle `output` with the original.
    pub fn finally(handler: Option<ScriptFunction>, output: Arc<AsyncOperationProxy>) -> Self {
        Self {
            on_resolved: handler,
            on_rejected: None,
            on_progress: None,
            output: Some(output),
            kind: ContinuationKind::Finally,
        }
    }

    /// Terminal handlers; failures nobody handled are raised to the engine.
    pub fn done(
        on_resolved: Option<ScriptFunction>,
        on_rejected: Option<ScriptFunction>,
        on_progress: Option<ScriptFunction>,
    ) -> Self {
        Self {
            on_resolved,
            on_rejected,
            on_progress,
            output: None,
            kind: ContinuationKind::Done,
        }
    }

    /// Settle `output` exactly as the operation settles.
    pub(crate) fn forward(output: Arc<AsyncOperationProxy>) -> Self {
        Self::then(None, None, None, output)
    }

    pub(crate) fn restore(original: Outcome, output: Arc<AsyncOperationProxy>) -> Self {
        Self {
            on_resolved: None,
            on_rejected: None,
            on_progress: None,
            output: Some(output),
            kind: ContinuationKind::Restore(original),
        }
    }

    /// Progress route: the handler, or the output to forward to.
    pub(crate) fn progress_route(
        &self,
    ) -> (Option<ScriptFunction>, Option<Arc<AsyncOperationProxy>>) {
        (self.on_progress.clone(), self.output.clone())
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ContinuationKind::Then => "then",
            ContinuationKind::Finally => "finally",
            ContinuationKind::Done => "done",
            ContinuationKind::Restore(_) => "restore",
        };
        f.debug_struct("Continuation")
            .field("kind", &kind)
            .field("resolved", &self.on_resolved.is_some())
            .field("rejected", &self.on_rejected.is_some())
            .field("progress", &self.on_progress.is_some())
            .field("chained", &self.output.is_some())
            .finish()
    }
}
