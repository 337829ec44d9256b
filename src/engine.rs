//! The scripting engine as seen from the bridge.

use std::fmt;

use projection_core::ScriptError;

/// Engine services the bridge calls back into.
pub trait ScriptEngine: Send + Sync {
    /// Report an error nobody handled.
    ///
    /// Called for failures of fire-and-forget continuations and for event
    /// listeners that throw.
    fn raise_unhandled(&self, error: ScriptError);
}

/// Engine that only logs unhandled errors.
#[derive(Default)]
pub struct LoggingEngine;

impl ScriptEngine for LoggingEngine {
    fn raise_unhandled(&self, error: ScriptError) {
        tracing::error!(%error, "unhandled script error");
    }
}

impl fmt::Debug for LoggingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoggingEngine")
    }
}
