//! Asynchronous operation bridge.
//!
//! Native asynchronous operations project as promise-like host objects.
//!
//! ## Key Types
//!
//! - [`AsyncOperationProxy`]: the Pending → Completed state machine
//! - [`Continuation`]: handlers attached through `then`, `catch`, `finally`
//!   and `done`
//! - [`PromiseObject`]: the host object scripts see
//!
//! Futures returned by `then` and friends are bridge-owned proxies with no
//! native handle. A handler returning a bridge promise is adopted: the
//! chained future settles when that promise does.

mod continuation;
mod object;
mod operation;

pub use continuation::{Continuation, Outcome};
pub use object::PromiseObject;
pub use operation::AsyncOperationProxy;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;

    use projection_core::{NativeError, ScriptError, ScriptFunction, ScriptValue, codes};

    use super::*;
    use crate::Context;
    use crate::config::ProjectionConfig;
    use crate::engine::ScriptEngine;
    use crate::invoker::{DispatchQueue, ThreadInvoker};

    #[derive(Default)]
    struct RecordingEngine {
        errors: Mutex<Vec<ScriptError>>,
    }

    impl ScriptEngine for RecordingEngine {
        fn raise_unhandled(&self, error: ScriptError) {
            self.errors.lock().push(error);
        }
    }

    struct Fixture {
        ctx: Arc<Context>,
        queue: DispatchQueue,
        engine: Arc<RecordingEngine>,
    }

    fn fixture_with(config: ProjectionConfig) -> Fixture {
        let (invoker, queue) = ThreadInvoker::for_current_thread();
        let engine = Arc::new(RecordingEngine::default());
        let ctx = Context::builder()
            .with_invoker(invoker)
            .with_engine(engine.clone())
            .with_config(config)
            .build()
            .unwrap();
        Fixture { ctx, queue, engine }
    }

    fn fixture() -> Fixture {
        fixture_with(ProjectionConfig::default())
    }

    type Calls = Arc<Mutex<Vec<ScriptValue>>>;

    /// Handler recording its first argument and returning it.
    fn recorder() -> (ScriptFunction, Calls) {
        let calls: Calls = Arc::default();
        let seen = calls.clone();
        let f = ScriptFunction::new("record", move |args| {
            let value = args.first().cloned().unwrap_or_default();
            seen.lock().push(value.clone());
            Ok(value)
        });
        (f, calls)
    }

    fn thrower(value: &str) -> ScriptFunction {
        let value = ScriptValue::from(value);
        ScriptFunction::new("throw", move |_| Err(ScriptError::Thrown(value.clone())))
    }

    fn call(target: &ScriptValue, method: &str, args: &[ScriptValue]) -> ScriptValue {
        let function = target.get(method).unwrap();
        function.as_function().unwrap().call(args).unwrap()
    }

    fn promise(proxy: &Arc<AsyncOperationProxy>) -> ScriptValue {
        ScriptValue::Host(PromiseObject::new(proxy.clone()))
    }

    fn outcome(value: &ScriptValue) -> Option<Outcome> {
        PromiseObject::proxy_of(value).unwrap().outcome()
    }

    #[test]
    fn attach_after_completion_is_scheduled_not_synchronous() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        p.complete(Ok(ScriptValue::Number(1.0)));

        let (on_ok, calls) = recorder();
        call(&promise(&p), "then", &[on_ok.into()]);
        assert!(calls.lock().is_empty());

        assert_eq!(f.queue.run_pending(), 1);
        assert_eq!(*calls.lock(), vec![ScriptValue::Number(1.0)]);
        assert_eq!(f.queue.run_pending(), 0);
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn pending_continuations_run_once_on_completion() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let (on_ok, calls) = recorder();
        let chained = call(&promise(&p), "then", &[on_ok.into()]);
        assert_eq!(p.pending_continuations(), 1);

        p.complete(Ok(ScriptValue::Number(5.0)));
        p.complete(Ok(ScriptValue::Number(6.0)));
        f.queue.run_until_idle();

        assert_eq!(*calls.lock(), vec![ScriptValue::Number(5.0)]);
        assert_eq!(p.pending_continuations(), 0);
        assert_eq!(outcome(&chained), Some(Ok(ScriptValue::Number(5.0))));
    }

    #[test]
    fn throwing_rejection_handler_rejects_with_new_error() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let chained = call(
            &promise(&p),
            "then",
            &[ScriptValue::Undefined, thrower("second").into()],
        );
        p.complete(Err(NativeError::fail("first").into()));
        assert_eq!(
            outcome(&chained),
            Some(Err(ScriptError::Thrown(ScriptValue::from("second"))))
        );
    }

    #[test]
    fn rejection_handler_can_recover() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let (on_err, calls) = recorder();
        let chained = call(&promise(&p), "catch", &[on_err.into()]);
        p.complete(Err(NativeError::new(codes::E_BOUNDS, "index").into()));

        let seen = calls.lock()[0].clone();
        assert_eq!(seen.get("number").unwrap(), ScriptValue::Number(codes::E_BOUNDS as f64));
        assert!(matches!(outcome(&chained), Some(Ok(ScriptValue::Object(_)))));
    }

    #[test]
    fn missing_handler_passes_outcome_through() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let (on_ok, calls) = recorder();
        let chained = call(&promise(&p), "then", &[on_ok.into()]);
        p.complete(Err(NativeError::canceled().into()));
        assert!(calls.lock().is_empty());
        assert!(matches!(
            outcome(&chained),
            Some(Err(ScriptError::Native { code, .. })) if code == codes::ERROR_CANCELLED
        ));
    }

    #[test]
    fn done_raises_unhandled_failures() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let result = call(&promise(&p), "done", &[]);
        assert!(result.is_undefined());
        p.complete(Err(ScriptError::type_error("nobody listens")));
        assert_eq!(
            *f.engine.errors.lock(),
            vec![ScriptError::type_error("nobody listens")]
        );
    }

    #[test]
    fn done_with_failing_handler_raises_its_error() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        p.complete(Ok(ScriptValue::Null));
        call(&promise(&p), "done", &[thrower("late").into()]);
        assert!(f.engine.errors.lock().is_empty());
        f.queue.run_pending();
        assert_eq!(
            *f.engine.errors.lock(),
            vec![ScriptError::Thrown(ScriptValue::from("late"))]
        );
    }

    #[test]
    fn progress_reaches_current_continuations_and_forwards() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let pv = promise(&p);
        let (on_progress, direct) = recorder();
        call(&pv, "then", &[ScriptValue::Null, ScriptValue::Null, on_progress.into()]);
        let forwarded = call(&pv, "then", &[]);
        let (on_forwarded, via_chain) = recorder();
        call(&forwarded, "then", &[ScriptValue::Null, ScriptValue::Null, on_forwarded.into()]);

        p.report_progress(ScriptValue::Number(0.5));

        let (late, late_calls) = recorder();
        call(&pv, "then", &[ScriptValue::Null, ScriptValue::Null, late.into()]);

        assert_eq!(*direct.lock(), vec![ScriptValue::Number(0.5)]);
        assert_eq!(*via_chain.lock(), vec![ScriptValue::Number(0.5)]);
        assert!(late_calls.lock().is_empty());
    }

    #[test]
    fn returned_promise_is_adopted() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let inner = AsyncOperationProxy::pending(f.ctx.clone());
        let inner_value = promise(&inner);
        let returns_inner = ScriptFunction::new("next", move |_| Ok(inner_value.clone()));

        let chained = call(&promise(&p), "then", &[returns_inner.into()]);
        p.complete(Ok(ScriptValue::Null));
        assert_eq!(outcome(&chained), None);

        inner.complete(Ok(ScriptValue::from("adopted")));
        assert_eq!(outcome(&chained), Some(Ok(ScriptValue::from("adopted"))));
    }

    #[test]
    fn self_resolution_is_rejected() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        p.resolve(Ok(promise(&p)));
        assert!(matches!(p.outcome(), Some(Err(ScriptError::Type(_)))));
    }

    #[test]
    fn finally_keeps_outcome_unless_handler_fails() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let (cleanup, calls) = recorder();
        let kept = call(&promise(&p), "finally", &[cleanup.into()]);
        let replaced = call(&promise(&p), "finally", &[thrower("cleanup failed").into()]);
        p.complete(Ok(ScriptValue::Number(3.0)));

        assert_eq!(*calls.lock(), vec![ScriptValue::Undefined]);
        assert_eq!(outcome(&kept), Some(Ok(ScriptValue::Number(3.0))));
        assert_eq!(
            outcome(&replaced),
            Some(Err(ScriptError::Thrown(ScriptValue::from("cleanup failed"))))
        );
    }

    #[test]
    fn cancel_on_bridge_promise_is_noop() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        call(&promise(&p), "cancel", &[]);
        assert!(!p.is_completed());
        assert!(!p.is_native());
    }

    #[test]
    fn off_thread_attach_panics_when_strict() {
        let f = fixture();
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let result = thread::spawn(move || p.attach(Continuation::done(None, None, None))).join();
        assert!(result.is_err());
    }

    #[test]
    fn off_thread_attach_is_tolerated_when_relaxed() {
        let f = fixture_with(ProjectionConfig::default().with_strict_thread_affinity(false));
        let p = AsyncOperationProxy::pending(f.ctx.clone());
        let q = p.clone();
        thread::spawn(move || q.attach(Continuation::done(None, None, None)))
            .join()
            .unwrap();
        assert_eq!(p.pending_continuations(), 1);
    }

    #[test]
    fn promise_members() {
        let f = fixture();
        let p = promise(&AsyncOperationProxy::pending(f.ctx.clone()));
        let host = p.as_host().unwrap();
        assert_eq!(host.class_name(), "Promise");
        assert_eq!(host.property_names(), vec!["then", "catch", "finally", "done", "cancel"]);
        assert!(p.get("resolve").unwrap().is_undefined());
    }
}
