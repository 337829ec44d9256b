//! Delegates in both directions.
//!
//! Native delegates reach script as plain callables. Script callables passed
//! where a delegate is expected become native delegates that marshal onto the
//! scripting thread: void delegates are fire-and-forget from other threads,
//! delegates with a result block the calling native thread until the script
//! ran.

use std::sync::Arc;

use projection_core::{
    Converter, DelegateSignature, NativeDelegate, NativeError, NativeValue, ProjectionError,
    ScriptError, ScriptFunction, ScriptValue,
};

use crate::Context;

/// Wrap a native delegate as a script callable.
pub(crate) fn project_delegate(
    context: Arc<Context>,
    delegate: NativeDelegate,
    signature: Arc<DelegateSignature>,
) -> ScriptFunction {
    let name = signature.name.clone();
    ScriptFunction::new(name, move |args| {
        if args.len() != signature.params.len() {
            return Err(ProjectionError::unknown_overload(&signature.name, args.len()).into());
        }
        let native_args = signature
            .params
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (converter, arg))| {
                converter
                    .to_native(arg, &*context)
                    .map_err(|source| ProjectionError::Argument {
                        operation: signature.name.clone(),
                        index,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ret = delegate.invoke(&native_args).map_err(ProjectionError::from)?;
        let value = signature
            .result
            .to_script(ret, &*context)
            .map_err(ProjectionError::from)?;
        Ok(value)
    })
}

/// Wrap a script callable as a native delegate.
pub(crate) fn wrap_script_function(
    context: Arc<Context>,
    function: ScriptFunction,
    signature: Arc<DelegateSignature>,
) -> NativeDelegate {
    NativeDelegate::new(move |args: &[NativeValue]| {
        let call = {
            let context = Arc::clone(&context);
            let function = function.clone();
            let signature = Arc::clone(&signature);
            let args = args.to_vec();
            move || call_script(&context, &function, &signature, args)
        };

        let invoker = context.invoker();
        if invoker.is_owner_thread() {
            return call();
        }
        if matches!(signature.result, Converter::Void) {
            let context = Arc::clone(&context);
            invoker.queue(Box::new(move || {
                if let Err(err) = call() {
                    context.raise_unhandled(script_error(err));
                }
            }));
            return Ok(NativeValue::Empty);
        }
        invoker.call_sync(call)?
    })
}

fn call_script(
    context: &Context,
    function: &ScriptFunction,
    signature: &DelegateSignature,
    args: Vec<NativeValue>,
) -> Result<NativeValue, NativeError> {
    let script_args = signature
        .params
        .iter()
        .zip(args)
        .map(|(converter, arg)| converter.to_script(arg, context))
        .collect::<Result<Vec<ScriptValue>, _>>()?;
    let ret = function.call(&script_args).map_err(native_error)?;
    Ok(signature.result.to_native(&ret, context)?)
}

/// Map a script failure onto the native error a delegate returns.
pub(crate) fn native_error(err: ScriptError) -> NativeError {
    match err {
        ScriptError::Native { code, message } => NativeError::new(code, message),
        other => NativeError::fail(other.to_string()),
    }
}

fn script_error(err: NativeError) -> ScriptError {
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection_core::codes;

    #[test]
    fn native_codes_survive_the_round_trip() {
        let err = native_error(ScriptError::Native {
            code: codes::E_BOUNDS,
            message: "index".into(),
        });
        assert_eq!(err.code, codes::E_BOUNDS);
        assert_eq!(script_error(err), ScriptError::Native {
            code: codes::E_BOUNDS,
            message: "index".into()
        });
    }

    #[test]
    fn thrown_values_become_failures() {
        let err = native_error(ScriptError::Thrown(ScriptValue::from("nope")));
        assert_eq!(err.code, codes::E_FAIL);
        assert!(err.message.contains("nope"));
    }
}
