//! One arity-selected native call.

use projection_core::{
    CallFrame, ConversionHost, Converter, NativeRef, NativeThunk, NativeValue, PlainObject,
    ProjectionError, ProjectionResult, ScriptValue,
};

/// Name of the result field when a method has output parameters.
pub const RETURN_VALUE: &str = "returnValue";

/// Direction of one declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDirection {
    /// Supplied by the caller.
    In,
    /// Written by the native call and exported in the result record.
    Out,
}

/// Conversion and naming for one declared parameter.
#[derive(Debug, Clone)]
pub struct ParamAdapter {
    /// Parameter direction.
    pub direction: ParamDirection,
    /// Value converter.
    pub converter: Converter,
    /// Parameter name; export name for outputs.
    pub name: String,
}

impl ParamAdapter {
    /// An input parameter.
    pub fn input(name: impl Into<String>, converter: Converter) -> Self {
        Self {
            direction: ParamDirection::In,
            converter,
            name: name.into(),
        }
    }

    /// An output parameter.
    pub fn output(name: impl Into<String>, converter: Converter) -> Self {
        Self {
            direction: ParamDirection::Out,
            converter,
            name: name.into(),
        }
    }
}

/// A single native overload.
#[derive(Debug, Clone)]
pub struct Overload {
    arity: usize,
    params: Vec<ParamAdapter>,
    result: Option<Converter>,
    thunk: NativeThunk,
}

impl Overload {
    /// Create an overload. Its arity is the number of input parameters.
    pub fn new(params: Vec<ParamAdapter>, result: Option<Converter>, thunk: NativeThunk) -> Self {
        let arity = params
            .iter()
            .filter(|p| p.direction == ParamDirection::In)
            .count();
        Self {
            arity,
            params,
            result,
            thunk,
        }
    }

    /// Number of input parameters.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[ParamAdapter] {
        &self.params
    }

    /// Check if any parameter is an output.
    pub fn has_outputs(&self) -> bool {
        self.params.iter().any(|p| p.direction == ParamDirection::Out)
    }

    /// Convert `args`, call the thunk and convert the results.
    ///
    /// With output parameters the result is a plain object holding
    /// `returnValue` (when the call has a result) and one field per output.
    /// Otherwise it is the converted return value, `Undefined` for void.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(
        &self,
        operation: &str,
        target: &NativeRef,
        args: &[ScriptValue],
        host: &dyn ConversionHost,
    ) -> ProjectionResult<ScriptValue> {
        let missing = ScriptValue::Undefined;
        let mut slots = Vec::with_capacity(self.params.len());
        let mut next_input = 0;
        for param in &self.params {
            match param.direction {
                ParamDirection::In => {
                    let index = next_input;
                    next_input += 1;
                    let arg = args.get(index).unwrap_or(&missing);
                    let value = param.converter.to_native(arg, host).map_err(|source| {
                        ProjectionError::Argument {
                            operation: operation.to_string(),
                            index,
                            source,
                        }
                    })?;
                    slots.push(value);
                }
                ParamDirection::Out => slots.push(param.converter.default_native()),
            }
        }

        let mut ret = NativeValue::Empty;
        self.thunk.call(&mut CallFrame::new(target, &mut slots, &mut ret))?;

        let result = match &self.result {
            Some(converter) => Some(converter.to_script(ret, host)?),
            None => None,
        };
        if !self.has_outputs() {
            return Ok(result.unwrap_or_default());
        }

        let mut record = PlainObject::new();
        if let Some(result) = result {
            record.insert(RETURN_VALUE, result);
        }
        for (param, slot) in self.params.iter().zip(slots) {
            if param.direction == ParamDirection::Out {
                record.insert(param.name.clone(), param.converter.to_script(slot, host)?);
            }
        }
        Ok(ScriptValue::Object(record))
    }
}
