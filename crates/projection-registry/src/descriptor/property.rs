//! Native properties.

use projection_core::{
    CallFrame, ConversionHost, Converter, NativeRef, NativeThunk, NativeValue, ProjectionResult,
    ScriptValue,
};

/// A named property with a getter and an optional setter.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    converter: Converter,
    getter: NativeThunk,
    setter: Option<NativeThunk>,
}

impl PropertyDescriptor {
    /// A read-only property.
    pub fn read_only(name: impl Into<String>, converter: Converter, getter: NativeThunk) -> Self {
        Self {
            name: name.into(),
            converter,
            getter,
            setter: None,
        }
    }

    /// A read-write property.
    pub fn read_write(
        name: impl Into<String>,
        converter: Converter,
        getter: NativeThunk,
        setter: NativeThunk,
    ) -> Self {
        Self {
            name: name.into(),
            converter,
            getter,
            setter: Some(setter),
        }
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the property has no setter.
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Read the property.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get(
        &self,
        target: &NativeRef,
        host: &dyn ConversionHost,
    ) -> ProjectionResult<ScriptValue> {
        let mut ret = NativeValue::Empty;
        self.getter.call(&mut CallFrame::new(target, &mut [], &mut ret))?;
        Ok(self.converter.to_script(ret, host)?)
    }

    /// Write the property.
    ///
    /// # Panics
    ///
    /// Panics if the property is read-only. Callers check
    /// [`is_read_only`](Self::is_read_only) first.
    pub fn set(
        &self,
        target: &NativeRef,
        value: &ScriptValue,
        host: &dyn ConversionHost,
    ) -> ProjectionResult<()> {
        let Some(setter) = &self.setter else {
            panic!("write to read-only property '{}'", self.name);
        };
        let mut slots = [self.converter.to_native(value, host)?];
        let mut ret = NativeValue::Empty;
        setter.call(&mut CallFrame::new(target, &mut slots, &mut ret))?;
        Ok(())
    }
}
