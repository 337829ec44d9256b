//! Named methods and arity-based overload resolution.

use std::fmt;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use projection_core::{ConversionHost, NativeRef, ProjectionError, ProjectionResult, ScriptValue};

use super::overload::Overload;
use crate::RegistrationError;

/// Produces the overloads of one method on first use.
pub type OverloadGenerator = Box<dyn Fn() -> Vec<Overload> + Send + Sync>;

/// Overloads keyed by arity.
pub type OverloadTable = FxHashMap<usize, Overload>;

/// A named method with one or more overloads that differ by arity.
///
/// The overload table is built from the generator the first time it is
/// queried and never changes afterwards.
pub struct MethodDescriptor {
    name: String,
    generator: OverloadGenerator,
    table: OnceLock<Result<OverloadTable, RegistrationError>>,
}

impl MethodDescriptor {
    /// Create a method from a generator.
    pub fn new<F>(name: impl Into<String>, generator: F) -> Self
    where
        F: Fn() -> Vec<Overload> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            generator: Box::new(generator),
            table: OnceLock::new(),
        }
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The overload table, or the error that made it malformed.
    pub fn try_table(&self) -> Result<&OverloadTable, &RegistrationError> {
        self.table
            .get_or_init(|| {
                let mut table = OverloadTable::default();
                for overload in (self.generator)() {
                    let arity = overload.arity();
                    if table.insert(arity, overload).is_some() {
                        return Err(RegistrationError::AmbiguousOverload {
                            method: self.name.clone(),
                            arity,
                        });
                    }
                }
                tracing::trace!(
                    method = %self.name,
                    overloads = table.len(),
                    "built overload table"
                );
                Ok(table)
            })
            .as_ref()
    }

    /// The overload table.
    ///
    /// # Panics
    ///
    /// Panics if the generated table is malformed.
    pub fn table(&self) -> &OverloadTable {
        match self.try_table() {
            Ok(table) => table,
            Err(err) => panic!("malformed generated table: {}", err),
        }
    }

    /// Check if an overload accepts `arity` arguments.
    pub fn can_invoke(&self, arity: usize) -> bool {
        self.table().contains_key(&arity)
    }

    /// Declared arities in ascending order.
    pub fn arities(&self) -> Vec<usize> {
        let mut arities: Vec<usize> = self.table().keys().copied().collect();
        arities.sort_unstable();
        arities
    }

    /// Invoke the overload whose arity matches `args.len()`.
    ///
    /// Fails with [`ProjectionError::UnknownOverload`] when none does.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(
        &self,
        target: &NativeRef,
        args: &[ScriptValue],
        host: &dyn ConversionHost,
    ) -> ProjectionResult<ScriptValue> {
        let overload = self
            .table()
            .get(&args.len())
            .ok_or_else(|| ProjectionError::unknown_overload(&self.name, args.len()))?;
        overload.invoke(&self.name, target, args, host)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("materialized", &self.table.get().is_some())
            .finish_non_exhaustive()
    }
}
