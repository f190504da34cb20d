//! Execution context: instantiation and entry-point dispatch.
//!
//! A [`Context`] takes a freshly loaded unit, instantiates it (running the
//! synthesized field-initializer function when one exists), resolves the
//! requested entry point by exact name and parameter types, and runs it.
//! It holds no state between invocations; each call starts from a clean
//! instance.

use crate::core::error::{InvocationError, format_signature};
use crate::core::value::{ScriptValue, TypeTag};
use crate::loader::LoadedUnit;
use crate::vm::{Instance, Vm};

/// Dispatches entry-point invocations against loaded units.
#[derive(Default)]
pub struct Context;

impl Context {
    pub fn new() -> Self {
        Self
    }

    /// Instantiate `unit` and invoke `entry` with the given arguments.
    ///
    /// `formals` are the declared parameter types to resolve against;
    /// `actuals` are the values passed, in the same order. The two must
    /// have the same length.
    pub fn invoke(
        &mut self,
        unit: &LoadedUnit,
        entry: &str,
        formals: &[TypeTag],
        actuals: Vec<ScriptValue>,
    ) -> Result<ScriptValue, InvocationError> {
        if formals.len() != actuals.len() {
            return Err(InvocationError::ArityMismatch {
                expected: formals.len(),
                found: actuals.len(),
            });
        }

        let program = unit.program();
        let mut instance = Instance::new(program.fields.len());
        let vm = Vm::new(program);

        if let Some(init) = program.init_function() {
            vm.run(&mut instance, init, Vec::new())
                .map_err(|source| InvocationError::Instantiation {
                    unit: unit.name().to_string(),
                    source,
                })?;
        }

        let index = unit
            .resolve(entry, formals)
            .ok_or_else(|| InvocationError::EntryPointNotFound {
                unit: unit.name().to_string(),
                signature: format_signature(entry, formals),
            })?;

        vm.run(&mut instance, index, actuals)
            .map_err(|source| InvocationError::Faulted {
                unit: unit.name().to_string(),
                entry: entry.to_string(),
                source,
            })
    }
}
