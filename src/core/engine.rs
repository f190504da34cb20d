//! The engine facade.
//!
//! [`Engine`] wires the pipeline together: synthesize (for blocks),
//! compile, load, instantiate, invoke. Its convenience methods never
//! return errors. A failed call yields `None` and appends a formatted
//! record to the engine's error log, which accumulates across calls until
//! [`clear_errors`](Engine::clear_errors) is called. This matches how the
//! engine is meant to be embedded: fire a script, check the result, and
//! consult the log only when something went missing.

use crate::builder::{BLOCK_ENTRY_POINT, wrap_block, wrap_block_with_args};
use crate::compiler::diagnostics::Diagnostic;
use crate::compiler::{Compiler, SourceUnit};
use crate::core::context::Context;
use crate::core::value::{ScriptValue, TypeTag};
use crate::loader::Loader;

/// Entry-point name used by [`run_main`](Engine::run_main).
pub const MAIN_ENTRY_POINT: &str = "main";

const RECORD_SEPARATOR: &str = "================================================================";

/// The top-level scripting engine.
pub struct Engine {
    compiler: Compiler,
    context: Context,
    errors: Vec<String>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            compiler: Compiler::new(),
            context: Context::new(),
            errors: Vec::new(),
        }
    }

    // =========================================================================
    // Convenience surface
    // =========================================================================

    /// Compile `text` as unit `name` and invoke its `main(string[])` entry
    /// point with an empty argument vector.
    pub fn run_main(&mut self, name: &str, text: &str) -> Option<ScriptValue> {
        self.run_main_with(name, text, Vec::new())
    }

    /// Compile `text` as unit `name` and invoke `main(string[])` with the
    /// given argument vector.
    pub fn run_main_with(
        &mut self,
        name: &str,
        text: &str,
        argv: Vec<String>,
    ) -> Option<ScriptValue> {
        let unit = SourceUnit::new(name, text);
        self.execute(
            &unit,
            MAIN_ENTRY_POINT,
            &[TypeTag::StrList],
            vec![ScriptValue::StrList(argv)],
        )
    }

    /// Compile `text` as unit `name` and invoke the named entry point with
    /// no arguments.
    pub fn call(&mut self, name: &str, text: &str, entry: &str) -> Option<ScriptValue> {
        self.call_with(name, text, entry, Vec::new())
    }

    /// Compile `text` as unit `name` and invoke the named entry point with
    /// the given arguments. The entry point is resolved against the
    /// arguments' runtime types, in order.
    pub fn call_with(
        &mut self,
        name: &str,
        text: &str,
        entry: &str,
        args: Vec<ScriptValue>,
    ) -> Option<ScriptValue> {
        let unit = SourceUnit::new(name, text);
        let formals: Vec<TypeTag> = args.iter().map(ScriptValue::type_tag).collect();
        self.execute(&unit, entry, &formals, args)
    }

    /// Wrap a statement fragment into a unit and run it with no arguments.
    pub fn eval_block(&mut self, fragment: &str) -> Option<ScriptValue> {
        let unit = wrap_block(fragment);
        self.execute(&unit, BLOCK_ENTRY_POINT, &[], Vec::new())
    }

    /// Wrap a statement fragment into a unit whose entry point declares
    /// parameters `p1` through `pN` typed after `args`, and run it.
    pub fn eval_block_with(&mut self, fragment: &str, args: Vec<ScriptValue>) -> Option<ScriptValue> {
        let unit = wrap_block_with_args(fragment, &args);
        let formals: Vec<TypeTag> = args.iter().map(ScriptValue::type_tag).collect();
        self.execute(&unit, BLOCK_ENTRY_POINT, &formals, args)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn execute(
        &mut self,
        unit: &SourceUnit,
        entry: &str,
        formals: &[TypeTag],
        actuals: Vec<ScriptValue>,
    ) -> Option<ScriptValue> {
        let Some(artifact) = self.compiler.compile(unit) else {
            let rendered: Vec<String> = self
                .compiler
                .diagnostics()
                .iter()
                .map(Diagnostic::to_string)
                .collect();
            self.errors.push(format!(
                "Error compiling unit '{}':\n{}",
                unit.normalized_name(),
                rendered.join("\n")
            ));
            return None;
        };

        let loaded = match Loader::load(&artifact) {
            Ok(loaded) => loaded,
            Err(error) => {
                // Bytes we just produced failed to load; an engine fault,
                // not a script fault.
                log::error!("artifact for unit '{}' failed to load: {error}", artifact.name);
                self.errors.push(format!(
                    "Error loading unit '{}': {error}",
                    artifact.name
                ));
                return None;
            }
        };

        match self.context.invoke(&loaded, entry, formals, actuals) {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(format!(
                    "Error executing entry point '{}' of unit '{}': {error}",
                    entry,
                    loaded.name()
                ));
                None
            }
        }
    }

    // =========================================================================
    // Error log
    // =========================================================================

    /// All accumulated error records joined into one report, `None` when
    /// the log is empty.
    pub fn errors(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(self.errors.join(&format!("\n{RECORD_SEPARATOR}\n")))
    }

    /// The accumulated error records, oldest first.
    pub fn error_records(&self) -> &[String] {
        &self.errors
    }

    /// Discard all accumulated error records.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Diagnostics from the most recent compile, in reported order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.compiler.diagnostics()
    }

    /// The engine's compiler, for artifact-table inspection.
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
