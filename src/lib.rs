//! memscript: an in-memory compile-and-execute engine.
//!
//! The engine takes a named unit of script source, compiles it to a bytecode
//! artifact held entirely in memory, loads the artifact into a per-call
//! handle, resolves an entry point by name and formal-parameter types, and
//! invokes it with caller-supplied arguments. Compile failures surface as
//! structured diagnostics; load and invocation failures are funnelled into
//! the engine's accumulating error log. No disk I/O happens at any stage.
//!
//! ```
//! use memscript::prelude::*;
//!
//! let mut engine = Engine::new();
//! let result = engine.eval_block("return \"hello\";");
//! assert_eq!(result, Some(ScriptValue::Str("hello".to_string())));
//! ```

pub mod arith;
pub mod builder;
pub mod compiler;
pub mod core;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod vm;

// Re-export main types
pub mod prelude {
    pub use crate::arith::{ArithError, eval_infix, eval_postfix, infix_to_postfix};
    pub use crate::builder::{BLOCK_ENTRY_POINT, BLOCK_UNIT_NAME, wrap_block, wrap_block_with_args};
    pub use crate::compiler::diagnostics::{Diagnostic, Severity};
    pub use crate::compiler::{CompiledArtifact, Compiler, SourceUnit};
    pub use crate::core::context::Context;
    pub use crate::core::engine::Engine;
    pub use crate::core::error::{InvocationError, LoadError, RuntimeError};
    pub use crate::core::value::{ScriptValue, TypeTag};
    pub use crate::loader::{LoadedUnit, Loader};
}

pub use prelude::*;
