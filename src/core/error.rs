//! Error types for the load and execution stages.
//!
//! Compile-stage problems are not errors in this sense: they surface as
//! `Diagnostic`s on the compiler. Everything here is recovered by the
//! engine into its error log; nothing propagates out of the convenience
//! methods.

use crate::compiler::bytecode::DecodeError;
use crate::core::value::TypeTag;
use thiserror::Error;

/// Failure to resolve compiled bytes into an invocable unit.
///
/// When this happens on bytes the engine's own compiler produced it is an
/// internal-consistency fault and is logged distinctly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Malformed artifact: {0}")]
    Malformed(#[from] DecodeError),

    #[error("Artifact '{artifact}' declares unit name '{declared}'")]
    NameMismatch { artifact: String, declared: String },

    #[error("Artifact declares entry point '{signature}' twice")]
    DuplicateEntryPoint { signature: String },
}

/// A fault raised while running script code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Cannot apply '{op}' to {lhs} and {rhs}")]
    BinaryTypeMismatch {
        op: &'static str,
        lhs: TypeTag,
        rhs: TypeTag,
    },

    #[error("Cannot apply '{op}' to {operand}")]
    UnaryTypeMismatch {
        op: &'static str,
        operand: TypeTag,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Condition must be a bool, found {found}")]
    ConditionNotBool { found: TypeTag },

    #[error("Cannot index a {base} value")]
    NotIndexable { base: TypeTag },

    #[error("Index must be an int, found {found}")]
    IndexNotInt { found: TypeTag },

    #[error("Index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Call depth limit exceeded")]
    CallDepthExceeded,

    // The remaining variants indicate malformed bytecode rather than a
    // script-level fault; a well-formed artifact cannot produce them.
    #[error("Value stack underflow")]
    StackUnderflow,

    #[error("Invalid constant index {index}")]
    BadConstant { index: u16 },

    #[error("Invalid function index {index}")]
    BadFunction { index: u16 },

    #[error("Invalid {what} slot {slot}")]
    BadSlot { what: &'static str, slot: u16 },

    #[error("Jump target {target} out of range")]
    BadJump { target: u16 },
}

/// Failure to instantiate a loaded unit or invoke its entry point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("Entry point '{signature}' not found in unit '{unit}'")]
    EntryPointNotFound { unit: String, signature: String },

    #[error("{found} argument(s) supplied for {expected} formal parameter(s)")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Failed to instantiate unit '{unit}': {source}")]
    Instantiation {
        unit: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Entry point '{entry}' in unit '{unit}' faulted: {source}")]
    Faulted {
        unit: String,
        entry: String,
        #[source]
        source: RuntimeError,
    },
}

/// Render an entry-point signature for messages: `name(string, int)`.
pub fn format_signature(name: &str, params: &[TypeTag]) -> String {
    let tags: Vec<String> = params.iter().map(|t| t.to_string()).collect();
    format!("{}({})", name, tags.join(", "))
}
