//! The in-memory compiler.
//!
//! [`Compiler`] turns one [`SourceUnit`] into a [`CompiledArtifact`]: lex,
//! parse, lower, then serialize, with the resulting bytes recorded in an
//! in-process artifact table instead of being written to disk. Failure is
//! not an error value but an absent artifact plus populated diagnostics,
//! mirroring how callers actually consume a compiler: "did it build, and
//! if not, what did it say".

pub mod bytecode;
pub mod codegen;
pub mod diagnostics;

use crate::compiler::diagnostics::{Diagnostic, Severity};
use crate::lexer::tokenize;
use crate::parser::parse_unit;
use rustc_hash::FxHashMap;

/// Conventional file-name suffix for memscript source; stripped from unit
/// names before compilation.
pub const SOURCE_SUFFIX: &str = ".ms";

/// A named, self-contained compilable unit of source text.
///
/// Transient: created per compile call, discarded after.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub name: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// The unit name with any trailing source suffix stripped.
    pub fn normalized_name(&self) -> &str {
        self.name.strip_suffix(SOURCE_SUFFIX).unwrap_or(&self.name)
    }
}

/// The binary output for one named unit. Immutable after creation; handed
/// to the loader by value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Compiles source units entirely in memory.
///
/// Keeps two pieces of state between calls: the diagnostics of the most
/// recent compile, and the artifact table mapping unit names to their
/// latest compiled bytes. Recompiling a name replaces its table entry.
pub struct Compiler {
    diagnostics: Vec<Diagnostic>,
    artifacts: FxHashMap<String, CompiledArtifact>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            artifacts: FxHashMap::default(),
        }
    }

    /// Compile one unit. Returns the artifact on success, `None` on
    /// failure with [`diagnostics`](Self::diagnostics) explaining why.
    pub fn compile(&mut self, unit: &SourceUnit) -> Option<CompiledArtifact> {
        self.diagnostics.clear();
        let name = unit.normalized_name().to_string();

        let (tokens, lex_errors) = tokenize(&unit.text);
        for error in &lex_errors {
            self.diagnostics
                .push(Diagnostic::error(&name, Some(error.line()), error.to_string()));
        }

        let class = match parse_unit(tokens) {
            Ok(class) => class,
            Err(error) => {
                let line = error.span().line;
                self.diagnostics.push(Diagnostic::error(
                    &name,
                    (line > 0).then_some(line),
                    error.to_string(),
                ));
                return None;
            }
        };

        if class.name != name {
            self.diagnostics.push(Diagnostic::error(
                &name,
                Some(class.span.line),
                format!(
                    "unit '{}' must declare a class of the same name, found '{}'",
                    name, class.name
                ),
            ));
        }

        if class.methods.is_empty() {
            self.diagnostics.push(Diagnostic::warning(
                &name,
                Some(class.span.line),
                "unit declares no methods; it compiles but exposes no entry point",
            ));
        }

        let program = match codegen::generate(&class, &name) {
            Ok(program) => program,
            Err(errors) => {
                for error in errors {
                    self.diagnostics.push(Diagnostic::error(
                        &name,
                        Some(error.span().line),
                        error.to_string(),
                    ));
                }
                return None;
            }
        };

        if self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
        {
            return None;
        }

        let bytes = match bytecode::encode(&program) {
            Ok(bytes) => bytes,
            Err(error) => {
                // Not a property of the source text; an internal limit.
                log::error!("failed to encode artifact for unit '{name}': {error}");
                return None;
            }
        };

        let artifact = CompiledArtifact {
            name: name.clone(),
            bytes,
        };
        self.artifacts.insert(name, artifact.clone());
        Some(artifact)
    }

    /// Diagnostics from the most recent compile call, in reported order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Look up a compiled artifact by unit name. `None` for names never
    /// compiled (or never successfully compiled).
    pub fn artifact(&self, name: &str) -> Option<&CompiledArtifact> {
        self.artifacts.get(name)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
