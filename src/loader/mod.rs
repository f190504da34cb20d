//! The in-memory loader.
//!
//! Turns the bytes of a [`CompiledArtifact`] into a [`LoadedUnit`]: a
//! decoded program plus an entry-point registry for exact name-and-types
//! resolution. Loading never touches the filesystem and never caches:
//! every call produces an independent handle, so two identically named
//! artifacts from different compiles cannot collide.

use crate::compiler::CompiledArtifact;
use crate::compiler::bytecode::{self, Program};
use crate::core::error::{LoadError, format_signature};
use crate::core::value::TypeTag;
use rustc_hash::FxHashMap;

/// Stateless loader; [`load`](Loader::load) is the whole surface.
pub struct Loader;

impl Loader {
    /// Define an artifact as an invocable unit.
    ///
    /// Fails if the bytes are not a well-formed artifact or if the
    /// self-declared unit name does not match the artifact's name; a bad
    /// artifact never yields a usable handle.
    pub fn load(artifact: &CompiledArtifact) -> Result<LoadedUnit, LoadError> {
        let program = bytecode::decode(&artifact.bytes)?;

        if program.name != artifact.name {
            return Err(LoadError::NameMismatch {
                artifact: artifact.name.clone(),
                declared: program.name.clone(),
            });
        }

        let mut registry = FxHashMap::default();
        for (index, function) in program.functions.iter().enumerate() {
            let key = EntryKey {
                name: function.name.clone(),
                params: function.params.clone(),
            };
            if registry.insert(key, index).is_some() {
                return Err(LoadError::DuplicateEntryPoint {
                    signature: format_signature(&function.name, &function.params),
                });
            }
        }

        Ok(LoadedUnit { program, registry })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    name: String,
    params: Vec<TypeTag>,
}

/// A loaded, invocable unit.
///
/// Valid for the scope of one execution call; the engine drops it once
/// invocation completes.
#[derive(Debug)]
pub struct LoadedUnit {
    program: Program,
    registry: FxHashMap<EntryKey, usize>,
}

impl LoadedUnit {
    /// The unit's self-declared name.
    pub fn name(&self) -> &str {
        &self.program.name
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Resolve an entry point by exact name and ordered parameter types.
    pub fn resolve(&self, name: &str, params: &[TypeTag]) -> Option<usize> {
        let key = EntryKey {
            name: name.to_string(),
            params: params.to_vec(),
        };
        self.registry.get(&key).copied()
    }

    /// Number of registered entry points.
    pub fn entry_point_count(&self) -> usize {
        self.registry.len()
    }
}
