//! Source synthesis for block execution.
//!
//! A block is a bare statement fragment with no surrounding class or
//! method. These helpers wrap a fragment into a complete source unit with
//! a fixed unit name and entry point so the rest of the pipeline never
//! needs a special case for blocks.

use crate::compiler::SourceUnit;
use crate::core::value::ScriptValue;

/// Unit name given to every synthesized block.
pub const BLOCK_UNIT_NAME: &str = "__BlockUnit__";

/// Entry-point name of every synthesized block.
pub const BLOCK_ENTRY_POINT: &str = "__run__";

/// Wrap a parameterless statement fragment into a compilable unit.
pub fn wrap_block(fragment: &str) -> SourceUnit {
    wrap_block_with_args(fragment, &[])
}

/// Wrap a statement fragment into a compilable unit whose entry point
/// declares one parameter per argument, named `p1` through `pN`, typed
/// after each argument's runtime type.
pub fn wrap_block_with_args(fragment: &str, args: &[ScriptValue]) -> SourceUnit {
    let params: Vec<String> = args
        .iter()
        .enumerate()
        .map(|(i, arg)| format!("{} p{}", arg.type_tag(), i + 1))
        .collect();
    let text = format!(
        "class {BLOCK_UNIT_NAME} {{\n    any {BLOCK_ENTRY_POINT}({}) {{\n        {fragment}\n    }}\n}}\n",
        params.join(", ")
    );
    SourceUnit::new(BLOCK_UNIT_NAME, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_without_params() {
        let unit = wrap_block("return 1;");
        assert_eq!(unit.name, BLOCK_UNIT_NAME);
        assert!(unit.text.contains("any __run__() {"));
        assert!(unit.text.contains("return 1;"));
    }

    #[test]
    fn synthesizes_typed_params_in_order() {
        let unit = wrap_block_with_args(
            "return p1;",
            &[
                ScriptValue::Str("a".to_string()),
                ScriptValue::Int(2),
                ScriptValue::Bool(true),
            ],
        );
        assert!(unit.text.contains("__run__(string p1, int p2, bool p3)"));
    }

    #[test]
    fn single_param_has_no_separator() {
        let unit = wrap_block_with_args("return p1;", &[ScriptValue::Int(1)]);
        assert!(unit.text.contains("__run__(int p1)"));
    }
}
