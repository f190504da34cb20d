//! Tests for the compiler's diagnostic reporting and artifact table.

use memscript::builder::{BLOCK_UNIT_NAME, wrap_block, wrap_block_with_args};
use memscript::compiler::{Compiler, SourceUnit};
use memscript::prelude::*;

const VALID: &str = r#"
    class Widget {
        int size() {
            return 3;
        }
    }
"#;

#[test]
fn test_successful_compile_yields_artifact() {
    let mut compiler = Compiler::new();

    let artifact = compiler.compile(&SourceUnit::new("Widget", VALID));
    let artifact = artifact.expect("valid source must compile");
    assert_eq!(artifact.name, "Widget");
    assert!(!artifact.bytes.is_empty());
    assert!(compiler.diagnostics().is_empty());
}

#[test]
fn test_unmatched_brace_reports_diagnostic() {
    let mut compiler = Compiler::new();

    let unit = SourceUnit::new("Broken", "class Broken { int f() { return 1;");
    assert_eq!(compiler.compile(&unit), None);

    let diagnostics = compiler.diagnostics();
    assert!(!diagnostics.is_empty());
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].unit, "Broken");
}

#[test]
fn test_diagnostics_carry_line_numbers() {
    let mut compiler = Compiler::new();

    let unit = SourceUnit::new(
        "Broken",
        "class Broken {\n    int f() {\n        return nonexistent;\n    }\n}",
    );
    assert_eq!(compiler.compile(&unit), None);

    let diagnostic = &compiler.diagnostics()[0];
    assert_eq!(diagnostic.line, Some(3));
    assert!(diagnostic.message.contains("nonexistent"));
}

#[test]
fn test_diagnostics_reset_between_compiles() {
    let mut compiler = Compiler::new();

    compiler.compile(&SourceUnit::new("Broken", "class Broken {"));
    assert!(!compiler.diagnostics().is_empty());

    compiler.compile(&SourceUnit::new("Widget", VALID));
    assert!(compiler.diagnostics().is_empty());
}

#[test]
fn test_class_name_must_match_unit_name() {
    let mut compiler = Compiler::new();

    let unit = SourceUnit::new("Expected", "class Actual { int f() { return 1; } }");
    assert_eq!(compiler.compile(&unit), None);

    let diagnostic = &compiler.diagnostics()[0];
    assert!(diagnostic.message.contains("Expected"));
    assert!(diagnostic.message.contains("Actual"));
}

#[test]
fn test_methodless_unit_compiles_with_warning() {
    let mut compiler = Compiler::new();

    let unit = SourceUnit::new("Inert", "class Inert { int counter = 0; }");
    let artifact = compiler.compile(&unit);
    assert!(artifact.is_some(), "warnings must not block compilation");

    let diagnostics = compiler.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert!(diagnostics[0].message.contains("no methods"));
}

#[test]
fn test_source_suffix_is_stripped_from_unit_name() {
    let mut compiler = Compiler::new();

    let artifact = compiler
        .compile(&SourceUnit::new("Widget.ms", VALID))
        .expect("valid source must compile");
    assert_eq!(artifact.name, "Widget");
}

#[test]
fn test_artifact_table_keeps_latest_compile() {
    let mut compiler = Compiler::new();

    compiler
        .compile(&SourceUnit::new("Widget", VALID))
        .expect("first compile");
    let first = compiler.artifact("Widget").unwrap().bytes.clone();

    let changed = r#"
        class Widget {
            int size() {
                return 3 + 4;
            }
        }
    "#;
    compiler
        .compile(&SourceUnit::new("Widget", changed))
        .expect("second compile");
    let second = &compiler.artifact("Widget").unwrap().bytes;

    assert_ne!(&first, second);
}

#[test]
fn test_failed_compile_does_not_touch_artifact_table() {
    let mut compiler = Compiler::new();

    compiler
        .compile(&SourceUnit::new("Widget", VALID))
        .expect("first compile");
    compiler.compile(&SourceUnit::new("Widget", "class Widget {"));

    assert!(compiler.artifact("Widget").is_some());
}

#[test]
fn test_unknown_names_have_no_artifact() {
    let compiler = Compiler::new();
    assert!(compiler.artifact("Nowhere").is_none());
}

// =============================================================================
// Block synthesis
// =============================================================================

#[test]
fn test_synthesized_block_compiles() {
    let mut compiler = Compiler::new();

    let unit = wrap_block("return 1 + 2;");
    let artifact = compiler.compile(&unit).expect("block must compile");
    assert_eq!(artifact.name, BLOCK_UNIT_NAME);
}

#[test]
fn test_synthesized_block_with_params_compiles() {
    let mut compiler = Compiler::new();

    for args in [
        vec![],
        vec![ScriptValue::Int(1)],
        vec![
            ScriptValue::Str("a".to_string()),
            ScriptValue::Bool(true),
            ScriptValue::Float(0.5),
        ],
    ] {
        let unit = wrap_block_with_args("return 0;", &args);
        assert!(
            compiler.compile(&unit).is_some(),
            "block with {} params must compile",
            args.len()
        );
    }
}
