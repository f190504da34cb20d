//! End-to-end tests for the engine's convenience surface: compile, load
//! and invoke in one call, with failures reported through the error log.

use memscript::prelude::*;

#[test]
fn test_main_without_args() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            void main(string[] args) {
                print("MainWithoutParm");
            }
        }
    "#;

    let result = engine.run_main("TestUnit", source);
    assert_eq!(result, Some(ScriptValue::Unit));
    assert_eq!(engine.errors(), None);
}

#[test]
fn test_main_with_args() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            string main(string[] args) {
                return args[0];
            }
        }
    "#;

    let result = engine.run_main_with("TestUnit", source, vec!["MainWithParm".to_string()]);
    assert_eq!(result, Some(ScriptValue::Str("MainWithParm".to_string())));
    assert_eq!(engine.errors(), None);
}

#[test]
fn test_method_without_args() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            string test() {
                return "MethodWithoutParam";
            }
        }
    "#;

    let result = engine.call("TestUnit", source, "test");
    assert_eq!(
        result,
        Some(ScriptValue::Str("MethodWithoutParam".to_string()))
    );
}

#[test]
fn test_method_with_args() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            string test(string s1, string s2) {
                return s1 + s2;
            }
        }
    "#;

    let result = engine.call_with(
        "TestUnit",
        source,
        "test",
        vec![
            ScriptValue::Str("Method".to_string()),
            ScriptValue::Str("WithParam".to_string()),
        ],
    );
    assert_eq!(result, Some(ScriptValue::Str("MethodWithParam".to_string())));
}

#[test]
fn test_block_without_args() {
    let mut engine = Engine::new();

    let result = engine.eval_block(r#"return "BlockWithoutParam";"#);
    assert_eq!(
        result,
        Some(ScriptValue::Str("BlockWithoutParam".to_string()))
    );
}

#[test]
fn test_block_with_args() {
    let mut engine = Engine::new();

    let result = engine.eval_block_with(
        "return p1 + p2 + p3;",
        vec![
            ScriptValue::Str("Block".to_string()),
            ScriptValue::Str("With".to_string()),
            ScriptValue::Str("Param".to_string()),
        ],
    );
    assert_eq!(result, Some(ScriptValue::Str("BlockWithParam".to_string())));
}

#[test]
fn test_unit_name_suffix_is_stripped() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            int test() {
                return 42;
            }
        }
    "#;

    let result = engine.call("TestUnit.ms", source, "test");
    assert_eq!(result, Some(ScriptValue::Int(42)));
}

#[test]
fn test_field_initializers_run_before_entry_point() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            string greeting = "hello";
            int base = 40;

            string greet() {
                return greeting + " " + (base + 2);
            }
        }
    "#;

    let result = engine.call("TestUnit", source, "greet");
    assert_eq!(result, Some(ScriptValue::Str("hello 42".to_string())));
}

#[test]
fn test_sibling_method_calls() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            int twice(int n) {
                return n * 2;
            }

            int run() {
                return twice(10) + twice(11);
            }
        }
    "#;

    let result = engine.call("TestUnit", source, "run");
    assert_eq!(result, Some(ScriptValue::Int(42)));
}

#[test]
fn test_while_loop_and_conditionals() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            int sum_to(int n) {
                var total = 0;
                var i = 1;
                while (i <= n) {
                    total = total + i;
                    i = i + 1;
                }
                if (total > 100) {
                    return 0;
                }
                return total;
            }
        }
    "#;

    let result = engine.call_with("TestUnit", source, "sum_to", vec![ScriptValue::Int(10)]);
    assert_eq!(result, Some(ScriptValue::Int(55)));
}

// =============================================================================
// Error log behavior
// =============================================================================

#[test]
fn test_compile_failure_is_logged_not_returned() {
    let mut engine = Engine::new();

    let result = engine.run_main("Broken", "class Broken { void main(string[] a) {");
    assert_eq!(result, None);

    let report = engine.errors().expect("a failed compile must be logged");
    assert!(report.contains("Error compiling unit 'Broken'"));
}

#[test]
fn test_error_log_accumulates_across_calls() {
    let mut engine = Engine::new();

    engine.run_main("First", "class First {");
    engine.run_main("Second", "class Second {");

    assert_eq!(engine.error_records().len(), 2);
    let report = engine.errors().unwrap();
    assert!(report.contains("First"));
    assert!(report.contains("Second"));
}

#[test]
fn test_clear_errors_empties_the_log() {
    let mut engine = Engine::new();

    engine.run_main("Broken", "not a class at all");
    assert!(engine.errors().is_some());

    engine.clear_errors();
    assert_eq!(engine.errors(), None);
    assert!(engine.error_records().is_empty());
}

#[test]
fn test_missing_entry_point_is_logged() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            int test() {
                return 1;
            }
        }
    "#;

    let result = engine.call("TestUnit", source, "nope");
    assert_eq!(result, None);

    let report = engine.errors().unwrap();
    assert!(report.contains("nope()"));
    assert!(report.contains("TestUnit"));
}

#[test]
fn test_signature_mismatch_is_not_resolved() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            string test(string s) {
                return s;
            }
        }
    "#;

    // test(int) does not match test(string); exact types only.
    let result = engine.call_with("TestUnit", source, "test", vec![ScriptValue::Int(1)]);
    assert_eq!(result, None);
    assert!(engine.errors().unwrap().contains("test(int)"));
}

#[test]
fn test_runtime_fault_is_logged() {
    let mut engine = Engine::new();

    let source = r#"
        class TestUnit {
            int test() {
                return 1 / 0;
            }
        }
    "#;

    let result = engine.call("TestUnit", source, "test");
    assert_eq!(result, None);

    let report = engine.errors().unwrap();
    assert!(report.contains("Division by zero"));
}

#[test]
fn test_successful_call_leaves_log_untouched() {
    let mut engine = Engine::new();

    engine.run_main("Broken", "class Broken {");
    assert_eq!(engine.error_records().len(), 1);

    engine.eval_block("return 1;");
    assert_eq!(engine.error_records().len(), 1);
}
