//! Tests for artifact loading and entry-point registration.

use memscript::compiler::{CompiledArtifact, Compiler, SourceUnit};
use memscript::core::error::LoadError;
use memscript::core::value::TypeTag;
use memscript::loader::Loader;

fn compile(name: &str, text: &str) -> CompiledArtifact {
    Compiler::new()
        .compile(&SourceUnit::new(name, text))
        .expect("source must compile")
}

#[test]
fn test_load_valid_artifact() {
    let artifact = compile(
        "Widget",
        r#"
            class Widget {
                int size() {
                    return 3;
                }
            }
        "#,
    );

    let unit = Loader::load(&artifact).expect("valid artifact must load");
    assert_eq!(unit.name(), "Widget");
    assert!(unit.resolve("size", &[]).is_some());
}

#[test]
fn test_registry_distinguishes_parameter_types() {
    let artifact = compile(
        "Widget",
        r#"
            class Widget {
                string show(int n) {
                    return "" + n;
                }
                string show(string s) {
                    return s;
                }
            }
        "#,
    );

    let unit = Loader::load(&artifact).expect("valid artifact must load");
    let by_int = unit.resolve("show", &[TypeTag::Int]);
    let by_str = unit.resolve("show", &[TypeTag::Str]);
    assert!(by_int.is_some());
    assert!(by_str.is_some());
    assert_ne!(by_int, by_str);
    assert_eq!(unit.resolve("show", &[TypeTag::Bool]), None);
}

#[test]
fn test_resolution_is_exact_no_coercion() {
    let artifact = compile(
        "Widget",
        r#"
            class Widget {
                float half(float f) {
                    return f / 2.0;
                }
            }
        "#,
    );

    let unit = Loader::load(&artifact).expect("valid artifact must load");
    assert!(unit.resolve("half", &[TypeTag::Float]).is_some());
    assert_eq!(unit.resolve("half", &[TypeTag::Int]), None);
}

#[test]
fn test_garbage_bytes_are_rejected() {
    let artifact = CompiledArtifact {
        name: "Junk".to_string(),
        bytes: b"this is not bytecode".to_vec(),
    };

    let err = Loader::load(&artifact).unwrap_err();
    assert!(matches!(err, LoadError::Malformed(_)));
}

#[test]
fn test_empty_bytes_are_rejected() {
    let artifact = CompiledArtifact {
        name: "Empty".to_string(),
        bytes: Vec::new(),
    };

    assert!(matches!(
        Loader::load(&artifact).unwrap_err(),
        LoadError::Malformed(_)
    ));
}

#[test]
fn test_truncated_artifact_is_rejected() {
    let mut artifact = compile(
        "Widget",
        r#"
            class Widget {
                int size() {
                    return 3;
                }
            }
        "#,
    );
    artifact.bytes.truncate(artifact.bytes.len() / 2);

    assert!(matches!(
        Loader::load(&artifact).unwrap_err(),
        LoadError::Malformed(_)
    ));
}

#[test]
fn test_huge_declared_code_length_is_rejected() {
    let mut artifact = compile(
        "Widget",
        r#"
            class Widget {
                int size() {
                    return 3;
                }
            }
        "#,
    );
    // The artifact ends with the function's 4-byte code count followed by
    // its 4 bytes of code; declare far more code than the bytes hold.
    let at = artifact.bytes.len() - 8;
    artifact.bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());

    assert!(matches!(
        Loader::load(&artifact).unwrap_err(),
        LoadError::Malformed(_)
    ));
}

#[test]
fn test_declared_name_must_match_artifact_name() {
    let mut artifact = compile(
        "Widget",
        r#"
            class Widget {
                int size() {
                    return 3;
                }
            }
        "#,
    );
    artifact.name = "Gadget".to_string();

    let err = Loader::load(&artifact).unwrap_err();
    assert!(matches!(err, LoadError::NameMismatch { .. }));
}

#[test]
fn test_entry_point_count_covers_all_methods() {
    let artifact = compile(
        "Widget",
        r#"
            class Widget {
                int a() { return 1; }
                int b() { return 2; }
            }
        "#,
    );

    let unit = Loader::load(&artifact).expect("valid artifact must load");
    assert_eq!(unit.entry_point_count(), 2);
}
