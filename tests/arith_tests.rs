//! Tests for the standalone arithmetical evaluator.

use memscript::arith::{ArithError, eval_infix, eval_postfix, infix_to_postfix};

const EXPR: &str = "(57 / 3 - (17 / 2)) + 1 -(15*3/1.666666)";

#[test]
fn test_infix_and_postfix_agree() {
    let infix = eval_infix(EXPR).expect("infix evaluation");
    let postfix_form = infix_to_postfix(EXPR).expect("translation");
    let postfix = eval_postfix(&postfix_form).expect("postfix evaluation");
    assert!((infix - postfix).abs() < 1e-9);
}

#[test]
fn test_reference_expression_value() {
    let result = eval_infix(EXPR).expect("evaluation");
    let expected = (57.0 / 3.0 - (17.0 / 2.0)) + 1.0 - (15.0 * 3.0 / 1.666666);
    assert!((result - expected).abs() < 1e-9);
}

#[test]
fn test_postfix_translation_shape() {
    assert_eq!(infix_to_postfix("1 + 2 * 3").unwrap(), "1 2 3 * +");
    assert_eq!(infix_to_postfix("(1 + 2) * 3").unwrap(), "1 2 + 3 *");
}

#[test]
fn test_multi_digit_and_decimal_operands() {
    assert_eq!(eval_infix("10 + 32").unwrap(), 42.0);
    assert_eq!(eval_infix("1.5 * 4").unwrap(), 6.0);
}

#[test]
fn test_malformed_expression_names_the_input() {
    let err = eval_postfix("1 x +").unwrap_err();
    assert_eq!(
        err,
        ArithError::Malformed {
            expr: "1 x +".to_string()
        }
    );
}

#[test]
fn test_operator_without_operands_is_malformed() {
    assert!(eval_postfix("+ +").is_err());
    assert!(eval_infix("").is_err());
}
