//! Standalone arithmetical evaluator.
//!
//! Evaluates expressions over `+ - * /` and parenthesized floating-point
//! operands, in both infix and postfix forms. Independent of the script
//! pipeline; useful for quick formula evaluation without compiling a
//! unit.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithError {
    #[error("Malformed arithmetical expression: '{expr}'")]
    Malformed { expr: String },
}

/// Evaluate an infix expression such as `(1 + 2) * 3`.
pub fn eval_infix(expr: &str) -> Result<f64, ArithError> {
    eval_postfix(&infix_to_postfix(expr)?)
}

/// Translate an infix expression into space-separated postfix form.
pub fn infix_to_postfix(expr: &str) -> Result<String, ArithError> {
    let malformed = || ArithError::Malformed {
        expr: expr.to_string(),
    };

    let mut ops: Vec<char> = Vec::new();
    let mut postfix = String::with_capacity(expr.len());

    for c in expr.chars() {
        if c == ' ' {
            continue;
        }
        if is_operand(c) {
            postfix.push(c);
        } else if is_operator(c) {
            push_separator(&mut postfix);
            // Flush stacked operators of equal or higher precedence.
            while let Some(&top) = ops.last() {
                if top == '(' || is_lower(c, top) {
                    break;
                }
                postfix.push(top);
                postfix.push(' ');
                ops.pop();
            }
            ops.push(c);
        } else if c == '(' {
            ops.push(c);
        } else if c == ')' {
            push_separator(&mut postfix);
            loop {
                let top = ops.pop().ok_or_else(malformed)?;
                if top == '(' {
                    break;
                }
                postfix.push(top);
                postfix.push(' ');
            }
        } else {
            return Err(malformed());
        }
    }

    if postfix.is_empty() {
        return Err(malformed());
    }
    if !postfix.ends_with(' ') {
        postfix.push(' ');
    }
    while let Some(op) = ops.pop() {
        if op == '(' {
            return Err(malformed());
        }
        postfix.push(op);
        postfix.push(' ');
    }

    Ok(postfix.trim_end().to_string())
}

/// Evaluate a space-separated postfix expression such as `1 2 + 3 *`.
pub fn eval_postfix(expr: &str) -> Result<f64, ArithError> {
    let malformed = || ArithError::Malformed {
        expr: expr.to_string(),
    };

    // Every character must be a digit, '.', an operator, a parenthesis
    // or a space before evaluation starts.
    if !expr.chars().all(|c| ('('..='9').contains(&c) || c == ' ') {
        return Err(malformed());
    }

    let mut stack: Vec<f64> = Vec::new();
    let mut number = String::new();

    for c in expr.chars() {
        if is_operand(c) {
            number.push(c);
        } else if c == ' ' {
            if !number.is_empty() {
                let value: f64 = number.parse().map_err(|_| malformed())?;
                stack.push(value);
                number.clear();
            }
        } else {
            let rhs = stack.pop().ok_or_else(malformed)?;
            let lhs = stack.pop().ok_or_else(malformed)?;
            let value = match c {
                '+' => lhs + rhs,
                '-' => lhs - rhs,
                '*' => lhs * rhs,
                '/' => lhs / rhs,
                _ => return Err(malformed()),
            };
            stack.push(value);
        }
    }
    if !number.is_empty() {
        let value: f64 = number.parse().map_err(|_| malformed())?;
        stack.push(value);
    }

    stack.pop().ok_or_else(malformed)
}

fn push_separator(postfix: &mut String) {
    if !postfix.is_empty() && !postfix.ends_with(' ') {
        postfix.push(' ');
    }
}

fn is_operand(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/')
}

/// True when `op1` binds tighter than `op2`.
fn is_lower(op1: char, op2: char) -> bool {
    if op1 == '+' || op1 == '-' {
        return false;
    }
    op2 == '+' || op2 == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_over_addition() {
        assert_eq!(eval_infix("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(infix_to_postfix("1 + 2 * 3").unwrap(), "1 2 3 * +");
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(eval_infix("(1 + 2) * 3").unwrap(), 9.0);
    }

    #[test]
    fn division_by_zero_is_infinite() {
        assert!(eval_infix("1 / 0").unwrap().is_infinite());
    }

    #[test]
    fn rejects_letters() {
        let err = eval_postfix("1 a +").unwrap_err();
        assert_eq!(
            err,
            ArithError::Malformed {
                expr: "1 a +".to_string()
            }
        );
    }

    #[test]
    fn rejects_missing_operands() {
        assert!(eval_postfix("+").is_err());
    }
}
