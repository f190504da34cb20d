//! Stack-machine interpreter for compiled programs.
//!
//! One [`Frame`] per script-level call; sibling-method calls recurse with
//! a depth cap. All faults are [`RuntimeError`] values, never panics: the
//! code under execution is assumed to be wrong in arbitrary ways.

use crate::compiler::bytecode::{Constant, Instruction, Program};
use crate::core::error::RuntimeError;
use crate::core::value::ScriptValue;

/// Maximum script-level call depth.
pub const MAX_CALL_DEPTH: usize = 64;

/// Per-execution field storage for one instantiated unit.
pub struct Instance {
    fields: Vec<ScriptValue>,
}

impl Instance {
    pub fn new(field_count: usize) -> Self {
        Self {
            fields: vec![ScriptValue::Unit; field_count],
        }
    }

    pub fn field(&self, slot: usize) -> Option<&ScriptValue> {
        self.fields.get(slot)
    }
}

/// Executes functions of one program against one instance.
pub struct Vm<'p> {
    program: &'p Program,
}

impl<'p> Vm<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Run the function at `index` with the given arguments.
    pub fn run(
        &self,
        instance: &mut Instance,
        index: usize,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, RuntimeError> {
        self.run_frame(instance, index, args, 0)
    }

    fn run_frame(
        &self,
        instance: &mut Instance,
        index: usize,
        args: Vec<ScriptValue>,
        depth: usize,
    ) -> Result<ScriptValue, RuntimeError> {
        if depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded);
        }

        let function = self
            .program
            .functions
            .get(index)
            .ok_or(RuntimeError::BadFunction {
                index: index as u16,
            })?;

        let mut frame = Frame::new(function.local_count as usize, args);
        let code = &function.code;
        let mut ip = 0usize;

        while ip < code.len() {
            match code[ip] {
                Instruction::PushConst(idx) => {
                    let constant = self
                        .program
                        .constants
                        .get(idx as usize)
                        .ok_or(RuntimeError::BadConstant { index: idx })?;
                    frame.stack.push(ScriptValue::from(constant));
                }
                Instruction::PushUnit => frame.stack.push(ScriptValue::Unit),
                Instruction::Pop => {
                    frame.pop()?;
                }
                Instruction::LoadLocal(slot) => {
                    let value = frame
                        .locals
                        .get(slot as usize)
                        .ok_or(RuntimeError::BadSlot {
                            what: "local",
                            slot,
                        })?
                        .clone();
                    frame.stack.push(value);
                }
                Instruction::StoreLocal(slot) => {
                    let value = frame.pop()?;
                    let local =
                        frame
                            .locals
                            .get_mut(slot as usize)
                            .ok_or(RuntimeError::BadSlot {
                                what: "local",
                                slot,
                            })?;
                    *local = value;
                }
                Instruction::LoadField(slot) => {
                    let value = instance
                        .fields
                        .get(slot as usize)
                        .ok_or(RuntimeError::BadSlot {
                            what: "field",
                            slot,
                        })?
                        .clone();
                    frame.stack.push(value);
                }
                Instruction::StoreField(slot) => {
                    let value = frame.pop()?;
                    let field =
                        instance
                            .fields
                            .get_mut(slot as usize)
                            .ok_or(RuntimeError::BadSlot {
                                what: "field",
                                slot,
                            })?;
                    *field = value;
                }
                Instruction::Add => frame.binary(add_values)?,
                Instruction::Sub => frame.binary(|a, b| arith(a, b, "-"))?,
                Instruction::Mul => frame.binary(|a, b| arith(a, b, "*"))?,
                Instruction::Div => frame.binary(|a, b| arith(a, b, "/"))?,
                Instruction::Mod => frame.binary(|a, b| arith(a, b, "%"))?,
                Instruction::Neg => {
                    let value = frame.pop()?;
                    let negated = match value {
                        ScriptValue::Int(v) => ScriptValue::Int(v.wrapping_neg()),
                        ScriptValue::Float(v) => ScriptValue::Float(-v),
                        other => {
                            return Err(RuntimeError::UnaryTypeMismatch {
                                op: "-",
                                operand: other.type_tag(),
                            });
                        }
                    };
                    frame.stack.push(negated);
                }
                Instruction::Not => {
                    let value = frame.pop()?;
                    match value.as_bool() {
                        Some(b) => frame.stack.push(ScriptValue::Bool(!b)),
                        None => {
                            return Err(RuntimeError::UnaryTypeMismatch {
                                op: "!",
                                operand: value.type_tag(),
                            });
                        }
                    }
                }
                Instruction::Eq => frame.binary(|a, b| Ok(ScriptValue::Bool(a == b)))?,
                Instruction::Ne => frame.binary(|a, b| Ok(ScriptValue::Bool(a != b)))?,
                Instruction::Lt => frame.binary(|a, b| compare(a, b, "<"))?,
                Instruction::Le => frame.binary(|a, b| compare(a, b, "<="))?,
                Instruction::Gt => frame.binary(|a, b| compare(a, b, ">"))?,
                Instruction::Ge => frame.binary(|a, b| compare(a, b, ">="))?,
                Instruction::Jump(target) => {
                    ip = check_jump(target, code.len())?;
                    continue;
                }
                Instruction::JumpIfFalse(target) => {
                    let cond = frame.pop()?;
                    let Some(cond) = cond.as_bool() else {
                        return Err(RuntimeError::ConditionNotBool {
                            found: cond.type_tag(),
                        });
                    };
                    if !cond {
                        ip = check_jump(target, code.len())?;
                        continue;
                    }
                }
                Instruction::Call(callee) => {
                    let callee_fn = self.program.functions.get(callee as usize).ok_or(
                        RuntimeError::BadFunction {
                            index: callee,
                        },
                    )?;
                    let argc = callee_fn.params.len();
                    let mut call_args = vec![ScriptValue::Unit; argc];
                    for slot in (0..argc).rev() {
                        call_args[slot] = frame.pop()?;
                    }
                    let result = self.run_frame(instance, callee as usize, call_args, depth + 1)?;
                    frame.stack.push(result);
                }
                Instruction::Index => {
                    let index = frame.pop()?;
                    let base = frame.pop()?;
                    frame.stack.push(index_value(base, index)?);
                }
                Instruction::Print => {
                    let value = frame.pop()?;
                    println!("{value}");
                    frame.stack.push(ScriptValue::Unit);
                }
                Instruction::Return => return Ok(ScriptValue::Unit),
                Instruction::ReturnValue => return frame.pop(),
            }
            ip += 1;
        }

        // A compiled function always ends in a return; running off the end
        // means the artifact was hand-made. Treat it as a void return.
        Ok(ScriptValue::Unit)
    }
}

struct Frame {
    locals: Vec<ScriptValue>,
    stack: Vec<ScriptValue>,
}

impl Frame {
    fn new(local_count: usize, args: Vec<ScriptValue>) -> Self {
        let mut locals = vec![ScriptValue::Unit; local_count.max(args.len())];
        for (slot, arg) in args.into_iter().enumerate() {
            locals[slot] = arg;
        }
        Self {
            locals,
            stack: Vec::with_capacity(8),
        }
    }

    fn pop(&mut self) -> Result<ScriptValue, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn binary(
        &mut self,
        op: impl Fn(ScriptValue, ScriptValue) -> Result<ScriptValue, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        self.stack.push(op(lhs, rhs)?);
        Ok(())
    }
}

impl From<&Constant> for ScriptValue {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Int(v) => ScriptValue::Int(*v),
            Constant::Float(v) => ScriptValue::Float(*v),
            Constant::Str(s) => ScriptValue::Str(s.clone()),
            Constant::Bool(v) => ScriptValue::Bool(*v),
        }
    }
}

fn check_jump(target: u16, code_len: usize) -> Result<usize, RuntimeError> {
    let target = target as usize;
    if target > code_len {
        return Err(RuntimeError::BadJump {
            target: target as u16,
        });
    }
    Ok(target)
}

/// `+` concatenates when either side is a string, otherwise numeric.
fn add_values(lhs: ScriptValue, rhs: ScriptValue) -> Result<ScriptValue, RuntimeError> {
    if matches!(lhs, ScriptValue::Str(_)) || matches!(rhs, ScriptValue::Str(_)) {
        return Ok(ScriptValue::Str(format!("{lhs}{rhs}")));
    }
    arith(lhs, rhs, "+")
}

fn arith(lhs: ScriptValue, rhs: ScriptValue, op: &'static str) -> Result<ScriptValue, RuntimeError> {
    use ScriptValue::{Float, Int};

    match (&lhs, &rhs) {
        (Int(a), Int(b)) => {
            let a = *a;
            let b = *b;
            let value = match op {
                "+" => Int(a.wrapping_add(b)),
                "-" => Int(a.wrapping_sub(b)),
                "*" => Int(a.wrapping_mul(b)),
                "/" => {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Int(a.wrapping_div(b))
                }
                "%" => {
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Int(a.wrapping_rem(b))
                }
                _ => unreachable!("unknown arithmetic op {op}"),
            };
            Ok(value)
        }
        (Int(_) | Float(_), Int(_) | Float(_)) => {
            let a = as_f64(&lhs);
            let b = as_f64(&rhs);
            let value = match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => a / b,
                "%" => a % b,
                _ => unreachable!("unknown arithmetic op {op}"),
            };
            Ok(Float(value))
        }
        _ => Err(RuntimeError::BinaryTypeMismatch {
            op,
            lhs: lhs.type_tag(),
            rhs: rhs.type_tag(),
        }),
    }
}

fn compare(lhs: ScriptValue, rhs: ScriptValue, op: &'static str) -> Result<ScriptValue, RuntimeError> {
    use ScriptValue::{Float, Int, Str};
    use std::cmp::Ordering;

    let ordering = match (&lhs, &rhs) {
        (Int(a), Int(b)) => a.cmp(b),
        (Int(_) | Float(_), Int(_) | Float(_)) => as_f64(&lhs)
            .partial_cmp(&as_f64(&rhs))
            .unwrap_or(Ordering::Less),
        (Str(a), Str(b)) => a.cmp(b),
        _ => {
            return Err(RuntimeError::BinaryTypeMismatch {
                op,
                lhs: lhs.type_tag(),
                rhs: rhs.type_tag(),
            });
        }
    };

    let result = match op {
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        _ => unreachable!("unknown comparison op {op}"),
    };
    Ok(ScriptValue::Bool(result))
}

fn as_f64(value: &ScriptValue) -> f64 {
    match value {
        ScriptValue::Int(v) => *v as f64,
        ScriptValue::Float(v) => *v,
        _ => unreachable!("as_f64 on non-numeric value"),
    }
}

fn index_value(base: ScriptValue, index: ScriptValue) -> Result<ScriptValue, RuntimeError> {
    let ScriptValue::StrList(items) = &base else {
        return Err(RuntimeError::NotIndexable {
            base: base.type_tag(),
        });
    };
    let ScriptValue::Int(i) = index else {
        return Err(RuntimeError::IndexNotInt {
            found: index.type_tag(),
        });
    };
    let slot = usize::try_from(i).ok().filter(|s| *s < items.len());
    match slot {
        Some(slot) => Ok(ScriptValue::Str(items[slot].clone())),
        None => Err(RuntimeError::IndexOutOfBounds {
            index: i,
            len: items.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::{FunctionDef, Program};
    use crate::core::value::TypeTag;

    fn one_function(code: Vec<Instruction>, constants: Vec<Constant>) -> Program {
        let mut program = Program::new("T".to_string());
        program.constants = constants;
        program.functions.push(FunctionDef {
            name: "f".to_string(),
            params: Vec::new(),
            return_ty: TypeTag::Any,
            local_count: 0,
            code,
        });
        program
    }

    #[test]
    fn string_concat_on_add() {
        let program = one_function(
            vec![
                Instruction::PushConst(0),
                Instruction::PushConst(1),
                Instruction::Add,
                Instruction::ReturnValue,
            ],
            vec![
                Constant::Str("foo".to_string()),
                Constant::Str("bar".to_string()),
            ],
        );
        let mut instance = Instance::new(0);
        let result = Vm::new(&program).run(&mut instance, 0, Vec::new()).unwrap();
        assert_eq!(result, ScriptValue::Str("foobar".to_string()));
    }

    #[test]
    fn int_division_by_zero_faults() {
        let program = one_function(
            vec![
                Instruction::PushConst(0),
                Instruction::PushConst(1),
                Instruction::Div,
                Instruction::ReturnValue,
            ],
            vec![Constant::Int(1), Constant::Int(0)],
        );
        let mut instance = Instance::new(0);
        let err = Vm::new(&program)
            .run(&mut instance, 0, Vec::new())
            .unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn self_recursion_hits_depth_cap() {
        let mut program = Program::new("T".to_string());
        program.functions.push(FunctionDef {
            name: "loop_forever".to_string(),
            params: Vec::new(),
            return_ty: TypeTag::Any,
            local_count: 0,
            code: vec![Instruction::Call(0), Instruction::ReturnValue],
        });
        let mut instance = Instance::new(0);
        let err = Vm::new(&program)
            .run(&mut instance, 0, Vec::new())
            .unwrap_err();
        assert_eq!(err, RuntimeError::CallDepthExceeded);
    }

    #[test]
    fn bad_constant_index_faults() {
        let program = one_function(vec![Instruction::PushConst(9)], Vec::new());
        let mut instance = Instance::new(0);
        let err = Vm::new(&program)
            .run(&mut instance, 0, Vec::new())
            .unwrap_err();
        assert_eq!(err, RuntimeError::BadConstant { index: 9 });
    }
}
