//! Bytecode instruction set and the binary artifact format.
//!
//! A compiled unit is a [`Program`]: a constant pool, a field table, and a
//! function table whose bodies are flat instruction streams. [`encode`]
//! serializes a program into the byte buffer carried by a
//! `CompiledArtifact`; [`decode`] is the loader-side inverse and rejects
//! anything that is not a well-formed artifact.

use crate::core::value::TypeTag;
use num_enum::TryFromPrimitive;
use std::fmt;
use thiserror::Error;

/// First bytes of every artifact.
pub const MAGIC: [u8; 4] = *b"MSBC";
/// Current artifact format version.
pub const FORMAT_VERSION: u16 = 1;

/// Name of the synthesized field-initializer function. Running it is what
/// "instantiating" a unit means; it exists only when a field declares an
/// initializer expression.
pub const INIT_FUNCTION: &str = "__init__";

/// Bytecode instructions executed by the VM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// Push constant-pool entry.
    PushConst(u16),
    /// Push the unit value.
    PushUnit,
    Pop,
    LoadLocal(u16),
    StoreLocal(u16),
    LoadField(u16),
    StoreField(u16),
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Unconditional jump to an instruction index within the function.
    Jump(u16),
    /// Pop a bool; jump when false.
    JumpIfFalse(u16),
    /// Call the function at the given index on the same instance.
    /// Arguments are on the stack, last on top.
    Call(u16),
    /// Pop base and index, push the indexed element.
    Index,
    /// Pop a value, print it to stdout, push unit.
    Print,
    /// Return the unit value.
    Return,
    /// Pop the top of stack and return it.
    ReturnValue,
}

/// Wire opcode for each instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    PushConst = 0,
    PushUnit = 1,
    Pop = 2,
    LoadLocal = 3,
    StoreLocal = 4,
    LoadField = 5,
    StoreField = 6,
    Add = 7,
    Sub = 8,
    Mul = 9,
    Div = 10,
    Mod = 11,
    Neg = 12,
    Not = 13,
    Eq = 14,
    Ne = 15,
    Lt = 16,
    Le = 17,
    Gt = 18,
    Ge = 19,
    Jump = 20,
    JumpIfFalse = 21,
    Call = 22,
    Index = 23,
    Print = 24,
    Return = 25,
    ReturnValue = 26,
}

impl Instruction {
    fn opcode(&self) -> Opcode {
        match self {
            Instruction::PushConst(_) => Opcode::PushConst,
            Instruction::PushUnit => Opcode::PushUnit,
            Instruction::Pop => Opcode::Pop,
            Instruction::LoadLocal(_) => Opcode::LoadLocal,
            Instruction::StoreLocal(_) => Opcode::StoreLocal,
            Instruction::LoadField(_) => Opcode::LoadField,
            Instruction::StoreField(_) => Opcode::StoreField,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::Mod => Opcode::Mod,
            Instruction::Neg => Opcode::Neg,
            Instruction::Not => Opcode::Not,
            Instruction::Eq => Opcode::Eq,
            Instruction::Ne => Opcode::Ne,
            Instruction::Lt => Opcode::Lt,
            Instruction::Le => Opcode::Le,
            Instruction::Gt => Opcode::Gt,
            Instruction::Ge => Opcode::Ge,
            Instruction::Jump(_) => Opcode::Jump,
            Instruction::JumpIfFalse(_) => Opcode::JumpIfFalse,
            Instruction::Call(_) => Opcode::Call,
            Instruction::Index => Opcode::Index,
            Instruction::Print => Opcode::Print,
            Instruction::Return => Opcode::Return,
            Instruction::ReturnValue => Opcode::ReturnValue,
        }
    }

    fn operand(&self) -> Option<u16> {
        match self {
            Instruction::PushConst(n)
            | Instruction::LoadLocal(n)
            | Instruction::StoreLocal(n)
            | Instruction::LoadField(n)
            | Instruction::StoreField(n)
            | Instruction::Jump(n)
            | Instruction::JumpIfFalse(n)
            | Instruction::Call(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            Some(n) => write!(f, "{:?} {}", self.opcode(), n),
            None => write!(f, "{:?}", self.opcode()),
        }
    }
}

/// Constant-pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// A compiled function body plus its resolution signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    /// Ordered declared parameter types; the resolution signature.
    pub params: Vec<TypeTag>,
    pub return_ty: TypeTag,
    /// Total local slot count, parameters included.
    pub local_count: u16,
    pub code: Vec<Instruction>,
}

/// An instance field slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeTag,
}

/// A fully compiled unit, the in-memory form of an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Self-declared unit name; the loader checks it against the
    /// artifact name.
    pub name: String,
    pub constants: Vec<Constant>,
    pub fields: Vec<FieldDef>,
    pub functions: Vec<FunctionDef>,
}

impl Program {
    pub fn new(name: String) -> Self {
        Self {
            name,
            constants: Vec::new(),
            fields: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Index of the synthesized initializer, when the unit has one.
    pub fn init_function(&self) -> Option<usize> {
        self.functions.iter().position(|f| f.name == INIT_FUNCTION)
    }
}

// =========================================
// Encoding
// =========================================

/// A program too large for the artifact format's fixed-width counters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Too many {what} ({count}, limit {limit})")]
    CountOverflow {
        what: &'static str,
        count: usize,
        limit: usize,
    },
}

/// Serialize a program into artifact bytes.
pub fn encode(program: &Program) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());

    write_str(&mut out, &program.name)?;

    write_count(&mut out, "constants", program.constants.len())?;
    for constant in &program.constants {
        match constant {
            Constant::Int(v) => {
                out.push(0);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Constant::Float(v) => {
                out.push(1);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Constant::Str(s) => {
                out.push(2);
                write_str(&mut out, s)?;
            }
            Constant::Bool(v) => {
                out.push(3);
                out.push(u8::from(*v));
            }
        }
    }

    write_count(&mut out, "fields", program.fields.len())?;
    for field in &program.fields {
        write_str(&mut out, &field.name)?;
        out.push(field.ty as u8);
    }

    write_count(&mut out, "functions", program.functions.len())?;
    for function in &program.functions {
        write_str(&mut out, &function.name)?;
        out.push(function.return_ty as u8);
        write_count(&mut out, "parameters", function.params.len())?;
        for param in &function.params {
            out.push(*param as u8);
        }
        out.extend_from_slice(&function.local_count.to_le_bytes());
        let code_len = u32::try_from(function.code.len()).map_err(|_| {
            EncodeError::CountOverflow {
                what: "instructions",
                count: function.code.len(),
                limit: u32::MAX as usize,
            }
        })?;
        out.extend_from_slice(&code_len.to_le_bytes());
        for instruction in &function.code {
            out.push(instruction.opcode() as u8);
            if let Some(operand) = instruction.operand() {
                out.extend_from_slice(&operand.to_le_bytes());
            }
        }
    }

    Ok(out)
}

fn write_count(out: &mut Vec<u8>, what: &'static str, count: usize) -> Result<(), EncodeError> {
    let count = u16::try_from(count).map_err(|_| EncodeError::CountOverflow {
        what,
        count,
        limit: u16::MAX as usize,
    })?;
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

fn write_str(out: &mut Vec<u8>, s: &str) -> Result<(), EncodeError> {
    let len = u16::try_from(s.len()).map_err(|_| EncodeError::CountOverflow {
        what: "string bytes",
        count: s.len(),
        limit: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

// =========================================
// Decoding
// =========================================

/// The ways artifact bytes can fail to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Not a memscript artifact (bad magic)")]
    BadMagic,

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("Truncated artifact: needed {needed} more byte(s) reading {what}")]
    Truncated { what: &'static str, needed: usize },

    #[error("Invalid {what} tag {value}")]
    InvalidTag { what: &'static str, value: u8 },

    #[error("String data is not valid UTF-8")]
    InvalidUtf8,
}

/// Deserialize artifact bytes back into a program.
pub fn decode(bytes: &[u8]) -> Result<Program, DecodeError> {
    let mut reader = Reader { bytes, pos: 0 };

    let magic = reader.take(4, "magic")?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = reader.take_u16("version")?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let name = reader.take_str("unit name")?;
    let mut program = Program::new(name);

    let constant_count = reader.take_u16("constant count")?;
    for _ in 0..constant_count {
        let tag = reader.take_u8("constant tag")?;
        let constant = match tag {
            0 => Constant::Int(i64::from_le_bytes(
                reader.take(8, "int constant")?.try_into().unwrap(),
            )),
            1 => Constant::Float(f64::from_le_bytes(
                reader.take(8, "float constant")?.try_into().unwrap(),
            )),
            2 => Constant::Str(reader.take_str("string constant")?),
            3 => Constant::Bool(reader.take_u8("bool constant")? != 0),
            value => {
                return Err(DecodeError::InvalidTag {
                    what: "constant",
                    value,
                });
            }
        };
        program.constants.push(constant);
    }

    let field_count = reader.take_u16("field count")?;
    for _ in 0..field_count {
        let name = reader.take_str("field name")?;
        let ty = reader.take_type_tag("field type")?;
        program.fields.push(FieldDef { name, ty });
    }

    let function_count = reader.take_u16("function count")?;
    for _ in 0..function_count {
        let name = reader.take_str("function name")?;
        let return_ty = reader.take_type_tag("return type")?;
        let param_count = reader.take_u16("parameter count")?;
        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(reader.take_type_tag("parameter type")?);
        }
        let local_count = reader.take_u16("local count")?;
        let code_len = reader.take_u32("code length")? as usize;
        // Each instruction occupies at least one byte, so a declared count
        // beyond the remaining input can never decode; reject it before
        // sizing the buffer after it.
        if code_len > reader.remaining() {
            return Err(DecodeError::Truncated {
                what: "code",
                needed: code_len - reader.remaining(),
            });
        }
        let mut code = Vec::with_capacity(code_len);
        for _ in 0..code_len {
            code.push(reader.take_instruction()?);
        }
        program.functions.push(FunctionDef {
            name,
            params,
            return_ty,
            local_count,
            code,
        });
    }

    Ok(program)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(DecodeError::Truncated {
                what,
                needed: n - remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, what)?[0])
    }

    fn take_u16(&mut self, what: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take(2, what)?.try_into().unwrap()))
    }

    fn take_u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take(4, what)?.try_into().unwrap()))
    }

    fn take_str(&mut self, what: &'static str) -> Result<String, DecodeError> {
        let len = self.take_u16(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn take_type_tag(&mut self, what: &'static str) -> Result<TypeTag, DecodeError> {
        let value = self.take_u8(what)?;
        TypeTag::try_from(value).map_err(|_| DecodeError::InvalidTag { what, value })
    }

    fn take_instruction(&mut self) -> Result<Instruction, DecodeError> {
        let byte = self.take_u8("opcode")?;
        let opcode = Opcode::try_from(byte).map_err(|_| DecodeError::InvalidTag {
            what: "opcode",
            value: byte,
        })?;

        let instruction = match opcode {
            Opcode::PushConst => Instruction::PushConst(self.take_u16("operand")?),
            Opcode::PushUnit => Instruction::PushUnit,
            Opcode::Pop => Instruction::Pop,
            Opcode::LoadLocal => Instruction::LoadLocal(self.take_u16("operand")?),
            Opcode::StoreLocal => Instruction::StoreLocal(self.take_u16("operand")?),
            Opcode::LoadField => Instruction::LoadField(self.take_u16("operand")?),
            Opcode::StoreField => Instruction::StoreField(self.take_u16("operand")?),
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::Mul => Instruction::Mul,
            Opcode::Div => Instruction::Div,
            Opcode::Mod => Instruction::Mod,
            Opcode::Neg => Instruction::Neg,
            Opcode::Not => Instruction::Not,
            Opcode::Eq => Instruction::Eq,
            Opcode::Ne => Instruction::Ne,
            Opcode::Lt => Instruction::Lt,
            Opcode::Le => Instruction::Le,
            Opcode::Gt => Instruction::Gt,
            Opcode::Ge => Instruction::Ge,
            Opcode::Jump => Instruction::Jump(self.take_u16("operand")?),
            Opcode::JumpIfFalse => Instruction::JumpIfFalse(self.take_u16("operand")?),
            Opcode::Call => Instruction::Call(self.take_u16("operand")?),
            Opcode::Index => Instruction::Index,
            Opcode::Print => Instruction::Print,
            Opcode::Return => Instruction::Return,
            Opcode::ReturnValue => Instruction::ReturnValue,
        };
        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program() -> Program {
        let mut program = Program::new("Sample".to_string());
        program.constants.push(Constant::Str("hi".to_string()));
        program.functions.push(FunctionDef {
            name: "greet".to_string(),
            params: vec![TypeTag::Str],
            return_ty: TypeTag::Str,
            local_count: 1,
            code: vec![Instruction::PushConst(0), Instruction::ReturnValue],
        });
        program
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = encode(&sample_program()).unwrap();
        bytes[0] = b'X';
        assert_eq!(decode(&bytes), Err(DecodeError::BadMagic));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = encode(&sample_program()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(decode(cut), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = encode(&sample_program()).unwrap();
        bytes[4] = 0xFF;
        bytes[5] = 0xFF;
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn oversized_declared_code_length_is_rejected() {
        let mut bytes = encode(&sample_program()).unwrap();
        // The sample's only function ends the buffer with a 4-byte code
        // count followed by 4 bytes of code.
        let at = bytes.len() - 8;
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn decoded_program_matches_encoded() {
        let program = sample_program();
        let bytes = encode(&program).unwrap();
        assert_eq!(decode(&bytes).unwrap(), program);
    }
}
