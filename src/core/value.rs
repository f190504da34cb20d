//! Runtime values and the declared-type vocabulary.

use num_enum::TryFromPrimitive;
use std::fmt;

/// A declared type in memscript source, also used as the resolution
/// signature of an entry point: lookup matches the ordered parameter
/// tags exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeTag {
    Void = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Str = 4,
    StrList = 5,
    Any = 6,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Void => "void",
            TypeTag::Bool => "bool",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "string",
            TypeTag::StrList => "string[]",
            TypeTag::Any => "any",
        };
        f.write_str(name)
    }
}

/// A runtime value. The VM is dynamically typed; declared types only
/// matter for entry-point resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// The absence of a value; what `void` methods produce.
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    StrList(Vec<String>),
}

impl ScriptValue {
    /// The type tag of this value, as used for signature inference.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            ScriptValue::Unit => TypeTag::Void,
            ScriptValue::Bool(_) => TypeTag::Bool,
            ScriptValue::Int(_) => TypeTag::Int,
            ScriptValue::Float(_) => TypeTag::Float,
            ScriptValue::Str(_) => TypeTag::Str,
            ScriptValue::StrList(_) => TypeTag::StrList,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Unit => f.write_str("()"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Float(x) => write!(f, "{x}"),
            ScriptValue::Str(s) => f.write_str(s),
            ScriptValue::StrList(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::Str(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::Str(v)
    }
}

impl From<Vec<String>> for ScriptValue {
    fn from(v: Vec<String>) -> Self {
        ScriptValue::StrList(v)
    }
}
