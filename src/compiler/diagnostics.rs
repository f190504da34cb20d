//! Structured compiler diagnostics.
//!
//! Diagnostics are kept in the order the compiler reported them and are
//! never reordered. Formatting of multi-diagnostic reports is left to the
//! consumer; the engine only renders them when writing its error log.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One compiler-reported issue tied to a unit and an optional line.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Name of the unit being compiled.
    pub unit: String,
    /// 1-based source line, when known.
    pub line: Option<u32>,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(unit: &str, line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.to_string(),
            line,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(unit: &str, line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.to_string(),
            line,
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "{}[{}:{}]: {}",
                self.severity, self.unit, line, self.message
            ),
            None => write!(f, "{}[{}]: {}", self.severity, self.unit, self.message),
        }
    }
}
