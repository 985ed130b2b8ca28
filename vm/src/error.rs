use std::fmt;

use ebmacro_dsl::diagnostic::Diagnostic;

/// Runtime traps that halt a macro invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trap {
    DivideByZero,
    Overflow,
    UndeclaredVariable(String),
    UnknownMacro(String),
    UnsupportedIntrinsic(String),
    IndexOutOfRange { array: String, index: i64 },
    InvalidArgument(&'static str),
    TriggerBudgetExhausted(usize),
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::DivideByZero => write!(f, "divide by zero"),
            Trap::Overflow => write!(f, "integer overflow"),
            Trap::UndeclaredVariable(name) => write!(f, "undeclared variable: {name}"),
            Trap::UnknownMacro(name) => write!(f, "unknown macro: {name}"),
            Trap::UnsupportedIntrinsic(name) => write!(f, "unsupported intrinsic: {name}"),
            Trap::IndexOutOfRange { array, index } => {
                write!(f, "index {index} out of range for {array}")
            }
            Trap::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Trap::TriggerBudgetExhausted(n) => write!(f, "trigger budget of {n} exhausted"),
        }
    }
}

/// Errors produced by interpreter operations.
#[derive(Debug)]
pub enum VmError {
    /// A runtime trap occurred while a macro ran.
    Trap(Trap),
    /// The macro could not be loaded because its declarations are invalid.
    Declaration(Diagnostic),
    /// The macro is not in the correct state to be loaded.
    InvalidState(&'static str),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Trap(t) => write!(f, "trap: {t}"),
            VmError::Declaration(d) => write!(f, "declaration error: {d}"),
            VmError::InvalidState(msg) => write!(f, "invalid macro state: {msg}"),
        }
    }
}

impl std::error::Error for VmError {}

impl From<Trap> for VmError {
    fn from(t: Trap) -> Self {
        VmError::Trap(t)
    }
}

impl From<Diagnostic> for VmError {
    fn from(d: Diagnostic) -> Self {
        VmError::Declaration(d)
    }
}
