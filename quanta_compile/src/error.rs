use std::fmt::Display;

use quanta_syntax::token::Position;
use thiserror::Error;

/// Any failure of a run, from lexing to evaluation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] quanta_syntax::error::Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A function call that was active when a runtime error occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub call_site: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorMsg {
    // Name resolution
    UndefinedVar,
    UndefinedFunc,
    // Calls
    NotCallable,
    TooFewArgs,
    TooManyArgs,
    ArgTypeMismatch,
    ReturnTypeMismatch,
    // Bindings
    DeclaredTypeMismatch,
    ReassignTypeMismatch,
    // Operations
    UnitMismatch,
    DivisionByZero,
    IntegerOverflow,
    InvalidOperation,
    InvalidUnaryOperation,
    InvalidCondition,
    InvalidMagnitude,
    MissingValue,
    // Control flow
    SignalOutsideLoop,
    // Call stack
    StackUnderflow,
    RecursionLimit,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UndefinedVar => "variable not defined",
            Self::UndefinedFunc => "function not defined",
            Self::NotCallable => "not a function",
            Self::TooFewArgs => "too few arguments in function call",
            Self::TooManyArgs => "too many arguments in function call",
            Self::ArgTypeMismatch => "argument type mismatch",
            Self::ReturnTypeMismatch => "return type mismatch",
            Self::DeclaredTypeMismatch => "declared type mismatch",
            Self::ReassignTypeMismatch => "cannot change the type of a variable",
            Self::UnitMismatch => "units do not match",
            Self::DivisionByZero => "division by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::InvalidOperation => "invalid operation",
            Self::InvalidUnaryOperation => "invalid unary operation",
            Self::InvalidCondition => "condition must be bool or numeric",
            Self::InvalidMagnitude => "magnitude must be int or double",
            Self::MissingValue => "expression produced no value",
            Self::SignalOutsideLoop => "control flow statement outside of its construct",
            Self::StackUnderflow => "call stack underflow",
            Self::RecursionLimit => "maximum call depth exceeded",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub msg: ErrorMsg,
    pub detail: String,
    pub pos: Option<Position>,
    /// Innermost call first, always ending with the top level.
    pub traceback: Vec<Frame>,
}

impl std::error::Error for RuntimeError {}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "Runtime error at {pos}: {}", self.msg)?,
            None => write!(f, "Runtime error: {}", self.msg)?,
        }
        if !self.detail.is_empty() {
            write!(f, ", {}", self.detail)?;
        }
        if !self.traceback.is_empty() {
            f.write_str("\nTraceback (innermost call first):")?;
            for frame in &self.traceback {
                if frame.name == crate::environment::MAIN {
                    write!(f, "\n  in {}", frame.name)?;
                } else {
                    write!(f, "\n  in {} called at {}", frame.name, frame.call_site)?;
                }
            }
        }
        Ok(())
    }
}

impl RuntimeError {
    /// Records where the error happened, keeping the innermost location.
    pub fn at(mut self, pos: Option<Position>) -> Self {
        if self.pos.is_none() {
            self.pos = pos;
        }
        self
    }

    /// Records the call stack, keeping the one seen closest to the failure.
    pub fn with_traceback(mut self, traceback: Vec<Frame>) -> Self {
        if self.traceback.is_empty() {
            self.traceback = traceback;
        }
        self
    }
}

pub fn runtime_error(msg: ErrorMsg, detail: impl Display) -> RuntimeError {
    RuntimeError {
        msg,
        detail: detail.to_string(),
        pos: None,
        traceback: vec![],
    }
}
