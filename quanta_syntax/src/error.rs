use std::fmt::Display;

use thiserror::Error;

use crate::{
    parse::MAX_NESTING_DEPTH,
    token::{Position, Token},
};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    #[error("Lex error at {pos}: illegal character '{illegal_char}'")]
    Lex { illegal_char: char, pos: Position },
    #[error("Syntax error at {pos}: expected {expected}, found {found}")]
    Syntax {
        pos: Position,
        expected: String,
        found: String,
    },
}

#[derive(Debug)]
pub enum ErrorMsg {
    ExpectedExpression,
    ExpectedType,
    ExpectedReturnType,
    ExpectedUnitNumerator,
    ExpectedMagnitude,
    IntOutOfRange,
    DoubleOutOfRange,
    NestingTooDeep,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::ExpectedExpression => "expression",
            Self::ExpectedType => "one of int, double, bool, string, phys, unit",
            Self::ExpectedReturnType => "a type or void",
            Self::ExpectedUnitNumerator => "identifier or 1",
            Self::ExpectedMagnitude => "int or double value",
            Self::IntOutOfRange => "integer literal within 64-bit range",
            Self::DoubleOutOfRange => "finite double literal",
            Self::NestingTooDeep => {
                return write!(f, "expression nested at most {MAX_NESTING_DEPTH} levels deep")
            }
        };
        f.write_str(msg)
    }
}

pub fn syntax_error(token: &Token, expected: impl Display) -> Error {
    Error::Syntax {
        pos: token.span.start,
        expected: expected.to_string(),
        found: token.to_string(),
    }
}
