pub mod config;
pub mod environment;
pub mod error;
pub mod interpret;
pub mod stdlib;
pub mod types;
pub mod units;

use crate::{error::Error, types::Value};
use interpret::Interpreter;
use log::trace;
use quanta_syntax::{lex::Lexer, parse::Parser};

/// Lexes, parses and evaluates `source`, returning the value of the
/// program's last statement. Globals persist in `interpreter` between runs.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<Option<Value>, Error> {
    let lexer = Lexer::new(source);
    trace!("Lexing {source}");
    let tokens = lexer.lex_all()?;
    trace!("Parsing {tokens:#?}");
    let parser = Parser::new(&tokens);
    let root = parser.parse_all()?;
    trace!("Interpreting {root:#?}");
    Ok(interpreter.interpret(&root)?)
}
