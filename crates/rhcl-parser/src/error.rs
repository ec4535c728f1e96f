//! Parser error types

use pest::error::{Error as PestError, InputLocation};
use thiserror::Error;

use crate::ast::Span;
use crate::parser::Rule;

/// Result type for parse operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse error type
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<PestError<Rule>>),

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Number out of range: {0}")]
    NumberOutOfRange(String),

    #[error("Invalid escape sequence: {0}")]
    InvalidEscape(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
}

impl ParseError {
    /// Source range of a syntax error, when pest reported one
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax(err) => Some(match err.location {
                InputLocation::Pos(pos) => Span::new(pos, pos),
                InputLocation::Span((start, end)) => Span::new(start, end),
            }),
            _ => None,
        }
    }
}

impl From<PestError<Rule>> for ParseError {
    fn from(err: PestError<Rule>) -> Self {
        ParseError::Syntax(Box::new(err))
    }
}
