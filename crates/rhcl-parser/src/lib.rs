//! rhcl Parser
//!
//! This crate provides a parser for rhcl configuration expressions.
//! It uses pest for parsing and produces an AST representation that the
//! runtime's evaluation scope walks.

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::*;
pub use error::{ParseError, ParseResult};
pub use parser::{parse_expression, parse_number, MAX_NUMBER_SCALE};
