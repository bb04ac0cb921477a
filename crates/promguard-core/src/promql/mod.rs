//! PromQL front end: tokenizer, parser, AST and printer.
//!
//! Parsing is panic-free: malformed input is reported as
//! `GateError::Parse` with the char offset of the offending token. Query
//! length and nesting depth are bounded, so neither the parser nor any later
//! walk over the tree can exhaust the stack.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;

pub use ast::Expr;
pub use parser::{parse_expr, parse_filter_matcher, parse_matcher, MAX_DEPTH, MAX_QUERY_BYTES};
