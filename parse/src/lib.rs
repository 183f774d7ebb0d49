pub mod ast;
pub mod ast_parser;
pub mod error;
pub mod functions;
pub mod lexer;

pub use ast::{Expression, Factor, Summand};
pub use ast_parser::{Parser, is_parseable, parse};
pub use error::ParseError;
pub use functions::{FUNCTIONS, FunctionKind, FunctionRegistry};
