//! FILENAME: parser/src/lib.rs
//! PURPOSE: Library root for the derived-column expression parser.
//! CONTEXT: This module exposes the lexer, parser, and AST components
//! needed to convert expression strings such as `sales_amount / quantity`
//! into trees the engine evaluates once per row.
//!
//! PIPELINE: Expression String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /
//! - Column references: bare (`qty`) or backtick-quoted (`` `unit price` ``)
//! - Numeric literals, including exponents: 1.1, 2e3
//! - Parentheses for grouping
//! - Unary negation: -discount

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use token::Token;
