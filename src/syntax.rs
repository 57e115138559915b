//! Syntax module for the Hebi reader.
//!
//! Text flows through three stages, each a lazy iterator over the previous:
//! [`lexer::Lexer`] turns indentation, hot-word markers and embedded
//! expressions into a flat token stream, and [`parser::Parser`] folds the
//! stream into nested [`Form`](crate::ast::Form)s. The embedded-expression
//! grammar the lexer consults lives in [`embedded`].

pub mod embedded;
pub mod lexer;
pub mod parser;
pub mod token;

use serde::{Deserialize, Serialize};

pub use embedded::{BracketGrammar, EmbeddedError, ExpressionGrammar, PythonGrammar};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{CloseReason, Token, TokenKind};

/// Represents a byte span in the source code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
