//! Tokens produced by the lexer.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Span;

/// Why a construct was closed. Only informative; the tree builder treats all
/// closes alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// An indentation level was popped.
    Dedent,
    /// A line at an existing level closed constructs deeper than it.
    SameLevel,
    /// Constructs opened on a line that cannot own the next block.
    EndOfLine,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Start of a polyadic hot-word construct.
    Open,
    Close(CloseReason),
    Symbol,
    /// Balanced host-language expression text, or `()` for the empty group.
    Embedded,
    /// `:`-prefixed control word.
    Key,
    /// `head:` immediately followed by its single operand.
    Unary,
    /// Head of a `head:` marker followed by whitespace, emitted right after
    /// its `Open`. Read exactly like a `Symbol`.
    Polyadic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// 1-based line of the first character.
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            line,
        }
    }

    /// True for `Open` and `Close`, which carry no form of their own.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, TokenKind::Open | TokenKind::Close(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Open => f.write_str("{{"),
            TokenKind::Close(reason) => write!(f, "]{reason:?}]"),
            TokenKind::Unary => write!(f, "{}:", self.text),
            _ => f.write_str(&self.text),
        }
    }
}
