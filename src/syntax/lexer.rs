//! # Hebi Lexer
//!
//! Turns source text into a flat stream of [`Token`]s, lazily.
//!
//! Three things make the lexer context-sensitive:
//!
//! - **Indentation.** A stack of column widths, strictly increasing from a
//!   base of 0. A deeper line pushes a level, but only when some hot-word
//!   construct is still open to own the block; a shallower line pops levels
//!   and must land exactly on one of them.
//! - **Hot words.** `head:` followed by whitespace opens a polyadic construct
//!   that lasts until reconciliation closes it; `head:` glued to the next
//!   character is a unary marker.
//! - **Embedded expressions.** Brackets and string literals are accumulated up
//!   to each occurrence of their terminator and re-checked with the
//!   [`ExpressionGrammar`] until it accepts the text.
//!
//! ## Reconciliation
//!
//! With `depth = indents.len() - 1`, the lexer keeps `opens >= depth`:
//!
//! - at every line start, after pushing or popping, close while
//!   `opens > depth`;
//! - at every line end, close while `opens > depth + 1`, so at most one of the
//!   constructs opened on a line (the outermost still open) can own the next
//!   indented block;
//! - at end of input, close everything.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::embedded::{terminator, EmbeddedError, ExpressionGrammar, PythonGrammar, STRING_START};
use super::token::{CloseReason, Token, TokenKind};
use super::Span;
use crate::config::DEFAULT_NO_OP_MARKER;
use crate::diagnostics::{to_error_source, SourceArc};
use crate::{err_ctx, HebiError};

static DEFAULT_GRAMMAR: PythonGrammar = PythonGrammar;

/// `(` with nothing but spaces and newlines before its `)`.
static EMPTY_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([ \r\n]*\)").expect("valid regex"));

fn is_word_char(c: char) -> bool {
    !(c.is_whitespace()
        || matches!(c, ':' | '#' | '\'' | '"' | '(' | ')' | '[' | ']' | '{' | '}'))
}

pub struct Lexer<'a> {
    text: String,
    pos: usize,
    line: usize,
    at_line_start: bool,
    indents: Vec<usize>,
    opens: usize,
    queue: VecDeque<Token>,
    grammar: &'a dyn ExpressionGrammar,
    no_op_marker: String,
    name: String,
    done: bool,
}

impl Lexer<'static> {
    /// A lexer with the host-expression grammar and the `pass` no-op marker.
    pub fn new(source: &str) -> Self {
        Lexer::with_grammar(source, &DEFAULT_GRAMMAR, DEFAULT_NO_OP_MARKER)
    }
}

impl<'a> Lexer<'a> {
    pub fn with_grammar(
        source: &str,
        grammar: &'a dyn ExpressionGrammar,
        no_op_marker: &str,
    ) -> Self {
        let mut text = source.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self {
            text,
            pos: 0,
            line: 1,
            at_line_start: true,
            indents: vec![0],
            opens: 0,
            queue: VecDeque::new(),
            grammar,
            no_op_marker: no_op_marker.to_string(),
            name: "<input>".to_string(),
            done: false,
        }
    }

    /// Names the source in diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The current indentation stack, base level first.
    pub fn indents(&self) -> &[usize] {
        &self.indents
    }

    /// Number of polyadic constructs currently open.
    pub fn open_constructs(&self) -> usize {
        self.opens
    }

    fn depth(&self) -> usize {
        self.indents.len() - 1
    }

    fn source(&self) -> SourceArc {
        to_error_source(&self.name, &self.text)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<String>, start: usize, end: usize) {
        self.queue
            .push_back(Token::new(kind, text, Span::new(start, end), self.line));
    }

    fn close(&mut self, reason: CloseReason) {
        self.opens -= 1;
        self.emit(TokenKind::Close(reason), "", self.pos, self.pos);
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    fn advance(&mut self) -> Result<(), HebiError> {
        if self.pos >= self.text.len() {
            while self.opens > 0 {
                self.close(CloseReason::EndOfInput);
            }
            self.done = true;
            return Ok(());
        }
        if self.at_line_start {
            self.at_line_start = false;
            return self.line_start();
        }
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(());
        };
        match c {
            '\n' => {
                self.end_of_line();
                self.pos += 1;
                self.line += 1;
                self.at_line_start = true;
            }
            ' ' | '\r' => self.pos += 1,
            '#' => self.skip_comment(),
            '\t' => {
                return Err(err_ctx!(
                    Lexical,
                    "tab characters are not allowed outside embedded expressions",
                    &self.source(),
                    Span::new(start, start + 1)
                )
                .at_line(self.line))
            }
            ')' | ']' | '}' => {
                return Err(err_ctx!(
                    Lexical,
                    format!("unexpected '{c}' without an open bracket"),
                    &self.source(),
                    Span::new(start, start + 1)
                )
                .at_line(self.line))
            }
            c if c.is_whitespace() => {
                return Err(err_ctx!(
                    Lexical,
                    format!("unexpected whitespace character {c:?}"),
                    &self.source(),
                    Span::new(start, start + c.len_utf8())
                )
                .at_line(self.line))
            }
            '(' | '[' | '{' => return self.embedded(),
            _ if STRING_START.is_match(&self.text[start..]) => return self.embedded(),
            _ => return self.word(),
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        match self.text[self.pos..].find('\n') {
            Some(offset) => self.pos += offset,
            None => self.pos = self.text.len(),
        }
    }

    // ========================================================================
    // INDENTATION
    // ========================================================================

    fn line_start(&mut self) -> Result<(), HebiError> {
        let rest = &self.text[self.pos..];
        let width = rest.len() - rest.trim_start_matches(' ').len();
        match rest[width..].chars().next() {
            // Blank and comment-only lines never change indentation.
            None | Some('\n') | Some('\r') | Some('#') => {}
            Some(_) => self.reconcile(width)?,
        }
        self.pos += width;
        Ok(())
    }

    fn line_text(&self) -> &str {
        let rest = &self.text[self.pos..];
        rest.split('\n').next().unwrap_or_default().trim_end_matches('\r')
    }

    fn indentation_error(&self, message: &str) -> HebiError {
        let text = self.line_text();
        let span = Span::new(self.pos, self.pos + text.len());
        err_ctx!(
            Indentation,
            format!("{message} (line {}: {:?})", self.line, text),
            &self.source(),
            span
        )
        .at_line(self.line)
    }

    fn reconcile(&mut self, width: usize) -> Result<(), HebiError> {
        let top = self.indents.last().copied().unwrap_or_default();
        let mut popped = 0;
        if width > top {
            if self.opens <= self.depth() {
                return Err(self.indentation_error("new indent without an opening construct"));
            }
            self.indents.push(width);
        } else if width < top {
            while self.indents.last().is_some_and(|&level| width < level) {
                self.indents.pop();
                popped += 1;
            }
            if self.indents.last() != Some(&width) {
                return Err(
                    self.indentation_error("unindent does not match any outer indentation level")
                );
            }
        }
        while self.opens > self.depth() {
            if popped > 0 {
                popped -= 1;
                self.close(CloseReason::Dedent);
            } else {
                self.close(CloseReason::SameLevel);
            }
        }
        trace!(indents = ?self.indents, opens = self.opens, "line start");
        Ok(())
    }

    fn end_of_line(&mut self) {
        while self.opens > self.depth() + 1 {
            self.close(CloseReason::EndOfLine);
        }
    }

    // ========================================================================
    // WORDS AND MARKERS
    // ========================================================================

    fn word(&mut self) -> Result<(), HebiError> {
        let start = self.pos;
        if self.peek() == Some(':') {
            self.pos += 1;
        }
        while let Some(c) = self.peek().filter(|&c| is_word_char(c)) {
            self.pos += c.len_utf8();
        }
        if self.pos == start {
            let width = self.peek().map_or(1, char::len_utf8);
            return Err(err_ctx!(
                Lexical,
                format!("unrecognized character {:?}", self.peek().unwrap_or_default()),
                &self.source(),
                Span::new(start, start + width)
            )
            .at_line(self.line));
        }
        let word = self.text[start..self.pos].to_string();

        if self.peek() != Some(':') {
            let kind = if word.starts_with(':') {
                TokenKind::Key
            } else {
                TokenKind::Symbol
            };
            self.emit(kind, word, start, self.pos);
            return Ok(());
        }

        // Marker: the word is the head, the colon is consumed.
        self.pos += 1;
        let end = self.pos;
        match self.peek() {
            Some(c) if !c.is_whitespace() => self.emit(TokenKind::Unary, word, start, end),
            _ => {
                self.opens += 1;
                self.emit(TokenKind::Open, "", start, end);
                if word != self.no_op_marker {
                    self.emit(TokenKind::Polyadic, word, start, end - 1);
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // EMBEDDED EXPRESSIONS
    // ========================================================================

    fn embedded(&mut self) -> Result<(), HebiError> {
        let start = self.pos;
        let rest = &self.text[start..];

        if let Some(m) = EMPTY_GROUP.find(rest) {
            let newlines = m.as_str().matches('\n').count();
            self.pos += m.end();
            self.emit(TokenKind::Embedded, "()", start, self.pos);
            self.line += newlines;
            return Ok(());
        }

        let opener = match STRING_START.find(rest) {
            Some(m) => m.as_str(),
            None => &rest[..1],
        };
        let term = terminator(opener);
        let mut search_from = start + opener.len();
        loop {
            let Some(offset) = self.text[search_from..].find(term) else {
                // No terminator left: the rest of the input is incomplete
                // unless it is already malformed.
                let span = Span::new(start, self.text.len());
                if let Err(EmbeddedError::Invalid(message)) = self.grammar.validate(&self.text[start..]) {
                    return Err(err_ctx!(Syntax, message, &self.source(), span).at_line(self.line));
                }
                return Err(err_ctx!(
                    Incomplete,
                    format!("unterminated embedded expression starting with {opener:?}"),
                    &self.source(),
                    span
                )
                .at_line(self.line));
            };
            let end = search_from + offset + term.len();
            let candidate = &self.text[start..end];
            match self.grammar.validate(candidate) {
                Ok(()) => {
                    let candidate = candidate.to_string();
                    let newlines = candidate.matches('\n').count();
                    self.pos = end;
                    self.emit(TokenKind::Embedded, candidate, start, end);
                    self.line += newlines;
                    return Ok(());
                }
                Err(EmbeddedError::Incomplete(_)) => search_from = end,
                Err(EmbeddedError::Invalid(message)) => {
                    return Err(err_ctx!(Syntax, message, &self.source(), Span::new(start, end))
                        .at_line(self.line))
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, HebiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                trace!(kind = ?token.kind, text = %token.text, line = token.line, "token");
                return Some(Ok(token));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.advance() {
                self.done = true;
                self.queue.clear();
                return Some(Err(e));
            }
        }
    }
}

/// Tokenizes a whole source text with the default grammar.
pub fn lex(source: &str) -> Result<Vec<Token>, HebiError> {
    Lexer::new(source).collect()
}
