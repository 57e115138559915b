//! Embedded host-language expressions.
//!
//! The lexer hands every candidate span of an embedded expression to an
//! [`ExpressionGrammar`]. The grammar answers one of three things: the text is
//! a complete expression, it is a prefix of one (keep accumulating), or it can
//! never become one. [`BracketGrammar`] is the structural grammar:
//! balanced brackets, string literals with prefixes, triple quotes and escapes,
//! and `#` comments inside brackets. [`PythonGrammar`] is the default: it
//! runs the structural check and then parses the text as a host expression.

use once_cell::sync::Lazy;
use regex::Regex;
use rustpython_parser::lexer::LexicalErrorType;
use rustpython_parser::{Mode, ParseErrorType};

/// Why a candidate was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedError {
    /// The text may still become valid with more input.
    Incomplete(String),
    /// The text is malformed no matter what follows.
    Invalid(String),
}

pub trait ExpressionGrammar {
    /// Checks whether `candidate` is exactly one complete expression.
    fn validate(&self, candidate: &str) -> Result<(), EmbeddedError>;
}

/// Structural grammar for bracketed expressions and string literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct BracketGrammar;

/// Host-expression grammar.
///
/// Structural incompleteness is decided by [`BracketGrammar`]. Text that is
/// balanced must then parse as exactly one expression; a parse that runs off
/// the end of input is still incomplete, every other parse error is final.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonGrammar;

impl ExpressionGrammar for PythonGrammar {
    fn validate(&self, candidate: &str) -> Result<(), EmbeddedError> {
        BracketGrammar.validate(candidate)?;
        match rustpython_parser::parse(candidate, Mode::Expression, "<embedded>") {
            Ok(_) => Ok(()),
            Err(err) if runs_off_end(&err.error) => {
                Err(EmbeddedError::Incomplete(err.error.to_string()))
            }
            Err(err) => Err(EmbeddedError::Invalid(err.error.to_string())),
        }
    }
}

fn runs_off_end(error: &ParseErrorType) -> bool {
    matches!(
        error,
        ParseErrorType::Eof | ParseErrorType::Lexical(LexicalErrorType::Eof)
    )
}

/// String prefix and opening quote at the start of a literal.
pub(crate) static STRING_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:[rR][bfBF]?|[bfBF][rR]?|[uU])?(?:'''|"""|'|")"#).expect("valid regex")
});

/// The text that ends a construct started by `opener`.
///
/// `opener` is either a bracket or a string start such as `rb'''`.
pub(crate) fn terminator(opener: &str) -> &'static str {
    for quote in ["'''", "\"\"\"", "'", "\""] {
        if opener.ends_with(quote) {
            return quote;
        }
    }
    match opener {
        "(" => ")",
        "[" => "]",
        _ => "}",
    }
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

impl ExpressionGrammar for BracketGrammar {
    fn validate(&self, candidate: &str) -> Result<(), EmbeddedError> {
        let chars: Vec<char> = candidate.chars().collect();
        let mut stack: Vec<char> = Vec::new();
        let mut finished = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if finished {
                if !c.is_whitespace() {
                    return Err(EmbeddedError::Invalid(format!(
                        "unexpected '{c}' after complete expression"
                    )));
                }
                i += 1;
                continue;
            }
            match c {
                '(' | '[' | '{' => stack.push(closer(c)),
                ')' | ']' | '}' => match stack.pop() {
                    Some(expected) if expected == c => finished = stack.is_empty(),
                    Some(expected) => {
                        return Err(EmbeddedError::Invalid(format!(
                            "closing '{c}' does not match '{expected}'"
                        )))
                    }
                    None => return Err(EmbeddedError::Invalid(format!("unmatched '{c}'"))),
                },
                '\'' | '"' => {
                    i = scan_string(&chars, i)?;
                    finished = stack.is_empty();
                    continue;
                }
                '#' if !stack.is_empty() => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '\\' => {
                    if chars.get(i + 1) != Some(&'\n') {
                        return Err(EmbeddedError::Invalid(
                            "unexpected character after line continuation".to_string(),
                        ));
                    }
                    i += 1;
                }
                _ if stack.is_empty() && !c.is_alphabetic() => {
                    return Err(EmbeddedError::Invalid(format!(
                        "unexpected '{c}' outside of brackets"
                    )))
                }
                _ => {}
            }
            i += 1;
        }
        if finished {
            Ok(())
        } else if stack.is_empty() {
            Err(EmbeddedError::Invalid("no expression found".to_string()))
        } else {
            Err(EmbeddedError::Incomplete(
                "unexpected EOF while parsing".to_string(),
            ))
        }
    }
}

/// Scans a string literal whose opening quote is at `start`; returns the
/// index just past the closing quote.
fn scan_string(chars: &[char], start: usize) -> Result<usize, EmbeddedError> {
    let q = chars[start];
    let triple = chars.get(start + 1) == Some(&q) && chars.get(start + 2) == Some(&q);
    let mut i = start + if triple { 3 } else { 1 };
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == '\n' && !triple {
            return Err(EmbeddedError::Incomplete(
                "EOL while scanning string literal".to_string(),
            ));
        }
        if c == q {
            if !triple {
                return Ok(i + 1);
            }
            if chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q) {
                return Ok(i + 3);
            }
        }
        i += 1;
    }
    Err(EmbeddedError::Incomplete(
        "EOF while scanning string literal".to_string(),
    ))
}

/// The value of an embedded expression that is a single plain string literal,
/// such as `("docstring")` or `(r'''a\b''')`. Byte and format strings and
/// anything else return `None`.
pub fn string_literal_value(embedded: &str) -> Option<String> {
    let inner = embedded.strip_prefix('(')?.strip_suffix(')')?.trim();
    let start = STRING_START.find(inner)?;
    let opener = start.as_str();
    let quote = terminator(opener);
    let prefix = &opener[..opener.len() - quote.len()];
    if prefix.chars().any(|c| matches!(c, 'b' | 'B' | 'f' | 'F')) {
        return None;
    }
    let raw = prefix.chars().any(|c| matches!(c, 'r' | 'R'));
    let chars: Vec<char> = inner.chars().collect();
    let quote_at = prefix.chars().count();
    let end = scan_string(&chars, quote_at).ok()?;
    if end != chars.len() {
        return None;
    }
    let body: String = chars[quote_at + quote.len()..end - quote.len()].iter().collect();
    Some(if raw { body } else { unescape(&body) })
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some(e @ ('\\' | '\'' | '"')) => out.push(e),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> Result<(), EmbeddedError> {
        BracketGrammar.validate(text)
    }

    #[test]
    fn balanced_groups_are_complete() {
        assert_eq!(check("(a + b)"), Ok(()));
        assert_eq!(check("[1, 2,\n     3, 4]"), Ok(()));
        assert_eq!(check("{'a': (1, [2])}"), Ok(()));
        assert_eq!(check("(x # note )\n)"), Ok(()));
    }

    #[test]
    fn open_groups_and_strings_are_incomplete() {
        assert!(matches!(check("(a (b)"), Err(EmbeddedError::Incomplete(_))));
        assert!(matches!(check("(x \")"), Err(EmbeddedError::Incomplete(_))));
        assert!(matches!(check("\"abc\n"), Err(EmbeddedError::Incomplete(_))));
        assert!(matches!(check("'''a'"), Err(EmbeddedError::Incomplete(_))));
    }

    #[test]
    fn mismatched_brackets_are_invalid() {
        assert!(matches!(check("(a]"), Err(EmbeddedError::Invalid(_))));
    }

    #[test]
    fn strings_with_prefixes_and_escapes() {
        assert_eq!(check("f\"Hi, {name}!\""), Ok(()));
        assert_eq!(check("rb'x'"), Ok(()));
        assert_eq!(check(r#""a\"b""#), Ok(()));
        assert_eq!(check("\"\"\"\nfoo\n\"\"\""), Ok(()));
    }

    #[test]
    fn terminators_follow_the_opener() {
        assert_eq!(terminator("("), ")");
        assert_eq!(terminator("{"), "}");
        assert_eq!(terminator("rb'''"), "'''");
        assert_eq!(terminator("f\""), "\"");
    }

    #[test]
    fn string_literal_values() {
        assert_eq!(string_literal_value("(\"docstring\")").as_deref(), Some("docstring"));
        assert_eq!(string_literal_value("('a\\nb')").as_deref(), Some("a\nb"));
        assert_eq!(string_literal_value("(r'a\\nb')").as_deref(), Some("a\\nb"));
        assert_eq!(string_literal_value("(\"\"\"Says Hi.\"\"\")").as_deref(), Some("Says Hi."));
        assert_eq!(string_literal_value("(b\"x\")"), None);
        assert_eq!(string_literal_value("(f\"{x}\")"), None);
        assert_eq!(string_literal_value("(a+b)"), None);
        assert_eq!(string_literal_value("(\"a\" + \"b\")"), None);
    }

    #[test]
    fn host_grammar_rejects_malformed_expressions() {
        assert!(matches!(PythonGrammar.validate("(1 +)"), Err(EmbeddedError::Invalid(_))));
        assert!(matches!(PythonGrammar.validate("(,)"), Err(EmbeddedError::Invalid(_))));
        assert!(matches!(PythonGrammar.validate("[a b]"), Err(EmbeddedError::Invalid(_))));
    }

    #[test]
    fn host_grammar_accepts_what_the_structure_accepts() {
        for text in ["(a +\n   b)", "[1, 2]", "( \n )", "{'a': (1, [2])}", "f\"Hi, {name}!\"", "rb'x'"] {
            assert_eq!(PythonGrammar.validate(text), Ok(()), "{text}");
        }
        assert!(matches!(PythonGrammar.validate("(1,\n"), Err(EmbeddedError::Incomplete(_))));
        assert!(matches!(PythonGrammar.validate("(a]"), Err(EmbeddedError::Invalid(_))));
    }
}
