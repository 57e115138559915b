//! Hebi tree builder.
//!
//! Folds the lexer's flat token stream into nested [`Form`]s, one top-level
//! form at a time. This stage is purely structural, plus two rewrites on
//! symbol text: reserved words and `!`-prefixed names become qualified macro
//! names, and numeric literals become number atoms.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::token::{Token, TokenKind};
use crate::ast::Form;
use crate::config::ReaderConfig;
use crate::{err_msg, HebiError};

/// Words that always name macros, suffixed with `_` when qualified.
pub const RESERVED_WORDS: [&str; 15] = [
    "and", "or", "not", "def", "if", "for", "try", "with", "raise", "import", "from", "assert",
    "break", "continue", "class",
];

// ============================================================================
// LITERAL PATTERNS
// ============================================================================

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.?[\p{L}_][\p{L}\p{N}_]*(?:\.\.?[\p{L}_][\p{L}\p{N}_]*)*$")
        .expect("valid regex")
});

static INTEGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(?:0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+|[0-9][0-9_]*)$")
        .expect("valid regex")
});

const REAL: &str = r"(?:[0-9][0-9_]*\.?[0-9_]*|\.[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)?";

static FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^[-+]?{REAL}$")).expect("valid regex"));

static IMAGINARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(?P<im>[-+]?{REAL})[jJ]$")).expect("valid regex"));

static COMPLEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?P<re>[-+]?{REAL})(?P<im>[-+]{REAL})[jJ]$")).expect("valid regex")
});

fn parse_real(text: &str) -> Option<f64> {
    text.replace('_', "").parse().ok()
}

fn parse_integer(text: &str) -> Option<i64> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let (radix, digits) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits),
    };
    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Reads a numeric literal: integers (with radix prefixes), floats, and
/// imaginary or complex numbers such as `2j` and `1+1j`.
pub fn parse_number(text: &str) -> Option<Form> {
    if let Some(caps) = COMPLEX.captures(text) {
        return Some(Form::Complex {
            re: parse_real(&caps["re"])?,
            im: parse_real(&caps["im"])?,
        });
    }
    if let Some(caps) = IMAGINARY.captures(text) {
        return Some(Form::Complex {
            re: 0.0,
            im: parse_real(&caps["im"])?,
        });
    }
    if INTEGER.is_match(text) {
        return parse_integer(text).map(Form::Int);
    }
    if FLOAT.is_match(text) && text.chars().any(|c| c.is_ascii_digit()) {
        return parse_real(text).map(Form::Float);
    }
    None
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

// ============================================================================
// PARSER
// ============================================================================

pub struct Parser<I> {
    tokens: I,
    macro_namespace: String,
    no_op_marker: String,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, HebiError>>,
{
    pub fn new(tokens: I) -> Self {
        Self::with_config(tokens, &ReaderConfig::default())
    }

    pub fn with_config(tokens: I, config: &ReaderConfig) -> Self {
        Self {
            tokens,
            macro_namespace: config.macro_namespace.clone(),
            no_op_marker: config.no_op_marker.clone(),
        }
    }

    /// Qualifies reserved words and `!name` into the macro namespace and
    /// reads numbers; everything else stays a symbol.
    pub fn resolve_symbol(&self, text: &str) -> Form {
        if let Some(name) = text.strip_prefix('!').filter(|n| !n.is_empty()) {
            let name = if RESERVED_WORDS.contains(&name) {
                format!("{name}_")
            } else {
                name.to_string()
            };
            return Form::Symbol(format!("{}.{}", self.macro_namespace, name));
        }
        if RESERVED_WORDS.contains(&text) {
            return Form::Symbol(format!("{}.{}_", self.macro_namespace, text));
        }
        if is_identifier(text) {
            return Form::sym(text);
        }
        parse_number(text).unwrap_or_else(|| Form::sym(text))
    }

    fn next_token(&mut self) -> Result<Option<Token>, HebiError> {
        self.tokens.next().transpose()
    }

    fn parse_form(&mut self, token: Token) -> Result<Form, HebiError> {
        match token.kind {
            TokenKind::Open => self.parse_list(&token),
            TokenKind::Close(reason) => Err(err_msg!(
                Syntax,
                "unbalanced close ({:?}) on line {}",
                reason,
                token.line
            )
            .at_line(token.line)),
            TokenKind::Unary => {
                let operand = match self.next_token()? {
                    Some(next) if !matches!(next.kind, TokenKind::Close(_)) => next,
                    _ => {
                        return Err(err_msg!(
                            Syntax,
                            "unary marker '{}:' has no operand",
                            token.text
                        )
                        .at_line(token.line))
                    }
                };
                let sub = self.parse_form(operand)?;
                if token.text == self.no_op_marker {
                    Ok(Form::List(vec![sub]))
                } else if token.text.starts_with(':') {
                    Ok(Form::List(vec![Form::sym(token.text), sub]))
                } else {
                    Ok(Form::List(vec![self.resolve_symbol(&token.text), sub]))
                }
            }
            TokenKind::Symbol | TokenKind::Polyadic => Ok(self.resolve_symbol(&token.text)),
            TokenKind::Key => Ok(Form::Symbol(token.text)),
            TokenKind::Embedded if token.text == "()" => Ok(Form::empty()),
            TokenKind::Embedded => Ok(Form::Embedded(format!("({})", token.text))),
        }
    }

    fn parse_list(&mut self, open: &Token) -> Result<Form, HebiError> {
        let mut items = Vec::new();
        loop {
            match self.next_token()? {
                Some(Token {
                    kind: TokenKind::Close(_),
                    ..
                }) => return Ok(Form::List(items)),
                Some(token) => items.push(self.parse_form(token)?),
                None => {
                    return Err(err_msg!(
                        Syntax,
                        "construct opened on line {} is never closed",
                        open.line
                    )
                    .at_line(open.line))
                }
            }
        }
    }
}

impl<I> Iterator for Parser<I>
where
    I: Iterator<Item = Result<Token, HebiError>>,
{
    type Item = Result<Form, HebiError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_located().map(|read| read.map(|(_, form)| form))
    }
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, HebiError>>,
{
    /// The next top-level form with the line it starts on.
    pub fn next_located(&mut self) -> Option<Result<(usize, Form), HebiError>> {
        let token = match self.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        let line = token.line;
        let form = self.parse_form(token);
        if let Ok(form) = &form {
            trace!(%form, line, "read form");
        }
        Some(form.map(|form| (line, form)))
    }
}

/// Reads every top-level form of `source` with the default configuration.
pub fn read(source: &str) -> Result<Vec<Form>, HebiError> {
    Parser::new(super::Lexer::new(source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(source: &str) -> String {
        let forms = read(source).unwrap();
        assert_eq!(forms.len(), 1, "{forms:?}");
        forms[0].to_string()
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("1"), Some(Form::Int(1)));
        assert_eq!(parse_number("-1.3e5"), Some(Form::Float(-1.3e5)));
        assert_eq!(parse_number("0x1f"), Some(Form::Int(31)));
        assert_eq!(parse_number("1_000"), Some(Form::Int(1000)));
        assert_eq!(parse_number("1+1j"), Some(Form::Complex { re: 1.0, im: 1.0 }));
        assert_eq!(parse_number("2.5j"), Some(Form::Complex { re: 0.0, im: 2.5 }));
        assert_eq!(parse_number("..."), None);
        assert_eq!(parse_number("+"), None);
        assert_eq!(parse_number("."), None);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("foo.bar..spam.eggs"));
        assert!(is_identifier(".replace"));
        assert!(is_identifier("xAUTO0_"));
        assert!(!is_identifier("..."));
        assert!(!is_identifier("a..b.."));
    }

    #[test]
    fn reserved_words_and_bang_names() {
        assert_eq!(read_one("if"), "hebi.basic.._macro_.if_");
        assert_eq!(read_one("!if_"), "hebi.basic.._macro_.if_");
        assert_eq!(read_one("!if"), "hebi.basic.._macro_.if_");
        assert_eq!(read_one("!mask"), "hebi.basic.._macro_.mask");
        assert_eq!(read_one("class"), "hebi.basic.._macro_.class_");
        assert_eq!(read_one("quote:def"), "(quote hebi.basic.._macro_.def_)");
    }

    #[test]
    fn unary_no_op_groups_its_operand() {
        assert_eq!(read_one("pass:a"), "(a)");
        assert_eq!(read_one("pass:pass:a"), "((a))");
        assert_eq!(read_one("operator..getitem:pass:globals"), "(operator..getitem (globals))");
    }

    #[test]
    fn unary_without_operand_is_a_syntax_error() {
        let err = read("a: b:#c\n").unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Syntax);
    }

    #[test]
    fn embedded_text_is_wrapped() {
        assert_eq!(read_one("print: \"Hello\""), "(print (\"Hello\"))");
        assert_eq!(read_one("()"), "()");
    }

    #[test]
    fn custom_macro_namespace() {
        let config = ReaderConfig {
            macro_namespace: "my.._macro_".into(),
            ..ReaderConfig::default()
        };
        let forms: Vec<Form> = Parser::with_config(super::super::Lexer::new("not: x"), &config)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(forms[0].to_string(), "(my.._macro_.not_ x)");
    }
}
