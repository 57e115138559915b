//! # Hebi Forms
//!
//! The uniform nested-list representation produced by the reader and consumed
//! by the expander and by downstream symbolic-expression compilers.
//!
//! ## Shape
//!
//! A form is either an atom or a list of forms. Atoms are symbols (plain
//! identifiers, qualified names and `:`-prefixed control words), numbers,
//! pre-validated embedded expressions, and the `Bool`/`None` constants that
//! only macros produce. Forms are strictly tree-shaped and never mutated after
//! construction; rewriting always builds new forms.
//!
//! Forms print in s-expression notation:
//!
//! ```rust
//! use hebi::ast::Form;
//! let form = Form::list(vec![Form::sym("a"), Form::Int(1), Form::list(vec![])]);
//! assert_eq!(form.to_string(), "(a 1 ())");
//! ```

pub mod builder;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node of the intermediate representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Form {
    /// Identifiers, qualified names, control words (`:in`, `:,`) and other
    /// symbolic text such as `...` or `None`.
    Symbol(String),
    Int(i64),
    Float(f64),
    Complex {
        re: f64,
        im: f64,
    },
    /// Host-language expression text, already wrapped in parentheses.
    Embedded(String),
    Bool(bool),
    None,
    List(Vec<Form>),
}

// ============================================================================
// CONSTRUCTION AND INSPECTION
// ============================================================================

impl Form {
    pub fn sym(name: impl Into<String>) -> Self {
        Form::Symbol(name.into())
    }

    pub fn list(items: Vec<Form>) -> Self {
        Form::List(items)
    }

    /// The empty form `()`.
    pub fn empty() -> Self {
        Form::List(Vec::new())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Form::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Form]> {
        match self {
            Form::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_atom(&self) -> bool {
        !matches!(self, Form::List(_))
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(self, Form::List(items) if items.is_empty())
    }

    /// True for `:`-prefixed control words.
    pub fn is_key(&self) -> bool {
        matches!(self, Form::Symbol(s) if s.starts_with(':'))
    }

    /// True if this is exactly the symbol `name`.
    pub fn is_symbol(&self, name: &str) -> bool {
        matches!(self, Form::Symbol(s) if s == name)
    }

    /// The head symbol of a non-empty list whose first element is a symbol.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    /// True if this is an embedded expression consisting of exactly one string
    /// literal, e.g. `("docstring")`.
    pub fn is_string_literal(&self) -> bool {
        match self {
            Form::Embedded(text) => crate::syntax::embedded::string_literal_value(text).is_some(),
            _ => false,
        }
    }

    /// Number of atoms in this form, counted through every nesting level.
    pub fn atom_count(&self) -> usize {
        match self {
            Form::List(items) => items.iter().map(Form::atom_count).sum(),
            _ => 1,
        }
    }

    /// Renders the form in s-expression notation, breaking lists that do not
    /// fit on one line so that each argument sits on its own line under the
    /// head.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, indent: usize) {
        let flat = self.to_string();
        let items = match self {
            Form::List(items) if indent + flat.len() > PRETTY_WIDTH && items.len() > 1 => items,
            _ => {
                out.push_str(&flat);
                return;
            }
        };
        out.push('(');
        items[0].pretty_into(out, indent + 1);
        for item in &items[1..] {
            out.push('\n');
            out.push_str(&" ".repeat(indent + 2));
            item.pretty_into(out, indent + 2);
        }
        out.push(')');
    }
}

const PRETTY_WIDTH: usize = 72;

impl From<&str> for Form {
    fn from(name: &str) -> Self {
        Form::sym(name)
    }
}

impl From<Vec<Form>> for Form {
    fn from(items: Vec<Form>) -> Self {
        Form::List(items)
    }
}

// ============================================================================
// PRINTING
// ============================================================================

/// Formats a float the way the host language prints it: integral values keep
/// a trailing `.0`, everything else uses the shortest round-tripping text.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Complex components drop the `.0` of integral values: `(1+1j)`, `2.5j`.
fn format_component(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{}", value as i64)
    } else {
        format_float(value)
    }
}

pub(crate) fn format_complex(re: f64, im: f64) -> String {
    if re == 0.0 {
        return format!("{}j", format_component(im));
    }
    let sign = if im < 0.0 { '-' } else { '+' };
    format!(
        "({}{}{}j)",
        format_component(re),
        sign,
        format_component(im.abs())
    )
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Symbol(s) | Form::Embedded(s) => f.write_str(s),
            Form::Int(n) => write!(f, "{n}"),
            Form::Float(x) => f.write_str(&format_float(*x)),
            Form::Complex { re, im } => f.write_str(&format_complex(*re, *im)),
            Form::Bool(true) => f.write_str("True"),
            Form::Bool(false) => f.write_str("False"),
            Form::None => f.write_str("None"),
            Form::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_numbers_like_the_host() {
        assert_eq!(Form::Float(-1.3e5).to_string(), "-130000.0");
        assert_eq!(Form::Float(0.25).to_string(), "0.25");
        assert_eq!(Form::Complex { re: 1.0, im: 1.0 }.to_string(), "(1+1j)");
        assert_eq!(Form::Complex { re: 0.0, im: 2.5 }.to_string(), "2.5j");
        assert_eq!(Form::Complex { re: 3.0, im: -2.0 }.to_string(), "(3-2j)");
    }

    #[test]
    fn atom_count_ignores_structure() {
        let form = Form::list(vec![
            Form::sym("a"),
            Form::list(vec![Form::sym("b"), Form::empty()]),
            Form::Embedded("(x)".into()),
        ]);
        assert_eq!(form.atom_count(), 3);
        assert_eq!(form.head_symbol(), Some("a"));
    }

    #[test]
    fn pretty_breaks_only_long_lists() {
        let short = Form::list(vec![Form::sym("f"), Form::Int(1)]);
        assert_eq!(short.pretty(), "(f 1)");
        let long_name = "x".repeat(40);
        let long = Form::list(vec![
            Form::sym("g"),
            Form::sym(long_name.as_str()),
            Form::list(vec![Form::sym("h"), Form::sym(long_name.as_str())]),
        ]);
        assert_eq!(
            long.pretty(),
            format!("(g\n  {long_name}\n  (h {long_name}))")
        );
    }

    #[test]
    fn forms_serialize_to_json() {
        let form = Form::list(vec![Form::sym("quote"), Form::Int(3)]);
        let json = serde_json::to_string(&form).unwrap();
        let back: Form = serde_json::from_str(&json).unwrap();
        assert_eq!(back, form);
    }
}
