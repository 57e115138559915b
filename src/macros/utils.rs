//! Helpers shared by the macro implementations: argument checks, clause
//! recognition and namespace-relative names.

use crate::ast::Form;
use crate::{err_msg, HebiError};

/// A `MacroSyntax` error attributed to macro `name`.
pub fn syntax_error(name: &str, detail: impl std::fmt::Display) -> HebiError {
    err_msg!(MacroSyntax, "{}: {}", name, detail)
}

/// The control word heading a clause such as `(:else body...)`, with the
/// clause's remaining forms.
pub fn clause(form: &Form) -> Option<(&str, &[Form])> {
    let items = form.as_list()?;
    let (head, rest) = items.split_first()?;
    match head {
        Form::Symbol(word) if word.starts_with(':') => Some((word, rest)),
        _ => None,
    }
}

/// Requires at least `min` arguments.
pub fn at_least<'f>(name: &str, args: &'f [Form], min: usize) -> Result<&'f [Form], HebiError> {
    if args.len() < min {
        return Err(syntax_error(
            name,
            format!("expected at least {min} argument(s), found {}", args.len()),
        ));
    }
    Ok(args)
}

/// Requires between `min` and `max` arguments.
pub fn between<'f>(
    name: &str,
    args: &'f [Form],
    min: usize,
    max: usize,
) -> Result<&'f [Form], HebiError> {
    if args.len() < min || args.len() > max {
        return Err(syntax_error(
            name,
            format!(
                "expected {min} to {max} argument(s), found {}",
                args.len()
            ),
        ));
    }
    Ok(args)
}

/// Names starting with `.` are relative to the enclosing namespace object
/// `_ns_`. For a list, only the head is rewritten.
pub fn expand_ns(form: &Form) -> Form {
    match form {
        Form::Symbol(name) if name.starts_with('.') => Form::Symbol(format!("_ns_{name}")),
        Form::List(items) if !items.is_empty() => {
            let mut items = items.clone();
            items[0] = expand_ns(&items[0]);
            Form::List(items)
        }
        other => other.clone(),
    }
}
