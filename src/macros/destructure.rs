//! Destructuring `let`.
//!
//! A structured target is handled in two halves. At expansion time the
//! target's names are flattened, in order, into the parameter list of a
//! lambda. At run time `_unpack` walks a quoted copy of the same target over
//! the value and produces the bound values in the same order, which are then
//! splatted into the lambda.
//!
//! Targets:
//!
//! - `(:, a b :list rest)`: positional. `:list x` binds the remaining items as
//!   a list, `:iter x` the remaining iterator, `:as x` the whole value.
//! - `(:= a 'key' :as whole (:strs b c) (:default a 0))`: keyed. Each binding is
//!   followed by its key expression; `:strs` names are their own keys;
//!   `:default` supplies fallbacks for missing keys.
//! - `_` binds nothing. Targets nest.

use crate::ast::builder::{call, lambda, quote, sym};
use crate::ast::Form;
use crate::macros::utils::syntax_error;
use crate::macros::ExpandContext;
use crate::HebiError;

/// `let: target :be value body...`
pub fn expand_let(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let [target, be, value, body @ ..] = args else {
        return Err(syntax_error("let", "expected target :be value body..."));
    };
    if !be.is_symbol(":be") {
        return Err(syntax_error("let", format!("missing :be, found {be}")));
    }
    let Form::List(items) = target else {
        return Ok(Form::List(vec![
            lambda(vec![target.clone()], body.iter().cloned()),
            value.clone(),
        ]));
    };
    match items.first().and_then(Form::as_symbol) {
        Some(":," | ":=") => {}
        _ => {
            return Err(syntax_error(
                "let",
                format!("a target must start with :, or :=, found {target}"),
            ))
        }
    }
    let mut params = Vec::new();
    flatten(items, &mut params)?;
    Ok(Form::List(vec![
        lambda(params, body.iter().cloned()),
        sym(":"),
        sym(":*"),
        call(ctx.prim("_unpack"), [quote_target(items, ctx)?, value.clone()]),
    ]))
}

fn is_binding_name(name: &str) -> bool {
    name != "_" && !name.starts_with(':')
}

/// Appends the names `items` binds to `out`, in unpacking order.
pub fn flatten(items: &[Form], out: &mut Vec<Form>) -> Result<(), HebiError> {
    if items.first().is_some_and(|h| h.is_symbol(":=")) {
        return flatten_mapping(&items[1..], out);
    }
    for item in items {
        match item {
            Form::List(inner) => flatten(inner, out)?,
            Form::Symbol(name) if is_binding_name(name) => out.push(item.clone()),
            _ => {}
        }
    }
    Ok(())
}

fn flatten_mapping(items: &[Form], out: &mut Vec<Form>) -> Result<(), HebiError> {
    let mut items = items.iter();
    while let Some(item) = items.next() {
        match item.head_symbol() {
            Some(":default") => continue,
            Some(":strs") => {
                flatten(item.as_list().unwrap_or_default(), out)?;
                continue;
            }
            _ => {}
        }
        if item.is_symbol(":as") {
            let name = items
                .next()
                .ok_or_else(|| syntax_error("let", ":as without a name"))?;
            out.push(name.clone());
            continue;
        }
        match item {
            Form::List(inner) => flatten(inner, out)?,
            Form::Symbol(name) if is_binding_name(name) => out.push(item.clone()),
            _ => {}
        }
        if items.next().is_none() {
            return Err(syntax_error("let", format!("{item} has no key")));
        }
    }
    Ok(())
}

/// Builds an expression that evaluates to the target as data: names and
/// control words quoted, nested targets rebuilt, key and default expressions
/// left to be evaluated.
pub fn quote_target(items: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let Some((head, rest)) = items.split_first() else {
        return Ok(call(ctx.prim("entuple"), []));
    };
    let mapping = head.is_symbol(":=");
    let paired = mapping || head.is_symbol(":default");
    let mut out = vec![quote(head.clone())];
    let mut rest = rest.iter();
    while let Some(item) = rest.next() {
        match item {
            Form::List(inner) if !inner.is_empty() => match item.head_symbol() {
                Some(":strs") if mapping => out.push(quote(item.clone())),
                Some(":default") if mapping => out.push(quote_target(inner, ctx)?),
                _ => {
                    out.push(quote_target(inner, ctx)?);
                    if mapping {
                        out.push(following(&mut rest, item)?);
                    }
                }
            },
            Form::Symbol(word) if mapping && word.starts_with(':') => {
                out.push(item.clone());
                match following(&mut rest, item)? {
                    Form::List(inner) if !inner.is_empty() => out.push(quote_target(&inner, ctx)?),
                    other => out.push(quote(other)),
                }
            }
            _ => {
                out.push(quote(item.clone()));
                if paired {
                    out.push(following(&mut rest, item)?);
                }
            }
        }
    }
    Ok(call(ctx.prim("entuple"), out))
}

fn following<'f>(
    rest: &mut impl Iterator<Item = &'f Form>,
    item: &Form,
) -> Result<Form, HebiError> {
    rest.next()
        .cloned()
        .ok_or_else(|| syntax_error("let", format!("{item} is missing its value")))
}
