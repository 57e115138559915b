//! Template quoting.
//!
//! `mask: form` builds code that reconstructs `form` as data at run time,
//! with every bare symbol qualified. Inside the template `(:, e)` is replaced
//! by the value of `e` and `(:,@ e)` splices the items of `e`. A nested
//! `mask` is quoted one level deeper, so its unquotes stay in the output.

use crate::ast::builder::{call, quote, sym};
use crate::ast::Form;
use crate::macros::utils::{between, syntax_error};
use crate::macros::ExpandContext;
use crate::HebiError;

pub fn expand_mask(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let args = between("mask", args, 1, 1)?;
    mask(&args[0], ctx)
}

/// The code that rebuilds `form`.
pub fn mask(form: &Form, ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    match form {
        Form::List(items) if !items.is_empty() => {
            if items[0].is_symbol(":,") {
                return operand(items);
            }
            if items[0].is_symbol(&ctx.macro_name("mask")) {
                return mask(&mask(&operand(items)?, ctx)?, ctx);
            }
            let mut construction = vec![sym(":")];
            for item in items {
                construction.extend(mask_item(item, ctx)?);
            }
            Ok(call(ctx.prim("entuple"), construction))
        }
        Form::Symbol(name) if !name.starts_with(':') => Ok(quote(sym(ctx.qualify(name)))),
        Form::Embedded(_) => Ok(quote(form.clone())),
        other => Ok(other.clone()),
    }
}

/// One `:?`/`:*` argument pair of the reconstruction call.
fn mask_item(item: &Form, ctx: &ExpandContext<'_>) -> Result<[Form; 2], HebiError> {
    let single = |value| [sym(":?"), value];
    Ok(match item {
        Form::Symbol(name) if !name.starts_with(':') => single(quote(sym(ctx.qualify(name)))),
        Form::Embedded(_) => single(quote(item.clone())),
        Form::List(items) if !items.is_empty() => match items[0].as_symbol() {
            Some(":,") => single(operand(items)?),
            Some(":,@") => [sym(":*"), operand(items)?],
            Some(head) if head == ctx.macro_name("mask") => {
                single(mask(&mask(&operand(items)?, ctx)?, ctx)?)
            }
            _ => single(mask(item, ctx)?),
        },
        _ => single(item.clone()),
    })
}

fn operand(items: &[Form]) -> Result<Form, HebiError> {
    items
        .get(1)
        .cloned()
        .ok_or_else(|| syntax_error("mask", format!("{} needs an operand", items[0])))
}
