//! Small constructors for the IR shapes the expander emits over and over:
//! quoted symbols, thunks, lambdas and calls with a keyword section.

use super::Form;

pub fn sym(name: impl Into<String>) -> Form {
    Form::Symbol(name.into())
}

/// `(quote form)`
pub fn quote(form: Form) -> Form {
    Form::List(vec![sym("quote"), form])
}

/// `(lambda (params...) body...)`
pub fn lambda(params: Vec<Form>, body: impl IntoIterator<Item = Form>) -> Form {
    let mut items = vec![sym("lambda"), Form::List(params)];
    items.extend(body);
    Form::List(items)
}

/// A deferred computation: `(lambda () body...)`.
pub fn thunk(body: impl IntoIterator<Item = Form>) -> Form {
    lambda(Vec::new(), body)
}

/// `(head args...)`
pub fn call(head: impl Into<String>, args: impl IntoIterator<Item = Form>) -> Form {
    let mut items = vec![sym(head)];
    items.extend(args);
    Form::List(items)
}

/// `(head args... : kwargs...)`; the separator is omitted when `kwargs` is empty.
pub fn call_kw(
    head: impl Into<String>,
    args: impl IntoIterator<Item = Form>,
    kwargs: impl IntoIterator<Item = Form>,
) -> Form {
    let mut items = vec![sym(head)];
    items.extend(args);
    let mut kwargs = kwargs.into_iter().peekable();
    if kwargs.peek().is_some() {
        items.push(sym(":"));
        items.extend(kwargs);
    }
    Form::List(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thunk_has_empty_parameter_list() {
        assert_eq!(thunk([sym("x")]).to_string(), "(lambda () x)");
    }

    #[test]
    fn call_kw_skips_separator_without_keywords() {
        assert_eq!(call_kw("f", [sym("a")], []).to_string(), "(f a)");
        assert_eq!(
            call_kw("f", [sym("a")], [sym("k"), Form::Int(1)]).to_string(),
            "(f a : k 1)"
        );
    }
}
