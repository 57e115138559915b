//! The standard macro vocabulary.
//!
//! Each macro turns its (unexpanded) argument forms into a call against the
//! primitive runtime vocabulary in the bootstrap namespace. Branches, bodies
//! and handlers become lambdas so that the primitive decides what runs and
//! when. Clause-structured macros (`if`, `for`, `try`) take their clauses as
//! lists headed by a control word, e.g. `(:else body...)`.

use std::iter;

use crate::ast::builder::{call, call_kw, lambda, quote, sym, thunk};
use crate::ast::Form;
use crate::macros::utils::{at_least, between, clause, expand_ns, syntax_error};
use crate::macros::{destructure, mask, ExpandContext, MacroRegistry, AUTO_NAME};
use crate::HebiError;

// ============================================================================
// REGISTRY
// ============================================================================

/// Registers every standard macro in `registry`.
pub fn register_std_macros(registry: &mut MacroRegistry) {
    // Boolean logic
    registry.register("and_", expand_and);
    registry.register("or_", expand_or);
    registry.register("not_", expand_not);

    // Definitions and bindings
    registry.register("def_", expand_def);
    registry.register("class_", expand_class);
    registry.register("let", destructure::expand_let);
    registry.register("import_", expand_import);
    registry.register("from_", expand_from);

    // Control flow
    registry.register("if_", expand_if);
    registry.register("for_", expand_for);
    registry.register("break_", expand_break);
    registry.register("continue_", expand_continue);
    registry.register("loop", expand_loop);
    registry.register("begin", expand_begin);
    registry.register("begin0", expand_begin0);
    registry.register("runtime", expand_runtime);

    // Conditions and resources
    registry.register("try_", expand_try);
    registry.register("raise_", expand_raise);
    registry.register("assert_", expand_assert);
    registry.register("with_", expand_with);

    // Templates
    registry.register("mask", mask::expand_mask);
}

// ============================================================================
// BOOLEAN LOGIC
// ============================================================================

/// `and()` is `True`, a single operand is itself, otherwise every operand
/// after the first is deferred.
fn expand_and(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    Ok(match args {
        [] => Form::Bool(true),
        [only] => only.clone(),
        [first, rest @ ..] => short_circuit(ctx.prim("_and_"), first, rest),
    })
}

fn expand_or(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    Ok(match args {
        [] => Form::empty(),
        [only] => only.clone(),
        [first, rest @ ..] => short_circuit(ctx.prim("_or_"), first, rest),
    })
}

fn short_circuit(head: String, first: &Form, rest: &[Form]) -> Form {
    call(
        head,
        iter::once(first.clone()).chain(rest.iter().map(|arg| thunk([arg.clone()]))),
    )
}

fn expand_not(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let args = between("not", args, 1, 1)?;
    Ok(call(ctx.prim("_not_"), [args[0].clone()]))
}

// ============================================================================
// DEFINITIONS
// ============================================================================

/// `def: name value` assigns a global; `def: (name params...) body...`
/// defines a function, with optional `:@ decorator` pairs and a docstring
/// before the body.
fn expand_def(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let Some((name, body)) = args.split_first() else {
        return Err(syntax_error("def", "missing name"));
    };
    if let Form::List(signature) = name {
        let Some((fname, params)) = signature.split_first() else {
            return Err(syntax_error("def", "empty function signature"));
        };
        return expand_def_function(fname, params, body, ctx);
    }
    let [value] = body else {
        return Err(syntax_error(
            "def",
            format!("a global takes exactly one value, found {}", body.len()),
        ));
    };
    let Form::Symbol(name) = expand_ns(name) else {
        return Err(syntax_error("def", format!("cannot assign to {name}")));
    };
    if let Some((namespace, attr)) = name.rsplit_once('.') {
        return Ok(call(
            ctx.builtin("setattr"),
            [sym(namespace), quote(sym(attr)), value.clone()],
        ));
    }
    Ok(call(
        ".__setitem__",
        [call(ctx.builtin("globals"), []), quote(sym(name)), value.clone()],
    ))
}

fn expand_def_function(
    fname: &Form,
    params: &[Form],
    body: &[Form],
    ctx: &ExpandContext<'_>,
) -> Result<Form, HebiError> {
    let (decorators, doc, rest) = split_decorators("def", body)?;
    let fname = expand_ns(fname);
    let function = call(
        ctx.prim("function"),
        [
            quote(fname.clone()),
            lambda(params.to_vec(), rest.iter().cloned()),
            doc,
        ],
    );
    Ok(call(ctx.macro_name("def_"), [fname, decorate(&decorators, function)]))
}

/// Leading `:@ decorator` pairs, then an optional docstring, then the body.
fn split_decorators<'f>(
    who: &str,
    body: &'f [Form],
) -> Result<(Vec<&'f Form>, Form, &'f [Form]), HebiError> {
    let mut decorators = Vec::new();
    let mut rest = body;
    while let Some((first, tail)) = rest.split_first() {
        if !first.is_symbol(":@") {
            break;
        }
        let Some((decorator, tail)) = tail.split_first() else {
            return Err(syntax_error(who, ":@ without a decorator"));
        };
        decorators.push(decorator);
        rest = tail;
    }
    let mut doc = Form::None;
    if let Some((first, tail)) = rest.split_first() {
        if first.is_string_literal() {
            doc = first.clone();
            rest = tail;
        }
    }
    Ok((decorators, doc, rest))
}

/// The first decorator listed ends up outermost.
fn decorate(decorators: &[&Form], inner: Form) -> Form {
    decorators.iter().rev().fold(inner, |inner, decorator| {
        Form::List(vec![expand_ns(decorator), inner])
    })
}

/// `class: (name bases... : keyword value) body...` binds a class, with the
/// same `:@` decorators and docstring as `def`. Inside the body `.name`
/// refers to the class namespace and `__class__` to the class itself.
fn expand_class(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let Some((signature, body)) = args.split_first() else {
        return Err(syntax_error("class", "missing name"));
    };
    let (name, bases) = match signature {
        Form::List(items) => match items.split_first() {
            Some((name, bases)) => (name, bases),
            None => return Err(syntax_error("class", "empty class signature")),
        },
        name => (name, &[][..]),
    };
    let name = expand_ns(name);
    if name.as_symbol().is_none() {
        return Err(syntax_error("class", format!("class name must be a symbol, found {name}")));
    }
    let (decorators, doc, rest) = split_decorators("class", body)?;

    let namespace_body = lambda(
        vec![sym("_ns_")],
        iter::once(sym("__class__")).chain(rest.iter().cloned()),
    );
    let class = call(
        ctx.prim("_class_"),
        [
            quote(name.clone()),
            call(ctx.prim("akword"), bases.iter().cloned()),
            doc,
            call(
                ".__getitem__",
                [call(ctx.builtin("globals"), []), quote(sym("__name__"))],
            ),
            lambda(vec![sym("__class__")], [namespace_body]),
        ],
    );
    Ok(call(ctx.macro_name("def_"), [name, decorate(&decorators, class)]))
}

/// `import: a.b c :as d` binds `a` and `d` as globals.
fn expand_import(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let args = at_least("import", args, 1)?;
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut specs = args.iter();
    while let Some(spec) = specs.next() {
        if spec.is_symbol(":as") {
            let alias = specs.next().and_then(Form::as_symbol);
            match (alias, pairs.last_mut()) {
                (Some(alias), Some(pair)) => pair.0 = alias.to_string(),
                _ => return Err(syntax_error("import", ":as needs a module and a name")),
            }
            continue;
        }
        let Some(module) = spec.as_symbol() else {
            return Err(syntax_error("import", format!("{spec} is not a module name")));
        };
        let root = module.split('.').next().unwrap_or(module);
        pairs.push((root.to_string(), module.to_string()));
    }
    let globals = || call(ctx.builtin("globals"), []);
    let assignments = pairs.into_iter().map(|(name, module)| {
        call(
            ".__setitem__",
            [
                globals(),
                quote(sym(name)),
                call("__import__", [quote(sym(module)), globals()]),
            ],
        )
    });
    Ok(Form::List(vec![thunk(assignments)]))
}

/// `from: .pkg :import a b :as c` binds `a` and `c` from `pkg`.
fn expand_from(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let [name, keyword, specs @ ..] = args else {
        return Err(syntax_error("from", "expected a module, :import and names"));
    };
    if !keyword.is_symbol(":import") {
        return Err(syntax_error("from", format!("expected :import, found {keyword}")));
    }
    let Some(name) = name.as_symbol() else {
        return Err(syntax_error("from", format!("{name} is not a module name")));
    };
    let mut fromlist = Vec::new();
    let mut pairs = Vec::new();
    let mut specs = specs.iter();
    while let Some(spec) = specs.next() {
        if spec.is_symbol(":as") {
            let (Some(alias), true) = (specs.next(), pairs.len() >= 2) else {
                return Err(syntax_error("from", ":as needs a name before and after it"));
            };
            let at = pairs.len() - 2;
            pairs[at] = alias.clone();
            continue;
        }
        let Some(attr) = spec.as_symbol() else {
            return Err(syntax_error("from", format!("{spec} is not a name")));
        };
        pairs.push(spec.clone());
        pairs.push(sym(format!("module.{attr}")));
        fromlist.push(spec.clone());
    }
    let bare = name.trim_start_matches('.');
    let level = (name.len() - bare.len()) as i64;
    let bind = lambda(
        vec![sym("module")],
        [call(
            ".update",
            [call(ctx.builtin("globals"), []), call_kw("dict", [], pairs)],
        )],
    );
    let import = call_kw(
        "__import__",
        [quote(sym(bare))],
        [
            sym("globals"),
            call(ctx.builtin("globals"), []),
            sym("fromlist"),
            quote(Form::List(fromlist)),
            sym("level"),
            Form::Int(level),
        ],
    );
    Ok(Form::List(vec![bind, import]))
}

// ============================================================================
// CONTROL FLOW
// ============================================================================

/// `if: cond (:then ...) (:elif c ...)* (:else ...)?`
fn expand_if(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let [condition, then, pairs @ ..] = args else {
        return Err(syntax_error("if", "expected a condition and a :then clause"));
    };
    let mut pairs = pairs;
    let mut else_ = Vec::new();
    if let Some((last, init)) = pairs.split_last() {
        if let Some((":else", body)) = clause(last) {
            else_ = vec![sym("else_"), thunk(body.iter().cloned())];
            pairs = init;
        }
    }

    let mut elifs = Vec::new();
    for pair in pairs {
        match clause(pair) {
            Some((":elif", [test, body @ ..])) => {
                elifs.push(thunk([test.clone()]));
                elifs.push(thunk(body.iter().cloned()));
            }
            Some((":else", _)) => {
                return Err(syntax_error("if", ":else must be the last clause"));
            }
            _ => return Err(syntax_error("if", format!("unexpected clause {pair}"))),
        }
    }

    let Some((":then", body)) = clause(then) else {
        return Err(syntax_error("if", format!("expected a :then clause, found {then}")));
    };

    let mut positional = vec![condition.clone(), thunk(body.iter().cloned())];
    positional.extend(elifs);
    Ok(call_kw(ctx.prim("_if_"), positional, else_))
}

/// `for: :label? bindings... :in iterable body... (:else ...)?`
fn expand_for(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let mut exprs = args;
    let mut else_ = Vec::new();
    if let Some((last, init)) = exprs.split_last() {
        if let Some((":else", body)) = clause(last) {
            else_ = vec![sym("else_"), thunk(body.iter().cloned())];
            exprs = init;
        }
    }
    let mut label = Form::None;
    if let Some((first, rest)) = exprs.split_first() {
        if first.is_key() && !first.is_symbol(":in") {
            label = first.clone();
            exprs = rest;
        }
    }
    let Some(split) = exprs.iter().position(|e| e.is_symbol(":in")) else {
        return Err(syntax_error("for", "missing :in"));
    };
    let bindings = &exprs[..split];
    let Some((iterable, body)) = exprs[split + 1..].split_first() else {
        return Err(syntax_error("for", "missing iterable after :in"));
    };
    let Some(first) = bindings.first() else {
        return Err(syntax_error("for", "missing loop variable"));
    };

    let function = if first.is_atom() {
        lambda(bindings.to_vec(), body.iter().cloned())
    } else {
        let mut destructure = vec![sym(ctx.macro_name("let"))];
        destructure.extend(bindings.iter().cloned());
        destructure.push(sym(":be"));
        destructure.push(sym(AUTO_NAME));
        destructure.extend(body.iter().cloned());
        lambda(vec![sym(AUTO_NAME)], [Form::List(destructure)])
    };

    let mut kwargs = else_;
    kwargs.push(sym("label"));
    kwargs.push(label);
    Ok(call_kw(ctx.prim("_for_"), [iterable.clone(), function], kwargs))
}

/// `break: :label? values...`
fn expand_break(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    match args.split_first() {
        Some((label, values)) if label.is_key() => Ok(call_kw(
            ctx.prim("Break"),
            values.iter().cloned(),
            [sym("label"), label.clone()],
        )),
        _ => Ok(call(ctx.prim("Break"), args.iter().cloned())),
    }
}

/// `continue: :label?`
fn expand_continue(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let args = between("continue", args, 0, 1)?;
    let label = args.first().cloned().unwrap_or(Form::None);
    Ok(call(ctx.prim("Continue"), [label]))
}

/// `loop: (recur name default ...) body...` calls the body once; calling
/// `recur` from it schedules another round with new arguments.
fn expand_loop(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let Some((start, body)) = args.split_first() else {
        return Err(syntax_error("loop", "expected (recur defaults...) and a body"));
    };
    let Some((recur, defaults)) = start.as_list().and_then(<[Form]>::split_first) else {
        return Err(syntax_error("loop", format!("expected (recur defaults...), found {start}")));
    };
    let mut params = vec![recur.clone()];
    if !defaults.is_empty() {
        params.push(sym(":"));
        params.extend(defaults.iter().cloned());
    }
    Ok(Form::List(vec![call(
        ctx.prim("_loop"),
        [lambda(params, body.iter().cloned())],
    )]))
}

fn expand_begin(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    Ok(call(ctx.prim("_begin"), args.iter().cloned()))
}

fn expand_begin0(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let args = at_least("begin0", args, 1)?;
    Ok(call(ctx.prim("_begin0"), args.iter().cloned()))
}

/// Forms that only run outside the compiler process.
fn expand_runtime(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let mut then = vec![sym(":then")];
    then.extend(args.iter().cloned());
    Ok(call(
        ctx.macro_name("if_"),
        [
            Form::Embedded("(__name__!='<compiler>')".to_string()),
            Form::List(then),
        ],
    ))
}

// ============================================================================
// CONDITIONS AND RESOURCES
// ============================================================================

/// `try: body (:except T [:as name] ...)* (:else ...)? (:finally ...)?`
fn expand_try(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let Some((body, handlers)) = args.split_first() else {
        return Err(syntax_error("try", "missing body"));
    };
    let mut excepts = Vec::new();
    let mut else_: Option<Form> = None;
    let mut finally: Option<Form> = None;

    for handler in handlers {
        match clause(handler) {
            Some((":except", rest)) => {
                if else_.is_some() || finally.is_some() {
                    return Err(syntax_error("try", ":except after :else or :finally"));
                }
                let Some((exception, tail)) = rest.split_first() else {
                    return Err(syntax_error("try", ":except needs an exception type"));
                };
                let (name, block) = match tail {
                    [keyword, name, block @ ..] if keyword.is_symbol(":as") => (name.clone(), block),
                    _ => (sym(AUTO_NAME), tail),
                };
                excepts.push(exception.clone());
                excepts.push(lambda(vec![name], block.iter().cloned()));
            }
            Some((":else", rest)) => {
                if else_.is_some() {
                    return Err(syntax_error("try", "duplicate :else"));
                }
                if finally.is_some() {
                    return Err(syntax_error("try", ":else after :finally"));
                }
                else_ = Some(thunk(rest.iter().cloned()));
            }
            Some((":finally", rest)) => {
                if finally.is_some() {
                    return Err(syntax_error("try", "duplicate :finally"));
                }
                finally = Some(thunk(rest.iter().cloned()));
            }
            _ => return Err(syntax_error("try", format!("unexpected clause {handler}"))),
        }
    }

    let mut items = vec![sym(ctx.prim("_try_")), thunk([body.clone()])];
    items.extend(excepts);
    items.push(sym(":"));
    if let Some(else_) = else_ {
        items.push(sym("else_"));
        items.push(else_);
    }
    if let Some(finally) = finally {
        items.push(sym("finally"));
        items.push(finally);
    }
    Ok(Form::List(items))
}

/// `raise:` re-raises, `raise: e` raises `e`, `raise: e :from c` chains.
fn expand_raise(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    match args {
        [] => Ok(call(ctx.prim("_raise"), [])),
        [exception] => Ok(call(ctx.prim("_raise_ex"), [exception.clone()])),
        [exception, keyword, cause] if keyword.is_symbol(":from") => Ok(call(
            ctx.prim("_raise_ex_from"),
            [exception.clone(), cause.clone()],
        )),
        [_, keyword, ..] => Err(syntax_error("raise", format!("unexpected {keyword}"))),
    }
}

/// `assert: b message...`; the message is only built when the check fails.
fn expand_assert(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    match args {
        [] => Err(syntax_error("assert", "missing condition")),
        [check] => Ok(call(ctx.prim("_assert_"), [check.clone()])),
        [check, message @ ..] => Ok(call(
            ctx.prim("_assert_message"),
            [check.clone(), thunk(message.iter().cloned())],
        )),
    }
}

/// `with: guard :as name body...`
fn expand_with(args: &[Form], ctx: &ExpandContext<'_>) -> Result<Form, HebiError> {
    let Some((guard, body)) = args.split_first() else {
        return Err(syntax_error("with", "missing resource"));
    };
    let (name, block) = match body {
        [keyword, name, block @ ..] if keyword.is_symbol(":as") => (name.clone(), block),
        _ => (sym(AUTO_NAME), body),
    };
    Ok(call(
        ctx.prim("_with_"),
        [thunk([guard.clone()]), lambda(vec![name], block.iter().cloned())],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::qualifier::QualContext;
    use crate::syntax::parser::read;
    use crate::ErrorType;

    /// Applies the macro named by the head of the first form read from
    /// `source`, once.
    fn rewrite(source: &str) -> Result<String, HebiError> {
        let config = ReaderConfig::default();
        let qual = QualContext::new();
        let ctx = ExpandContext::new(&config, &qual);
        let registry = MacroRegistry::with_std();
        let form = read(source)?.remove(0);
        let items = form.as_list().unwrap();
        let (_, func) = registry
            .resolve(items[0].as_symbol().unwrap(), &config)
            .unwrap();
        func(&items[1..], &ctx).map(|f| f.to_string())
    }

    #[test]
    fn and_or_shapes() {
        assert_eq!(rewrite("!and:\n").unwrap(), "True");
        assert_eq!(rewrite("or:\n").unwrap(), "()");
        assert_eq!(rewrite("and: a\n").unwrap(), "a");
        assert_eq!(
            rewrite("and: a b c\n").unwrap(),
            "(hebi.bootstrap.._and_ a (lambda () b) (lambda () c))"
        );
    }

    #[test]
    fn if_with_elif_and_else() {
        let source = "if: c\n  :then: x\n  :elif: d y\n  :else: z\n";
        assert_eq!(
            rewrite(source).unwrap(),
            "(hebi.bootstrap.._if_ c (lambda () x) (lambda () d) (lambda () y) : else_ (lambda () z))"
        );
    }

    #[test]
    fn if_clause_errors() {
        let missing_then = rewrite("if: c\n  :else: z\n").unwrap_err();
        assert_eq!(missing_then.error_type(), ErrorType::MacroSyntax);
        let elif_after_else = rewrite("if: c\n  :then: x\n  :else: z\n  :elif: d y\n");
        assert!(elif_after_else.is_err());
    }

    #[test]
    fn for_with_label_and_else() {
        let source = "for: :outer x :in xs\n  f: x\n  :else: done\n";
        assert_eq!(
            rewrite(source).unwrap(),
            "(hebi.bootstrap.._for_ xs (lambda (x) (f x)) : else_ (lambda () done) label :outer)"
        );
    }

    #[test]
    fn for_with_destructuring_target() {
        let source = "for: pass: :, a b\n  :in pairs\n  f: a b\n";
        assert_eq!(
            rewrite(source).unwrap(),
            "(hebi.bootstrap.._for_ pairs (lambda (xAUTO0_) (hebi.basic.._macro_.let (:, a b) :be xAUTO0_ (f a b))) : label None)"
        );
    }

    #[test]
    fn for_without_in_is_an_error() {
        assert!(rewrite("for: x xs\n").is_err());
    }

    #[test]
    fn break_and_continue() {
        assert_eq!(
            rewrite("break: :outer 1\n").unwrap(),
            "(hebi.bootstrap..Break 1 : label :outer)"
        );
        assert_eq!(rewrite("break: 1 2\n").unwrap(), "(hebi.bootstrap..Break 1 2)");
        assert_eq!(rewrite("continue:\n").unwrap(), "(hebi.bootstrap..Continue None)");
        assert_eq!(
            rewrite("continue: :outer\n").unwrap(),
            "(hebi.bootstrap..Continue :outer)"
        );
    }

    #[test]
    fn try_shapes_and_clause_order() {
        let source = "try: risky:\n  :except: E :as e\n    h: e\n  :except: F\n    g:\n  :finally: done\n";
        assert_eq!(
            rewrite(source).unwrap(),
            "(hebi.bootstrap.._try_ (lambda () (risky)) E (lambda (e) (h e)) F (lambda (xAUTO0_) (g)) : finally (lambda () done))"
        );
        assert!(rewrite("try: x\n  :finally: a\n  :except: E b\n").is_err());
        assert!(rewrite("try: x\n  :else: a\n  :else: b\n").is_err());
        assert!(rewrite("try: x\n  :finally: a\n  :else: b\n").is_err());
        assert!(rewrite("try: x\n  :catch: E a\n").is_err());
    }

    #[test]
    fn with_binds_the_resource() {
        assert_eq!(
            rewrite("with: open:f :as g\n  use: g\n").unwrap(),
            "(hebi.bootstrap.._with_ (lambda () (open f)) (lambda (g) (use g)))"
        );
        assert_eq!(
            rewrite("with: lock\n  work:\n").unwrap(),
            "(hebi.bootstrap.._with_ (lambda () lock) (lambda (xAUTO0_) (work)))"
        );
    }

    #[test]
    fn raise_and_assert() {
        assert_eq!(rewrite("raise:\n").unwrap(), "(hebi.bootstrap.._raise)");
        assert_eq!(rewrite("raise: e\n").unwrap(), "(hebi.bootstrap.._raise_ex e)");
        assert_eq!(
            rewrite("raise: e :from c\n").unwrap(),
            "(hebi.bootstrap.._raise_ex_from e c)"
        );
        assert!(rewrite("raise: e :to c\n").is_err());
        assert_eq!(rewrite("assert: b\n").unwrap(), "(hebi.bootstrap.._assert_ b)");
        assert_eq!(
            rewrite("assert: b \"no\"\n").unwrap(),
            "(hebi.bootstrap.._assert_message b (lambda () (\"no\")))"
        );
    }

    #[test]
    fn def_function_with_decorators_and_docstring() {
        let source = "def: pass: f x\n  :@ outer\n  :@ inner\n  \"doc\"\n  x\n";
        assert_eq!(
            rewrite(source).unwrap(),
            "(hebi.basic.._macro_.def_ f (outer (inner (hebi.bootstrap..function (quote f) (lambda (x) x) (\"doc\")))))"
        );
    }

    #[test]
    fn class_with_bases_decorator_and_docstring() {
        let source = "class: pass: Point Base\n  :@ frozen\n  \"A point.\"\n  def: .x 0\n";
        assert_eq!(
            rewrite(source).unwrap(),
            "(hebi.basic.._macro_.def_ Point (frozen (hebi.bootstrap.._class_ (quote Point) \
             (hebi.bootstrap..akword Base) (\"A point.\") \
             (.__getitem__ (builtins..globals) (quote __name__)) \
             (lambda (__class__) (lambda (_ns_) __class__ (hebi.basic.._macro_.def_ .x 0))))))"
        );
    }

    #[test]
    fn class_needs_a_name() {
        assert_eq!(rewrite("class:\n").unwrap_err().error_type(), ErrorType::MacroSyntax);
        assert!(rewrite("class: pass: 1\n").is_err());
    }

    #[test]
    fn def_globals() {
        assert_eq!(
            rewrite("def: x 1\n").unwrap(),
            "(.__setitem__ (builtins..globals) (quote x) 1)"
        );
        assert_eq!(
            rewrite("def: .x 1\n").unwrap(),
            "(builtins..setattr _ns_ (quote x) 1)"
        );
        assert!(rewrite("def: x 1 2\n").is_err());
    }

    #[test]
    fn loop_and_begin() {
        assert_eq!(
            rewrite("!loop: pass: recur n 0\n  f: n\n").unwrap(),
            "((hebi.bootstrap.._loop (lambda (recur : n 0) (f n))))"
        );
        assert_eq!(rewrite("!begin: a b\n").unwrap(), "(hebi.bootstrap.._begin a b)");
        assert_eq!(rewrite("!begin0: a b\n").unwrap(), "(hebi.bootstrap.._begin0 a b)");
    }

    #[test]
    fn imports() {
        assert_eq!(
            rewrite("import: a.b c :as d\n").unwrap(),
            "((lambda () (.__setitem__ (builtins..globals) (quote a) (__import__ (quote a.b) (builtins..globals))) (.__setitem__ (builtins..globals) (quote d) (__import__ (quote c) (builtins..globals)))))"
        );
        assert_eq!(
            rewrite("from: ..pkg :import x y :as z\n").unwrap(),
            "((lambda (module) (.update (builtins..globals) (dict : x module.x z module.y))) (__import__ (quote pkg) : globals (builtins..globals) fromlist (quote (x y)) level 2))"
        );
    }

    #[test]
    fn runtime_guards_on_the_module_name() {
        assert_eq!(
            rewrite("!runtime: f:\n").unwrap(),
            "(hebi.basic.._macro_.if_ (__name__!='<compiler>') (:then (f)))"
        );
    }
}
