//! The primitive vocabulary expanded forms call into, plus the handful of
//! built-ins and `operator` functions the reference runtime needs.
//!
//! Deferred code arrives as zero-argument functions (thunks) and is only
//! called when selected, so a primitive controls exactly what runs.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::eval::{Env, Interpreter};
use super::unpack;
use super::value::{Args, Class, DictRef, Exception, Kwargs, Value};
use super::Flow;

fn define(
    env: &mut Env,
    name: &str,
    func: impl Fn(&Interpreter, Args, Kwargs) -> Result<Value, Flow> + 'static,
) {
    env.insert(name.to_string(), Value::native(name, func));
}

/// Removes the first keyword argument called one of `names`.
fn take_kw(kwargs: &mut Kwargs, names: &[&str]) -> Option<Value> {
    let index = kwargs.iter().position(|(k, _)| names.contains(&k.as_str()))?;
    Some(kwargs.remove(index).1)
}

fn reject_kwargs(interp: &Interpreter, name: &str, kwargs: &Kwargs) -> Result<(), Flow> {
    match kwargs.first() {
        Some((key, _)) => Err(interp.type_error(format!(
            "{name}() got an unexpected keyword argument '{key}'"
        ))),
        None => Ok(()),
    }
}

fn arity(
    interp: &Interpreter,
    name: &str,
    args: &Args,
    min: usize,
    max: usize,
) -> Result<(), Flow> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(interp.type_error(format!(
            "{name}() takes {expected} arguments ({} given)",
            args.len()
        )));
    }
    Ok(())
}

fn empty() -> Value {
    Value::tuple(Vec::new())
}

/// A loop label: `None` or a `:label` string.
fn label_of(interp: &Interpreter, value: Option<Value>) -> Result<Option<String>, Flow> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(interp.type_error(format!(
            "loop labels must be strings, not {}",
            other.type_name()
        ))),
    }
}

/// An unlabeled signal targets the innermost loop.
fn targets(signal: &Option<String>, label: &Option<String>) -> bool {
    signal.is_none() || signal == label
}

fn to_exception(interp: &Interpreter, value: Value) -> Result<Rc<Exception>, Flow> {
    match value {
        Value::Exception(ex) => Ok(ex),
        Value::ExceptionType(ty) => match interp.instantiate(&ty, Vec::new()) {
            Value::Exception(ex) => Ok(ex),
            _ => Err(interp.type_error("exception construction failed")),
        },
        other => Err(interp.type_error(format!(
            "exceptions must derive from BaseException, not {}",
            other.type_name()
        ))),
    }
}

// ============================================================================
// BOOTSTRAP
// ============================================================================

pub fn bootstrap() -> Env {
    let mut env = Env::new();

    define(&mut env, "_and_", |interp, args, kwargs| {
        reject_kwargs(interp, "_and_", &kwargs)?;
        let mut args = args.into_iter();
        let mut result = args.next().unwrap_or(Value::Bool(true));
        for thunk in args {
            if !result.truthy() {
                break;
            }
            result = interp.call0(&thunk, Vec::new())?;
        }
        Ok(result)
    });

    define(&mut env, "_or_", |interp, args, kwargs| {
        reject_kwargs(interp, "_or_", &kwargs)?;
        let mut args = args.into_iter();
        let mut result = args.next().unwrap_or_else(empty);
        for thunk in args {
            if result.truthy() {
                break;
            }
            result = interp.call0(&thunk, Vec::new())?;
        }
        Ok(result)
    });

    define(&mut env, "_not_", |interp, args, kwargs| {
        reject_kwargs(interp, "_not_", &kwargs)?;
        arity(interp, "_not_", &args, 1, 1)?;
        Ok(if args[0].truthy() {
            empty()
        } else {
            Value::Bool(true)
        })
    });

    define(&mut env, "_if_", |interp, args, mut kwargs| {
        let else_ = take_kw(&mut kwargs, &["else_"]);
        reject_kwargs(interp, "_if_", &kwargs)?;
        if args.len() < 2 || args.len() % 2 != 0 {
            return Err(interp.type_error(
                "_if_() takes a condition, a thunk and thunk pairs",
            ));
        }
        if args[0].truthy() {
            return interp.call0(&args[1], Vec::new());
        }
        for pair in args[2..].chunks(2) {
            if interp.call0(&pair[0], Vec::new())?.truthy() {
                return interp.call0(&pair[1], Vec::new());
            }
        }
        match else_ {
            Some(thunk) => interp.call0(&thunk, Vec::new()),
            None => Ok(empty()),
        }
    });

    define(&mut env, "_for_", |interp, args, mut kwargs| {
        let else_ = take_kw(&mut kwargs, &["else_"]);
        let label = label_of(interp, take_kw(&mut kwargs, &["label"]))?;
        reject_kwargs(interp, "_for_", &kwargs)?;
        arity(interp, "_for_", &args, 2, 2)?;
        let iter = interp.iterate(&args[0])?;
        loop {
            let next = iter.borrow_mut().next();
            let Some(item) = next else {
                break;
            };
            match interp.call0(&args[1], vec![item]) {
                Ok(_) => {}
                Err(Flow::Continue { label: signal }) if targets(&signal, &label) => {}
                Err(Flow::Break {
                    label: signal,
                    value,
                }) if targets(&signal, &label) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
        match else_ {
            Some(thunk) => interp.call0(&thunk, Vec::new()),
            None => Ok(empty()),
        }
    });

    define(&mut env, "Break", |interp, mut args, mut kwargs| {
        let label = label_of(interp, take_kw(&mut kwargs, &["label"]))?;
        reject_kwargs(interp, "Break", &kwargs)?;
        let value = match args.len() {
            0 => Value::None,
            1 => args.remove(0),
            _ => Value::tuple(args),
        };
        Err(Flow::Break { label, value })
    });

    define(&mut env, "Continue", |interp, args, mut kwargs| {
        let keyword = take_kw(&mut kwargs, &["label"]);
        reject_kwargs(interp, "Continue", &kwargs)?;
        arity(interp, "Continue", &args, 0, 1)?;
        let label = label_of(interp, keyword.or_else(|| args.into_iter().next()))?;
        Err(Flow::Continue { label })
    });

    define(&mut env, "_try_", |interp, args, mut kwargs| {
        let else_ = take_kw(&mut kwargs, &["else_"]).filter(|v| !v.is_none());
        let finally = take_kw(&mut kwargs, &["finally", "finally_"]);
        reject_kwargs(interp, "_try_", &kwargs)?;
        let Some((thunk, handlers)) = args.split_first() else {
            return Err(interp.type_error("_try_() needs a body thunk"));
        };
        if handlers.len() % 2 != 0 {
            return Err(interp.type_error("_try_() handlers must be (type, handler) pairs"));
        }
        for pair in handlers.chunks(2) {
            let valid = match &pair[0] {
                Value::ExceptionType(_) => true,
                Value::Tuple(items) => items.iter().all(|t| matches!(t, Value::ExceptionType(_))),
                _ => false,
            };
            if !valid {
                return Err(interp.type_error(format!(
                    "catching {} that does not inherit from BaseException is not allowed",
                    pair[0].type_name()
                )));
            }
        }

        let outcome = match interp.call0(thunk, Vec::new()) {
            Ok(value) => match &else_ {
                Some(thunk) => interp.call0(thunk, Vec::new()),
                None => Ok(value),
            },
            Err(Flow::Raise(raised)) => {
                match handlers.chunks(2).find(|pair| interp.matches(&raised, &pair[0])) {
                    Some(pair) => {
                        interp.push_handling(raised.clone());
                        let handled = interp.call0(&pair[1], vec![raised]);
                        interp.pop_handling();
                        handled
                    }
                    None => Err(Flow::Raise(raised)),
                }
            }
            Err(other) => Err(other),
        };
        if let Some(finally) = finally {
            interp.call0(&finally, Vec::new())?;
        }
        outcome
    });

    define(&mut env, "_with_", |interp, args, kwargs| {
        reject_kwargs(interp, "_with_", &kwargs)?;
        arity(interp, "_with_", &args, 2, 2)?;
        let guard = interp.call0(&args[0], Vec::new())?;
        let Value::Resource(resource) = &guard else {
            return Err(interp.type_error(format!(
                "'{}' object does not support the context manager protocol",
                guard.type_name()
            )));
        };
        let entered = resource.enter(interp)?;
        let outcome = interp.call0(&args[1], vec![entered]);
        let raised = match &outcome {
            Err(Flow::Raise(ex)) => Some(ex.clone()),
            _ => None,
        };
        let suppress = resource.exit(interp, raised.as_ref())?;
        match outcome {
            Err(Flow::Raise(_)) if suppress => Ok(Value::None),
            other => other,
        }
    });

    define(&mut env, "_unpack", |interp, args, kwargs| {
        reject_kwargs(interp, "_unpack", &kwargs)?;
        arity(interp, "_unpack", &args, 2, 2)?;
        let mut out = Vec::new();
        unpack::unpack(interp, &args[0], args[1].clone(), &mut out)?;
        Ok(Value::tuple(out))
    });

    define(&mut env, "entuple", |interp, args, kwargs| {
        reject_kwargs(interp, "entuple", &kwargs)?;
        Ok(Value::tuple(args))
    });

    define(&mut env, "_begin", |interp, args, kwargs| {
        reject_kwargs(interp, "_begin", &kwargs)?;
        Ok(args.into_iter().last().unwrap_or_else(empty))
    });

    define(&mut env, "_begin0", |interp, args, kwargs| {
        reject_kwargs(interp, "_begin0", &kwargs)?;
        match args.into_iter().next() {
            Some(first) => Ok(first),
            None => Err(interp.type_error("_begin0() needs at least one argument")),
        }
    });

    define(&mut env, "_raise", |interp, args, kwargs| {
        reject_kwargs(interp, "_raise", &kwargs)?;
        arity(interp, "_raise", &args, 0, 0)?;
        match interp.current_exception() {
            Some(ex) => Err(Flow::Raise(ex)),
            None => Err(interp.raise(
                &interp.exceptions().runtime_error,
                "No active exception to reraise",
            )),
        }
    });

    define(&mut env, "_raise_ex", |interp, args, kwargs| {
        reject_kwargs(interp, "_raise_ex", &kwargs)?;
        arity(interp, "_raise_ex", &args, 1, 1)?;
        let ex = to_exception(interp, args[0].clone())?;
        Err(Flow::Raise(Value::Exception(ex)))
    });

    define(&mut env, "_raise_ex_from", |interp, args, kwargs| {
        reject_kwargs(interp, "_raise_ex_from", &kwargs)?;
        arity(interp, "_raise_ex_from", &args, 2, 2)?;
        let ex = to_exception(interp, args[0].clone())?;
        let cause = match &args[1] {
            Value::None => None,
            other => Some(Value::Exception(to_exception(interp, other.clone())?)),
        };
        Err(Flow::Raise(Value::Exception(Rc::new(Exception {
            ty: Rc::clone(&ex.ty),
            args: ex.args.clone(),
            cause,
        }))))
    });

    define(&mut env, "_assert_", |interp, args, kwargs| {
        reject_kwargs(interp, "_assert_", &kwargs)?;
        arity(interp, "_assert_", &args, 1, 1)?;
        if args[0].truthy() {
            Ok(Value::None)
        } else {
            Err(interp.raise(&interp.exceptions().assertion_error, ""))
        }
    });

    define(&mut env, "_assert_message", |interp, args, kwargs| {
        reject_kwargs(interp, "_assert_message", &kwargs)?;
        arity(interp, "_assert_message", &args, 2, 2)?;
        if args[0].truthy() {
            return Ok(Value::None);
        }
        let message = interp.call0(&args[1], Vec::new())?;
        Err(Flow::Raise(
            interp.instantiate(&interp.exceptions().assertion_error, vec![message]),
        ))
    });

    define(&mut env, "_loop", |interp, args, kwargs| {
        reject_kwargs(interp, "_loop", &kwargs)?;
        arity(interp, "_loop", &args, 1, 1)?;
        Ok(trampoline(args[0].clone()))
    });

    define(&mut env, "function", |interp, args, mut kwargs| {
        take_kw(&mut kwargs, &["doc", "annotations", "dict_"]);
        reject_kwargs(interp, "function", &kwargs)?;
        arity(interp, "function", &args, 2, 5)?;
        Ok(args[1].clone())
    });

    define(&mut env, "akword", |_, args, kwargs| {
        Ok(Value::tuple(vec![Value::tuple(args), Value::dict(kwargs)]))
    });

    define(&mut env, "_class_", |interp, args, kwargs| {
        reject_kwargs(interp, "_class_", &kwargs)?;
        arity(interp, "_class_", &args, 5, 5)?;
        make_class(interp, &args)
    });

    env
}

/// `_class_(name, (bases, keywords), doc, module, callback)`.
///
/// The class exists before its body runs: `callback(cls)` returns the body
/// function, which is then called with the class namespace as `_ns_`.
fn make_class(interp: &Interpreter, args: &Args) -> Result<Value, Flow> {
    let Some(name) = args[0].as_str() else {
        return Err(interp.type_error("class name must be a string"));
    };
    let (bases, keywords) = match &args[1] {
        Value::Tuple(pair) if pair.len() == 2 => (pair[0].clone(), pair[1].clone()),
        other => {
            return Err(interp.type_error(format!(
                "class arguments must come from akword, not {}",
                other.type_name()
            )))
        }
    };
    if let Value::Dict(map) = &keywords {
        if let Some(key) = map.borrow().keys().next() {
            return Err(interp.type_error(format!(
                "class keyword '{key}' is not supported"
            )));
        }
    }
    let bases = match bases {
        Value::Tuple(items) => items
            .iter()
            .map(|base| match base {
                Value::Class(class) => Ok(Rc::clone(class)),
                other => Err(interp.type_error(format!(
                    "bases must be classes, not {}",
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    let namespace: DictRef = Rc::new(RefCell::new(im::HashMap::new()));
    {
        let mut ns = namespace.borrow_mut();
        ns.insert("__module__".to_string(), args[3].clone());
        if !args[2].is_none() {
            ns.insert("__doc__".to_string(), args[2].clone());
        }
    }
    let class = Value::Class(Rc::new(Class {
        name: name.to_string(),
        bases,
        namespace: Rc::clone(&namespace),
    }));
    let body = interp.call0(&args[4], vec![class.clone()])?;
    interp.call0(&body, vec![Value::Dict(namespace)])?;
    Ok(class)
}

/// Wraps `body`, a function whose first parameter is `recur`, so that calling
/// `recur` schedules another round instead of growing the stack.
fn trampoline(body: Value) -> Value {
    type Pending = Rc<RefCell<Option<(Args, Kwargs)>>>;
    let pending: Pending = Rc::new(RefCell::new(None));

    let scheduled = Rc::clone(&pending);
    let recur = Value::native("recur", move |_, args, kwargs| {
        *scheduled.borrow_mut() = Some((args, kwargs));
        Ok(Value::None)
    });

    Value::native("loop", move |interp, args, kwargs| {
        pending.borrow_mut().take();
        let mut call_args = vec![recur.clone()];
        call_args.extend(args);
        let mut result = interp.call(&body, call_args, kwargs)?;
        loop {
            let next = pending.borrow_mut().take();
            let Some((args, kwargs)) = next else {
                break;
            };
            let mut call_args = vec![recur.clone()];
            call_args.extend(args);
            result = interp.call(&body, call_args, kwargs)?;
        }
        Ok(result)
    })
}

// ============================================================================
// BUILTINS
// ============================================================================

pub fn builtins(globals: &DictRef) -> Env {
    let mut env = Env::new();
    env.insert("True".to_string(), Value::Bool(true));
    env.insert("False".to_string(), Value::Bool(false));
    env.insert("None".to_string(), Value::None);

    let shared = Rc::clone(globals);
    define(&mut env, "globals", move |interp, args, kwargs| {
        reject_kwargs(interp, "globals", &kwargs)?;
        arity(interp, "globals", &args, 0, 0)?;
        Ok(Value::Dict(Rc::clone(&shared)))
    });

    define(&mut env, "setattr", |interp, args, kwargs| {
        reject_kwargs(interp, "setattr", &kwargs)?;
        arity(interp, "setattr", &args, 3, 3)?;
        match (&args[0], &args[1]) {
            (Value::Dict(map), Value::Str(name)) => {
                map.borrow_mut().insert(name.to_string(), args[2].clone());
                Ok(Value::None)
            }
            (Value::Instance(obj), Value::Str(name)) => {
                obj.attrs.borrow_mut().insert(name.to_string(), args[2].clone());
                Ok(Value::None)
            }
            (Value::Class(class), Value::Str(name)) => {
                class.namespace.borrow_mut().insert(name.to_string(), args[2].clone());
                Ok(Value::None)
            }
            (target, _) => Err(interp.raise(
                &interp.exceptions().attribute_error,
                format!("cannot set attributes on '{}' objects", target.type_name()),
            )),
        }
    });

    define(&mut env, "getattr", |interp, args, kwargs| {
        reject_kwargs(interp, "getattr", &kwargs)?;
        arity(interp, "getattr", &args, 2, 3)?;
        let Some(name) = args[1].as_str() else {
            return Err(interp.type_error("attribute name must be a string"));
        };
        match (interp.getattr(&args[0], name), args.get(2)) {
            (Err(Flow::Raise(_)), Some(default)) => Ok(default.clone()),
            (result, _) => result,
        }
    });

    define(&mut env, "len", |interp, args, kwargs| {
        reject_kwargs(interp, "len", &kwargs)?;
        arity(interp, "len", &args, 1, 1)?;
        let len = match &args[0] {
            Value::Str(s) => s.chars().count(),
            Value::Tuple(items) => items.len(),
            Value::List(items) => items.borrow().len(),
            Value::Dict(map) => map.borrow().len(),
            other => {
                return Err(interp.type_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                )))
            }
        };
        Ok(Value::Int(len as i64))
    });

    define(&mut env, "tuple", |interp, args, kwargs| {
        reject_kwargs(interp, "tuple", &kwargs)?;
        arity(interp, "tuple", &args, 0, 1)?;
        match args.first() {
            Some(source) => {
                let iter = interp.iterate(source)?;
                let items: Vec<Value> = iter.borrow_mut().by_ref().collect();
                Ok(Value::tuple(items))
            }
            None => Ok(empty()),
        }
    });

    define(&mut env, "list", |interp, args, kwargs| {
        reject_kwargs(interp, "list", &kwargs)?;
        arity(interp, "list", &args, 0, 1)?;
        match args.first() {
            Some(source) => {
                let iter = interp.iterate(source)?;
                let items: Vec<Value> = iter.borrow_mut().by_ref().collect();
                Ok(Value::list(items))
            }
            None => Ok(Value::list(Vec::new())),
        }
    });

    define(&mut env, "dict", |interp, args, kwargs| {
        arity(interp, "dict", &args, 0, 1)?;
        let mut map = match args.first() {
            Some(Value::Dict(source)) => source.borrow().clone(),
            Some(other) => {
                return Err(interp.type_error(format!(
                    "cannot convert '{}' to a dict",
                    other.type_name()
                )))
            }
            None => im::HashMap::new(),
        };
        map.extend(kwargs);
        Ok(Value::Dict(Rc::new(RefCell::new(map))))
    });

    define(&mut env, "range", |interp, args, kwargs| {
        reject_kwargs(interp, "range", &kwargs)?;
        arity(interp, "range", &args, 1, 3)?;
        let mut ints = Vec::new();
        for arg in &args {
            match arg.as_int() {
                Some(n) => ints.push(n),
                None => {
                    return Err(interp.type_error(format!(
                        "'{}' object cannot be interpreted as an integer",
                        arg.type_name()
                    )))
                }
            }
        }
        let (start, stop, step) = match ints.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => (0, 0, 1),
        };
        if step == 0 {
            return Err(interp.raise(
                &interp.exceptions().value_error,
                "range() arg 3 must not be zero",
            ));
        }
        let iter = std::iter::successors(Some(start), move |n| Some(n + step))
            .take_while(move |n| if step > 0 { *n < stop } else { *n > stop })
            .map(Value::Int);
        Ok(Value::iterator(iter))
    });

    define(&mut env, "iter", |interp, args, kwargs| {
        reject_kwargs(interp, "iter", &kwargs)?;
        arity(interp, "iter", &args, 1, 1)?;
        Ok(Value::Iterator(interp.iterate(&args[0])?))
    });

    define(&mut env, "next", |interp, args, kwargs| {
        reject_kwargs(interp, "next", &kwargs)?;
        arity(interp, "next", &args, 1, 2)?;
        let Value::Iterator(iter) = &args[0] else {
            return Err(interp.type_error(format!(
                "'{}' object is not an iterator",
                args[0].type_name()
            )));
        };
        let next = iter.borrow_mut().next();
        match (next, args.get(1)) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(interp.raise(&interp.exceptions().stop_iteration, "")),
        }
    });

    define(&mut env, "isinstance", |interp, args, kwargs| {
        reject_kwargs(interp, "isinstance", &kwargs)?;
        arity(interp, "isinstance", &args, 2, 2)?;
        Ok(Value::Bool(interp.matches(&args[0], &args[1])))
    });

    define(&mut env, "bool", |interp, args, kwargs| {
        reject_kwargs(interp, "bool", &kwargs)?;
        arity(interp, "bool", &args, 0, 1)?;
        Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
    });

    define(&mut env, "str", |interp, args, kwargs| {
        reject_kwargs(interp, "str", &kwargs)?;
        arity(interp, "str", &args, 0, 1)?;
        Ok(Value::str(
            &args.first().map(ToString::to_string).unwrap_or_default(),
        ))
    });

    define(&mut env, "repr", |interp, args, kwargs| {
        reject_kwargs(interp, "repr", &kwargs)?;
        arity(interp, "repr", &args, 1, 1)?;
        Ok(Value::str(&args[0].repr()))
    });

    env
}

// ============================================================================
// OPERATORS
// ============================================================================

fn arithmetic(interp: &Interpreter, op: &str, a: &Value, b: &Value) -> Result<Value, Flow> {
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        let result = match op {
            "add" => x.checked_add(y),
            "sub" => x.checked_sub(y),
            _ => x.checked_mul(y),
        };
        return result.map(Value::Int).ok_or_else(|| {
            interp.raise(&interp.exceptions().arithmetic_error, "integer overflow")
        });
    }
    let float = |v: &Value| match v {
        Value::Float(x) => Some(*x),
        other => other.as_int().map(|n| n as f64),
    };
    if let (Some(x), Some(y)) = (float(a), float(b)) {
        return Ok(Value::Float(match op {
            "add" => x + y,
            "sub" => x - y,
            _ => x * y,
        }));
    }
    match (op, a, b) {
        ("add", Value::Str(x), Value::Str(y)) => Ok(Value::str(&format!("{x}{y}"))),
        ("add", Value::Tuple(x), Value::Tuple(y)) => {
            Ok(Value::tuple(x.iter().chain(y.iter()).cloned().collect()))
        }
        ("add", Value::List(x), Value::List(y)) => Ok(Value::list(
            x.borrow().iter().chain(y.borrow().iter()).cloned().collect(),
        )),
        _ => Err(interp.type_error(format!(
            "unsupported operand type(s) for {op}: '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn compare(interp: &Interpreter, a: &Value, b: &Value) -> Result<Ordering, Flow> {
    let ordering = match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => {
                let float = |v: &Value| match v {
                    Value::Float(x) => Some(*x),
                    other => other.as_int().map(|n| n as f64),
                };
                float(a).zip(float(b)).and_then(|(x, y)| x.partial_cmp(&y))
            }
        },
    };
    ordering.ok_or_else(|| {
        interp.type_error(format!(
            "comparison not supported between instances of '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))
    })
}

pub fn operators() -> Env {
    let mut env = Env::new();
    for op in ["add", "sub", "mul"] {
        define(&mut env, op, move |interp, args, kwargs| {
            reject_kwargs(interp, op, &kwargs)?;
            arity(interp, op, &args, 2, 2)?;
            arithmetic(interp, op, &args[0], &args[1])
        });
    }
    let comparisons: [(&'static str, fn(Ordering) -> bool); 4] = [
        ("lt", Ordering::is_lt),
        ("le", Ordering::is_le),
        ("gt", Ordering::is_gt),
        ("ge", Ordering::is_ge),
    ];
    for (op, accept) in comparisons {
        define(&mut env, op, move |interp, args, kwargs| {
            reject_kwargs(interp, op, &kwargs)?;
            arity(interp, op, &args, 2, 2)?;
            Ok(Value::Bool(accept(compare(interp, &args[0], &args[1])?)))
        });
    }
    define(&mut env, "eq", |interp, args, kwargs| {
        reject_kwargs(interp, "eq", &kwargs)?;
        arity(interp, "eq", &args, 2, 2)?;
        Ok(Value::Bool(args[0] == args[1]))
    });
    define(&mut env, "ne", |interp, args, kwargs| {
        reject_kwargs(interp, "ne", &kwargs)?;
        arity(interp, "ne", &args, 2, 2)?;
        Ok(Value::Bool(args[0] != args[1]))
    });
    define(&mut env, "not_", |interp, args, kwargs| {
        reject_kwargs(interp, "not_", &kwargs)?;
        arity(interp, "not_", &args, 1, 1)?;
        Ok(Value::Bool(!args[0].truthy()))
    });
    define(&mut env, "getitem", |interp, args, kwargs| {
        reject_kwargs(interp, "getitem", &kwargs)?;
        arity(interp, "getitem", &args, 2, 2)?;
        interp.getitem(&args[0], &args[1])
    });
    env
}

// ============================================================================
// METHODS
// ============================================================================

/// `(.name target args...)`
pub fn call_method(
    interp: &Interpreter,
    name: &str,
    target: &Value,
    args: Args,
    kwargs: Kwargs,
) -> Result<Value, Flow> {
    match (name, target) {
        ("__getitem__", _) => {
            arity(interp, name, &args, 1, 1)?;
            interp.getitem(target, &args[0])
        }
        ("__setitem__", Value::Dict(map)) => {
            arity(interp, name, &args, 2, 2)?;
            let Some(key) = args[0].as_str() else {
                return Err(interp.type_error("dict keys must be strings"));
            };
            map.borrow_mut().insert(key.to_string(), args[1].clone());
            Ok(Value::None)
        }
        ("__setitem__", Value::List(items)) => {
            arity(interp, name, &args, 2, 2)?;
            let len = items.borrow().len() as i64;
            let index = args[0].as_int().unwrap_or(len);
            let at = if index < 0 { index + len } else { index };
            if at < 0 || at >= len {
                return Err(interp.raise(
                    &interp.exceptions().index_error,
                    "list assignment index out of range",
                ));
            }
            items.borrow_mut()[at as usize] = args[1].clone();
            Ok(Value::None)
        }
        ("update", Value::Dict(map)) => {
            arity(interp, name, &args, 0, 1)?;
            if let Some(Value::Dict(other)) = args.first() {
                let entries = other.borrow().clone();
                map.borrow_mut().extend(entries);
            }
            map.borrow_mut().extend(kwargs);
            Ok(Value::None)
        }
        ("get", Value::Dict(map)) => {
            arity(interp, name, &args, 1, 2)?;
            let found = args[0].as_str().and_then(|k| map.borrow().get(k).cloned());
            Ok(found.or_else(|| args.get(1).cloned()).unwrap_or_default())
        }
        ("append", Value::List(items)) => {
            arity(interp, name, &args, 1, 1)?;
            items.borrow_mut().push(args[0].clone());
            Ok(Value::None)
        }
        (_, Value::Instance(_) | Value::Class(_)) => {
            let method = interp.getattr(target, name)?;
            interp.call(&method, args, kwargs)
        }
        _ => Err(interp.raise(
            &interp.exceptions().attribute_error,
            format!("'{}' object has no attribute '{name}'", target.type_name()),
        )),
    }
}
