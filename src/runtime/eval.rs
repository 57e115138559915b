//! Evaluation of expanded forms.
//!
//! Scopes are persistent `im::HashMap`s: a closure captures its defining scope
//! by cloning the map, which shares structure with the original. Globals live
//! in one shared dict so that `(.__setitem__ (builtins..globals) ...)` is
//! visible to later lookups.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::primitives;
use super::value::{
    Args, Class, DictRef, Exception, ExceptionType, Function, Instance, IterRef, Kwargs, Value,
};
use super::Flow;
use crate::ast::Form;
use crate::config::ReaderConfig;
use crate::syntax::embedded::string_literal_value;
use crate::syntax::parser::parse_number;
use crate::{err_msg, HebiError};

pub type Env = im::HashMap<String, Value>;

// ============================================================================
// CLOSURES
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Params {
    required: Vec<String>,
    optional: Vec<(String, Value)>,
    rest: Option<String>,
    kwrest: Option<String>,
}

impl Params {
    fn positional(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .map(String::as_str)
            .chain(self.optional.iter().map(|(name, _)| name.as_str()))
    }
}

/// A `lambda` together with the scope it was created in.
pub struct Closure {
    pub name: Option<String>,
    params: Params,
    body: Vec<Form>,
    env: Env,
}

/// The built-in exception hierarchy.
pub struct Exceptions {
    pub base_exception: Rc<ExceptionType>,
    pub exception: Rc<ExceptionType>,
    pub lookup_error: Rc<ExceptionType>,
    pub key_error: Rc<ExceptionType>,
    pub index_error: Rc<ExceptionType>,
    pub type_error: Rc<ExceptionType>,
    pub value_error: Rc<ExceptionType>,
    pub assertion_error: Rc<ExceptionType>,
    pub runtime_error: Rc<ExceptionType>,
    pub name_error: Rc<ExceptionType>,
    pub attribute_error: Rc<ExceptionType>,
    pub arithmetic_error: Rc<ExceptionType>,
    pub zero_division_error: Rc<ExceptionType>,
    pub stop_iteration: Rc<ExceptionType>,
}

impl Exceptions {
    fn new() -> Self {
        let base_exception = ExceptionType::new("BaseException", None);
        let exception = ExceptionType::new("Exception", Some(&base_exception));
        let lookup_error = ExceptionType::new("LookupError", Some(&exception));
        let arithmetic_error = ExceptionType::new("ArithmeticError", Some(&exception));
        Self {
            key_error: ExceptionType::new("KeyError", Some(&lookup_error)),
            index_error: ExceptionType::new("IndexError", Some(&lookup_error)),
            type_error: ExceptionType::new("TypeError", Some(&exception)),
            value_error: ExceptionType::new("ValueError", Some(&exception)),
            assertion_error: ExceptionType::new("AssertionError", Some(&exception)),
            runtime_error: ExceptionType::new("RuntimeError", Some(&exception)),
            name_error: ExceptionType::new("NameError", Some(&exception)),
            attribute_error: ExceptionType::new("AttributeError", Some(&exception)),
            zero_division_error: ExceptionType::new("ZeroDivisionError", Some(&arithmetic_error)),
            stop_iteration: ExceptionType::new("StopIteration", Some(&exception)),
            base_exception,
            exception,
            lookup_error,
            arithmetic_error,
        }
    }

    fn all(&self) -> Vec<&Rc<ExceptionType>> {
        vec![
            &self.base_exception,
            &self.exception,
            &self.lookup_error,
            &self.key_error,
            &self.index_error,
            &self.type_error,
            &self.value_error,
            &self.assertion_error,
            &self.runtime_error,
            &self.name_error,
            &self.attribute_error,
            &self.arithmetic_error,
            &self.zero_division_error,
            &self.stop_iteration,
        ]
    }
}

/// A method with `receiver` as its first argument.
fn bind(receiver: Value, func: Value) -> Value {
    let name = match &func {
        Value::Function(f) => f.name().to_string(),
        _ => "method".to_string(),
    };
    Value::native(name, move |interp, args, kwargs| {
        let mut call_args = vec![receiver.clone()];
        call_args.extend(args);
        interp.call(&func, call_args, kwargs)
    })
}

// ============================================================================
// INTERPRETER
// ============================================================================

pub struct Interpreter {
    config: ReaderConfig,
    globals: DictRef,
    modules: HashMap<String, Env>,
    exceptions: Exceptions,
    handling: RefCell<Vec<Value>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        let exceptions = Exceptions::new();
        let globals: DictRef = Rc::new(RefCell::new(im::HashMap::new()));
        globals
            .borrow_mut()
            .insert("__name__".to_string(), Value::str("__main__"));

        let mut builtins = primitives::builtins(&globals);
        for ty in exceptions.all() {
            builtins.insert(ty.name.clone(), Value::ExceptionType(Rc::clone(ty)));
        }

        let module_key = |ns: &str| ns.trim_end_matches('.').to_string();
        let mut modules = HashMap::new();
        modules.insert(module_key(&config.builtins_namespace), builtins);
        modules.insert(
            module_key(&config.bootstrap_namespace),
            primitives::bootstrap(),
        );
        modules.insert("operator".to_string(), primitives::operators());

        Self {
            config,
            globals,
            modules,
            exceptions,
            handling: RefCell::new(Vec::new()),
        }
    }

    pub fn exceptions(&self) -> &Exceptions {
        &self.exceptions
    }

    /// Binds a global name.
    pub fn define(&self, name: &str, value: Value) {
        self.globals.borrow_mut().insert(name.to_string(), value);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    /// Evaluates a top-level form. Uncaught exceptions and stray loop signals
    /// become errors.
    pub fn eval(&self, form: &Form) -> Result<Value, HebiError> {
        debug!(%form, "evaluating top-level form");
        self.eval_in(form, &Env::new()).map_err(|flow| self.uncaught(flow))
    }

    /// Evaluates forms in order and returns the last value.
    pub fn eval_all(&self, forms: &[Form]) -> Result<Value, HebiError> {
        let mut last = Value::None;
        for form in forms {
            last = self.eval(form)?;
        }
        Ok(last)
    }

    fn uncaught(&self, flow: Flow) -> HebiError {
        match flow {
            Flow::Raise(Value::Exception(ex)) => HebiError::unhandled(ex.ty.name.clone(), ex.message()),
            Flow::Raise(other) => HebiError::unhandled(other.type_name(), other.repr()),
            Flow::Break { .. } => err_msg!(Eval, "break outside of a loop"),
            Flow::Continue { .. } => err_msg!(Eval, "continue outside of a loop"),
            Flow::Error(e) => e,
        }
    }

    // ------------------------------------------------------------------------
    // Raising
    // ------------------------------------------------------------------------

    /// Builds a raised exception of type `ty` with a message argument.
    pub fn raise(&self, ty: &Rc<ExceptionType>, message: impl Into<String>) -> Flow {
        let message = message.into();
        let args = if message.is_empty() {
            Vec::new()
        } else {
            vec![Value::str(&message)]
        };
        Flow::Raise(self.instantiate(ty, args))
    }

    pub fn key_error(&self, key: &Value) -> Flow {
        Flow::Raise(self.instantiate(&self.exceptions.key_error, vec![key.clone()]))
    }

    pub fn type_error(&self, message: impl Into<String>) -> Flow {
        self.raise(&self.exceptions.type_error, message)
    }

    pub(crate) fn instantiate(&self, ty: &Rc<ExceptionType>, args: Args) -> Value {
        Value::Exception(Rc::new(Exception {
            ty: Rc::clone(ty),
            args,
            cause: None,
        }))
    }

    /// True if the raised `value` matches a handler spec: an exception type
    /// or a tuple of them.
    pub(crate) fn matches(&self, value: &Value, spec: &Value) -> bool {
        match (value, spec) {
            (_, Value::Tuple(items)) => items.iter().any(|item| self.matches(value, item)),
            (Value::Exception(ex), Value::ExceptionType(ty)) => ex.ty.is_subtype_of(ty),
            (Value::Instance(obj), Value::Class(class)) => obj.class.is_subclass_of(class),
            _ => false,
        }
    }

    pub(crate) fn push_handling(&self, ex: Value) {
        self.handling.borrow_mut().push(ex);
    }

    pub(crate) fn pop_handling(&self) {
        self.handling.borrow_mut().pop();
    }

    /// The exception whose handler is currently running.
    pub(crate) fn current_exception(&self) -> Option<Value> {
        self.handling.borrow().last().cloned()
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    pub fn eval_in(&self, form: &Form, env: &Env) -> Result<Value, Flow> {
        match form {
            Form::Symbol(name) => self.lookup(name, env),
            Form::Int(n) => Ok(Value::Int(*n)),
            Form::Float(x) => Ok(Value::Float(*x)),
            Form::Bool(b) => Ok(Value::Bool(*b)),
            Form::None => Ok(Value::None),
            Form::Complex { .. } => Err(Flow::Error(err_msg!(
                Eval,
                "complex numbers are not supported by the reference runtime"
            ))),
            Form::Embedded(text) => self.eval_embedded(text),
            Form::List(items) if items.is_empty() => Ok(Value::tuple(Vec::new())),
            Form::List(items) => self.eval_list(items, env),
        }
    }

    fn eval_embedded(&self, text: &str) -> Result<Value, Flow> {
        if let Some(s) = string_literal_value(text) {
            return Ok(Value::str(&s));
        }
        let inner = text
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(text)
            .trim();
        match parse_number(inner) {
            Some(Form::Int(n)) => Ok(Value::Int(n)),
            Some(Form::Float(x)) => Ok(Value::Float(x)),
            _ => Err(Flow::Error(err_msg!(
                Eval,
                "embedded expression {} is host code and is not evaluated",
                text
            ))),
        }
    }

    fn eval_list(&self, items: &[Form], env: &Env) -> Result<Value, Flow> {
        let head = &items[0];
        let args = &items[1..];
        match head.as_symbol() {
            Some("quote") => match args {
                [quoted] => Ok(quote(quoted)),
                _ => Err(Flow::Error(err_msg!(Eval, "quote takes exactly one form"))),
            },
            Some("lambda") => self.make_closure(args, env),
            Some(method) if method.starts_with('.') && !method.contains("..") => {
                let Some((target, rest)) = args.split_first() else {
                    return Err(self.type_error(format!("method call {method} needs a target")));
                };
                let target = self.eval_in(target, env)?;
                let (args, kwargs) = self.eval_args(rest, env)?;
                primitives::call_method(self, &method[1..], &target, args, kwargs)
            }
            _ => {
                let func = self.eval_in(head, env)?;
                let (args, kwargs) = self.eval_args(args, env)?;
                self.call(&func, args, kwargs)
            }
        }
    }

    /// Evaluates call arguments: positionals, then after `:` the pairs
    /// `:? value`, `:* iterable`, `:** mapping` and `name value`.
    fn eval_args(&self, forms: &[Form], env: &Env) -> Result<(Args, Kwargs), Flow> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        let split = forms.iter().position(|f| f.is_symbol(":"));
        let (positional, pairs) = match split {
            Some(i) => (&forms[..i], &forms[i + 1..]),
            None => (forms, &[][..]),
        };
        for form in positional {
            args.push(self.eval_in(form, env)?);
        }
        if pairs.len() % 2 != 0 {
            return Err(Flow::Error(err_msg!(
                Eval,
                "keyword section must hold pairs, found {} forms",
                pairs.len()
            )));
        }
        for pair in pairs.chunks(2) {
            let value = self.eval_in(&pair[1], env)?;
            match pair[0].as_symbol() {
                Some(":?") => args.push(value),
                Some(":*") => {
                    let iter = self.iterate(&value)?;
                    let items: Vec<Value> = iter.borrow_mut().by_ref().collect();
                    args.extend(items);
                }
                Some(":**") => match value {
                    Value::Dict(map) => {
                        kwargs.extend(map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    other => {
                        return Err(self.type_error(format!(
                            "argument after ** must be a mapping, not {}",
                            other.type_name()
                        )))
                    }
                },
                Some(name) => kwargs.push((name.to_string(), value)),
                None => {
                    return Err(Flow::Error(err_msg!(
                        Eval,
                        "keyword name must be a symbol, found {}",
                        pair[0]
                    )))
                }
            }
        }
        Ok((args, kwargs))
    }

    fn lookup(&self, name: &str, env: &Env) -> Result<Value, Flow> {
        if name.starts_with(':') {
            return Ok(Value::str(name));
        }
        if let Some((module, attr)) = name.split_once("..") {
            return self
                .modules
                .get(module)
                .and_then(|m| m.get(attr))
                .cloned()
                .ok_or_else(|| {
                    self.raise(
                        &self.exceptions.name_error,
                        format!("name '{name}' is not defined"),
                    )
                });
        }
        if let Some((first, path)) = name.split_once('.').filter(|(first, _)| !first.is_empty()) {
            let mut value = self.lookup(first, env)?;
            for attr in path.split('.') {
                value = self.getattr(&value, attr)?;
            }
            return Ok(value);
        }
        if let Some(value) = env.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.globals.borrow().get(name) {
            return Ok(value.clone());
        }
        let builtins_key = self.config.builtins_namespace.trim_end_matches('.');
        self.modules
            .get(builtins_key)
            .and_then(|m| m.get(name))
            .cloned()
            .ok_or_else(|| {
                self.raise(
                    &self.exceptions.name_error,
                    format!("name '{name}' is not defined"),
                )
            })
    }

    pub fn getattr(&self, value: &Value, attr: &str) -> Result<Value, Flow> {
        match value {
            Value::Exception(ex) if attr == "args" => Ok(Value::tuple(ex.args.clone())),
            Value::Exception(ex) if attr == "__cause__" => {
                Ok(ex.cause.clone().unwrap_or_default())
            }
            Value::Dict(map) => map.borrow().get(attr).cloned().ok_or_else(|| {
                self.raise(
                    &self.exceptions.attribute_error,
                    format!("dict has no attribute '{attr}'"),
                )
            }),
            Value::Class(class) if attr == "__name__" => Ok(Value::str(&class.name)),
            Value::Class(class) => class.lookup(attr).ok_or_else(|| {
                self.raise(
                    &self.exceptions.attribute_error,
                    format!("type object '{}' has no attribute '{attr}'", class.name),
                )
            }),
            Value::Instance(obj) if attr == "__class__" => Ok(Value::Class(Rc::clone(&obj.class))),
            Value::Instance(obj) => {
                if let Some(value) = obj.attrs.borrow().get(attr) {
                    return Ok(value.clone());
                }
                match obj.class.lookup(attr) {
                    Some(Value::Function(func)) => Ok(bind(value.clone(), Value::Function(func))),
                    Some(other) => Ok(other),
                    None => Err(self.raise(
                        &self.exceptions.attribute_error,
                        format!("'{}' object has no attribute '{attr}'", obj.class.name),
                    )),
                }
            }
            other => Err(self.raise(
                &self.exceptions.attribute_error,
                format!("'{}' object has no attribute '{attr}'", other.type_name()),
            )),
        }
    }

    fn make_closure(&self, args: &[Form], env: &Env) -> Result<Value, Flow> {
        let Some((params, body)) = args.split_first() else {
            return Err(Flow::Error(err_msg!(Eval, "lambda needs a parameter list")));
        };
        let Some(params) = params.as_list() else {
            return Err(Flow::Error(err_msg!(
                Eval,
                "lambda parameters must be a list, found {}",
                params
            )));
        };
        let params = self.parse_params(params, env)?;
        Ok(Value::Function(Rc::new(Function::Closure(Closure {
            name: None,
            params,
            body: body.to_vec(),
            env: env.clone(),
        }))))
    }

    /// Reads `(a b : c default :* rest :** kw)`; defaults are evaluated now.
    fn parse_params(&self, forms: &[Form], env: &Env) -> Result<Params, Flow> {
        let mut params = Params::default();
        let name_of = |form: &Form| {
            form.as_symbol().map(str::to_string).ok_or_else(|| {
                Flow::Error(err_msg!(Eval, "parameter names must be symbols, found {}", form))
            })
        };
        let split = forms.iter().position(|f| f.is_symbol(":"));
        let (required, pairs) = match split {
            Some(i) => (&forms[..i], &forms[i + 1..]),
            None => (forms, &[][..]),
        };
        for form in required {
            params.required.push(name_of(form)?);
        }
        if pairs.len() % 2 != 0 {
            return Err(Flow::Error(err_msg!(
                Eval,
                "lambda parameters after ':' must be pairs"
            )));
        }
        for pair in pairs.chunks(2) {
            match pair[0].as_symbol() {
                Some(":*") => params.rest = Some(name_of(&pair[1])?),
                Some(":**") => params.kwrest = Some(name_of(&pair[1])?),
                _ if pair[1].is_symbol(":?") => params.required.push(name_of(&pair[0])?),
                _ => {
                    let default = self.eval_in(&pair[1], env)?;
                    params.optional.push((name_of(&pair[0])?, default));
                }
            }
        }
        Ok(params)
    }

    // ------------------------------------------------------------------------
    // Calling
    // ------------------------------------------------------------------------

    pub fn call(&self, func: &Value, args: Args, kwargs: Kwargs) -> Result<Value, Flow> {
        match func {
            Value::Function(f) => match f.as_ref() {
                Function::Native { func, .. } => func(self, args, kwargs),
                Function::Closure(closure) => self.call_closure(closure, args, kwargs),
            },
            Value::ExceptionType(ty) => Ok(self.instantiate(ty, args)),
            Value::Class(class) => self.construct(class, args, kwargs),
            other => Err(self.type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Makes an instance and runs `__init__` on it, if the class has one.
    fn construct(&self, class: &Rc<Class>, args: Args, kwargs: Kwargs) -> Result<Value, Flow> {
        let obj = Value::Instance(Rc::new(Instance {
            class: Rc::clone(class),
            attrs: Rc::new(RefCell::new(im::HashMap::new())),
        }));
        match class.lookup("__init__") {
            Some(init) => {
                let mut call_args = vec![obj.clone()];
                call_args.extend(args);
                self.call(&init, call_args, kwargs)?;
            }
            None if !args.is_empty() || !kwargs.is_empty() => {
                return Err(self.type_error(format!("{}() takes no arguments", class.name)))
            }
            None => {}
        }
        Ok(obj)
    }

    /// Calls `func` with positional arguments only.
    pub fn call0(&self, func: &Value, args: Args) -> Result<Value, Flow> {
        self.call(func, args, Vec::new())
    }

    fn call_closure(&self, closure: &Closure, args: Args, kwargs: Kwargs) -> Result<Value, Flow> {
        let params = &closure.params;
        let name = closure.name.as_deref().unwrap_or("<lambda>");
        let positional: Vec<&str> = params.positional().collect();
        let mut env = closure.env.clone();
        let mut bound: Vec<&str> = Vec::new();
        let mut rest = Vec::new();

        let given = args.len();
        for (i, arg) in args.into_iter().enumerate() {
            match positional.get(i) {
                Some(p) => {
                    env.insert(p.to_string(), arg);
                    bound.push(*p);
                }
                None if params.rest.is_some() => rest.push(arg),
                None => {
                    return Err(self.type_error(format!(
                        "{name}() takes {} positional arguments but {given} were given",
                        positional.len()
                    )))
                }
            }
        }
        if let Some(rest_name) = &params.rest {
            env.insert(rest_name.clone(), Value::tuple(rest));
        }

        let mut extra = Vec::new();
        for (key, value) in kwargs {
            match positional.iter().find(|p| **p == key) {
                Some(p) if bound.contains(p) => {
                    return Err(self.type_error(format!(
                        "{name}() got multiple values for argument '{key}'"
                    )))
                }
                Some(p) => {
                    bound.push(*p);
                    env.insert(key, value);
                }
                None if params.kwrest.is_some() => extra.push((key, value)),
                None => {
                    return Err(self.type_error(format!(
                        "{name}() got an unexpected keyword argument '{key}'"
                    )))
                }
            }
        }
        if let Some(kwrest) = &params.kwrest {
            env.insert(kwrest.clone(), Value::dict(extra));
        }

        for required in &params.required {
            if !bound.contains(&required.as_str()) {
                return Err(self.type_error(format!(
                    "{name}() missing required argument '{required}'"
                )));
            }
        }
        for (optional, default) in &params.optional {
            if !bound.contains(&optional.as_str()) {
                env.insert(optional.clone(), default.clone());
            }
        }

        let mut result = Value::tuple(Vec::new());
        for form in &closure.body {
            result = self.eval_in(form, &env)?;
        }
        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------------

    /// An iterator over `value`. Iterators are shared, not copied.
    pub fn iterate(&self, value: &Value) -> Result<IterRef, Flow> {
        let items: Vec<Value> = match value {
            Value::Iterator(iter) => return Ok(Rc::clone(iter)),
            Value::Tuple(items) => items.as_ref().clone(),
            Value::List(items) => items.borrow().clone(),
            Value::Str(s) => s.chars().map(|c| Value::str(&c.to_string())).collect(),
            Value::Dict(map) => {
                let mut keys: Vec<String> = map.borrow().keys().cloned().collect();
                keys.sort();
                keys.into_iter().map(|k| Value::str(&k)).collect()
            }
            other => {
                return Err(self.type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )))
            }
        };
        Ok(Rc::new(RefCell::new(Box::new(items.into_iter()))))
    }

    /// `container[key]`, raising `KeyError` or `IndexError` like the host.
    pub fn getitem(&self, container: &Value, key: &Value) -> Result<Value, Flow> {
        match (container, key) {
            (Value::Dict(map), Value::Str(k)) => {
                map.borrow().get(&**k).cloned().ok_or_else(|| self.key_error(key))
            }
            (Value::Dict(_), _) => Err(self.key_error(key)),
            (Value::Tuple(_) | Value::List(_) | Value::Str(_), _) => {
                let Some(index) = key.as_int() else {
                    return Err(self.type_error(format!(
                        "indices must be integers, not {}",
                        key.type_name()
                    )));
                };
                let items: Vec<Value> = match container {
                    Value::Tuple(items) => items.as_ref().clone(),
                    Value::List(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::str(&c.to_string())).collect(),
                    _ => Vec::new(),
                };
                let len = items.len() as i64;
                let at = if index < 0 { index + len } else { index };
                if at < 0 || at >= len {
                    return Err(self.raise(&self.exceptions.index_error, "index out of range"));
                }
                Ok(items[at as usize].clone())
            }
            (other, _) => Err(self.type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }
}

/// The data a quoted form denotes: symbols and embedded text become strings,
/// lists become tuples.
pub fn quote(form: &Form) -> Value {
    match form {
        Form::Symbol(s) | Form::Embedded(s) => Value::str(s),
        Form::Int(n) => Value::Int(*n),
        Form::Float(x) => Value::Float(*x),
        Form::Complex { re, im } => Value::str(&crate::ast::format_complex(*re, *im)),
        Form::Bool(b) => Value::Bool(*b),
        Form::None => Value::None,
        Form::List(items) => Value::tuple(items.iter().map(quote).collect()),
    }
}
