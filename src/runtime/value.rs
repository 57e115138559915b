//! Runtime values of the reference interpreter.
//!
//! The value model mirrors the host the expanded forms target: symbols and
//! string literals are both strings, tuples are immutable sequences, and lists
//! and dicts are shared mutable containers. Exceptions form a small single
//! inheritance hierarchy so that `try` handlers can match by subtype.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::{format_float, Form};
use crate::runtime::eval::Interpreter;
use crate::runtime::{Flow, Resource};

pub type Args = Vec<Value>;
pub type Kwargs = Vec<(String, Value)>;
pub type DictRef = Rc<RefCell<im::HashMap<String, Value>>>;
pub type IterRef = Rc<RefCell<Box<dyn Iterator<Item = Value>>>>;

/// Signature of functions implemented in Rust.
pub type NativeFn = dyn Fn(&Interpreter, Args, Kwargs) -> Result<Value, Flow>;

// ============================================================================
// VALUES
// ============================================================================

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Rc<Vec<Value>>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(DictRef),
    Iterator(IterRef),
    Function(Rc<Function>),
    ExceptionType(Rc<ExceptionType>),
    Exception(Rc<Exception>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Resource(Rc<dyn Resource>),
}

pub enum Function {
    Closure(super::eval::Closure),
    Native { name: String, func: Box<NativeFn> },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Closure(c) => c.name.as_deref().unwrap_or("<lambda>"),
            Function::Native { name, .. } => name,
        }
    }
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn native(
        name: impl Into<String>,
        func: impl Fn(&Interpreter, Args, Kwargs) -> Result<Value, Flow> + 'static,
    ) -> Self {
        Value::Function(Rc::new(Function::Native {
            name: name.into(),
            func: Box::new(func),
        }))
    }

    pub fn iterator(iter: impl Iterator<Item = Value> + 'static) -> Self {
        Value::Iterator(Rc::new(RefCell::new(Box::new(iter))))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Iterator(_) => "iterator",
            Value::Function(_) => "function",
            Value::ExceptionType(_) => "type",
            Value::Exception(_) => "exception",
            Value::Class(_) => "type",
            Value::Instance(_) => "object",
            Value::Resource(_) => "resource",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Host truthiness: `None`, `False`, zero and empty containers are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(map) => !map.borrow().is_empty(),
            _ => true,
        }
    }

    /// Converts quoted data back into a form. Strings starting with `(` are
    /// embedded text, other strings are symbols. Returns `None` for values
    /// that have no form, such as functions.
    pub fn to_form(&self) -> Option<Form> {
        Some(match self {
            Value::None => Form::None,
            Value::Bool(b) => Form::Bool(*b),
            Value::Int(n) => Form::Int(*n),
            Value::Float(x) => Form::Float(*x),
            Value::Str(s) if s.starts_with('(') => Form::Embedded(s.to_string()),
            Value::Str(s) => Form::Symbol(s.to_string()),
            Value::Tuple(items) => Form::List(
                items
                    .iter()
                    .map(Value::to_form)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::List(items) => Form::List(
                items
                    .borrow()
                    .iter()
                    .map(Value::to_form)
                    .collect::<Option<Vec<_>>>()?,
            ),
            _ => return None,
        })
    }

    /// The host's `repr` of this value.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

fn join_repr<'v>(items: impl Iterator<Item = &'v Value>) -> String {
    items.map(Value::repr).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
            Value::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0].repr()),
            Value::Tuple(items) => write!(f, "({})", join_repr(items.iter())),
            Value::List(items) => write!(f, "[{}]", join_repr(items.borrow().iter())),
            Value::Dict(map) => {
                let mut entries: Vec<_> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("'{k}': {}", v.repr()))
                    .collect();
                entries.sort();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Iterator(_) => f.write_str("<iterator>"),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::ExceptionType(ty) => write!(f, "<class '{}'>", ty.name),
            Value::Exception(ex) => write!(f, "{}({})", ex.ty.name, join_repr(ex.args.iter())),
            Value::Class(class) => write!(f, "<class '{}'>", class.name),
            Value::Instance(obj) => write!(f, "<{} object>", obj.class.name),
            Value::Resource(r) => write!(f, "<resource {r:?}>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (Str(a), Str(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Float(a), b) | (b, Float(a)) => b.as_int().is_some_and(|n| n as f64 == *a),
            (a @ (Int(_) | Bool(_)), b @ (Int(_) | Bool(_))) => a.as_int() == b.as_int(),
            (Tuple(a), Tuple(b)) => a == b,
            (List(a), List(b)) => *a.borrow() == *b.borrow(),
            (Dict(a), Dict(b)) => *a.borrow() == *b.borrow(),
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            (ExceptionType(a), ExceptionType(b)) => a.name == b.name,
            (Exception(a), Exception(b)) => Rc::ptr_eq(a, b),
            (Iterator(a), Iterator(b)) => Rc::ptr_eq(a, b),
            (Class(a), Class(b)) => Rc::ptr_eq(a, b),
            (Instance(a), Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// EXCEPTIONS
// ============================================================================

#[derive(Debug)]
pub struct ExceptionType {
    pub name: String,
    pub parent: Option<Rc<ExceptionType>>,
}

impl ExceptionType {
    pub fn new(name: &str, parent: Option<&Rc<ExceptionType>>) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            parent: parent.cloned(),
        })
    }

    /// True if `self` is `other` or derives from it.
    pub fn is_subtype_of(&self, other: &ExceptionType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty.name == other.name {
                return true;
            }
            current = ty.parent.as_deref();
        }
        false
    }
}

#[derive(Debug)]
pub struct Exception {
    pub ty: Rc<ExceptionType>,
    pub args: Vec<Value>,
    pub cause: Option<Value>,
}

impl Exception {
    /// The message the host would print after the type name.
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [Value::Str(s)] if self.ty.name != "KeyError" => s.to_string(),
            [single] => single.repr(),
            many => format!("({})", join_repr(many.iter())),
        }
    }
}

// ============================================================================
// CLASSES
// ============================================================================

/// A class built by `_class_`. Its namespace is shared with the class body,
/// so attributes the body assigns after creation are visible.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub bases: Vec<Rc<Class>>,
    pub namespace: DictRef,
}

impl Class {
    /// Looks `attr` up in this class, then depth-first through its bases.
    pub fn lookup(&self, attr: &str) -> Option<Value> {
        if let Some(value) = self.namespace.borrow().get(attr) {
            return Some(value.clone());
        }
        self.bases.iter().find_map(|base| base.lookup(attr))
    }

    pub fn is_subclass_of(&self, other: &Class) -> bool {
        std::ptr::eq(self, other) || self.bases.iter().any(|base| base.is_subclass_of(other))
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub attrs: DictRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_the_host() {
        assert!(!Value::None.truthy());
        assert!(!Value::tuple(vec![]).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::str("x").truthy());
        assert!(Value::list(vec![Value::None]).truthy());
    }

    #[test]
    fn numbers_compare_across_types() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::str("1"), Value::Int(1));
    }

    #[test]
    fn subtype_chain() {
        let base = ExceptionType::new("Exception", None);
        let lookup = ExceptionType::new("LookupError", Some(&base));
        let key = ExceptionType::new("KeyError", Some(&lookup));
        assert!(key.is_subtype_of(&base));
        assert!(!base.is_subtype_of(&key));
    }

    #[test]
    fn class_lookup_walks_the_bases() {
        let base = Rc::new(Class {
            name: "Base".into(),
            bases: Vec::new(),
            namespace: Rc::new(RefCell::new(im::hashmap! {"x".to_string() => Value::Int(1)})),
        });
        let derived = Class {
            name: "Derived".into(),
            bases: vec![Rc::clone(&base)],
            namespace: Rc::new(RefCell::new(im::HashMap::new())),
        };
        assert_eq!(derived.lookup("x"), Some(Value::Int(1)));
        assert_eq!(derived.lookup("y"), None);
        assert!(derived.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&derived));
    }

    #[test]
    fn quoted_data_converts_back_to_forms() {
        let value = Value::tuple(vec![Value::str("a"), Value::str("(\"s\")"), Value::Int(2)]);
        assert_eq!(value.to_form().unwrap().to_string(), "(a (\"s\") 2)");
        assert_eq!(value.to_string(), "('a', '(\"s\")', 2)");
    }
}
