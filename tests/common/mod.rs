//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use hebi::runtime::{Flow, Interpreter, Resource, Value};
use hebi::{Engine, HebiError, QualContext};

/// Reads `source` and prints every top-level form.
pub fn read(source: &str) -> Vec<String> {
    Engine::new()
        .read(source)
        .unwrap_or_else(|e| panic!("failed to read {source:?}: {e}"))
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Reads and expands `source` without a unit name.
pub fn expand(source: &str) -> Vec<String> {
    Engine::new()
        .read_expanded(source, &QualContext::new())
        .unwrap_or_else(|e| panic!("failed to expand {source:?}: {e}"))
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Reads, expands and evaluates `source` in `interp`.
pub fn run_in(interp: &Interpreter, source: &str) -> Result<Value, HebiError> {
    let forms = Engine::new().read_expanded(source, &QualContext::new())?;
    interp.eval_all(&forms)
}

pub fn run(source: &str) -> Result<Value, HebiError> {
    run_in(&Interpreter::new(), source)
}

/// An interpreter with an empty list bound to `name`, returned alongside it.
pub fn with_list(name: &str) -> (Interpreter, Value) {
    let interp = Interpreter::new();
    let list = Value::list(Vec::new());
    interp.define(name, list.clone());
    (interp, list)
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

pub fn pair(a: i64, b: i64) -> Value {
    Value::tuple(ints(&[a, b]))
}

/// The type name of an uncaught runtime condition.
pub fn unhandled_type(error: &HebiError) -> &str {
    match error {
        HebiError::Unhandled { type_name, .. } => type_name,
        other => panic!("expected an unhandled condition, got {other}"),
    }
}

/// A resource that logs its entry and exits.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: RefCell<Vec<String>>,
    pub suppress: bool,
}

impl Recorder {
    pub fn suppressing() -> Self {
        Self {
            suppress: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Resource for Recorder {
    fn enter(&self, _interp: &Interpreter) -> Result<Value, Flow> {
        self.events.borrow_mut().push("enter".to_string());
        Ok(Value::str("entered"))
    }

    fn exit(&self, _interp: &Interpreter, raised: Option<&Value>) -> Result<bool, Flow> {
        let event = match raised {
            Some(_) => "exit raised",
            None => "exit",
        };
        self.events.borrow_mut().push(event.to_string());
        Ok(self.suppress)
    }
}

/// Binds a fresh [`Recorder`] as `name`.
pub fn with_recorder(interp: &Interpreter, name: &str, recorder: Recorder) -> Rc<Recorder> {
    let recorder = Rc::new(recorder);
    interp.define(name, Value::Resource(recorder.clone()));
    recorder
}
