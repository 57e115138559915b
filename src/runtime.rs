//! # Reference runtime
//!
//! A small interpreter for expanded forms, together with a Rust
//! implementation of the primitive vocabulary the expander targets
//! (`_if_`, `_for_`, `Break`, `_try_`, `_with_`, `_unpack`, `entuple`, ...).
//!
//! It exists to check expansion contracts end to end: a form goes through the
//! reader and the expander, and the result is evaluated here. It understands
//! `quote`, `lambda`, calls with the `:` keyword section (`:?` positional,
//! `:*` splat, `:**` keyword splat, `name value`), `.method` calls and
//! `module..name` references. Embedded host-language text is only evaluated
//! when it is a plain string or number literal.
//!
//! ## Non-local control flow
//!
//! `break`, `continue` and raised conditions are values of [`Flow`] returned
//! through `Result`, never panics. A `try` only handles [`Flow::Raise`]; loop
//! signals pass through it (running `finally` on the way) to their loop.

pub mod eval;
pub mod primitives;
pub mod unpack;
pub mod value;

use std::fmt;

pub use eval::{Closure, Interpreter};
pub use value::{Exception, ExceptionType, Function, Value};

use crate::HebiError;

/// A non-local exit out of an evaluation.
#[derive(Debug)]
pub enum Flow {
    /// Leave the loop whose label matches (or the innermost one when `label`
    /// is `None`) with `value` as its result.
    Break { label: Option<String>, value: Value },
    /// Resume the next iteration of the matching loop.
    Continue { label: Option<String> },
    /// A raised exception instance.
    Raise(Value),
    /// The interpreter cannot go on, e.g. it was asked to run host code.
    Error(HebiError),
}

impl From<HebiError> for Flow {
    fn from(error: HebiError) -> Self {
        Flow::Error(error)
    }
}

/// A scoped resource for `with` blocks.
pub trait Resource: fmt::Debug {
    /// Called on entry; the result is bound to the `:as` name.
    fn enter(&self, interp: &Interpreter) -> Result<Value, Flow>;

    /// Called on every exit. `raised` is the exception leaving the block, if
    /// any; returning `true` suppresses it.
    fn exit(&self, interp: &Interpreter, raised: Option<&Value>) -> Result<bool, Flow>;
}
