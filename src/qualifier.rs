//! Symbol qualification.
//!
//! Template quoting (`mask`) rewrites bare symbols to fully qualified names so
//! that expanded code refers to the same bindings wherever it lands. The
//! active compilation unit and its macro names are carried in an explicit
//! [`QualContext`]; nothing here is global except the fixed built-in table.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DEFAULT_BUILTINS_NAMESPACE;

/// Public names of the host's built-in module.
pub static BUILTIN_NAMES: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        "ArithmeticError", "AssertionError", "AttributeError", "BaseException",
        "BlockingIOError", "BrokenPipeError", "BufferError", "BytesWarning",
        "ChildProcessError", "ConnectionAbortedError", "ConnectionError",
        "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning", "EOFError",
        "Ellipsis", "EnvironmentError", "Exception", "False", "FileExistsError",
        "FileNotFoundError", "FloatingPointError", "FutureWarning", "GeneratorExit", "IOError",
        "ImportError", "ImportWarning", "IndentationError", "IndexError", "InterruptedError",
        "IsADirectoryError", "KeyError", "KeyboardInterrupt", "LookupError", "MemoryError",
        "ModuleNotFoundError", "NameError", "None", "NotADirectoryError", "NotImplemented",
        "NotImplementedError", "OSError", "OverflowError", "PendingDeprecationWarning",
        "PermissionError", "ProcessLookupError", "RecursionError", "ReferenceError",
        "ResourceWarning", "RuntimeError", "RuntimeWarning", "StopAsyncIteration",
        "StopIteration", "SyntaxError", "SyntaxWarning", "SystemError", "SystemExit",
        "TabError", "TimeoutError", "True", "TypeError", "UnboundLocalError",
        "UnicodeDecodeError", "UnicodeEncodeError", "UnicodeError", "UnicodeTranslateError",
        "UnicodeWarning", "UserWarning", "ValueError", "Warning", "ZeroDivisionError",
        "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint",
        "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
        "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate", "eval",
        "exec", "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
        "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance", "issubclass",
        "iter", "len", "license", "list", "locals", "map", "max", "memoryview", "min", "next",
        "object", "oct", "open", "ord", "pow", "print", "property", "quit", "range", "repr",
        "reversed", "round", "set", "setattr", "slice", "sorted", "staticmethod", "str",
        "sum", "super", "tuple", "type", "vars", "zip",
    ]
    .into_iter()
    .collect()
});

/// Symbols qualification leaves alone.
static ALREADY_RESOLVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\.|^\.|^quote$|^lambda$|xAUTO\d+_$").expect("valid regex"));

/// The qualified name of the unit being compiled and the names of the macros
/// it defines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualContext {
    pub unit: Option<String>,
    pub macros: BTreeSet<String>,
}

impl QualContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_unit(unit: impl Into<String>) -> Self {
        Self {
            unit: Some(unit.into()),
            ..Self::default()
        }
    }

    pub fn with_macro(mut self, name: impl Into<String>) -> Self {
        self.macros.insert(name.into());
        self
    }

    /// Qualifies `symbol` in this context. See [`qualify`].
    pub fn qualify(&self, symbol: &str) -> String {
        qualify(symbol, self)
    }
}

/// Qualifies a bare symbol, sending built-ins to `builtins..`.
///
/// Embedded text, names containing `..`, names starting with `.`, `quote`,
/// `lambda` and generated names are returned as they are. Otherwise the
/// symbol is placed in the unit's macro namespace if the unit defines a macro
/// by that name, or in the unit itself. Without a unit the symbol is
/// unchanged. Qualifying twice changes nothing.
pub fn qualify(symbol: &str, ctx: &QualContext) -> String {
    qualify_in(symbol, ctx, DEFAULT_BUILTINS_NAMESPACE)
}

/// [`qualify`] with the built-in namespace taken from the reader
/// configuration (`builtins_namespace` ends in `..`).
pub fn qualify_in(symbol: &str, ctx: &QualContext, builtins_namespace: &str) -> String {
    if symbol.starts_with('(') || ALREADY_RESOLVED.is_match(symbol) {
        return symbol.to_string();
    }
    if BUILTIN_NAMES.contains(symbol) {
        return format!("{builtins_namespace}{symbol}");
    }
    match &ctx.unit {
        Some(unit) if ctx.macros.contains(symbol) => format!("{unit}.._macro_.{symbol}"),
        Some(unit) => format!("{unit}..{symbol}"),
        None => symbol.to_string(),
    }
}
