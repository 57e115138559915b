//! # Hebi Macro Expansion
//!
//! Purely syntactic rewriting of forms before they reach a compiler. Reserved
//! words and `!`-prefixed names are read as qualified macro names
//! (`hebi.basic.._macro_.if_`); the [`Expander`] finds lists headed by such a
//! name and replaces them with calls against the primitive runtime
//! vocabulary (`hebi.bootstrap.._if_`, `hebi.bootstrap.._for_`, ...).
//!
//! ## Core Principles
//!
//! - **Syntactic only**: a macro is a plain function from its argument forms to
//!   a new form. It never evaluates anything.
//! - **Deferred code is a thunk**: branches, loop bodies and handlers are
//!   emitted as `(lambda () ...)` so the runtime decides what runs.
//! - **No hidden state**: the qualification context travels in
//!   [`ExpandContext`] next to the reader configuration.
//!
//! ## Layout
//!
//! - [`std_macros`]: control flow and definition sugar (`if`, `for`, `try`, ...).
//! - [`destructure`]: `let` and destructuring targets.
//! - [`mask`]: quote/unquote templates.
//! - [`registry`]: name to macro lookup.
//! - [`expander`]: the top-down rewriting walk.

pub mod destructure;
pub mod expander;
pub mod mask;
pub mod registry;
pub mod std_macros;
pub mod utils;

pub use expander::Expander;
pub use registry::MacroRegistry;

use crate::ast::Form;
use crate::config::ReaderConfig;
use crate::qualifier::{qualify_in, QualContext};
use crate::HebiError;

/// A macro: argument forms in, replacement form out.
pub type MacroFn = fn(&[Form], &ExpandContext<'_>) -> Result<Form, HebiError>;

/// Name bound to values the source did not name, such as an unnamed
/// exception or a `with` resource without `:as`.
pub const AUTO_NAME: &str = "xAUTO0_";

/// What a macro may consult while rewriting.
#[derive(Debug, Clone, Copy)]
pub struct ExpandContext<'a> {
    pub config: &'a ReaderConfig,
    pub qual: &'a QualContext,
}

impl<'a> ExpandContext<'a> {
    pub fn new(config: &'a ReaderConfig, qual: &'a QualContext) -> Self {
        Self { config, qual }
    }

    /// A primitive reference, e.g. `hebi.bootstrap.._if_`.
    pub fn prim(&self, name: &str) -> String {
        self.config.primitive(name)
    }

    /// A qualified macro name, e.g. `hebi.basic.._macro_.let`.
    pub fn macro_name(&self, name: &str) -> String {
        self.config.macro_name(name)
    }

    pub fn builtin(&self, name: &str) -> String {
        self.config.builtin(name)
    }

    /// Qualifies `symbol` for the unit, with built-ins in the configured
    /// builtins namespace.
    pub fn qualify(&self, symbol: &str) -> String {
        qualify_in(symbol, self.qual, &self.config.builtins_namespace)
    }
}
