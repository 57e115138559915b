//! # Hebi
//!
//! An indentation-sensitive reader for hot-word source text and a macro layer
//! that rewrites the resulting forms into calls against a small primitive
//! runtime vocabulary.
//!
//! ```rust
//! use hebi::{Engine, QualContext};
//!
//! let engine = Engine::new();
//! let forms = engine.read("print: 1 2\n").unwrap();
//! assert_eq!(forms[0].to_string(), "(print 1 2)");
//!
//! let expanded = engine.read_expanded("not: x\n", &QualContext::new()).unwrap();
//! assert_eq!(expanded[0].to_string(), "(hebi.bootstrap.._not_ x)");
//! ```

pub use crate::ast::Form;
pub use crate::config::ReaderConfig;
pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, HebiError};
pub use crate::engine::{Compiler, Completeness, Engine, SexpCompiler};
pub use crate::macros::{Expander, MacroRegistry};
pub use crate::qualifier::{qualify, qualify_in, QualContext};

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod macros;
pub mod qualifier;
pub mod runtime;
pub mod syntax;
