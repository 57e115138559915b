//! # Hebi Engine
//!
//! The pipeline facade. An [`Engine`] owns the reader configuration, the
//! macro registry and the embedded-expression grammar, and runs text through
//! the stages in order:
//!
//! ```text
//! text -> lex -> read -> expand -> compile
//! ```
//!
//! Each stage is also exposed on its own. Expansion takes the
//! [`QualContext`] of the unit being compiled as an explicit argument, so one
//! engine can serve several units.

use std::iter;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::ast::Form;
use crate::config::ReaderConfig;
use crate::macros::expander::ExpansionStep;
use crate::macros::{Expander, MacroRegistry};
use crate::qualifier::QualContext;
use crate::syntax::{ExpressionGrammar, Lexer, Parser, PythonGrammar, Token};
use crate::HebiError;

/// A marker that may still be waiting for its block.
static PENDING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":(?:\n| |$)").expect("valid regex"));

// ============================================================================
// COMPILER SEAM
// ============================================================================

/// The downstream stage that turns expanded forms into host source text.
pub trait Compiler {
    fn compile(&self, forms: &[Form]) -> Result<String, HebiError>;
}

/// Prints forms in s-expression notation, one per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SexpCompiler {
    pub pretty: bool,
}

impl Compiler for SexpCompiler {
    fn compile(&self, forms: &[Form]) -> Result<String, HebiError> {
        let mut out = String::new();
        for form in forms {
            if self.pretty {
                out.push_str(&form.pretty());
            } else {
                out.push_str(&form.to_string());
            }
            out.push('\n');
        }
        Ok(out)
    }
}

/// Result of [`Engine::is_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    /// More input could still make the text valid.
    Incomplete,
    Invalid,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    config: ReaderConfig,
    registry: MacroRegistry,
    grammar: Box<dyn ExpressionGrammar>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Default configuration, the standard macros and the host-expression grammar.
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
            registry: MacroRegistry::with_std(),
            grammar: Box::new(PythonGrammar),
        }
    }

    /// Validates `config` before using it.
    pub fn with_config(config: ReaderConfig) -> Result<Self, HebiError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Replaces the embedded-expression grammar.
    pub fn with_grammar(mut self, grammar: impl ExpressionGrammar + 'static) -> Self {
        self.grammar = Box::new(grammar);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    /// For registering additional macros.
    pub fn registry_mut(&mut self) -> &mut MacroRegistry {
        &mut self.registry
    }

    fn lexer<'e>(&'e self, source: &str) -> Lexer<'e> {
        Lexer::with_grammar(source, &*self.grammar, &self.config.no_op_marker)
    }

    pub fn lex(&self, source: &str) -> Result<Vec<Token>, HebiError> {
        self.lexer(source).collect()
    }

    /// Tokenizes and builds the tree.
    pub fn read(&self, source: &str) -> Result<Vec<Form>, HebiError> {
        Parser::with_config(self.lexer(source), &self.config).collect()
    }

    pub fn expand(&self, forms: &[Form], qual: &QualContext) -> Result<Vec<Form>, HebiError> {
        debug!(unit = ?qual.unit, forms = forms.len(), "expanding unit");
        Expander::new(&self.registry, &self.config, qual).expand_all(forms)
    }

    /// Like [`Engine::expand`], also returning every rewrite in order.
    pub fn expand_traced(
        &self,
        forms: &[Form],
        qual: &QualContext,
    ) -> Result<(Vec<Form>, Vec<ExpansionStep>), HebiError> {
        let mut expander = Expander::new(&self.registry, &self.config, qual).with_trace();
        let expanded = expander.expand_all(forms)?;
        Ok((expanded, expander.steps().to_vec()))
    }

    /// Top-level forms paired with the line each one starts on.
    pub fn read_located(&self, source: &str) -> Result<Vec<(usize, Form)>, HebiError> {
        let mut parser = Parser::with_config(self.lexer(source), &self.config);
        iter::from_fn(|| parser.next_located()).collect()
    }

    /// Reads and expands `source`. Expansion errors carry the line of the
    /// top-level form they came from.
    pub fn read_expanded(&self, source: &str, qual: &QualContext) -> Result<Vec<Form>, HebiError> {
        let forms = self.read_located(source)?;
        debug!(unit = ?qual.unit, forms = forms.len(), "expanding unit");
        let mut expander = Expander::new(&self.registry, &self.config, qual);
        forms
            .iter()
            .map(|(line, form)| {
                expander.expand(form).map_err(|e| match e.line() {
                    Some(_) => e,
                    None => e.at_line(*line),
                })
            })
            .collect()
    }

    /// Reads, expands and hands the result to `compiler`.
    pub fn compile(
        &self,
        source: &str,
        qual: &QualContext,
        compiler: &dyn Compiler,
    ) -> Result<String, HebiError> {
        let forms = self.read_expanded(source, qual)?;
        compiler.compile(&forms)
    }

    /// Whether an interactive caller should submit `source` or ask for more.
    ///
    /// Text without a final newline that contains a marker with nothing glued
    /// to it might still get an indented block, so it is incomplete. Otherwise
    /// the text is read: an `Incomplete` error means incomplete, any other
    /// error means invalid.
    pub fn is_complete(&self, source: &str) -> Completeness {
        let mut status = if source.ends_with('\n') || !PENDING_MARKER.is_match(source) {
            Completeness::Complete
        } else {
            Completeness::Incomplete
        };
        match self.read(source) {
            Ok(_) => {}
            Err(e) if e.is_incomplete() => status = Completeness::Incomplete,
            Err(_) => status = Completeness::Invalid,
        }
        status
    }
}
