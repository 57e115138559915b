//! The expansion walk.
//!
//! Forms are visited top-down. A list headed by a registered macro name is
//! rewritten and the result is expanded again; `quote` forms are left exactly
//! as written; every other list is rebuilt from its expanded children. The
//! number of consecutive rewrites along one path is bounded by
//! `max_expansion_depth`.

use tracing::{debug, trace};

use crate::ast::Form;
use crate::config::ReaderConfig;
use crate::macros::{ExpandContext, MacroRegistry};
use crate::qualifier::QualContext;
use crate::{err_msg, HebiError};

/// One rewrite, recorded when tracing is enabled on the expander.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionStep {
    pub macro_name: String,
    pub input: Form,
    pub output: Form,
}

pub struct Expander<'a> {
    registry: &'a MacroRegistry,
    ctx: ExpandContext<'a>,
    steps: Option<Vec<ExpansionStep>>,
}

impl<'a> Expander<'a> {
    pub fn new(registry: &'a MacroRegistry, config: &'a ReaderConfig, qual: &'a QualContext) -> Self {
        Self {
            registry,
            ctx: ExpandContext::new(config, qual),
            steps: None,
        }
    }

    /// Records every rewrite; see [`Expander::steps`].
    pub fn with_trace(mut self) -> Self {
        self.steps = Some(Vec::new());
        self
    }

    /// Rewrites recorded so far, oldest first. Empty unless tracing.
    pub fn steps(&self) -> &[ExpansionStep] {
        self.steps.as_deref().unwrap_or_default()
    }

    pub fn expand(&mut self, form: &Form) -> Result<Form, HebiError> {
        self.expand_at(form, 0)
    }

    pub fn expand_all(&mut self, forms: &[Form]) -> Result<Vec<Form>, HebiError> {
        forms.iter().map(|form| self.expand(form)).collect()
    }

    fn expand_at(&mut self, form: &Form, depth: usize) -> Result<Form, HebiError> {
        let Form::List(items) = form else {
            return Ok(form.clone());
        };
        let Some(head) = items.first() else {
            return Ok(form.clone());
        };
        if head.is_symbol("quote") {
            return Ok(form.clone());
        }
        if let Some((name, func)) = head
            .as_symbol()
            .and_then(|symbol| self.registry.resolve(symbol, self.ctx.config))
        {
            if depth >= self.ctx.config.max_expansion_depth {
                return Err(err_msg!(
                    MacroSyntax,
                    "expansion of '{}' exceeded the depth limit of {}",
                    name,
                    self.ctx.config.max_expansion_depth
                ));
            }
            let expanded = func(&items[1..], &self.ctx)?;
            debug!(macro_name = name, depth, "expanded {} -> {}", form, expanded);
            if let Some(steps) = &mut self.steps {
                steps.push(ExpansionStep {
                    macro_name: name.to_string(),
                    input: form.clone(),
                    output: expanded.clone(),
                });
            }
            return self.expand_at(&expanded, depth + 1);
        }
        trace!(depth, "descending into {}", form);
        items
            .iter()
            .map(|item| self.expand_at(item, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Form::List)
    }
}
