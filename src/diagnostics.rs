//! # Hebi Diagnostics
//!
//! The unified, `miette`-based error type for every stage of the reader
//! pipeline: tokenizing, tree building, macro expansion and the reference
//! runtime. Errors are constructed through the `err_msg!` and `err_ctx!`
//! macros so call sites never assemble an `ErrorContext` by hand.
//!
//! - **Use `err_msg!` for message-only errors.**
//!   `err_msg!(MacroSyntax, "missing :be in let")`
//! - **Use `err_ctx!` when a source and span are available.**
//!   `err_ctx!(Lexical, "unexpected ')'", &source, span)`
//!
//! The `Incomplete` variant is not a real failure: it is the soft signal that
//! more input is needed, and interactive callers test for it with
//! [`HebiError::is_incomplete`].

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::syntax::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification corresponding to the `HebiError` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Unrecognized character, stray closing bracket.
    Lexical,
    /// Misaligned dedent or an indent nothing opened.
    Indentation,
    /// Input ends inside an embedded expression.
    Incomplete,
    /// Rejected by the embedded-expression grammar or the tree builder.
    Syntax,
    /// Malformed macro clause ordering or shape.
    MacroSyntax,
    /// A runtime condition nothing handled.
    Unhandled,
    /// Reference runtime misuse (undefined names, bad calls).
    Eval,
    /// Invalid reader configuration.
    Config,
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Lexical => "Lexical",
            ErrorType::Indentation => "Indentation",
            ErrorType::Incomplete => "Incomplete",
            ErrorType::Syntax => "Syntax",
            ErrorType::MacroSyntax => "MacroSyntax",
            ErrorType::Unhandled => "Unhandled",
            ErrorType::Eval => "Eval",
            ErrorType::Config => "Config",
            ErrorType::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The primary source for this error (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// 1-based line of the offending source line.
    pub line: Option<usize>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            line: None,
            help: None,
        }
    }
}

/// Unified error type for all Hebi failure modes.
#[derive(Debug, Error)]
pub enum HebiError {
    #[error("Lexical error: {message}")]
    Lexical {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Indentation error: {message}")]
    Indentation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Incomplete input: {message}")]
    Incomplete {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Syntax error: {message}")]
    Syntax {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Macro syntax error: {message}")]
    MacroSyntax {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Unhandled {type_name}: {message}")]
    Unhandled {
        type_name: String,
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Evaluation error: {message}")]
    Eval {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl HebiError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            HebiError::Lexical { ctx, .. }
            | HebiError::Indentation { ctx, .. }
            | HebiError::Incomplete { ctx, .. }
            | HebiError::Syntax { ctx, .. }
            | HebiError::MacroSyntax { ctx, .. }
            | HebiError::Unhandled { ctx, .. }
            | HebiError::Eval { ctx, .. }
            | HebiError::Config { ctx, .. }
            | HebiError::Internal { ctx, .. } => ctx,
        }
    }

    fn get_ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            HebiError::Lexical { ctx, .. }
            | HebiError::Indentation { ctx, .. }
            | HebiError::Incomplete { ctx, .. }
            | HebiError::Syntax { ctx, .. }
            | HebiError::MacroSyntax { ctx, .. }
            | HebiError::Unhandled { ctx, .. }
            | HebiError::Eval { ctx, .. }
            | HebiError::Config { ctx, .. }
            | HebiError::Internal { ctx, .. } => ctx,
        }
    }

    /// The message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            HebiError::Lexical { message, .. }
            | HebiError::Indentation { message, .. }
            | HebiError::Incomplete { message, .. }
            | HebiError::Syntax { message, .. }
            | HebiError::MacroSyntax { message, .. }
            | HebiError::Unhandled { message, .. }
            | HebiError::Eval { message, .. }
            | HebiError::Config { message, .. }
            | HebiError::Internal { message, .. } => message,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            HebiError::Lexical { .. } => ErrorType::Lexical,
            HebiError::Indentation { .. } => ErrorType::Indentation,
            HebiError::Incomplete { .. } => ErrorType::Incomplete,
            HebiError::Syntax { .. } => ErrorType::Syntax,
            HebiError::MacroSyntax { .. } => ErrorType::MacroSyntax,
            HebiError::Unhandled { .. } => ErrorType::Unhandled,
            HebiError::Eval { .. } => ErrorType::Eval,
            HebiError::Config { .. } => ErrorType::Config,
            HebiError::Internal { .. } => ErrorType::Internal,
        }
    }

    /// True for the soft "need more input" signal.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, HebiError::Incomplete { .. })
    }

    /// The 1-based source line this error points at, when known.
    pub fn line(&self) -> Option<usize> {
        self.get_ctx().line
    }

    pub fn span(&self) -> Option<Span> {
        self.get_ctx().span
    }

    /// Attaches the offending source line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.get_ctx_mut().line = Some(line);
        self
    }

    /// Attaches a help message.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.get_ctx_mut().help = Some(help.into());
        self
    }

    /// Wraps a foreign error as the cause of a configuration failure.
    pub fn config(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        HebiError::Config {
            message: message.into(),
            ctx: ErrorContext::none(),
            source: Some(Box::new(cause)),
        }
    }

    /// An uncaught condition escaping the reference runtime.
    pub fn unhandled(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        HebiError::Unhandled {
            type_name: type_name.into(),
            message: message.into(),
            ctx: ErrorContext::none(),
            source: None,
        }
    }
}

impl Diagnostic for HebiError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("hebi::{}", self.error_type().as_str().to_lowercase())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        // A span without source text would point at nothing.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let text = match ctx.line {
            Some(line) => format!("{} (line {})", self.message(), line),
            None => self.message().to_string(),
        };
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(text),
            span.start,
            len,
        ))))
    }
}

/// Converts a source string into a named source for error contexts.
pub fn to_error_source(name: impl AsRef<str>, source: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(
        name.as_ref(),
        source.as_ref().to_string(),
    ))
}

/// Constructs a `HebiError` variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:literal $(, $arg:expr)* $(,)?) => {
        $crate::HebiError::$variant {
            message: format!($msg $(, $arg)*),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::HebiError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a `HebiError` variant with a message, a source and a span.
#[macro_export]
macro_rules! err_ctx {
    // Message, src, span, help
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::HebiError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                line: None,
                help: Some(format!("{}", $help)),
            },
            source: None,
        }
    };
    // Message, src, span
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::HebiError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[test]
    fn err_msg_formats_arguments() {
        let err = crate::err_msg!(MacroSyntax, "bad clause {}", "(:elif x)");
        assert_eq!(err.error_type(), ErrorType::MacroSyntax);
        assert_eq!(err.message(), "bad clause (:elif x)");
        assert!(err.line().is_none());
    }

    #[test]
    fn err_ctx_carries_span_line_and_labels() {
        let src = to_error_source("unit", "a:\n    b\n  c\n");
        let err = crate::err_ctx!(Indentation, "unindent does not match", &src, Span { start: 9, end: 12 })
            .at_line(3);
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.span(), Some(Span { start: 9, end: 12 }));
        let labels: Vec<_> = err.labels().expect("labels").collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 9);
        assert!(labels[0].label().unwrap_or_default().contains("line 3"));
    }

    #[test]
    fn incomplete_is_soft() {
        let err = crate::err_msg!(Incomplete, "unterminated string");
        assert!(err.is_incomplete());
        assert!(!crate::err_msg!(Syntax, "x").is_incomplete());
    }
}
