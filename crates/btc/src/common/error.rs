//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use super::Span;

/// Compile error with source location
///
/// Semantic errors may be raised below the level of any syntax node (for
/// example by the scope table), so their span is optional. The first node
/// that sees a span-less error attaches its own span via [`CompileError::at`];
/// errors that already carry a span pass through untouched.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error at {span:?}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span:?}: {message}")]
    Parser { message: String, span: Span },

    #[error("ReferenceError: {message}{}", located(.span))]
    Reference { message: String, span: Option<Span> },

    #[error("ReferenceError: cannot redeclare '{name}' in the same scope{}", located(.span))]
    Redeclaration { name: String, span: Option<Span> },

    #[error("TypeError: {message}{}", located(.span))]
    Type { message: String, span: Option<Span> },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn located(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" ({span})"),
        None => String::new(),
    }
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    /// Reference error without a position; the reporting node attaches one
    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference {
            message: message.into(),
            span: None,
        }
    }

    pub fn reference_at(message: impl Into<String>, span: Span) -> Self {
        Self::Reference {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn redeclaration(name: impl Into<String>) -> Self {
        Self::Redeclaration {
            name: name.into(),
            span: None,
        }
    }

    /// Type error without a position; the reporting node attaches one
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
            span: None,
        }
    }

    pub fn type_error_at(message: impl Into<String>, span: Span) -> Self {
        Self::Type {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Attach `span` unless the error already points somewhere
    pub fn at(mut self, span: Span) -> Self {
        match &mut self {
            Self::Reference { span: slot, .. }
            | Self::Redeclaration { span: slot, .. }
            | Self::Type { span: slot, .. } => {
                if slot.is_none() {
                    *slot = Some(span);
                }
            }
            Self::Lexer { .. } | Self::Parser { .. } | Self::Config { .. } | Self::Io(_) => {}
        }
        self
    }

    /// Source position of the error, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } => Some(*span),
            Self::Reference { span, .. }
            | Self::Redeclaration { span, .. }
            | Self::Type { span, .. } => *span,
            Self::Config { .. } | Self::Io(_) => None,
        }
    }

    /// Undefined names and same-scope redeclarations
    pub fn is_reference_error(&self) -> bool {
        matches!(self, Self::Reference { .. } | Self::Redeclaration { .. })
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::Type { .. })
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Attach-once positioning for results flowing out of a node
pub trait ResultExt<T> {
    fn at(self, span: Span) -> CompileResult<T>;
}

impl<T> ResultExt<T> for CompileResult<T> {
    fn at(self, span: Span) -> CompileResult<T> {
        self.map_err(|e| e.at(span))
    }
}

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let diagnostic = Self::diagnostic(file_id, error);
        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic);
    }

    fn diagnostic(file_id: usize, error: &CompileError) -> Diagnostic<usize> {
        let labelled = |title: &str, message: String, span: Option<Span>| {
            let diagnostic = Diagnostic::error().with_message(title.to_string());
            match span {
                Some(span) => diagnostic.with_labels(vec![
                    Label::primary(file_id, span.range()).with_message(message),
                ]),
                None => diagnostic.with_notes(vec![message]),
            }
        };

        match error {
            CompileError::Lexer { message, span } => {
                labelled("Lexer error", message.clone(), Some(*span))
            }
            CompileError::Parser { message, span } => {
                labelled("Syntax error", message.clone(), Some(*span))
            }
            CompileError::Reference { message, span } => {
                labelled("Reference error", message.clone(), *span)
            }
            CompileError::Redeclaration { name, span } => labelled(
                "Reference error",
                format!("cannot redeclare '{name}' in the same scope"),
                *span,
            ),
            CompileError::Type { message, span } => {
                labelled("Type error", message.clone(), *span)
            }
            CompileError::Config { message } => {
                Diagnostic::error().with_message(format!("Configuration error: {message}"))
            }
            CompileError::Io(err) => {
                Diagnostic::error().with_message(format!("IO error: {err}"))
            }
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_attached_once() {
        let err = CompileError::type_error("mismatched types")
            .at(Span::new(10, 12))
            .at(Span::new(0, 40));
        assert_eq!(err.span(), Some(Span::new(10, 12)));
    }

    #[test]
    fn test_result_ext_keeps_inner_span() {
        let inner: CompileResult<()> = Err(CompileError::reference_at("x is not defined", Span::new(3, 4)));
        let outer = inner.at(Span::new(0, 20));
        assert_eq!(outer.unwrap_err().span(), Some(Span::new(3, 4)));
    }

    #[test]
    fn test_error_display_mentions_position() {
        let err = CompileError::redeclaration("x").at(Span::new(15, 16));
        assert_eq!(
            err.to_string(),
            "ReferenceError: cannot redeclare 'x' in the same scope (near char 15)"
        );
        assert!(err.is_reference_error());
    }
}
