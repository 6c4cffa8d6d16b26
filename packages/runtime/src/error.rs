use petal_parser::{ParseError, Span};
use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;
pub type DomResult<T> = Result<T, DomError>;

/// Failure while compiling or evaluating a template expression
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{name} is not defined")]
    ReferenceError { name: String, span: Span },

    #[error("{message}")]
    TypeError { message: String, span: Span },

    #[error("Invalid assignment target")]
    InvalidAssignment { span: Span },

    #[error("Call stack exceeded")]
    StackOverflow { span: Span },
}

impl EvalError {
    pub fn reference(name: impl Into<String>, span: Span) -> Self {
        Self::ReferenceError {
            name: name.into(),
            span,
        }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::TypeError {
            message: message.into(),
            span,
        }
    }

    /// Errors raised by native functions carry no source location
    pub fn native(message: impl Into<String>) -> Self {
        Self::type_error(message, Span::default())
    }

    pub fn span(&self) -> Span {
        match self {
            EvalError::Parse(err) => {
                let range = err.span();
                Span::new(range.start, range.end)
            }
            EvalError::ReferenceError { span, .. }
            | EvalError::TypeError { span, .. }
            | EvalError::InvalidAssignment { span }
            | EvalError::StackOverflow { span } => *span,
        }
    }
}

/// Failure of a DOM tree mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Node {child} is not a child of node {parent}")]
    NotAChild { parent: usize, child: usize },

    #[error("Cannot insert node {node} into node {parent}: {reason}")]
    HierarchyRequest {
        node: usize,
        parent: usize,
        reason: &'static str,
    },

    #[error("Invalid markup: {0}")]
    Markup(#[from] ParseError),
}
