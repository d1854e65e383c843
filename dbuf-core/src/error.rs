#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use dbuf_ast::{Interner, PrettyPrint, Span, Symbol};
use dbuf_verify::OracleError;
use miette::Diagnostic;
use thiserror::Error;

/// A user-facing checking error. `Display` is exactly `message`.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(dbuf::check))]
#[allow(unused_assignments)]
pub struct SemanticError {
    pub message: String,
    #[label]
    pub span: Option<Span>,
}

impl SemanticError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn unlocated(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }
}

impl From<OracleError> for SemanticError {
    fn from(err: OracleError) -> Self {
        Self {
            message: format!("solver error: {}", err.message),
            span: err.span,
        }
    }
}

pub type ErrorList = Vec<SemanticError>;

/// A field access that cannot be resolved against the bound expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    #[error("field access on a scalar value")]
    FieldAccessOnScalar { field: Symbol, span: Span },
    #[error("constructed value has no such field")]
    MissingField { field: Symbol, span: Span },
    #[error("field access on an expression that is neither a value nor a variable")]
    IllFormedAccess { field: Symbol, span: Span },
}

impl SubstitutionError {
    pub fn span(&self) -> Span {
        match self {
            SubstitutionError::FieldAccessOnScalar { span, .. }
            | SubstitutionError::MissingField { span, .. }
            | SubstitutionError::IllFormedAccess { span, .. } => *span,
        }
    }

    pub fn into_semantic(self, interner: &Interner) -> SemanticError {
        let field = match &self {
            SubstitutionError::FieldAccessOnScalar { field, .. }
            | SubstitutionError::MissingField { field, .. }
            | SubstitutionError::IllFormedAccess { field, .. } => *field,
        };
        SemanticError::new(
            format!("substitution error: {self} (field \"{}\")", field.pretty(interner)),
            self.span(),
        )
    }
}
