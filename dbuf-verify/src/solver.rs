#![allow(unused_assignments)]

use std::str::FromStr;

use dbuf_ast::{Expression, Interner, Span, Symbol, TypeExpression};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("verification error: {message}")]
#[diagnostic(code(dbuf::verify))]
#[allow(unused_assignments)]
pub struct OracleError {
    pub message: String,
    #[label]
    pub span: Option<Span>,
}

impl OracleError {
    pub fn new(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SmtProfile {
    /// Very low timeouts.
    #[default]
    Fast,
    /// CI-friendly medium timeouts.
    Ci,
    /// Higher timeouts.
    Thorough,
}

impl SmtProfile {
    pub const ENV_VAR: &'static str = "DBUF_SMT_PROFILE";

    /// Per-query solver budget.
    pub fn timeout_ms(self) -> u32 {
        match self {
            SmtProfile::Fast => 50,
            SmtProfile::Ci => 250,
            SmtProfile::Thorough => 2_000,
        }
    }

    /// Profile named by `DBUF_SMT_PROFILE`, or the default.
    pub fn from_env() -> Self {
        match std::env::var(Self::ENV_VAR) {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unknown {}, using default profile", Self::ENV_VAR);
                SmtProfile::default()
            }),
            Err(_) => SmtProfile::default(),
        }
    }
}

impl FromStr for SmtProfile {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(SmtProfile::Fast),
            "ci" => Ok(SmtProfile::Ci),
            "thorough" => Ok(SmtProfile::Thorough),
            other => Err(OracleError::new(format!("unknown SMT profile `{other}`"), None)),
        }
    }
}

/// Solver-level sort of a field, dependency or variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldSort {
    Int,
    Unsigned,
    Float,
    Bool,
    String,
    /// A declared message or enum.
    Named(Symbol),
    Array(Box<FieldSort>),
    Set(Box<FieldSort>),
}

impl FieldSort {
    /// Sort of values of `ty`. `None` when the collection element is not a
    /// type expression.
    pub fn of(ty: &TypeExpression) -> Option<FieldSort> {
        let element = || -> Option<Box<FieldSort>> {
            let first = ty.parameters.first()?;
            Some(Box::new(FieldSort::of(first.as_type()?)?))
        };
        Some(match ty.name() {
            Symbol::INT => FieldSort::Int,
            Symbol::UNSIGNED => FieldSort::Unsigned,
            Symbol::FLOAT => FieldSort::Float,
            Symbol::BOOL => FieldSort::Bool,
            Symbol::STRING => FieldSort::String,
            Symbol::ARRAY => FieldSort::Array(element()?),
            Symbol::SET => FieldSort::Set(element()?),
            other => FieldSort::Named(other),
        })
    }

    /// True if `name` occurs anywhere in the sort.
    pub fn mentions(&self, name: Symbol) -> bool {
        match self {
            FieldSort::Named(n) => *n == name,
            FieldSort::Array(e) | FieldSort::Set(e) => e.mentions(name),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CtorDecl {
    pub name: Symbol,
    pub fields: Vec<(Symbol, FieldSort)>,
}

/// An algebraic datatype: one per message (single constructor named after
/// the message) and one per enum (one constructor per output constructor
/// of every rule).
#[derive(Clone, Debug, PartialEq)]
pub struct SortDecl {
    pub name: Symbol,
    pub constructors: Vec<CtorDecl>,
}

/// An uninterpreted function over value sorts.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub parameters: Vec<FieldSort>,
    pub result: FieldSort,
}

/// What a translation needs to know about the checker's live scope.
pub trait TranslationEnv {
    fn interner(&self) -> &Interner;

    /// Sort of a free variable, if it is in scope and has a value type.
    fn var_sort(&self, var: Symbol) -> Option<FieldSort>;
}

/// Decision procedure for equality of symbolic expressions.
///
/// Types are declared in dependency order; a declaration may refer to any
/// sort declared before it and to itself.
pub trait EqualityOracle {
    type Term;

    fn declare_type(&mut self, decl: &SortDecl, interner: &Interner) -> Result<(), OracleError>;

    fn declare_function(
        &mut self,
        decl: &FunctionDecl,
        interner: &Interner,
    ) -> Result<(), OracleError>;

    fn translate(
        &mut self,
        expr: &Expression,
        env: &dyn TranslationEnv,
    ) -> Result<Self::Term, OracleError>;

    /// `Ok(true)` only if `expected == got` holds for every assignment of
    /// the free variables.
    fn check_equal(
        &mut self,
        expected: &Expression,
        got: &Expression,
        env: &dyn TranslationEnv,
    ) -> Result<bool, OracleError>;
}
