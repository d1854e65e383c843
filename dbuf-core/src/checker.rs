//! The checking pipeline: name resolution, positivity, type checking.

use dbuf_ast::{Ast, Interner};
use dbuf_verify::{EqualityOracle, SmtProfile};

use crate::error::ErrorList;
use crate::name_resolution::check_name_resolution;
use crate::positivity::check_positivity;
use crate::type_checker::TypeChecker;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckOptions {
    pub smt_profile: SmtProfile,
}

impl CheckOptions {
    /// Options with the solver profile taken from `DBUF_SMT_PROFILE`.
    pub fn from_env() -> Self {
        Self {
            smt_profile: SmtProfile::from_env(),
        }
    }
}

/// Runs the three stages in order and stops at the first one that reports
/// errors. On success `ast.visit_order` holds the dependency order.
#[derive(Clone, Debug, Default)]
pub struct Checker {
    options: CheckOptions,
}

impl Checker {
    pub fn new() -> Self {
        Self::with_options(CheckOptions::from_env())
    }

    pub fn with_options(options: CheckOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> CheckOptions {
        self.options
    }

    #[cfg(feature = "z3")]
    pub fn check(&self, ast: &mut Ast, interner: &Interner) -> Result<(), ErrorList> {
        let mut oracle = dbuf_verify::Z3Oracle::new(self.options.smt_profile);
        check_all_with_oracle(ast, interner, &mut oracle)
    }

    #[cfg(not(feature = "z3"))]
    pub fn check(&self, ast: &mut Ast, interner: &Interner) -> Result<(), ErrorList> {
        tracing::trace!(
            profile = ?self.options.smt_profile,
            "solver profile unused without the z3 feature"
        );
        let mut oracle = dbuf_verify::StructuralOracle::new();
        check_all_with_oracle(ast, interner, &mut oracle)
    }
}

pub fn check_all(ast: &mut Ast, interner: &Interner) -> Result<(), ErrorList> {
    Checker::new().check(ast, interner)
}

pub fn check_all_with(
    ast: &mut Ast,
    interner: &Interner,
    options: CheckOptions,
) -> Result<(), ErrorList> {
    Checker::with_options(options).check(ast, interner)
}

pub fn check_all_with_oracle<O: EqualityOracle>(
    ast: &mut Ast,
    interner: &Interner,
    oracle: &mut O,
) -> Result<(), ErrorList> {
    let errors = check_name_resolution(ast, interner);
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "name resolution failed");
        return Err(errors);
    }

    let errors = check_positivity(ast, interner);
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "positivity check failed");
        return Err(errors);
    }

    TypeChecker::new(ast, interner, oracle).check().map_err(|err| {
        tracing::debug!(error = %err, "type checking failed");
        vec![err]
    })?;
    tracing::debug!(types = ast.visit_order.len(), functions = ast.functions.len(), "schema checked");
    Ok(())
}
