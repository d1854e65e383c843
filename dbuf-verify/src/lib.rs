#![forbid(unsafe_code)]

//! Equality oracles for dependent type parameters.
//!
//! The checker asks whether two value expressions are equal for every
//! assignment of their free variables. Without the `z3` feature the answer
//! comes from [`StructuralOracle`]; with it, from [`Z3Oracle`].

pub mod solver;
pub mod structural;
#[cfg(feature = "z3")]
pub mod z3_oracle;

pub use solver::{
    CtorDecl, EqualityOracle, FieldSort, FunctionDecl, OracleError, SmtProfile, SortDecl,
    TranslationEnv,
};
pub use structural::StructuralOracle;
#[cfg(feature = "z3")]
pub use z3_oracle::Z3Oracle;
