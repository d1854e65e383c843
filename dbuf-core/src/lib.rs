#![forbid(unsafe_code)]

//! Semantic analysis of DependoBuf schemas.
//!
//! [`check_all`] runs name resolution, the positivity check and the
//! dependent type checker over a parsed [`dbuf_ast::Ast`].

mod checker;
mod error;
mod matcher;
mod name_resolution;
mod positivity;
mod substitutor;
mod type_checker;
mod type_comparator;

pub use checker::{check_all, check_all_with, check_all_with_oracle, CheckOptions, Checker};
pub use error::{ErrorList, SemanticError, SubstitutionError};
pub use name_resolution::check_name_resolution;
pub use positivity::{check_positivity, sort_types, PositivityResult};
pub use substitutor::Substitutor;
pub use type_checker::{Binding, CheckResult, TypeChecker};
