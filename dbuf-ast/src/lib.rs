#![forbid(unsafe_code)]

//! Syntax tree of DependoBuf schemas as consumed by the checking pipeline.
//!
//! The parser is an external collaborator: it hands over an [`Ast`] whose
//! names are [`Symbol`]s owned by an [`Interner`]. Later stages never mutate
//! expression trees; they build new ones.

use miette::SourceSpan;

mod ast;
mod builder;
mod display;
mod expr;
mod interner;

pub use ast::{
    Ast, Constructor, Enum, Func, FunctionType, InputPattern, Message, ParamType, Parameter, Rule,
    TypeDefinition, TypedVariable,
};
pub use builder::AstBuilder;
pub use display::{Pretty, PrettyPrint};
pub use expr::{
    BinaryExpression, BinaryOp, CollectionValue, ConstructedValue, ExprRef, Expression,
    FieldInit, FunctionValue, Identifier, Scalar, ScalarValue, TypeExpression, UnaryExpression,
    UnaryOp, Value, VarAccess,
};
pub use interner::{Interner, Symbol};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}
