//! Solver-free equality oracle.
//!
//! Folds constant sub-expressions and compares the normalised trees
//! structurally. Every `true` answer is a real equality; expressions that
//! are equal only by algebra (`n + 1` vs `1 + n`) are reported unequal.

use std::rc::Rc;

use dbuf_ast::{
    BinaryOp, CollectionValue, ConstructedValue, ExprRef, Expression, FieldInit, FunctionValue,
    Interner, PrettyPrint, Scalar, Symbol, TypeExpression, UnaryExpression, UnaryOp, Value,
};
use rustc_hash::FxHashMap;

use crate::solver::{EqualityOracle, FunctionDecl, OracleError, SortDecl, TranslationEnv};

#[derive(Debug, Default)]
pub struct StructuralOracle {
    sorts: FxHashMap<Symbol, SortDecl>,
    functions: FxHashMap<Symbol, FunctionDecl>,
}

impl StructuralOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&self, name: Symbol) -> Option<&SortDecl> {
        self.sorts.get(&name)
    }

    pub fn function(&self, name: Symbol) -> Option<&FunctionDecl> {
        self.functions.get(&name)
    }
}

impl EqualityOracle for StructuralOracle {
    type Term = ExprRef;

    fn declare_type(&mut self, decl: &SortDecl, interner: &Interner) -> Result<(), OracleError> {
        tracing::debug!(
            sort = %decl.name.pretty(interner),
            constructors = decl.constructors.len(),
            "declared sort"
        );
        self.sorts.insert(decl.name, decl.clone());
        Ok(())
    }

    fn declare_function(
        &mut self,
        decl: &FunctionDecl,
        interner: &Interner,
    ) -> Result<(), OracleError> {
        tracing::debug!(function = %decl.name.pretty(interner), "declared function");
        self.functions.insert(decl.name, decl.clone());
        Ok(())
    }

    fn translate(
        &mut self,
        expr: &Expression,
        _env: &dyn TranslationEnv,
    ) -> Result<ExprRef, OracleError> {
        Ok(normalize(expr))
    }

    fn check_equal(
        &mut self,
        expected: &Expression,
        got: &Expression,
        env: &dyn TranslationEnv,
    ) -> Result<bool, OracleError> {
        let expected = self.translate(expected, env)?;
        let got = self.translate(got, env)?;
        let equal = same(&expected, &got);
        tracing::debug!(
            expected = %expected.pretty(env.interner()),
            got = %got.pretty(env.interner()),
            equal,
            "structural comparison"
        );
        Ok(equal)
    }
}

/// Constant-folds `expr` bottom-up.
pub fn normalize(expr: &Expression) -> ExprRef {
    match expr {
        Expression::Binary(e) => {
            let left = normalize(&e.left);
            let right = normalize(&e.right);
            if let (Some(l), Some(r)) = (as_scalar(&left), as_scalar(&right)) {
                if let Some(folded) = fold_binary(e.op, l, r) {
                    return Expression::scalar(e.span, folded);
                }
            }
            Expression::binary(e.span, e.op, left, right)
        }
        Expression::Unary(e) => {
            let operand = normalize(&e.operand);
            if let Some(folded) = as_scalar(&operand).and_then(|s| fold_unary(e.op, s)) {
                return Expression::scalar(e.span, folded);
            }
            Rc::new(Expression::Unary(UnaryExpression {
                span: e.span,
                op: e.op,
                operand,
            }))
        }
        Expression::Type(ty) => Rc::new(Expression::Type(TypeExpression {
            span: ty.span,
            identifier: ty.identifier,
            parameters: ty.parameters.iter().map(|p| normalize(p)).collect(),
        })),
        Expression::VarAccess(_) | Expression::Value(Value::Scalar(_)) => Rc::new(expr.clone()),
        Expression::Value(Value::Constructed(v)) => {
            Rc::new(Expression::Value(Value::Constructed(ConstructedValue {
                span: v.span,
                constructor: v.constructor,
                fields: v
                    .fields
                    .iter()
                    .map(|init| FieldInit {
                        name: init.name,
                        value: normalize(&init.value),
                    })
                    .collect(),
            })))
        }
        Expression::Value(Value::Collection(v)) => {
            Rc::new(Expression::Value(Value::Collection(CollectionValue {
                span: v.span,
                elements: v.elements.iter().map(|e| normalize(e)).collect(),
            })))
        }
        Expression::Value(Value::Function(v)) => {
            Rc::new(Expression::Value(Value::Function(FunctionValue {
                span: v.span,
                function: v.function,
                arguments: v.arguments.iter().map(|a| normalize(a)).collect(),
            })))
        }
    }
}

fn as_scalar(expr: &Expression) -> Option<&Scalar> {
    match expr {
        Expression::Value(Value::Scalar(v)) => Some(&v.scalar),
        _ => None,
    }
}

fn as_integer(scalar: &Scalar) -> Option<i128> {
    match scalar {
        Scalar::Int(v) => Some(i128::from(*v)),
        Scalar::Unsigned(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, left: &Scalar, right: &Scalar) -> Option<Scalar> {
    if let (Some(a), Some(b)) = (as_integer(left), as_integer(right)) {
        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a.checked_mul(b)?,
            _ => return None,
        };
        let both_unsigned = matches!((left, right), (Scalar::Unsigned(_), Scalar::Unsigned(_)));
        return match u64::try_from(value) {
            Ok(v) if both_unsigned => Some(Scalar::Unsigned(v)),
            _ => i64::try_from(value).ok().map(Scalar::Int),
        };
    }
    match (op, left, right) {
        (BinaryOp::Add, Scalar::Float(a), Scalar::Float(b)) => Some(Scalar::Float(a + b)),
        (BinaryOp::Sub, Scalar::Float(a), Scalar::Float(b)) => Some(Scalar::Float(a - b)),
        (BinaryOp::Mul, Scalar::Float(a), Scalar::Float(b)) => Some(Scalar::Float(a * b)),
        (BinaryOp::Div, Scalar::Float(a), Scalar::Float(b)) => Some(Scalar::Float(a / b)),
        (BinaryOp::Add, Scalar::String(a), Scalar::String(b)) => Some(Scalar::String(format!("{a}{b}"))),
        (BinaryOp::And, Scalar::Bool(a), Scalar::Bool(b)) => Some(Scalar::Bool(*a && *b)),
        (BinaryOp::Or, Scalar::Bool(a), Scalar::Bool(b)) => Some(Scalar::Bool(*a || *b)),
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, operand: &Scalar) -> Option<Scalar> {
    match (op, operand) {
        (UnaryOp::Neg, Scalar::Int(v)) => v.checked_neg().map(Scalar::Int),
        (UnaryOp::Neg, Scalar::Unsigned(v)) => i64::try_from(*v).ok().map(|v| Scalar::Int(-v)),
        (UnaryOp::Neg, Scalar::Float(v)) => Some(Scalar::Float(-v)),
        (UnaryOp::Not, Scalar::Bool(v)) => Some(Scalar::Bool(!v)),
        _ => None,
    }
}

fn same_scalar(a: &Scalar, b: &Scalar) -> bool {
    if let (Some(x), Some(y)) = (as_integer(a), as_integer(b)) {
        return x == y;
    }
    match (a, b) {
        (Scalar::Bool(x), Scalar::Bool(y)) => x == y,
        (Scalar::Float(x), Scalar::Float(y)) => x.to_bits() == y.to_bits(),
        (Scalar::String(x), Scalar::String(y)) => x == y,
        _ => false,
    }
}

fn same_all(a: &[ExprRef], b: &[ExprRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same(x, y))
}

/// Structural equality ignoring spans.
pub fn same(a: &Expression, b: &Expression) -> bool {
    match (a, b) {
        (Expression::Binary(x), Expression::Binary(y)) => {
            x.op == y.op && same(&x.left, &y.left) && same(&x.right, &y.right)
        }
        (Expression::Unary(x), Expression::Unary(y)) => x.op == y.op && same(&x.operand, &y.operand),
        (Expression::Type(x), Expression::Type(y)) => {
            x.name() == y.name() && same_all(&x.parameters, &y.parameters)
        }
        (Expression::VarAccess(x), Expression::VarAccess(y)) => {
            x.var.name == y.var.name
                && x.fields.len() == y.fields.len()
                && x.fields.iter().zip(&y.fields).all(|(f, g)| f.name == g.name)
        }
        (Expression::Value(x), Expression::Value(y)) => match (x, y) {
            (Value::Scalar(x), Value::Scalar(y)) => same_scalar(&x.scalar, &y.scalar),
            (Value::Constructed(x), Value::Constructed(y)) => {
                x.constructor.name == y.constructor.name
                    && x.fields.len() == y.fields.len()
                    && x.fields.iter().all(|init| {
                        y.field(init.name.name)
                            .is_some_and(|other| same(&init.value, other))
                    })
            }
            (Value::Collection(x), Value::Collection(y)) => same_all(&x.elements, &y.elements),
            (Value::Function(x), Value::Function(y)) => {
                x.function.name == y.function.name && same_all(&x.arguments, &y.arguments)
            }
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbuf_ast::AstBuilder;

    struct NoVars(Interner);

    impl TranslationEnv for NoVars {
        fn interner(&self) -> &Interner {
            &self.0
        }

        fn var_sort(&self, _: Symbol) -> Option<crate::FieldSort> {
            None
        }
    }

    #[test]
    fn test_folds_constant_arithmetic() {
        let b = AstBuilder::new();
        let sum = b.binary(BinaryOp::Add, b.uint(1), b.binary(BinaryOp::Mul, b.uint(2), b.uint(3)));
        let seven = b.uint(7);
        let env = NoVars(b.finish());
        let mut oracle = StructuralOracle::new();
        assert!(oracle.check_equal(&sum, &seven, &env).unwrap());
    }

    #[test]
    fn test_distinct_constants_are_unequal() {
        let b = AstBuilder::new();
        let two = b.binary(BinaryOp::Add, b.uint(1), b.uint(1));
        let three = b.uint(3);
        let env = NoVars(b.finish());
        let mut oracle = StructuralOracle::new();
        assert!(!oracle.check_equal(&three, &two, &env).unwrap());
    }

    #[test]
    fn test_float_constants_fold_to_nearest() {
        let b = AstBuilder::new();
        let inexact = b.binary(BinaryOp::Add, b.float(0.1), b.float(0.2));
        let exact = b.binary(BinaryOp::Add, b.float(0.5), b.float(0.25));
        let (point_three, three_quarters) = (b.float(0.3), b.float(0.75));
        let env = NoVars(b.finish());
        let mut oracle = StructuralOracle::new();
        assert!(!oracle.check_equal(&inexact, &point_three, &env).unwrap());
        assert!(oracle.check_equal(&exact, &three_quarters, &env).unwrap());
    }

    #[test]
    fn test_int_and_unsigned_literals_compare_by_value() {
        let b = AstBuilder::new();
        let (i, u) = (b.int(5), b.uint(5));
        let env = NoVars(b.finish());
        assert!(StructuralOracle::new().check_equal(&i, &u, &env).unwrap());
    }

    #[test]
    fn test_symbolic_terms_compare_structurally() {
        let b = AstBuilder::new();
        let a = b.binary(BinaryOp::Sub, b.var("n"), b.uint(1));
        let a2 = b.binary(BinaryOp::Sub, b.var("n"), b.uint(1));
        let swapped = b.binary(BinaryOp::Sub, b.uint(1), b.var("n"));
        let env = NoVars(b.finish());
        let mut oracle = StructuralOracle::new();
        assert!(oracle.check_equal(&a, &a2, &env).unwrap());
        assert!(!oracle.check_equal(&a, &swapped, &env).unwrap());
    }

    #[test]
    fn test_constructed_values_ignore_field_order() {
        let b = AstBuilder::new();
        let p = b.ctor("P", vec![("x", b.int(1)), ("y", b.var("y"))]);
        let q = b.ctor("P", vec![("y", b.var("y")), ("x", b.int(1))]);
        let env = NoVars(b.finish());
        assert!(StructuralOracle::new().check_equal(&p, &q, &env).unwrap());
    }

    #[test]
    fn test_unsigned_underflow_folds_to_negative_int() {
        let b = AstBuilder::new();
        let diff = b.binary(BinaryOp::Sub, b.uint(1), b.uint(2));
        let minus_one = b.int(-1);
        let env = NoVars(b.finish());
        assert!(StructuralOracle::new().check_equal(&diff, &minus_one, &env).unwrap());
    }
}
