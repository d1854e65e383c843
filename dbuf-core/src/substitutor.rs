//! Capture-free substitution of variables by expressions.
//!
//! Bindings live in a stack of scopes. [`Substitutor::add_substitution`]
//! closes the incoming expression under the bindings already present, so a
//! stored expression is never substituted again on lookup.

use std::rc::Rc;

use dbuf_ast::{
    BinaryExpression, CollectionValue, ConstructedValue, ExprRef, Expression, FieldInit,
    FunctionValue, Identifier, Interner, PrettyPrint, Symbol, TypeExpression, UnaryExpression,
    Value, VarAccess,
};
use rustc_hash::FxHashMap;

use crate::error::SubstitutionError;

#[derive(Clone, Debug)]
pub struct Substitutor {
    scopes: Vec<FxHashMap<Symbol, ExprRef>>,
}

impl Default for Substitutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Substitutor {
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// The outermost scope is never popped.
    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "unbalanced substitution scopes");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Binds `name` to `expr` after substituting `expr` with the current
    /// bindings.
    pub fn add_substitution(&mut self, name: Symbol, expr: &ExprRef) -> Result<(), SubstitutionError> {
        let closed = self.substitute(expr)?;
        self.bind(name, closed);
        Ok(())
    }

    /// Binds `name` to `expr` as is. `expr` must not mention names bound
    /// here; used when instantiating a declaration with caller expressions.
    pub fn add_closed_substitution(&mut self, name: Symbol, expr: &ExprRef) {
        self.bind(name, Rc::clone(expr));
    }

    fn bind(&mut self, name: Symbol, expr: ExprRef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, expr);
        }
    }

    pub fn lookup(&self, name: Symbol) -> Option<&ExprRef> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    pub fn substitute(&self, expr: &ExprRef) -> Result<ExprRef, SubstitutionError> {
        match &**expr {
            Expression::Value(Value::Scalar(_)) => Ok(Rc::clone(expr)),
            Expression::VarAccess(access) => match self.lookup(access.var.name) {
                Some(bound) => resolve_access(bound, &access.fields),
                None => Ok(Rc::clone(expr)),
            },
            Expression::Binary(e) => Ok(Rc::new(Expression::Binary(BinaryExpression {
                span: e.span,
                op: e.op,
                left: self.substitute(&e.left)?,
                right: self.substitute(&e.right)?,
            }))),
            Expression::Unary(e) => Ok(Rc::new(Expression::Unary(UnaryExpression {
                span: e.span,
                op: e.op,
                operand: self.substitute(&e.operand)?,
            }))),
            Expression::Type(ty) => Ok(Rc::new(Expression::Type(self.substitute_type(ty)?))),
            Expression::Value(Value::Constructed(v)) => {
                let fields = v
                    .fields
                    .iter()
                    .map(|init| {
                        Ok(FieldInit {
                            name: init.name,
                            value: self.substitute(&init.value)?,
                        })
                    })
                    .collect::<Result<Vec<_>, SubstitutionError>>()?;
                Ok(Rc::new(Expression::Value(Value::Constructed(ConstructedValue {
                    span: v.span,
                    constructor: v.constructor,
                    fields,
                }))))
            }
            Expression::Value(Value::Collection(v)) => {
                Ok(Rc::new(Expression::Value(Value::Collection(CollectionValue {
                    span: v.span,
                    elements: self.substitute_all(&v.elements)?,
                }))))
            }
            Expression::Value(Value::Function(v)) => {
                Ok(Rc::new(Expression::Value(Value::Function(FunctionValue {
                    span: v.span,
                    function: v.function,
                    arguments: self.substitute_all(&v.arguments)?,
                }))))
            }
        }
    }

    /// Substitutes the parameters; the type name itself is never replaced.
    pub fn substitute_type(&self, ty: &TypeExpression) -> Result<TypeExpression, SubstitutionError> {
        Ok(TypeExpression {
            span: ty.span,
            identifier: ty.identifier,
            parameters: self.substitute_all(&ty.parameters)?,
        })
    }

    fn substitute_all(&self, exprs: &[ExprRef]) -> Result<Vec<ExprRef>, SubstitutionError> {
        exprs.iter().map(|e| self.substitute(e)).collect()
    }

    /// Current bindings, innermost last, for logging.
    pub fn describe(&self, interner: &Interner) -> String {
        let mut out = Vec::new();
        for scope in &self.scopes {
            for (name, expr) in scope {
                out.push(format!("{} := {}", name.pretty(interner), expr.pretty(interner)));
            }
        }
        out.join(", ")
    }
}

/// Applies the field chain `fields` to an already substituted expression.
fn resolve_access(bound: &ExprRef, fields: &[Identifier]) -> Result<ExprRef, SubstitutionError> {
    let Some((first, rest)) = fields.split_first() else {
        return Ok(Rc::clone(bound));
    };
    match &**bound {
        Expression::VarAccess(inner) => {
            let mut chain = inner.fields.clone();
            chain.extend_from_slice(fields);
            Ok(Rc::new(Expression::VarAccess(VarAccess {
                span: inner.span,
                var: inner.var,
                fields: chain,
            })))
        }
        Expression::Value(Value::Constructed(v)) => match v.field(first.name) {
            Some(value) => resolve_access(value, rest),
            None => Err(SubstitutionError::MissingField {
                field: first.name,
                span: first.span,
            }),
        },
        Expression::Value(Value::Scalar(_)) => Err(SubstitutionError::FieldAccessOnScalar {
            field: first.name,
            span: first.span,
        }),
        _ => Err(SubstitutionError::IllFormedAccess {
            field: first.name,
            span: first.span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbuf_ast::{AstBuilder, BinaryOp};
    use pretty_assertions::assert_eq;

    fn render(expr: &ExprRef, interner: &Interner) -> String {
        expr.pretty(interner).to_string()
    }

    #[test]
    fn test_free_variables_are_untouched() {
        let b = AstBuilder::new();
        let expr = b.binary(BinaryOp::Add, b.var("x"), b.uint(1));
        let sub = Substitutor::new();
        let out = sub.substitute(&expr).unwrap();
        assert_eq!(*out, *expr);
    }

    #[test]
    fn test_access_chains_concatenate() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("foo"), &b.var("x.y")).unwrap();
        let out = sub.substitute(&b.var("foo.bar")).unwrap();
        assert_eq!(render(&out, &b.finish()), "x.y.bar");
    }

    #[test]
    fn test_access_descends_into_constructed_value() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        let value = b.ctor("Succ", vec![("prev", b.ctor("Zero", vec![("tag", b.uint(7))]))]);
        sub.add_substitution(b.sym("n"), &value).unwrap();
        let out = sub.substitute(&b.var("n.prev.tag")).unwrap();
        assert_eq!(render(&out, &b.finish()), "7u");
    }

    #[test]
    fn test_bare_access_to_scalar_returns_scalar() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("n"), &b.uint(5)).unwrap();
        let out = sub.substitute(&b.binary(BinaryOp::Sub, b.var("n"), b.uint(1))).unwrap();
        assert_eq!(render(&out, &b.finish()), "(5u - 1u)");
    }

    #[test]
    fn test_field_access_on_scalar_fails() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("n"), &b.uint(5)).unwrap();
        let err = sub.substitute(&b.var("n.size")).expect_err("scalar has no fields");
        assert!(matches!(err, SubstitutionError::FieldAccessOnScalar { .. }), "unexpected error: {err}");
    }

    #[test]
    fn test_missing_field_fails() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("p"), &b.ctor("P", vec![("x", b.int(1))])).unwrap();
        let err = sub.substitute(&b.var("p.y")).expect_err("no field y");
        assert!(matches!(err, SubstitutionError::MissingField { .. }), "unexpected error: {err}");
    }

    #[test]
    fn test_substitutions_compose_eagerly() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("a"), &b.uint(2)).unwrap();
        sub.push_scope();
        sub.add_substitution(b.sym("c"), &b.binary(BinaryOp::Mul, b.var("a"), b.var("a")))
            .unwrap();
        sub.pop_scope();
        sub.push_scope();
        // `c` was dropped with its scope; `a` is still bound.
        let out = sub.substitute(&b.binary(BinaryOp::Add, b.var("c"), b.var("a"))).unwrap();
        assert_eq!(render(&out, &b.finish()), "(c + 2u)");
    }

    #[test]
    fn test_stored_expression_is_closed() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("a"), &b.var("b")).unwrap();
        sub.add_substitution(b.sym("b"), &b.uint(1)).unwrap();
        // `a` was closed before `b` was bound.
        let out = sub.substitute(&b.var("a")).unwrap();
        assert_eq!(render(&out, &b.finish()), "b");
    }

    #[test]
    fn test_type_name_is_kept() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("n"), &b.uint(3)).unwrap();
        let ty = b.ty("Array", vec![b.type_expr("Int", vec![]), b.var("n")]);
        let out = sub.substitute_type(&ty).unwrap();
        assert_eq!(out.identifier, ty.identifier);
        assert_eq!(out.pretty(&b.finish()).to_string(), "Array(Int, 3u)");
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("n"), &b.uint(1)).unwrap();
        sub.push_scope();
        sub.add_closed_substitution(b.sym("n"), &b.uint(2));
        let inner = sub.substitute(&b.var("n")).unwrap();
        sub.pop_scope();
        let outer = sub.substitute(&b.var("n")).unwrap();
        let interner = b.finish();
        assert_eq!(render(&inner, &interner), "2u");
        assert_eq!(render(&outer, &interner), "1u");
    }

    #[test]
    fn test_describe_lists_outer_bindings_first() {
        let b = AstBuilder::new();
        let mut sub = Substitutor::new();
        sub.add_substitution(b.sym("n"), &b.uint(1)).unwrap();
        sub.push_scope();
        sub.add_substitution(b.sym("m"), &b.binary(BinaryOp::Add, b.var("n"), b.uint(2)))
            .unwrap();
        assert_eq!(sub.describe(&b.finish()), "n := 1u, m := (1u + 2u)");
    }
}
