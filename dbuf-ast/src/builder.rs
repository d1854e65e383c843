//! Programmatic construction of schemas.
//!
//! The parser collaborator and the test suites build trees through this
//! type instead of spelling out nodes and spans by hand. Every created node
//! gets a fresh span so diagnostics can still point somewhere distinct.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{
    BinaryOp, CollectionValue, ConstructedValue, Constructor, Enum, ExprRef, Expression,
    FieldInit, Func, FunctionType, FunctionValue, Identifier, InputPattern, Interner, Message,
    ParamType, Parameter, Rule, Scalar, Span, Symbol, TypeExpression, TypedVariable,
    UnaryExpression, UnaryOp, Value, VarAccess, span,
};

pub struct AstBuilder {
    interner: RefCell<Interner>,
    cursor: Cell<usize>,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::with_interner(Interner::new())
    }

    pub fn with_interner(interner: Interner) -> Self {
        Self {
            interner: RefCell::new(interner),
            cursor: Cell::new(0),
        }
    }

    pub fn finish(self) -> Interner {
        self.interner.into_inner()
    }

    fn next_span(&self, len: usize) -> Span {
        let start = self.cursor.get();
        self.cursor.set(start + len + 1);
        span(start, len)
    }

    pub fn sym(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().intern(name)
    }

    pub fn ident(&self, name: &str) -> Identifier {
        Identifier::new(self.sym(name), self.next_span(name.len()))
    }

    pub fn ty(&self, name: &str, parameters: Vec<ExprRef>) -> TypeExpression {
        TypeExpression::new(self.ident(name), parameters)
    }

    pub fn type_expr(&self, name: &str, parameters: Vec<ExprRef>) -> ExprRef {
        Rc::new(Expression::Type(self.ty(name, parameters)))
    }

    /// `"a.b.c"` becomes an access of `a` through fields `b` and `c`.
    pub fn access(&self, path: &str) -> VarAccess {
        let mut parts = path.split('.');
        let var = self.ident(parts.next().unwrap_or_default());
        let fields = parts.map(|part| self.ident(part)).collect();
        VarAccess::new(var, fields)
    }

    pub fn var(&self, path: &str) -> ExprRef {
        Rc::new(Expression::VarAccess(self.access(path)))
    }

    fn scalar(&self, scalar: Scalar, len: usize) -> ExprRef {
        Expression::scalar(self.next_span(len), scalar)
    }

    pub fn int(&self, value: i64) -> ExprRef {
        self.scalar(Scalar::Int(value), value.to_string().len())
    }

    pub fn uint(&self, value: u64) -> ExprRef {
        self.scalar(Scalar::Unsigned(value), value.to_string().len() + 1)
    }

    pub fn float(&self, value: f64) -> ExprRef {
        self.scalar(Scalar::Float(value), value.to_string().len())
    }

    pub fn boolean(&self, value: bool) -> ExprRef {
        self.scalar(Scalar::Bool(value), if value { 4 } else { 5 })
    }

    pub fn string(&self, value: &str) -> ExprRef {
        self.scalar(Scalar::String(value.to_string()), value.len() + 2)
    }

    pub fn binary(&self, op: BinaryOp, left: ExprRef, right: ExprRef) -> ExprRef {
        Expression::binary(self.next_span(op.as_str().len()), op, left, right)
    }

    pub fn unary(&self, op: UnaryOp, operand: ExprRef) -> ExprRef {
        Rc::new(Expression::Unary(UnaryExpression {
            span: self.next_span(1),
            op,
            operand,
        }))
    }

    pub fn ctor(&self, name: &str, fields: Vec<(&str, ExprRef)>) -> ExprRef {
        let constructor = self.ident(name);
        let fields = fields
            .into_iter()
            .map(|(field, value)| FieldInit {
                name: self.ident(field),
                value,
            })
            .collect();
        Rc::new(Expression::Value(Value::Constructed(ConstructedValue {
            span: constructor.span,
            constructor,
            fields,
        })))
    }

    pub fn collection(&self, elements: Vec<ExprRef>) -> ExprRef {
        Rc::new(Expression::Value(Value::Collection(CollectionValue {
            span: self.next_span(2),
            elements,
        })))
    }

    pub fn call(&self, function: &str, arguments: Vec<ExprRef>) -> ExprRef {
        let function = self.ident(function);
        Rc::new(Expression::Value(Value::Function(FunctionValue {
            span: function.span,
            function,
            arguments,
        })))
    }

    /// A field or a type dependency.
    pub fn field(&self, name: &str, type_expression: TypeExpression) -> TypedVariable {
        TypedVariable {
            name: self.ident(name),
            type_expression,
        }
    }

    pub fn message(
        &self,
        name: &str,
        type_dependencies: Vec<TypedVariable>,
        fields: Vec<TypedVariable>,
    ) -> Message {
        Message {
            identifier: self.ident(name),
            type_dependencies,
            fields,
        }
    }

    pub fn constructor(&self, name: &str, fields: Vec<TypedVariable>) -> Constructor {
        Constructor {
            identifier: self.ident(name),
            fields,
        }
    }

    pub fn star(&self) -> InputPattern {
        InputPattern::Star(self.next_span(1))
    }

    pub fn pattern(&self, value: ExprRef) -> InputPattern {
        InputPattern::Pattern(value)
    }

    pub fn rule(&self, inputs: Vec<InputPattern>, outputs: Vec<Constructor>) -> Rule {
        Rule { inputs, outputs }
    }

    pub fn enumeration(
        &self,
        name: &str,
        type_dependencies: Vec<TypedVariable>,
        pattern_mapping: Vec<Rule>,
    ) -> Enum {
        Enum {
            identifier: self.ident(name),
            type_dependencies,
            pattern_mapping,
        }
    }

    pub fn param(&self, name: &str, ty: TypeExpression) -> Parameter {
        Parameter {
            name: self.ident(name),
            ty: ParamType::Value(ty),
        }
    }

    pub fn fn_param(
        &self,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: TypeExpression,
    ) -> Parameter {
        Parameter {
            name: self.ident(name),
            ty: ParamType::Function(FunctionType {
                parameters,
                return_type,
            }),
        }
    }

    pub fn function(
        &self,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: TypeExpression,
        body: Option<ExprRef>,
    ) -> Func {
        Func {
            identifier: self.ident(name),
            parameters,
            return_type,
            body,
        }
    }
}
