use std::rc::Rc;

use crate::{Span, Symbol};

/// Shared handle to an immutable expression node.
pub type ExprRef = Rc<Expression>;

/// An interned name together with the place it was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: Symbol,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: Symbol, span: Span) -> Self {
        Self { name, span }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    In,
    Union,
    Intersect,
    Difference,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::In => "in",
            BinaryOp::Union => "\\/",
            BinaryOp::Intersect => "/\\",
            BinaryOp::Difference => "\\",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpression {
    pub span: Span,
    pub op: BinaryOp,
    pub left: ExprRef,
    pub right: ExprRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpression {
    pub span: Span,
    pub op: UnaryOp,
    pub operand: ExprRef,
}

/// A reference to a type, applied to its dependent parameters.
///
/// `Array(Int, n + 1)` has identifier `Array` and parameters
/// `[Int, n + 1]`. Parameters are arbitrary expressions.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpression {
    pub span: Span,
    pub identifier: Identifier,
    pub parameters: Vec<ExprRef>,
}

impl TypeExpression {
    pub fn new(identifier: Identifier, parameters: Vec<ExprRef>) -> Self {
        Self {
            span: identifier.span,
            identifier,
            parameters,
        }
    }

    pub fn name(&self) -> Symbol {
        self.identifier.name
    }
}

/// `var.field.field...`
#[derive(Clone, Debug, PartialEq)]
pub struct VarAccess {
    pub span: Span,
    pub var: Identifier,
    pub fields: Vec<Identifier>,
}

impl VarAccess {
    pub fn new(var: Identifier, fields: Vec<Identifier>) -> Self {
        Self {
            span: var.span,
            var,
            fields,
        }
    }

    /// A bare name with no field chain.
    pub fn is_bare(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Builtin type of the literal.
    pub fn type_name(&self) -> Symbol {
        match self {
            Scalar::Bool(_) => Symbol::BOOL,
            Scalar::Int(_) => Symbol::INT,
            Scalar::Unsigned(_) => Symbol::UNSIGNED,
            Scalar::Float(_) => Symbol::FLOAT,
            Scalar::String(_) => Symbol::STRING,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarValue {
    pub span: Span,
    pub scalar: Scalar,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldInit {
    pub name: Identifier,
    pub value: ExprRef,
}

/// `Ctor{field: expr, ...}`
#[derive(Clone, Debug, PartialEq)]
pub struct ConstructedValue {
    pub span: Span,
    pub constructor: Identifier,
    pub fields: Vec<FieldInit>,
}

impl ConstructedValue {
    pub fn field(&self, name: Symbol) -> Option<&ExprRef> {
        self.fields
            .iter()
            .find(|init| init.name.name == name)
            .map(|init| &init.value)
    }
}

/// `[a, b, c]`, used for both `Array` and `Set` literals.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionValue {
    pub span: Span,
    pub elements: Vec<ExprRef>,
}

/// `f(a, b)`; may supply fewer arguments than `f` declares.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionValue {
    pub span: Span,
    pub function: Identifier,
    pub arguments: Vec<ExprRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(ScalarValue),
    Constructed(ConstructedValue),
    Collection(CollectionValue),
    Function(FunctionValue),
}

impl Value {
    pub fn span(&self) -> Span {
        match self {
            Value::Scalar(v) => v.span,
            Value::Constructed(v) => v.span,
            Value::Collection(v) => v.span,
            Value::Function(v) => v.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Type(TypeExpression),
    Value(Value),
    VarAccess(VarAccess),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Binary(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Type(e) => e.span,
            Expression::Value(v) => v.span(),
            Expression::VarAccess(e) => e.span,
        }
    }

    pub fn scalar(span: Span, scalar: Scalar) -> ExprRef {
        Rc::new(Expression::Value(Value::Scalar(ScalarValue { span, scalar })))
    }

    pub fn unsigned(span: Span, value: u64) -> ExprRef {
        Self::scalar(span, Scalar::Unsigned(value))
    }

    pub fn binary(span: Span, op: BinaryOp, left: ExprRef, right: ExprRef) -> ExprRef {
        Rc::new(Expression::Binary(BinaryExpression {
            span,
            op,
            left,
            right,
        }))
    }

    pub fn as_var_access(&self) -> Option<&VarAccess> {
        match self {
            Expression::VarAccess(access) => Some(access),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeExpression> {
        match self {
            Expression::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_constructed(&self) -> Option<&ConstructedValue> {
        match self {
            Expression::Value(Value::Constructed(value)) => Some(value),
            _ => None,
        }
    }

    /// A `VarAccess` with no field chain, i.e. something a pattern can bind.
    pub fn as_bare_var(&self) -> Option<Identifier> {
        self.as_var_access()
            .filter(|access| access.is_bare())
            .map(|access| access.var)
    }
}

impl From<TypeExpression> for Expression {
    fn from(ty: TypeExpression) -> Self {
        Expression::Type(ty)
    }
}

impl From<VarAccess> for Expression {
    fn from(access: VarAccess) -> Self {
        Expression::VarAccess(access)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span;

    #[test]
    fn test_bare_var_detection() {
        let var = Identifier::new(Symbol::INT, span(0, 1));
        let bare = Expression::from(VarAccess::new(var, vec![]));
        let chained = Expression::from(VarAccess::new(var, vec![var]));
        assert_eq!(bare.as_bare_var(), Some(var));
        assert_eq!(chained.as_bare_var(), None);
    }

    #[test]
    fn test_scalar_type_names() {
        assert_eq!(Scalar::Unsigned(3).type_name(), Symbol::UNSIGNED);
        assert_eq!(Scalar::String("a".into()).type_name(), Symbol::STRING);
        assert_eq!(Scalar::Float(1.5).type_name(), Symbol::FLOAT);
    }
}
