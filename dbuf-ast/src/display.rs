//! Source-like rendering of tree nodes. Names are symbols, so rendering
//! needs the interner; `node.pretty(&interner)` yields a `fmt::Display`.

use std::fmt;

use crate::{
    Expression, Identifier, InputPattern, Interner, Scalar, Symbol, TypeExpression, Value,
    VarAccess,
};

pub trait PrettyPrint {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result;

    fn pretty<'a>(&'a self, interner: &'a Interner) -> Pretty<'a, Self> {
        Pretty {
            node: self,
            interner,
        }
    }
}

pub struct Pretty<'a, T: ?Sized> {
    node: &'a T,
    interner: &'a Interner,
}

impl<T: PrettyPrint + ?Sized> fmt::Display for Pretty<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.fmt_with(f, self.interner)
    }
}

fn comma_separated<T: PrettyPrint>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    interner: &Interner,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.fmt_with(f, interner)?;
    }
    Ok(())
}

impl PrettyPrint for Symbol {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        f.write_str(interner.resolve(*self))
    }
}

impl PrettyPrint for Identifier {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        self.name.fmt_with(f, interner)
    }
}

impl<T: PrettyPrint + ?Sized> PrettyPrint for std::rc::Rc<T> {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        (**self).fmt_with(f, interner)
    }
}

impl PrettyPrint for TypeExpression {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        self.identifier.fmt_with(f, interner)?;
        if !self.parameters.is_empty() {
            write!(f, "(")?;
            comma_separated(f, &self.parameters, interner)?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl PrettyPrint for VarAccess {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        self.var.fmt_with(f, interner)?;
        for field in &self.fields {
            write!(f, ".")?;
            field.fmt_with(f, interner)?;
        }
        Ok(())
    }
}

impl PrettyPrint for Scalar {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, _: &Interner) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Unsigned(v) => write!(f, "{v}u"),
            Scalar::Float(v) => write!(f, "{v:?}"),
            Scalar::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl PrettyPrint for Value {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        match self {
            Value::Scalar(v) => v.scalar.fmt_with(f, interner),
            Value::Constructed(v) => {
                v.constructor.fmt_with(f, interner)?;
                write!(f, "{{")?;
                for (i, init) in v.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    init.name.fmt_with(f, interner)?;
                    write!(f, ": ")?;
                    init.value.fmt_with(f, interner)?;
                }
                write!(f, "}}")
            }
            Value::Collection(v) => {
                write!(f, "[")?;
                comma_separated(f, &v.elements, interner)?;
                write!(f, "]")
            }
            Value::Function(v) => {
                v.function.fmt_with(f, interner)?;
                write!(f, "(")?;
                comma_separated(f, &v.arguments, interner)?;
                write!(f, ")")
            }
        }
    }
}

impl PrettyPrint for Expression {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        match self {
            Expression::Binary(e) => {
                write!(f, "(")?;
                e.left.fmt_with(f, interner)?;
                write!(f, " {} ", e.op.as_str())?;
                e.right.fmt_with(f, interner)?;
                write!(f, ")")
            }
            Expression::Unary(e) => {
                write!(f, "{}", e.op.as_str())?;
                e.operand.fmt_with(f, interner)
            }
            Expression::Type(e) => e.fmt_with(f, interner),
            Expression::Value(v) => v.fmt_with(f, interner),
            Expression::VarAccess(v) => v.fmt_with(f, interner),
        }
    }
}

impl PrettyPrint for InputPattern {
    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, interner: &Interner) -> fmt::Result {
        match self {
            InputPattern::Star(_) => write!(f, "*"),
            InputPattern::Pattern(e) => e.fmt_with(f, interner),
        }
    }
}
