//! Value expressions against expected types.

use std::rc::Rc;

use dbuf_ast::{
    BinaryExpression, BinaryOp, ConstructedValue, ExprRef, Expression, FunctionType,
    FunctionValue, Identifier, ParamType, Parameter, PrettyPrint, Span, Symbol, TypeDefinition,
    TypeExpression, UnaryOp, Value, VarAccess,
};
use dbuf_verify::EqualityOracle;

use crate::error::SemanticError;
use crate::substitutor::Substitutor;
use crate::type_checker::{Binding, CheckResult, TypeChecker};

fn binary_supported(op: BinaryOp, ty: Symbol) -> bool {
    match op {
        BinaryOp::Add => matches!(
            ty,
            Symbol::INT | Symbol::UNSIGNED | Symbol::STRING | Symbol::FLOAT
        ),
        BinaryOp::Sub | BinaryOp::Mul => {
            matches!(ty, Symbol::INT | Symbol::UNSIGNED | Symbol::FLOAT)
        }
        BinaryOp::Div => ty == Symbol::FLOAT,
        BinaryOp::And | BinaryOp::Or | BinaryOp::In => ty == Symbol::BOOL,
        BinaryOp::Intersect | BinaryOp::Difference => ty == Symbol::SET,
        BinaryOp::Union => matches!(ty, Symbol::ARRAY | Symbol::SET),
    }
}

fn unary_supported(op: UnaryOp, ty: Symbol) -> bool {
    match op {
        UnaryOp::Neg => matches!(ty, Symbol::INT | Symbol::FLOAT),
        UnaryOp::Not => ty == Symbol::BOOL,
    }
}

fn var_ref(id: Identifier) -> ExprRef {
    Rc::new(Expression::VarAccess(VarAccess::new(id, Vec::new())))
}

impl<O: EqualityOracle> TypeChecker<'_, O> {
    /// Checks that `expr` is a value of type `expected`.
    pub(crate) fn compare_value(&mut self, expected: &TypeExpression, expr: &ExprRef) -> CheckResult {
        match &**expr {
            Expression::Type(ty) => Err(SemanticError::new(
                format!(
                    "Expected value of type \"{}\", but got type \"{}\"",
                    expected.pretty(self.interner),
                    ty.pretty(self.interner)
                ),
                ty.span,
            )),
            Expression::Binary(e) if e.op == BinaryOp::Union && expected.name() == Symbol::ARRAY => {
                self.compare_array(expected, expr)
            }
            Expression::Binary(e) => self.compare_binary(expected, e),
            Expression::Unary(e) => {
                if !unary_supported(e.op, expected.name()) {
                    return Err(self.unsupported_operator(e.op.as_str(), expected, e.span));
                }
                self.compare_value(expected, &e.operand)
            }
            Expression::VarAccess(access) => {
                let actual = self.var_access_type(access)?;
                self.compare_binding(expected, actual, access.span)
            }
            Expression::Value(Value::Scalar(v)) => {
                let got = v.scalar.type_name();
                if got == expected.name() && expected.parameters.is_empty() {
                    return Ok(());
                }
                Err(SemanticError::new(
                    format!(
                        "Got value of type \"{}\", but expected type is \"{}\"",
                        got.pretty(self.interner),
                        expected.pretty(self.interner)
                    ),
                    v.span,
                ))
            }
            Expression::Value(Value::Constructed(v)) => self.compare_constructed(expected, v),
            Expression::Value(Value::Collection(v)) => match expected.name() {
                Symbol::SET => {
                    let element = self.type_parameter(expected, 0)?;
                    for item in &v.elements {
                        self.compare_value(element, item)?;
                    }
                    Ok(())
                }
                Symbol::ARRAY => self.compare_array(expected, expr),
                _ => Err(SemanticError::new(
                    format!(
                        "Got collection {}, but expected type is \"{}\"",
                        expr.pretty(self.interner),
                        expected.pretty(self.interner)
                    ),
                    v.span,
                )),
            },
            Expression::Value(Value::Function(v)) => {
                let actual = self.function_value_type(v)?;
                self.compare_binding(expected, actual, v.span)
            }
        }
    }

    fn compare_binding(&mut self, expected: &TypeExpression, actual: Binding, span: Span) -> CheckResult {
        match actual {
            Binding::Value(ty) => self.compare_type_expressions(expected, &ty, span),
            Binding::Function(_) => Err(SemanticError::new(
                format!(
                    "Got function, but expected value of type \"{}\"",
                    expected.pretty(self.interner)
                ),
                span,
            )),
        }
    }

    fn compare_binary(&mut self, expected: &TypeExpression, e: &BinaryExpression) -> CheckResult {
        if !binary_supported(e.op, expected.name()) {
            return Err(self.unsupported_operator(e.op.as_str(), expected, e.span));
        }
        if e.op == BinaryOp::In {
            tracing::trace!("operands of `in` are not checked");
            return Ok(());
        }
        self.compare_value(expected, &e.left)?;
        self.compare_value(expected, &e.right)
    }

    fn unsupported_operator(&self, op: &str, ty: &TypeExpression, span: Span) -> SemanticError {
        SemanticError::new(
            format!(
                "Operator \"{op}\" is not supported by type {}",
                ty.pretty(self.interner)
            ),
            span,
        )
    }

    /// Element types are checked one by one; the length is accumulated
    /// symbolically and handed to the oracle.
    fn compare_array(&mut self, expected: &TypeExpression, expr: &ExprRef) -> CheckResult {
        let element = self.type_parameter(expected, 0)?;
        let Some(expected_len) = expected.parameters.get(1) else {
            return Err(SemanticError::new(
                format!(
                    "Expected 2 parameters for typename \"Array\", but got {}",
                    expected.parameters.len()
                ),
                expected.span,
            ));
        };
        let got_len = self.array_length(element, expr)?;
        if self.oracle_equal(expected_len, &got_len)? {
            return Ok(());
        }
        Err(SemanticError::new(
            format!(
                "Array size mismatch: expected size {}, but got {}",
                expected_len.pretty(self.interner),
                got_len.pretty(self.interner)
            ),
            expr.span(),
        ))
    }

    fn array_length(&mut self, element: &TypeExpression, expr: &ExprRef) -> CheckResult<ExprRef> {
        let actual = match &**expr {
            Expression::Value(Value::Collection(v)) => {
                for item in &v.elements {
                    self.compare_value(element, item)?;
                }
                return Ok(Expression::unsigned(v.span, v.elements.len() as u64));
            }
            Expression::Binary(e) if e.op == BinaryOp::Union => {
                let left = self.array_length(element, &e.left)?;
                let right = self.array_length(element, &e.right)?;
                return Ok(Expression::binary(e.span, BinaryOp::Add, left, right));
            }
            Expression::VarAccess(access) => self.var_access_type(access)?,
            Expression::Value(Value::Function(v)) => self.function_value_type(v)?,
            _ => {
                return Err(SemanticError::new(
                    format!("Expression {} is not an array", expr.pretty(self.interner)),
                    expr.span(),
                ));
            }
        };

        let ty = match actual {
            Binding::Value(ty) if ty.name() == Symbol::ARRAY => ty,
            Binding::Value(ty) => {
                return Err(SemanticError::new(
                    format!(
                        "Got type \"{}\", but expected an array of \"{}\"",
                        ty.pretty(self.interner),
                        element.pretty(self.interner)
                    ),
                    expr.span(),
                ));
            }
            Binding::Function(_) => {
                return Err(SemanticError::new(
                    format!("Got function, but expected an array of \"{}\"", element.pretty(self.interner)),
                    expr.span(),
                ));
            }
        };
        let actual_element = self.type_parameter(&ty, 0)?;
        self.compare_type_expressions(element, actual_element, expr.span())?;
        ty.parameters.get(1).cloned().ok_or_else(|| {
            SemanticError::new(
                format!("Array type \"{}\" has no length", ty.pretty(self.interner)),
                expr.span(),
            )
        })
    }

    fn compare_constructed(&mut self, expected: &TypeExpression, value: &ConstructedValue) -> CheckResult {
        let ast = self.ast;
        let ctor = value.constructor;
        let (owner, fields) = ast.constructor(ctor.name).ok_or_else(|| {
            SemanticError::new(
                format!("Undefined constructor: \"{}\"", ctor.pretty(self.interner)),
                ctor.span,
            )
        })?;
        let owner_name = owner.identifier();
        if owner_name.name != expected.name() {
            return Err(SemanticError::new(
                format!(
                    "Got value of type \"{}\", but expected type is \"{}\"",
                    owner_name.pretty(self.interner),
                    expected.pretty(self.interner)
                ),
                value.span,
            ));
        }

        let deps = owner.type_dependencies();
        if deps.len() != expected.parameters.len() {
            return Err(SemanticError::new(
                format!(
                    "Expected {} parameters for typename \"{}\", but got {}",
                    deps.len(),
                    owner_name.pretty(self.interner),
                    expected.parameters.len()
                ),
                expected.span,
            ));
        }
        let mut local = Substitutor::new();
        for (dep, param) in deps.iter().zip(&expected.parameters) {
            local.add_closed_substitution(dep.name.name, param);
        }
        if let TypeDefinition::Enum(e) = owner {
            self.select_rule(e, ctor, &expected.parameters, &mut local)?;
        }

        if value.fields.len() != fields.len() {
            return Err(SemanticError::new(
                format!(
                    "Expected {} fields in constructor \"{}\", but got {}",
                    fields.len(),
                    ctor.pretty(self.interner),
                    value.fields.len()
                ),
                value.span,
            ));
        }
        for field in fields {
            let field_value = value.field(field.name.name).ok_or_else(|| {
                SemanticError::new(
                    format!(
                        "Field \"{}\" is missing in constructor \"{}\"",
                        field.name.pretty(self.interner),
                        ctor.pretty(self.interner)
                    ),
                    value.span,
                )
            })?;
            let field_type = self.instantiate(&local, &field.type_expression)?;
            match field_value.as_bare_var() {
                Some(alias) if self.pattern_mode => {
                    self.add_name(alias.name, Binding::Value(field_type));
                }
                _ => self.compare_value(&field_type, field_value)?,
            }
            local.add_closed_substitution(field.name.name, field_value);
        }
        Ok(())
    }

    /// Type of `x.f.g`: each step looks the field up in the message type of
    /// the previous step, with that message's dependencies bound to the
    /// actual type parameters and earlier fields bound to their accesses.
    pub(crate) fn var_access_type(&self, access: &VarAccess) -> CheckResult<Binding> {
        let binding = self.lookup(access.var.name).cloned().ok_or_else(|| {
            SemanticError::new(
                format!("Undefined variable: \"{}\"", access.var.pretty(self.interner)),
                access.var.span,
            )
        })?;
        if access.fields.is_empty() {
            return Ok(binding);
        }
        let Binding::Value(mut current) = binding else {
            return Err(SemanticError::new(
                format!(
                    "Field access works only for messages, but \"{}\" is a function",
                    access.var.pretty(self.interner)
                ),
                access.span,
            ));
        };

        let mut prefix = VarAccess::new(access.var, Vec::new());
        for field in &access.fields {
            let message = match self.ast.types.get(&current.name()) {
                Some(TypeDefinition::Message(m)) => m,
                Some(TypeDefinition::Enum(_)) => {
                    return Err(SemanticError::new(
                        format!(
                            "Field access works only for messages, but \"{}\" is enum",
                            current.identifier.pretty(self.interner)
                        ),
                        field.span,
                    ));
                }
                None => {
                    return Err(SemanticError::new(
                        format!(
                            "Field access works only for messages, but \"{}\" is builtin",
                            current.identifier.pretty(self.interner)
                        ),
                        field.span,
                    ));
                }
            };

            let mut local = Substitutor::new();
            for (dep, param) in message.type_dependencies.iter().zip(&current.parameters) {
                local.add_closed_substitution(dep.name.name, param);
            }
            let mut found = None;
            for declared in &message.fields {
                if declared.name.name == field.name {
                    found = Some(self.instantiate(&local, &declared.type_expression)?);
                    break;
                }
                let mut earlier = prefix.clone();
                earlier.fields.push(declared.name);
                local.add_closed_substitution(declared.name.name, &Rc::new(earlier.into()));
            }
            current = found.ok_or_else(|| {
                SemanticError::new(
                    format!(
                        "Field \"{}\" not found in message \"{}\"",
                        field.pretty(self.interner),
                        message.identifier.pretty(self.interner)
                    ),
                    field.span,
                )
            })?;
            prefix.fields.push(*field);
        }
        Ok(Binding::Value(current))
    }

    /// A full application yields the return type; a partial one yields the
    /// function type of the remaining parameters.
    pub(crate) fn function_value_type(&mut self, value: &FunctionValue) -> CheckResult<Binding> {
        let callee = value.function;
        let signature = self.callee_signature(callee)?;
        let arity = signature.parameters.len();
        if value.arguments.len() > arity {
            return Err(SemanticError::new(
                format!(
                    "Expected at most {arity} arguments for function \"{}\", but got {}",
                    callee.pretty(self.interner),
                    value.arguments.len()
                ),
                value.span,
            ));
        }

        let mut local = Substitutor::new();
        for (param, argument) in signature.parameters.iter().zip(&value.arguments) {
            match &param.ty {
                ParamType::Value(ty) => {
                    let expected = self.instantiate(&local, ty)?;
                    self.compare_value(&expected, argument)?;
                }
                ParamType::Function(ft) => {
                    let expected = self.instantiate_function(&local, ft)?;
                    let actual = self.function_reference_type(argument)?;
                    self.compare_function_types(&expected, &actual, argument.span())?;
                }
            }
            local.add_closed_substitution(param.name.name, argument);
        }

        let return_type = self.instantiate(&local, &signature.return_type)?;
        if value.arguments.len() == arity {
            return Ok(Binding::Value(return_type));
        }
        let remaining = signature.parameters[value.arguments.len()..]
            .iter()
            .map(|param| self.instantiate_parameter(&local, param))
            .collect::<CheckResult<Vec<_>>>()?;
        Ok(Binding::Function(FunctionType {
            parameters: remaining,
            return_type,
        }))
    }

    fn callee_signature(&self, callee: Identifier) -> CheckResult<FunctionType> {
        match self.lookup(callee.name) {
            Some(Binding::Function(ft)) => Ok(ft.clone()),
            Some(Binding::Value(ty)) => Err(SemanticError::new(
                format!(
                    "\"{}\" is not a function, it has type \"{}\"",
                    callee.pretty(self.interner),
                    ty.pretty(self.interner)
                ),
                callee.span,
            )),
            None => self
                .ast
                .functions
                .get(&callee.name)
                .map(|func| func.signature())
                .ok_or_else(|| {
                    SemanticError::new(
                        format!("Undefined function: \"{}\"", callee.pretty(self.interner)),
                        callee.span,
                    )
                }),
        }
    }

    /// Type of an argument passed for a function-typed parameter.
    fn function_reference_type(&mut self, argument: &ExprRef) -> CheckResult<FunctionType> {
        let binding = match &**argument {
            Expression::VarAccess(access) if access.is_bare() => {
                Binding::Function(self.callee_signature(access.var)?)
            }
            Expression::Value(Value::Function(v)) => self.function_value_type(v)?,
            _ => {
                return Err(SemanticError::new(
                    format!("Expected function, but got {}", argument.pretty(self.interner)),
                    argument.span(),
                ));
            }
        };
        match binding {
            Binding::Function(ft) => Ok(ft),
            Binding::Value(ty) => Err(SemanticError::new(
                format!(
                    "Expected function, but got value of type \"{}\"",
                    ty.pretty(self.interner)
                ),
                argument.span(),
            )),
        }
    }

    /// Parameters are compared positionally; names of `actual` are renamed
    /// to those of `expected`.
    fn compare_function_types(
        &mut self,
        expected: &FunctionType,
        actual: &FunctionType,
        span: Span,
    ) -> CheckResult {
        if expected.parameters.len() != actual.parameters.len() {
            return Err(SemanticError::new(
                format!(
                    "Expected function with {} parameters, but got {}",
                    expected.parameters.len(),
                    actual.parameters.len()
                ),
                span,
            ));
        }
        self.scoped(|this| {
            let mut rename = Substitutor::new();
            for (index, (e, a)) in expected.parameters.iter().zip(&actual.parameters).enumerate() {
                match (&e.ty, &a.ty) {
                    (ParamType::Value(et), ParamType::Value(at)) => {
                        let at = this.instantiate(&rename, at)?;
                        this.compare_type_expressions(et, &at, span)?;
                        this.add_name(e.name.name, Binding::Value(et.clone()));
                    }
                    (ParamType::Function(ef), ParamType::Function(af)) => {
                        this.compare_function_types(ef, af, span)?;
                        this.add_name(e.name.name, Binding::Function(ef.clone()));
                    }
                    _ => {
                        return Err(SemanticError::new(
                            format!("Function parameter {index} mismatch: value and function"),
                            span,
                        ));
                    }
                }
                rename.add_closed_substitution(a.name.name, &var_ref(e.name));
            }
            let return_type = this.instantiate(&rename, &actual.return_type)?;
            this.compare_type_expressions(&expected.return_type, &return_type, span)
        })
    }

    fn instantiate_function(&self, local: &Substitutor, ft: &FunctionType) -> CheckResult<FunctionType> {
        Ok(FunctionType {
            parameters: ft
                .parameters
                .iter()
                .map(|param| self.instantiate_parameter(local, param))
                .collect::<CheckResult<Vec<_>>>()?,
            return_type: self.instantiate(local, &ft.return_type)?,
        })
    }

    fn instantiate_parameter(&self, local: &Substitutor, param: &Parameter) -> CheckResult<Parameter> {
        let ty = match &param.ty {
            ParamType::Value(ty) => ParamType::Value(self.instantiate(local, ty)?),
            ParamType::Function(ft) => ParamType::Function(self.instantiate_function(local, ft)?),
        };
        Ok(Parameter {
            name: param.name,
            ty,
        })
    }

    /// Same name, same number of parameters, and pairwise equal parameters:
    /// types structurally, values by the oracle.
    pub(crate) fn compare_type_expressions(
        &mut self,
        expected: &TypeExpression,
        actual: &TypeExpression,
        span: Span,
    ) -> CheckResult {
        if expected.name() != actual.name() {
            return Err(SemanticError::new(
                format!(
                    "Got type \"{}\", but expected type is \"{}\"",
                    actual.pretty(self.interner),
                    expected.pretty(self.interner)
                ),
                span,
            ));
        }
        if expected.parameters.len() != actual.parameters.len() {
            return Err(SemanticError::new(
                format!(
                    "Expected {} parameters for typename \"{}\", but got {}",
                    expected.parameters.len(),
                    expected.identifier.pretty(self.interner),
                    actual.parameters.len()
                ),
                span,
            ));
        }
        for (index, (e, a)) in expected.parameters.iter().zip(&actual.parameters).enumerate() {
            let equal = match (e.as_type(), a.as_type()) {
                (Some(et), Some(at)) => {
                    self.compare_type_expressions(et, at, span)?;
                    true
                }
                (None, None) => self.oracle_equal(e, a)?,
                _ => false,
            };
            if !equal {
                return Err(SemanticError::new(
                    format!(
                        "Type parameter {index} mismatch: Expressions {} and {} are not equal",
                        e.pretty(self.interner),
                        a.pretty(self.interner)
                    ),
                    span,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dbuf_ast::{Ast, AstBuilder};
    use dbuf_verify::StructuralOracle;

    use super::*;
    use crate::positivity::check_positivity;

    fn run(mut ast: Ast, b: AstBuilder) -> CheckResult {
        let interner = b.finish();
        let errors = check_positivity(&mut ast, &interner);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let mut oracle = StructuralOracle::new();
        TypeChecker::new(&ast, &interner, &mut oracle).check()
    }

    fn pair(b: &AstBuilder) -> dbuf_ast::Message {
        b.message(
            "Pair",
            vec![],
            vec![b.field("a", b.ty("Int", vec![])), b.field("b", b.ty("Bool", vec![]))],
        )
    }

    #[test]
    fn test_operator_table() {
        assert!(binary_supported(BinaryOp::Add, Symbol::STRING));
        assert!(binary_supported(BinaryOp::Sub, Symbol::UNSIGNED));
        assert!(!binary_supported(BinaryOp::Div, Symbol::INT));
        assert!(binary_supported(BinaryOp::Union, Symbol::ARRAY));
        assert!(!binary_supported(BinaryOp::Intersect, Symbol::ARRAY));
        assert!(binary_supported(BinaryOp::In, Symbol::BOOL));
        assert!(unary_supported(UnaryOp::Not, Symbol::BOOL));
        assert!(!unary_supported(UnaryOp::Neg, Symbol::UNSIGNED));
    }

    #[test]
    fn test_unsupported_operator() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_function(b.function(
            "f",
            vec![],
            b.ty("Bool", vec![]),
            Some(b.binary(BinaryOp::Add, b.boolean(true), b.boolean(false))),
        ));
        let err = run(ast, b).expect_err("+ on Bool");
        assert!(
            err.message.contains("Operator \"+\" is not supported by type Bool"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_field_access_types() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(pair(&b));
        ast.add_function(b.function(
            "second",
            vec![b.param("p", b.ty("Pair", vec![]))],
            b.ty("Bool", vec![]),
            Some(b.var("p.b")),
        ));
        run(ast, b).unwrap();
    }

    #[test]
    fn test_field_access_type_mismatch() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(pair(&b));
        ast.add_function(b.function(
            "first",
            vec![b.param("p", b.ty("Pair", vec![]))],
            b.ty("Bool", vec![]),
            Some(b.var("p.a")),
        ));
        let err = run(ast, b).expect_err("Int field for Bool");
        assert!(
            err.message.contains("Got type \"Int\", but expected type is \"Bool\""),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_unknown_field() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(pair(&b));
        ast.add_function(b.function(
            "third",
            vec![b.param("p", b.ty("Pair", vec![]))],
            b.ty("Int", vec![]),
            Some(b.var("p.c")),
        ));
        let err = run(ast, b).expect_err("no field c");
        assert!(
            err.message.contains("Field \"c\" not found in message \"Pair\""),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_field_access_on_enum() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_enum(b.enumeration(
            "Flag",
            vec![],
            vec![b.rule(
                vec![],
                vec![b.constructor("On", vec![b.field("level", b.ty("Int", vec![]))])],
            )],
        ));
        ast.add_function(b.function(
            "level",
            vec![b.param("f", b.ty("Flag", vec![]))],
            b.ty("Int", vec![]),
            Some(b.var("f.level")),
        ));
        let err = run(ast, b).expect_err("enum field access");
        assert!(
            err.message.contains("Field access works only for messages, but \"Flag\" is enum"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_dependent_field_access() {
        // Box(n) { xs: Array(Int, n) }; b.xs of a Box(2u) has length 2u.
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message(
            "Box",
            vec![b.field("n", b.ty("Unsigned", vec![]))],
            vec![b.field("xs", b.ty("Array", vec![b.type_expr("Int", vec![]), b.var("n")]))],
        ));
        ast.add_function(b.function(
            "items",
            vec![b.param("bx", b.ty("Box", vec![b.uint(2)]))],
            b.ty("Array", vec![b.type_expr("Int", vec![]), b.uint(2)]),
            Some(b.var("bx.xs")),
        ));
        ast.add_function(b.function(
            "wrong",
            vec![b.param("bx", b.ty("Box", vec![b.uint(2)]))],
            b.ty("Array", vec![b.type_expr("Int", vec![]), b.uint(3)]),
            Some(b.var("bx.xs")),
        ));
        let err = run(ast, b).expect_err("length 2u is not 3u");
        assert!(
            err.message.contains("Type parameter 1 mismatch: Expressions 3u and 2u are not equal"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_constructed_value_field_count() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(pair(&b));
        ast.add_function(b.function(
            "make",
            vec![],
            b.ty("Pair", vec![]),
            Some(b.ctor("Pair", vec![("a", b.int(1))])),
        ));
        let err = run(ast, b).expect_err("missing field b");
        assert!(
            err.message.contains("Expected 2 fields in constructor \"Pair\", but got 1"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_array_union_lengths_add_up() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_function(b.function(
            "joined",
            vec![],
            b.ty("Array", vec![b.type_expr("Int", vec![]), b.uint(3)]),
            Some(b.binary(
                BinaryOp::Union,
                b.collection(vec![b.int(1)]),
                b.collection(vec![b.int(2), b.int(3)]),
            )),
        ));
        run(ast, b).unwrap();
    }

    #[test]
    fn test_set_elements_are_checked() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_function(b.function(
            "tags",
            vec![],
            b.ty("Set", vec![b.type_expr("String", vec![])]),
            Some(b.collection(vec![b.string("a"), b.int(1)])),
        ));
        let err = run(ast, b).expect_err("Int in a set of strings");
        assert!(
            err.message.contains("Got value of type \"Int\", but expected type is \"String\""),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_partial_application() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        let int = || b.ty("Int", vec![]);
        ast.add_function(b.function(
            "add",
            vec![b.param("x", int()), b.param("y", int())],
            int(),
            Some(b.binary(BinaryOp::Add, b.var("x"), b.var("y"))),
        ));
        ast.add_function(b.function(
            "apply",
            vec![b.fn_param("g", vec![b.param("z", int())], int())],
            int(),
            Some(b.call("g", vec![b.int(1)])),
        ));
        ast.add_function(b.function(
            "main",
            vec![],
            int(),
            Some(b.call("apply", vec![b.call("add", vec![b.int(1)])])),
        ));
        run(ast, b).unwrap();
    }

    #[test]
    fn test_partial_application_is_not_a_value() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        let int = || b.ty("Int", vec![]);
        ast.add_function(b.function(
            "add",
            vec![b.param("x", int()), b.param("y", int())],
            int(),
            None,
        ));
        ast.add_function(b.function(
            "main",
            vec![],
            int(),
            Some(b.call("add", vec![b.int(1)])),
        ));
        let err = run(ast, b).expect_err("partial application as Int");
        assert!(
            err.message.contains("Got function, but expected value of type \"Int\""),
            "unexpected error: {}",
            err.message
        );
    }
}
