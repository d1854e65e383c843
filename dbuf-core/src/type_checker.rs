//! Dependent type checking of declarations.
//!
//! Types are checked in `Ast::visit_order`; each one is declared to the
//! equality oracle once its fields are known to be well-formed, so later
//! types and value comparisons can refer to it. Checking is fail-fast: the
//! first error is returned.
//!
//! Value-level comparison lives in `type_comparator`, enum rule dispatch in
//! `matcher`.

use dbuf_ast::{
    Ast, Enum, ExprRef, Func, FunctionType, Identifier, InputPattern, Interner, Message,
    ParamType, PrettyPrint, Rule, Span, Symbol, TypeDefinition, TypeExpression, TypedVariable,
};
use dbuf_verify::{
    CtorDecl, EqualityOracle, FieldSort, FunctionDecl, SortDecl, TranslationEnv,
};
use rustc_hash::FxHashMap;

use crate::error::{SemanticError, SubstitutionError};
use crate::substitutor::Substitutor;

pub type CheckResult<T = ()> = Result<T, SemanticError>;

/// What a name in scope stands for.
#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Value(TypeExpression),
    Function(FunctionType),
}

pub struct TypeChecker<'a, O: EqualityOracle> {
    pub(crate) ast: &'a Ast,
    pub(crate) interner: &'a Interner,
    pub(crate) oracle: &'a mut O,
    pub(crate) scopes: Vec<FxHashMap<Symbol, Binding>>,
    pub(crate) substitutor: Substitutor,
    /// Set while an enum rule input is checked: bare variables in
    /// constructor fields bind new names instead of being looked up.
    pub(crate) pattern_mode: bool,
}

impl<'a, O: EqualityOracle> TypeChecker<'a, O> {
    pub fn new(ast: &'a Ast, interner: &'a Interner, oracle: &'a mut O) -> Self {
        Self {
            ast,
            interner,
            oracle,
            scopes: vec![FxHashMap::default()],
            substitutor: Substitutor::new(),
            pattern_mode: false,
        }
    }

    /// Checks every type in visit order, then every function.
    pub fn check(&mut self) -> CheckResult {
        let ast = self.ast;
        if ast.visit_order.len() != ast.types.len() {
            return Err(SemanticError::unlocated(format!(
                "Type checking needs an order of all {} types, but got {}",
                ast.types.len(),
                ast.visit_order.len()
            )));
        }

        for name in &ast.visit_order {
            let def = ast.types.get(name).ok_or_else(|| {
                SemanticError::unlocated(format!(
                    "Type \"{}\" is in the visit order but not declared",
                    name.pretty(self.interner)
                ))
            })?;
            tracing::debug!(name = %name.pretty(self.interner), kind = def.kind(), "checking type");
            match def {
                TypeDefinition::Message(m) => self.check_message(m)?,
                TypeDefinition::Enum(e) => self.check_enum(e)?,
            }
        }

        for func in ast.functions.values() {
            self.declare_function(func)?;
        }
        for func in ast.functions.values() {
            self.check_function(func)?;
        }
        Ok(())
    }

    fn check_message(&mut self, message: &Message) -> CheckResult {
        self.scoped(|this| {
            this.check_variables(&message.type_dependencies)?;
            this.check_variables(&message.fields)
        })?;

        let decl = SortDecl {
            name: message.identifier.name,
            constructors: vec![CtorDecl {
                name: message.identifier.name,
                fields: self.field_sorts(&message.fields)?,
            }],
        };
        self.oracle.declare_type(&decl, self.interner)?;
        Ok(())
    }

    fn check_enum(&mut self, ast_enum: &Enum) -> CheckResult {
        self.scoped(|this| {
            this.check_variables(&ast_enum.type_dependencies)?;
            for rule in &ast_enum.pattern_mapping {
                this.check_rule(ast_enum, rule)?;
            }
            Ok(())
        })?;

        let constructors = ast_enum
            .constructors()
            .map(|constructor| -> CheckResult<CtorDecl> {
                Ok(CtorDecl {
                    name: constructor.identifier.name,
                    fields: self.field_sorts(&constructor.fields)?,
                })
            })
            .collect::<CheckResult<Vec<_>>>()?;
        let decl = SortDecl {
            name: ast_enum.identifier.name,
            constructors,
        };
        self.oracle.declare_type(&decl, self.interner)?;
        Ok(())
    }

    fn check_rule(&mut self, ast_enum: &Enum, rule: &Rule) -> CheckResult {
        let deps = &ast_enum.type_dependencies;
        if rule.inputs.len() != deps.len() {
            return Err(SemanticError::new(
                format!(
                    "Expected {} inputs in pattern for enum \"{}\", but got {}",
                    deps.len(),
                    ast_enum.identifier.pretty(self.interner),
                    rule.inputs.len()
                ),
                ast_enum.identifier.span,
            ));
        }

        self.scoped(|this| {
            for (input, dep) in rule.inputs.iter().zip(deps) {
                let InputPattern::Pattern(pattern) = input else {
                    continue;
                };
                let dep_type = this.substitute_type(&dep.type_expression)?;
                match pattern.as_bare_var() {
                    Some(alias) => this.add_name(alias.name, Binding::Value(dep_type)),
                    None => this.in_pattern_mode(|this| this.compare_value(&dep_type, pattern))?,
                }
                this.add_substitution(dep.name.name, pattern)?;
            }
            for constructor in &rule.outputs {
                this.scoped(|this| this.check_variables(&constructor.fields))?;
            }
            Ok(())
        })
    }

    /// Dependencies, fields and value parameters: each type is substituted,
    /// checked, then its name is bound for the variables after it.
    fn check_variables(&mut self, vars: &[TypedVariable]) -> CheckResult {
        for var in vars {
            let ty = self.substitute_type(&var.type_expression)?;
            self.check_type_expression(&ty)?;
            self.add_name(var.name.name, Binding::Value(ty));
        }
        Ok(())
    }

    pub(crate) fn check_type_expression(&mut self, ty: &TypeExpression) -> CheckResult {
        let name = ty.name();
        let params = &ty.parameters;

        if name.is_scalar_type() {
            return self.expect_arity(ty, 0);
        }
        match name {
            Symbol::ARRAY => {
                self.expect_arity(ty, 2)?;
                let element = self.type_parameter(ty, 0)?;
                self.check_type_expression(element)?;
                let unsigned = builtin(Symbol::UNSIGNED, params[1].span());
                self.compare_value(&unsigned, &params[1])
            }
            Symbol::SET => {
                self.expect_arity(ty, 1)?;
                let element = self.type_parameter(ty, 0)?;
                self.check_type_expression(element)
            }
            _ => {
                let ast = self.ast;
                let deps = ast.type_dependencies(name).ok_or_else(|| {
                    SemanticError::new(
                        format!("Undefined type name: \"{}\"", ty.identifier.pretty(self.interner)),
                        ty.identifier.span,
                    )
                })?;
                self.expect_arity(ty, deps.len())?;
                let mut local = Substitutor::new();
                for (dep, param) in deps.iter().zip(params) {
                    let expected = self.instantiate(&local, &dep.type_expression)?;
                    self.compare_value(&expected, param)?;
                    local.add_closed_substitution(dep.name.name, param);
                }
                Ok(())
            }
        }
    }

    fn expect_arity(&self, ty: &TypeExpression, expected: usize) -> CheckResult {
        if ty.parameters.len() == expected {
            return Ok(());
        }
        Err(SemanticError::new(
            format!(
                "Expected {expected} parameters for typename \"{}\", but got {}",
                ty.identifier.pretty(self.interner),
                ty.parameters.len()
            ),
            ty.span,
        ))
    }

    /// The `index`-th parameter of a collection type, which must be a type.
    pub(crate) fn type_parameter<'t>(
        &self,
        ty: &'t TypeExpression,
        index: usize,
    ) -> CheckResult<&'t TypeExpression> {
        let param = ty.parameters.get(index).ok_or_else(|| {
            SemanticError::new(
                format!("Type \"{}\" has no parameter {index}", ty.pretty(self.interner)),
                ty.span,
            )
        })?;
        param.as_type().ok_or_else(|| {
            SemanticError::new(
                format!(
                    "Expected a type as parameter {index} of \"{}\", but got value {}",
                    ty.identifier.pretty(self.interner),
                    param.pretty(self.interner)
                ),
                param.span(),
            )
        })
    }

    fn declare_function(&mut self, func: &Func) -> CheckResult {
        let mut parameters = Vec::with_capacity(func.parameters.len());
        for param in &func.parameters {
            match &param.ty {
                ParamType::Value(ty) => match FieldSort::of(ty) {
                    Some(sort) => parameters.push(sort),
                    None => return Ok(()),
                },
                ParamType::Function(_) => {
                    tracing::trace!(
                        function = %func.identifier.pretty(self.interner),
                        "higher-order function is not declared to the oracle"
                    );
                    return Ok(());
                }
            }
        }
        let Some(result) = FieldSort::of(&func.return_type) else {
            return Ok(());
        };
        let decl = FunctionDecl {
            name: func.identifier.name,
            parameters,
            result,
        };
        self.oracle.declare_function(&decl, self.interner)?;
        Ok(())
    }

    fn check_function(&mut self, func: &Func) -> CheckResult {
        tracing::debug!(function = %func.identifier.pretty(self.interner), "checking function");
        self.scoped(|this| {
            this.bind_parameters(&func.signature())?;
            let return_type = this.substitute_type(&func.return_type)?;
            this.check_type_expression(&return_type)?;
            if let Some(body) = &func.body {
                this.compare_value(&return_type, body)?;
            }
            Ok(())
        })
    }

    /// Checks a function type in its own scope.
    fn check_function_type(&mut self, ft: &FunctionType) -> CheckResult {
        self.scoped(|this| {
            this.bind_parameters(ft)?;
            let return_type = this.substitute_type(&ft.return_type)?;
            this.check_type_expression(&return_type)
        })
    }

    pub(crate) fn bind_parameters(&mut self, ft: &FunctionType) -> CheckResult {
        for param in &ft.parameters {
            match &param.ty {
                ParamType::Value(ty) => {
                    let ty = self.substitute_type(ty)?;
                    self.check_type_expression(&ty)?;
                    self.add_name(param.name.name, Binding::Value(ty));
                }
                ParamType::Function(inner) => {
                    self.check_function_type(inner)?;
                    self.add_name(param.name.name, Binding::Function(inner.clone()));
                }
            }
        }
        Ok(())
    }

    fn field_sorts(&self, fields: &[TypedVariable]) -> CheckResult<Vec<(Symbol, FieldSort)>> {
        fields
            .iter()
            .map(|field| -> CheckResult<(Symbol, FieldSort)> {
                let sort = FieldSort::of(&field.type_expression).ok_or_else(|| {
                    SemanticError::new(
                        format!(
                            "Cannot encode field \"{}\" of type \"{}\"",
                            field.name.pretty(self.interner),
                            field.type_expression.pretty(self.interner)
                        ),
                        field.name.span,
                    )
                })?;
                Ok((field.name.name, sort))
            })
            .collect()
    }

    pub(crate) fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> CheckResult<T>) -> CheckResult<T> {
        self.scopes.push(FxHashMap::default());
        self.substitutor.push_scope();
        tracing::trace!(depth = self.scopes.len(), "pushed type scope");
        let result = f(self);
        self.substitutor.pop_scope();
        self.scopes.pop();
        tracing::trace!(depth = self.scopes.len(), "popped type scope");
        result
    }

    pub(crate) fn in_pattern_mode<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CheckResult<T>,
    ) -> CheckResult<T> {
        let previous = std::mem::replace(&mut self.pattern_mode, true);
        let result = f(self);
        self.pattern_mode = previous;
        result
    }

    pub(crate) fn add_name(&mut self, name: Symbol, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    pub(crate) fn lookup(&self, name: Symbol) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    fn add_substitution(&mut self, name: Symbol, expr: &ExprRef) -> CheckResult {
        self.substitutor
            .add_substitution(name, expr)
            .map_err(|err| err.into_semantic(self.interner))?;
        tracing::trace!(
            name = %name.pretty(self.interner),
            value = %expr.pretty(self.interner),
            bindings = %self.substitutor.describe(self.interner),
            "added substitution"
        );
        Ok(())
    }

    fn substitute_type(&self, ty: &TypeExpression) -> CheckResult<TypeExpression> {
        self.instantiate(&self.substitutor, ty)
    }

    /// Applies a local substitutor, e.g. declaration dependencies bound to
    /// the parameters of a use site.
    pub(crate) fn instantiate(
        &self,
        local: &Substitutor,
        ty: &TypeExpression,
    ) -> CheckResult<TypeExpression> {
        local
            .substitute_type(ty)
            .map_err(|err: SubstitutionError| err.into_semantic(self.interner))
    }

    /// `Ok(true)` if the oracle proves `expected == got` in the live scope.
    pub(crate) fn oracle_equal(&mut self, expected: &ExprRef, got: &ExprRef) -> CheckResult<bool> {
        let env = ScopeEnv {
            scopes: &self.scopes,
            interner: self.interner,
        };
        let equal = self.oracle.check_equal(expected, got, &env)?;
        Ok(equal)
    }
}

/// The live scope as seen by the oracle.
struct ScopeEnv<'s> {
    scopes: &'s [FxHashMap<Symbol, Binding>],
    interner: &'s Interner,
}

impl TranslationEnv for ScopeEnv<'_> {
    fn interner(&self) -> &Interner {
        self.interner
    }

    fn var_sort(&self, var: Symbol) -> Option<FieldSort> {
        match self.scopes.iter().rev().find_map(|scope| scope.get(&var))? {
            Binding::Value(ty) => FieldSort::of(ty),
            Binding::Function(_) => None,
        }
    }
}

/// A parameterless builtin type, e.g. `Unsigned`.
pub(crate) fn builtin(name: Symbol, span: Span) -> TypeExpression {
    TypeExpression::new(Identifier::new(name, span), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbuf_ast::{AstBuilder, BinaryOp};
    use dbuf_verify::StructuralOracle;

    use crate::positivity::check_positivity;

    fn check(mut ast: Ast, b: AstBuilder) -> (CheckResult, StructuralOracle, Interner) {
        let interner = b.finish();
        let errors = check_positivity(&mut ast, &interner);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let mut oracle = StructuralOracle::new();
        let result = TypeChecker::new(&ast, &interner, &mut oracle).check();
        (result, oracle, interner)
    }

    #[test]
    fn test_message_declares_single_constructor() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message(
            "Point",
            vec![],
            vec![b.field("x", b.ty("Int", vec![])), b.field("y", b.ty("Int", vec![]))],
        ));
        let point = b.sym("Point");
        let (result, oracle, _) = check(ast, b);
        result.unwrap();
        let decl = oracle.sort(point).unwrap();
        assert_eq!(decl.constructors.len(), 1);
        assert_eq!(decl.constructors[0].fields.len(), 2);
    }

    #[test]
    fn test_recursive_list_declares_one_sort() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_enum(b.enumeration(
            "List",
            vec![b.field("n", b.ty("Unsigned", vec![]))],
            vec![
                b.rule(vec![b.pattern(b.uint(0))], vec![b.constructor("Nil", vec![])]),
                b.rule(
                    vec![b.star()],
                    vec![b.constructor(
                        "Cons",
                        vec![
                            b.field("head", b.ty("Int", vec![])),
                            b.field(
                                "tail",
                                b.ty("List", vec![b.binary(BinaryOp::Sub, b.var("n"), b.uint(1))]),
                            ),
                        ],
                    )],
                ),
            ],
        ));
        let list = b.sym("List");
        let (result, oracle, _) = check(ast, b);
        result.unwrap();
        assert_eq!(oracle.sort(list).unwrap().constructors.len(), 2);
    }

    #[test]
    fn test_rule_input_count_must_match_dependencies() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_enum(b.enumeration(
            "E",
            vec![b.field("n", b.ty("Int", vec![]))],
            vec![b.rule(vec![b.star(), b.star()], vec![b.constructor("A", vec![])])],
        ));
        let (result, _, _) = check(ast, b);
        let err = result.expect_err("two inputs for one dependency");
        assert!(
            err.message.contains("Expected 1 inputs in pattern for enum \"E\", but got 2"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_scalar_types_take_no_parameters() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message("M", vec![], vec![b.field("x", b.ty("Int", vec![b.int(1)]))]));
        let (result, _, _) = check(ast, b);
        let err = result.expect_err("Int with a parameter");
        assert!(
            err.message.contains("Expected 0 parameters for typename \"Int\", but got 1"),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_array_length_must_be_unsigned() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message(
            "M",
            vec![],
            vec![b.field("xs", b.ty("Array", vec![b.type_expr("Int", vec![]), b.string("3")]))],
        ));
        let (result, _, _) = check(ast, b);
        let err = result.expect_err("string length");
        assert!(
            err.message.contains("Got value of type \"String\", but expected type is \"Unsigned\""),
            "unexpected error: {}",
            err.message
        );
    }

    #[test]
    fn test_later_dependencies_see_earlier_ones() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message(
            "Sized",
            vec![
                b.field("n", b.ty("Unsigned", vec![])),
                b.field("xs", b.ty("Array", vec![b.type_expr("Int", vec![]), b.var("n")])),
            ],
            vec![],
        ));
        ast.add_message(b.message(
            "User",
            vec![],
            vec![b.field(
                "s",
                b.ty("Sized", vec![b.uint(2), b.collection(vec![b.int(1), b.int(2)])]),
            )],
        ));
        let (result, _, _) = check(ast, b);
        result.unwrap();
    }

    #[test]
    fn test_functions_are_checked_after_types() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_function(b.function(
            "double",
            vec![b.param("x", b.ty("Int", vec![]))],
            b.ty("Int", vec![]),
            Some(b.binary(BinaryOp::Add, b.var("x"), b.var("x"))),
        ));
        ast.add_function(b.function(
            "broken",
            vec![],
            b.ty("Bool", vec![]),
            Some(b.call("double", vec![b.int(2)])),
        ));
        let double = b.sym("double");
        let (result, oracle, _) = check(ast, b);
        let err = result.expect_err("Int body for a Bool function");
        assert!(
            err.message.contains("Got type \"Int\", but expected type is \"Bool\""),
            "unexpected error: {}",
            err.message
        );
        assert!(oracle.function(double).is_some());
    }
}
