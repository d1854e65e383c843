//! Checks that every referenced name is declared in an enclosing scope.
//!
//! Errors are accumulated; the whole schema is always walked.

use dbuf_ast::{
    Ast, Constructor, Expression, FunctionType, Identifier, InputPattern, Interner, ParamType,
    Parameter, PrettyPrint, Symbol, TypeDefinition, TypeExpression, TypedVariable, Value,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ErrorList, SemanticError};

pub fn check_name_resolution(ast: &Ast, interner: &Interner) -> ErrorList {
    let mut resolver = NameResolver::new(ast, interner);
    resolver.run();
    resolver.errors
}

struct NameResolver<'a> {
    ast: &'a Ast,
    interner: &'a Interner,
    scopes: Vec<FxHashSet<Symbol>>,
    constructor_fields: FxHashMap<Symbol, FxHashSet<Symbol>>,
    /// Scope that receives names bound by rule input patterns.
    alias_scope: Option<usize>,
    errors: ErrorList,
}

impl<'a> NameResolver<'a> {
    fn new(ast: &'a Ast, interner: &'a Interner) -> Self {
        Self {
            ast,
            interner,
            scopes: Vec::new(),
            constructor_fields: FxHashMap::default(),
            alias_scope: None,
            errors: ErrorList::new(),
        }
    }

    fn run(&mut self) {
        let ast = self.ast;
        self.push_scope();
        self.add_global_names();
        self.constructor_fields = constructor_fields(ast);

        for def in ast.types.values() {
            match def {
                TypeDefinition::Message(m) => {
                    self.push_scope();
                    self.dependencies(&m.type_dependencies);
                    self.fields(&m.fields);
                    self.pop_scope();
                }
                TypeDefinition::Enum(e) => {
                    self.push_scope();
                    self.dependencies(&e.type_dependencies);
                    for rule in &e.pattern_mapping {
                        self.push_scope();
                        self.alias_scope = Some(self.scopes.len() - 1);
                        for input in &rule.inputs {
                            self.input(input);
                        }
                        self.alias_scope = None;
                        for constructor in &rule.outputs {
                            self.constructor(constructor);
                        }
                        self.pop_scope();
                    }
                    self.pop_scope();
                }
            }
        }

        for func in ast.functions.values() {
            self.push_scope();
            for param in &func.parameters {
                self.parameter(param);
            }
            self.type_expression(&func.return_type);
            if let Some(body) = &func.body {
                self.expression(body);
            }
            self.pop_scope();
        }

        self.pop_scope();
    }

    fn add_global_names(&mut self) {
        let ast = self.ast;
        for builtin in Symbol::BUILTINS {
            self.add_global(builtin, None, "type");
        }
        for def in ast.types.values() {
            let id = def.identifier();
            self.add_global(id.name, Some(id), def.kind());
            if let TypeDefinition::Enum(e) = def {
                for constructor in e.constructors() {
                    let id = constructor.identifier;
                    self.add_global(id.name, Some(id), "constructor");
                }
            }
        }
        for func in ast.functions.values() {
            let id = func.identifier;
            self.add_global(id.name, Some(id), "function");
        }
        for (id, kind) in &ast.redeclared {
            self.redeclaration(*id, kind);
        }
    }

    fn add_global(&mut self, name: Symbol, id: Option<Identifier>, kind: &str) {
        match id {
            Some(id) => self.add_name(id, kind, false),
            None => {
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name);
                }
            }
        }
    }

    fn dependencies(&mut self, deps: &[TypedVariable]) {
        for dep in deps {
            self.type_expression(&dep.type_expression);
            self.add_name(dep.name, "dependency", true);
        }
    }

    fn fields(&mut self, fields: &[TypedVariable]) {
        for field in fields {
            self.type_expression(&field.type_expression);
            self.add_name(field.name, "field", false);
        }
    }

    fn constructor(&mut self, constructor: &Constructor) {
        self.push_scope();
        self.fields(&constructor.fields);
        self.pop_scope();
    }

    fn input(&mut self, input: &InputPattern) {
        match input {
            InputPattern::Star(_) => {}
            InputPattern::Pattern(expr) => match expr.as_bare_var() {
                Some(alias) if self.alias_scope.is_some() => self.add_alias(alias),
                _ => self.expression(expr),
            },
        }
    }

    fn parameter(&mut self, param: &Parameter) {
        match &param.ty {
            ParamType::Value(ty) => self.type_expression(ty),
            ParamType::Function(ft) => self.function_type(ft),
        }
        self.add_name(param.name, "parameter", false);
    }

    fn function_type(&mut self, ft: &FunctionType) {
        self.push_scope();
        for param in &ft.parameters {
            self.parameter(param);
        }
        self.type_expression(&ft.return_type);
        self.pop_scope();
    }

    fn type_expression(&mut self, ty: &TypeExpression) {
        if !self.is_in_scope(ty.name()) {
            self.error(
                format!("Undefined type name: \"{}\"", ty.identifier.pretty(self.interner)),
                ty.identifier,
            );
        }
        for param in &ty.parameters {
            self.expression(param);
        }
    }

    fn expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary(e) => {
                self.expression(&e.left);
                self.expression(&e.right);
            }
            Expression::Unary(e) => self.expression(&e.operand),
            Expression::Type(ty) => self.type_expression(ty),
            Expression::VarAccess(access) => {
                if !self.is_in_scope(access.var.name) {
                    self.error(
                        format!("Undefined variable: \"{}\"", access.var.pretty(self.interner)),
                        access.var,
                    );
                }
            }
            Expression::Value(Value::Scalar(_)) => {}
            Expression::Value(Value::Collection(v)) => {
                for element in &v.elements {
                    self.expression(element);
                }
            }
            Expression::Value(Value::Function(v)) => {
                if !self.is_in_scope(v.function.name) {
                    self.error(
                        format!("Undefined function: \"{}\"", v.function.pretty(self.interner)),
                        v.function,
                    );
                }
                for argument in &v.arguments {
                    self.expression(argument);
                }
            }
            Expression::Value(Value::Constructed(v)) => {
                let ctor = v.constructor;
                let defined = self.is_in_scope(ctor.name);
                if !defined {
                    self.error(
                        format!("Undefined constructor: \"{}\"", ctor.pretty(self.interner)),
                        ctor,
                    );
                }
                self.push_scope();
                for init in &v.fields {
                    let known = self
                        .constructor_fields
                        .get(&ctor.name)
                        .is_some_and(|fields| fields.contains(&init.name.name));
                    if defined && !known {
                        self.error(
                            format!(
                                "No field with name {} in constructor {}.",
                                init.name.pretty(self.interner),
                                ctor.pretty(self.interner)
                            ),
                            init.name,
                        );
                    }
                    match init.value.as_bare_var() {
                        Some(alias) if self.alias_scope.is_some() => self.add_alias(alias),
                        _ => self.expression(&init.value),
                    }
                    self.add_name(init.name, "field", true);
                }
                self.pop_scope();
            }
        }
    }

    fn is_in_scope(&self, name: Symbol) -> bool {
        self.scopes.iter().any(|scope| scope.contains(&name))
    }

    fn add_name(&mut self, id: Identifier, kind: &str, allow_shadowing: bool) {
        if !allow_shadowing && self.is_in_scope(id.name) {
            self.redeclaration(id, kind);
        }
        tracing::trace!(name = %id.pretty(self.interner), kind, "added name");
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(id.name);
        }
    }

    fn add_alias(&mut self, id: Identifier) {
        tracing::trace!(name = %id.pretty(self.interner), "added alias");
        if let Some(scope) = self.alias_scope.and_then(|depth| self.scopes.get_mut(depth)) {
            scope.insert(id.name);
        }
    }

    fn redeclaration(&mut self, id: Identifier, kind: &str) {
        self.error(
            format!("Re-declaration of {kind}: \"{}\"", id.pretty(self.interner)),
            id,
        );
    }

    fn error(&mut self, message: String, at: Identifier) {
        tracing::debug!(%message, "name resolution error");
        self.errors.push(SemanticError::new(message, at.span));
    }

    fn push_scope(&mut self) {
        self.scopes.push(FxHashSet::default());
        tracing::trace!(depth = self.scopes.len(), "pushed name scope");
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
        tracing::trace!(depth = self.scopes.len(), "popped name scope");
    }
}

/// Field names of every constructor, messages included.
fn constructor_fields(ast: &Ast) -> FxHashMap<Symbol, FxHashSet<Symbol>> {
    let mut out: FxHashMap<Symbol, FxHashSet<Symbol>> = FxHashMap::default();
    for def in ast.types.values() {
        match def {
            TypeDefinition::Message(m) => {
                out.entry(m.identifier.name)
                    .or_default()
                    .extend(m.fields.iter().map(|f| f.name.name));
            }
            TypeDefinition::Enum(e) => {
                for constructor in e.constructors() {
                    out.entry(constructor.identifier.name)
                        .or_default()
                        .extend(constructor.fields.iter().map(|f| f.name.name));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbuf_ast::AstBuilder;

    #[test]
    fn test_builtins_resolve() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message(
            "M",
            vec![],
            vec![
                b.field("a", b.ty("Int", vec![])),
                b.field("s", b.ty("Set", vec![b.type_expr("String", vec![])])),
            ],
        ));
        let interner = b.finish();
        assert!(check_name_resolution(&ast, &interner).is_empty());
    }

    #[test]
    fn test_constructor_fields_are_scoped_per_constructor() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_enum(b.enumeration(
            "E",
            vec![],
            vec![b.rule(
                vec![],
                vec![
                    b.constructor("A", vec![b.field("x", b.ty("Int", vec![]))]),
                    b.constructor("B", vec![b.field("x", b.ty("Int", vec![]))]),
                ],
            )],
        ));
        let interner = b.finish();
        assert!(check_name_resolution(&ast, &interner).is_empty());
    }
}
