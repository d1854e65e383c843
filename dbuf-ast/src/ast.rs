use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::{ExprRef, Identifier, Span, Symbol, TypeExpression};

/// A name together with its declared type: a field, a type dependency or a
/// function parameter of value type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedVariable {
    pub name: Identifier,
    pub type_expression: TypeExpression,
}

/// One variant of an enum, or the implicit single constructor of a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Constructor {
    pub identifier: Identifier,
    pub fields: Vec<TypedVariable>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub identifier: Identifier,
    pub type_dependencies: Vec<TypedVariable>,
    pub fields: Vec<TypedVariable>,
}

impl Message {
    pub fn field(&self, name: Symbol) -> Option<&TypedVariable> {
        self.fields.iter().find(|field| field.name.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputPattern {
    /// `*`: matches any value.
    Star(Span),
    /// A value to match, or a bare name that binds the matched value.
    Pattern(ExprRef),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub inputs: Vec<InputPattern>,
    pub outputs: Vec<Constructor>,
}

impl Rule {
    pub fn constructor(&self, name: Symbol) -> Option<&Constructor> {
        self.outputs.iter().find(|c| c.identifier.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub identifier: Identifier,
    pub type_dependencies: Vec<TypedVariable>,
    pub pattern_mapping: Vec<Rule>,
}

impl Enum {
    /// Every output constructor of every rule, in declaration order.
    pub fn constructors(&self) -> impl Iterator<Item = &Constructor> {
        self.pattern_mapping.iter().flat_map(|rule| rule.outputs.iter())
    }

    pub fn constructor(&self, name: Symbol) -> Option<&Constructor> {
        self.constructors().find(|c| c.identifier.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeDefinition {
    Message(Message),
    Enum(Enum),
}

impl TypeDefinition {
    pub fn identifier(&self) -> Identifier {
        match self {
            TypeDefinition::Message(m) => m.identifier,
            TypeDefinition::Enum(e) => e.identifier,
        }
    }

    pub fn type_dependencies(&self) -> &[TypedVariable] {
        match self {
            TypeDefinition::Message(m) => &m.type_dependencies,
            TypeDefinition::Enum(e) => &e.type_dependencies,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypeDefinition::Message(_) => "message",
            TypeDefinition::Enum(_) => "enum",
        }
    }
}

/// Signature of a function-typed parameter or of a partially applied
/// function.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub parameters: Vec<Parameter>,
    pub return_type: TypeExpression,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamType {
    Value(TypeExpression),
    Function(FunctionType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: Identifier,
    pub ty: ParamType,
}

/// A top-level function declaration.
///
/// Functions without a body are opaque: the checker only knows their
/// signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Func {
    pub identifier: Identifier,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeExpression,
    pub body: Option<ExprRef>,
}

impl Func {
    pub fn signature(&self) -> FunctionType {
        FunctionType {
            parameters: self.parameters.clone(),
            return_type: self.return_type.clone(),
        }
    }
}

/// The parsed schema.
///
/// `types` and `functions` are keyed by name. A second definition under an
/// already used name is not stored; its identifier is kept in `redeclared`
/// so name resolution can report it.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    pub types: BTreeMap<Symbol, TypeDefinition>,
    pub constructor_to_type: FxHashMap<Symbol, Symbol>,
    pub functions: BTreeMap<Symbol, Func>,
    /// Filled by the positivity check: dependencies come first.
    pub visit_order: Vec<Symbol>,
    pub redeclared: Vec<(Identifier, &'static str)>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: Message) {
        let name = message.identifier.name;
        if self.types.contains_key(&name) {
            self.redeclared.push((message.identifier, "message"));
            return;
        }
        self.constructor_to_type.entry(name).or_insert(name);
        self.types.insert(name, TypeDefinition::Message(message));
    }

    pub fn add_enum(&mut self, ast_enum: Enum) {
        let name = ast_enum.identifier.name;
        if self.types.contains_key(&name) {
            self.redeclared.push((ast_enum.identifier, "enum"));
            return;
        }
        for constructor in ast_enum.constructors() {
            self.constructor_to_type
                .entry(constructor.identifier.name)
                .or_insert(name);
        }
        self.types.insert(name, TypeDefinition::Enum(ast_enum));
    }

    pub fn add_function(&mut self, func: Func) {
        let name = func.identifier.name;
        if self.functions.contains_key(&name) {
            self.redeclared.push((func.identifier, "function"));
            return;
        }
        self.functions.insert(name, func);
    }

    pub fn type_dependencies(&self, name: Symbol) -> Option<&[TypedVariable]> {
        self.types.get(&name).map(TypeDefinition::type_dependencies)
    }

    /// Owning type and field list of a constructor. A message is its own
    /// constructor.
    pub fn constructor(&self, name: Symbol) -> Option<(&TypeDefinition, &[TypedVariable])> {
        let owner = self.constructor_to_type.get(&name)?;
        let def = self.types.get(owner)?;
        match def {
            TypeDefinition::Message(m) if m.identifier.name == name => Some((def, &m.fields)),
            TypeDefinition::Message(_) => None,
            TypeDefinition::Enum(e) => e.constructor(name).map(|c| (def, c.fields.as_slice())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AstBuilder;

    #[test]
    fn test_constructor_lookup_covers_messages_and_enums() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message("Point", vec![], vec![b.field("x", b.ty("Int", vec![]))]));
        ast.add_enum(b.enumeration(
            "Shape",
            vec![],
            vec![b.rule(
                vec![],
                vec![
                    b.constructor("Circle", vec![b.field("r", b.ty("Float", vec![]))]),
                    b.constructor("Empty", vec![]),
                ],
            )],
        ));
        let interner = b.finish();

        let circle = interner.get("Circle").unwrap();
        let (owner, fields) = ast.constructor(circle).unwrap();
        assert_eq!(interner.resolve(owner.identifier().name), "Shape");
        assert_eq!(fields.len(), 1);

        let point = interner.get("Point").unwrap();
        let (owner, fields) = ast.constructor(point).unwrap();
        assert_eq!(owner.kind(), "message");
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_duplicate_type_is_recorded_not_stored() {
        let b = AstBuilder::new();
        let mut ast = Ast::new();
        ast.add_message(b.message("A", vec![], vec![]));
        ast.add_enum(b.enumeration("A", vec![], vec![]));
        assert_eq!(ast.types.len(), 1);
        assert_eq!(ast.redeclared.len(), 1);
        assert_eq!(ast.redeclared[0].1, "enum");
    }
}
