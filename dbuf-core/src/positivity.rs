//! Well-foundedness of type definitions and their dependency order.
//!
//! An edge `T -> U` means the definition of `T` mentions `U`. Mentions in
//! type dependencies and enum rule inputs always count, including `T`
//! itself; mentions in fields skip `T`, so recursion behind a field is
//! accepted.

use dbuf_ast::{
    Ast, Expression, InputPattern, Interner, PrettyPrint, Symbol, TypeDefinition,
    TypeExpression, TypedVariable, Value,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ErrorList, SemanticError};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositivityResult {
    /// Every declared type, dependencies first. Empty when a cycle was found.
    pub sorted: Vec<Symbol>,
    pub errors: ErrorList,
}

/// Orders the declared types so that each comes after everything it
/// mentions. Stops at the first cycle.
pub fn sort_types(ast: &Ast, interner: &Interner) -> PositivityResult {
    let graph = DependencyGraph::build(ast, interner);
    let mut sorter = Sorter {
        graph: &graph,
        state: FxHashMap::default(),
        stack: Vec::new(),
        sorted: Vec::with_capacity(graph.nodes.len()),
    };

    for &node in &graph.nodes {
        if sorter.state(node) != VisitState::Unvisited {
            continue;
        }
        if let Err(cycle) = sorter.visit(node) {
            let path = cycle
                .iter()
                .map(|name| name.pretty(interner).to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            tracing::debug!(%path, "dependency cycle");
            return PositivityResult {
                sorted: Vec::new(),
                errors: vec![SemanticError::unlocated(format!(
                    "Found dependency cycle: {path}"
                ))],
            };
        }
    }

    PositivityResult {
        sorted: sorter.sorted,
        errors: ErrorList::new(),
    }
}

/// Runs [`sort_types`] and stores the order in `ast.visit_order`.
pub fn check_positivity(ast: &mut Ast, interner: &Interner) -> ErrorList {
    let PositivityResult { sorted, errors } = sort_types(ast, interner);
    if errors.is_empty() {
        ast.visit_order = sorted;
    }
    errors
}

struct DependencyGraph {
    /// Declared types, by name.
    nodes: Vec<Symbol>,
    /// Targets of each node, by name. May contain builtins and undeclared
    /// names; those are never visited.
    edges: FxHashMap<Symbol, Vec<Symbol>>,
}

impl DependencyGraph {
    fn build(ast: &Ast, interner: &Interner) -> Self {
        let by_name = |a: &Symbol, b: &Symbol| interner.resolve(*a).cmp(interner.resolve(*b));

        let mut nodes: Vec<Symbol> = ast.types.keys().copied().collect();
        nodes.sort_by(by_name);

        let mut edges = FxHashMap::default();
        for (&name, def) in &ast.types {
            let mut collector = EdgeCollector {
                ast,
                interner,
                owner: name,
                add_self: true,
                targets: FxHashSet::default(),
            };
            match def {
                TypeDefinition::Message(m) => {
                    collector.variables(&m.type_dependencies, true);
                    collector.variables(&m.fields, false);
                }
                TypeDefinition::Enum(e) => {
                    collector.variables(&e.type_dependencies, true);
                    for rule in &e.pattern_mapping {
                        collector.add_self = true;
                        for input in &rule.inputs {
                            if let InputPattern::Pattern(expr) = input {
                                collector.expression(expr);
                            }
                        }
                        for constructor in &rule.outputs {
                            collector.variables(&constructor.fields, false);
                        }
                    }
                }
            }
            let mut targets: Vec<Symbol> = collector.targets.into_iter().collect();
            targets.sort_by(by_name);
            edges.insert(name, targets);
        }

        Self { nodes, edges }
    }
}

struct EdgeCollector<'a> {
    ast: &'a Ast,
    interner: &'a Interner,
    owner: Symbol,
    add_self: bool,
    targets: FxHashSet<Symbol>,
}

impl EdgeCollector<'_> {
    fn variables(&mut self, vars: &[TypedVariable], add_self: bool) {
        self.add_self = add_self;
        for var in vars {
            self.type_expression(&var.type_expression);
        }
    }

    fn type_expression(&mut self, ty: &TypeExpression) {
        self.mention(ty.name());
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
            Expression::VarAccess(_) => {}
            Expression::Value(Value::Scalar(_)) => {}
            Expression::Value(Value::Constructed(v)) => {
                if let Some(&owner) = self.ast.constructor_to_type.get(&v.constructor.name) {
                    self.mention(owner);
                }
                for init in &v.fields {
                    self.expression(&init.value);
                }
            }
            Expression::Value(Value::Collection(v)) => {
                for element in &v.elements {
                    self.expression(element);
                }
            }
            Expression::Value(Value::Function(v)) => {
                for argument in &v.arguments {
                    self.expression(argument);
                }
            }
        }
    }

    fn mention(&mut self, target: Symbol) {
        if target == self.owner && !self.add_self {
            return;
        }
        if self.targets.insert(target) {
            tracing::trace!(
                from = %self.owner.pretty(self.interner),
                to = %target.pretty(self.interner),
                "dependency edge"
            );
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

struct Sorter<'g> {
    graph: &'g DependencyGraph,
    state: FxHashMap<Symbol, VisitState>,
    stack: Vec<Symbol>,
    sorted: Vec<Symbol>,
}

impl Sorter<'_> {
    fn state(&self, node: Symbol) -> VisitState {
        self.state.get(&node).copied().unwrap_or(VisitState::Unvisited)
    }

    /// Depth-first post-order. On a back edge returns the cycle, starting
    /// and ending at the repeated node.
    fn visit(&mut self, node: Symbol) -> Result<(), Vec<Symbol>> {
        self.state.insert(node, VisitState::Visiting);
        self.stack.push(node);

        let graph = self.graph;
        for &dep in graph.edges.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if !graph.edges.contains_key(&dep) {
                continue;
            }
            match self.state(dep) {
                VisitState::Visited => {}
                VisitState::Visiting => {
                    let start = self.stack.iter().position(|&n| n == dep).unwrap_or(0);
                    let mut cycle = self.stack[start..].to_vec();
                    cycle.push(dep);
                    return Err(cycle);
                }
                VisitState::Unvisited => self.visit(dep)?,
            }
        }

        self.stack.pop();
        self.state.insert(node, VisitState::Visited);
        self.sorted.push(node);
        Ok(())
    }
}
