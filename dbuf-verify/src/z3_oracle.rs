//! Z3-backed equality oracle.
//!
//! Messages and enums become Z3 algebraic datatypes, `Int` and `Unsigned`
//! become mathematical integers (with `>= 0` side conditions for
//! `Unsigned` terms), `Float` is IEEE double, `Array` is an int-indexed Z3
//! array and `Set` a Z3 set.

use dbuf_ast::{
    BinaryOp, Expression, Interner, PrettyPrint, Scalar, Span, Symbol, UnaryOp, Value, VarAccess,
};
use rustc_hash::FxHashMap;
use z3::ast::{Array, Ast, Bool, Dynamic, Float, Int, Set};
use z3::{
    Config, Context, DatatypeAccessor, DatatypeBuilder, DatatypeSort, FuncDecl, Params,
    SatResult, Solver, Sort,
};

use crate::solver::{
    EqualityOracle, FieldSort, FunctionDecl, OracleError, SmtProfile, SortDecl, TranslationEnv,
};
use crate::structural::normalize;

struct Accessor {
    decl: FuncDecl<'static>,
    sort: FieldSort,
}

struct CtorEntry {
    owner: Symbol,
    constructor: FuncDecl<'static>,
    fields: Vec<(Symbol, Accessor)>,
}

pub struct Z3Oracle {
    ctx: &'static Context,
    solver: Solver<'static>,
    profile: SmtProfile,
    sorts: FxHashMap<Symbol, Sort<'static>>,
    constructors: FxHashMap<Symbol, CtorEntry>,
    functions: FxHashMap<Symbol, (FuncDecl<'static>, FieldSort)>,
}

impl Z3Oracle {
    pub fn new(profile: SmtProfile) -> Self {
        let cfg = Config::new();
        // Leaked so solver terms can be `'static` without self-referential structs.
        let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
        let solver = Solver::new(ctx);

        let mut params = Params::new(ctx);
        params.set_u32("timeout", profile.timeout_ms());
        params.set_u32("smt.random_seed", 0);
        params.set_u32("sat.random_seed", 0);
        solver.set_params(&params);

        Self {
            ctx,
            solver,
            profile,
            sorts: FxHashMap::default(),
            constructors: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }

    fn sort_of(&self, sort: &FieldSort) -> Result<Sort<'static>, OracleError> {
        let ctx = self.ctx;
        Ok(match sort {
            FieldSort::Int | FieldSort::Unsigned => Sort::int(ctx),
            FieldSort::Bool => Sort::bool(ctx),
            FieldSort::String => Sort::string(ctx),
            FieldSort::Float => Sort::float(ctx, 11, 53),
            FieldSort::Named(name) => self.sorts.get(name).cloned().ok_or_else(|| {
                OracleError::new("sort used before it was declared", None)
            })?,
            FieldSort::Array(element) => Sort::array(ctx, &Sort::int(ctx), &self.sort_of(element)?),
            FieldSort::Set(element) => Sort::set(ctx, &self.sort_of(element)?),
        })
    }

    fn accessor(&self, owner: Symbol, field: Symbol) -> Option<&Accessor> {
        if let Some(entry) = self.constructors.get(&owner) {
            if let Some((_, accessor)) = entry.fields.iter().find(|(name, _)| *name == field) {
                return Some(accessor);
            }
        }
        self.constructors
            .values()
            .filter(|entry| entry.owner == owner)
            .find_map(|entry| {
                entry
                    .fields
                    .iter()
                    .find(|(name, _)| *name == field)
                    .map(|(_, accessor)| accessor)
            })
    }
}

impl EqualityOracle for Z3Oracle {
    type Term = Dynamic<'static>;

    fn declare_type(&mut self, decl: &SortDecl, interner: &Interner) -> Result<(), OracleError> {
        let ctx = self.ctx;
        let name = interner.resolve(decl.name);

        if decl.constructors.is_empty() {
            self.sorts
                .insert(decl.name, Sort::uninterpreted(ctx, z3::Symbol::String(name.to_string())));
            tracing::debug!(sort = name, "declared empty sort");
            return Ok(());
        }

        let mut builder = DatatypeBuilder::new(ctx, name);
        for ctor in &decl.constructors {
            let mut fields = Vec::with_capacity(ctor.fields.len());
            for (field, sort) in &ctor.fields {
                let accessor = if *sort == FieldSort::Named(decl.name) {
                    DatatypeAccessor::Datatype(name.into())
                } else if sort.mentions(decl.name) {
                    // Self-reference under a collection: opaque to the solver.
                    let opaque = format!("{name}$ref");
                    DatatypeAccessor::Sort(Sort::uninterpreted(ctx, z3::Symbol::String(opaque)))
                } else {
                    DatatypeAccessor::Sort(self.sort_of(sort)?)
                };
                fields.push((interner.resolve(*field), accessor));
            }
            builder = builder.variant(interner.resolve(ctor.name), fields);
        }

        let DatatypeSort { sort, variants, .. } = builder.finish();
        tracing::debug!(sort = name, constructors = variants.len(), "declared datatype");
        self.sorts.insert(decl.name, sort);

        for (variant, ctor) in variants.into_iter().zip(&decl.constructors) {
            let fields = variant
                .accessors
                .into_iter()
                .zip(&ctor.fields)
                .map(|(decl, (field, sort))| {
                    (
                        *field,
                        Accessor {
                            decl,
                            sort: sort.clone(),
                        },
                    )
                })
                .collect();
            self.constructors.insert(
                ctor.name,
                CtorEntry {
                    owner: decl.name,
                    constructor: variant.constructor,
                    fields,
                },
            );
        }
        Ok(())
    }

    fn declare_function(
        &mut self,
        decl: &FunctionDecl,
        interner: &Interner,
    ) -> Result<(), OracleError> {
        let domain = decl
            .parameters
            .iter()
            .map(|sort| self.sort_of(sort))
            .collect::<Result<Vec<_>, _>>()?;
        let domain_refs: Vec<&Sort<'static>> = domain.iter().collect();
        let range = self.sort_of(&decl.result)?;
        let name = interner.resolve(decl.name);
        let func = FuncDecl::new(self.ctx, name, &domain_refs, &range);
        tracing::debug!(function = name, arity = domain.len(), "declared function");
        self.functions.insert(decl.name, (func, decl.result.clone()));
        Ok(())
    }

    fn translate(
        &mut self,
        expr: &Expression,
        env: &dyn TranslationEnv,
    ) -> Result<Dynamic<'static>, OracleError> {
        let mut session = Session::new(self, env);
        session.translate(expr, None).map(|typed| typed.term)
    }

    fn check_equal(
        &mut self,
        expected: &Expression,
        got: &Expression,
        env: &dyn TranslationEnv,
    ) -> Result<bool, OracleError> {
        // Constant sub-expressions fold with IEEE round-to-nearest, as in the
        // structural oracle; only symbolic float arithmetic reaches Z3.
        let expected_folded = normalize(expected);
        let got_folded = normalize(got);
        let (expected, got) = (&*expected_folded, &*got_folded);

        let oracle: &Z3Oracle = self;
        let mut session = Session::new(oracle, env);

        // A collection literal takes its sort from the other side.
        let (expected_term, got_term) = if is_collection(expected) {
            let rhs = session.translate(got, None)?;
            let lhs = session.translate(expected, rhs.sort.as_ref())?;
            (lhs.term, rhs.term)
        } else {
            let lhs = session.translate(expected, None)?;
            let rhs = session.translate(got, lhs.sort.as_ref())?;
            (lhs.term, rhs.term)
        };

        let interner = env.interner();
        if expected_term.get_sort() != got_term.get_sort() {
            tracing::debug!(
                expected = %expected.pretty(interner),
                got = %got.pretty(interner),
                "sort mismatch, not equal"
            );
            return Ok(false);
        }

        oracle.solver.push();
        for constraint in &session.constraints {
            oracle.solver.assert(constraint);
        }
        oracle.solver.assert(&expected_term._eq(&got_term).not());
        let result = oracle.solver.check();
        oracle.solver.pop(1);

        let equal = match result {
            SatResult::Unsat => true,
            SatResult::Sat => false,
            SatResult::Unknown => {
                tracing::warn!(
                    expected = %expected.pretty(interner),
                    got = %got.pretty(interner),
                    timeout_ms = oracle.profile.timeout_ms(),
                    "solver returned unknown, treating as not equal"
                );
                false
            }
        };
        tracing::debug!(
            expected = %expected.pretty(interner),
            got = %got.pretty(interner),
            equal,
            "compared expressions"
        );
        Ok(equal)
    }
}

fn is_collection(expr: &Expression) -> bool {
    matches!(expr, Expression::Value(Value::Collection(_)))
}

struct Typed {
    term: Dynamic<'static>,
    sort: Option<FieldSort>,
}

/// One translation: free variables become constants, memoized by name.
struct Session<'o> {
    oracle: &'o Z3Oracle,
    env: &'o dyn TranslationEnv,
    vars: FxHashMap<Symbol, (Dynamic<'static>, FieldSort)>,
    constraints: Vec<Bool<'static>>,
}

impl<'o> Session<'o> {
    fn new(oracle: &'o Z3Oracle, env: &'o dyn TranslationEnv) -> Self {
        Self {
            oracle,
            env,
            vars: FxHashMap::default(),
            constraints: Vec::new(),
        }
    }

    fn ctx(&self) -> &'static Context {
        self.oracle.ctx
    }

    fn name(&self, sym: Symbol) -> &str {
        self.env.interner().resolve(sym)
    }

    fn constrain_unsigned(&mut self, term: &Dynamic<'static>, sort: &FieldSort) {
        if *sort == FieldSort::Unsigned {
            if let Some(int) = term.as_int() {
                self.constraints.push(int.ge(&Int::from_u64(self.ctx(), 0)));
            }
        }
    }

    fn translate(&mut self, expr: &Expression, hint: Option<&FieldSort>) -> Result<Typed, OracleError> {
        let ctx = self.ctx();
        match expr {
            Expression::Value(Value::Scalar(v)) => {
                let (term, sort) = match &v.scalar {
                    Scalar::Bool(b) => (Dynamic::from_ast(&Bool::from_bool(ctx, *b)), FieldSort::Bool),
                    Scalar::Int(i) => (Dynamic::from_ast(&Int::from_i64(ctx, *i)), FieldSort::Int),
                    Scalar::Unsigned(u) => {
                        (Dynamic::from_ast(&Int::from_u64(ctx, *u)), FieldSort::Unsigned)
                    }
                    Scalar::Float(f) => (Dynamic::from_ast(&Float::from_f64(ctx, *f)), FieldSort::Float),
                    Scalar::String(s) => {
                        let term = z3::ast::String::from_str(ctx, s).map_err(|_| {
                            OracleError::new("string literal contains a NUL byte", Some(v.span))
                        })?;
                        (Dynamic::from_ast(&term), FieldSort::String)
                    }
                };
                Ok(Typed {
                    term,
                    sort: Some(sort),
                })
            }
            Expression::VarAccess(access) => self.var_access(access),
            Expression::Binary(e) => {
                let left = self.translate(&e.left, hint)?;
                let right = self.translate(&e.right, left.sort.as_ref())?;
                let term = self.binary(e.op, &left.term, &right.term, e.span)?;
                let sort = match e.op {
                    BinaryOp::In => Some(FieldSort::Bool),
                    BinaryOp::Sub => left.sort.filter(|s| *s != FieldSort::Unsigned).or(Some(FieldSort::Int)),
                    _ => left.sort,
                };
                Ok(Typed { term, sort })
            }
            Expression::Unary(e) => {
                let operand = self.translate(&e.operand, hint)?;
                let term = match e.op {
                    UnaryOp::Neg => {
                        if let Some(int) = operand.term.as_int() {
                            Dynamic::from_ast(&int.unary_minus())
                        } else if let Some(float) = operand.term.as_float() {
                            Dynamic::from_ast(&float.unary_neg())
                        } else {
                            return Err(OracleError::new("`-` needs a numeric operand", Some(e.span)));
                        }
                    }
                    UnaryOp::Not => match operand.term.as_bool() {
                        Some(b) => Dynamic::from_ast(&b.not()),
                        None => return Err(OracleError::new("`!` needs a boolean operand", Some(e.span))),
                    },
                };
                let sort = match e.op {
                    UnaryOp::Neg if operand.sort == Some(FieldSort::Unsigned) => Some(FieldSort::Int),
                    _ => operand.sort,
                };
                Ok(Typed { term, sort })
            }
            Expression::Value(Value::Constructed(v)) => {
                let entry = self.oracle.constructors.get(&v.constructor.name).ok_or_else(|| {
                    OracleError::new(
                        format!("constructor `{}` has no solver declaration", self.name(v.constructor.name)),
                        Some(v.span),
                    )
                })?;
                let mut args = Vec::with_capacity(entry.fields.len());
                for (field, accessor) in &entry.fields {
                    let value = v.field(*field).ok_or_else(|| {
                        OracleError::new(
                            format!("missing field `{}`", self.name(*field)),
                            Some(v.span),
                        )
                    })?;
                    let typed = self.translate(value, Some(&accessor.sort))?;
                    args.push(typed.term);
                }
                let arg_refs: Vec<&dyn Ast<'static>> =
                    args.iter().map(|a| a as &dyn Ast<'static>).collect();
                Ok(Typed {
                    term: entry.constructor.apply(&arg_refs),
                    sort: Some(FieldSort::Named(entry.owner)),
                })
            }
            Expression::Value(Value::Collection(v)) => {
                let mut elements = Vec::with_capacity(v.elements.len());
                let element_hint = match hint {
                    Some(FieldSort::Array(e)) | Some(FieldSort::Set(e)) => Some(e.as_ref().clone()),
                    _ => None,
                };
                let mut element_sort = element_hint.clone();
                for element in &v.elements {
                    let typed = self.translate(element, element_sort.as_ref())?;
                    element_sort = element_sort.or(typed.sort);
                    elements.push(typed.term);
                }
                let element_sort = element_sort.ok_or_else(|| {
                    OracleError::new("cannot infer the element sort of an empty collection", Some(v.span))
                })?;
                let z3_element = self.oracle.sort_of(&element_sort)?;
                if let Some(FieldSort::Set(_)) = hint {
                    let mut set = Set::empty(ctx, &z3_element);
                    for element in &elements {
                        set = set.add(element);
                    }
                    return Ok(Typed {
                        term: Dynamic::from_ast(&set),
                        sort: Some(FieldSort::Set(Box::new(element_sort))),
                    });
                }
                let hole = FuncDecl::new(ctx, "dbuf$hole", &[], &z3_element).apply(&[]);
                let mut array = Array::const_array(ctx, &Sort::int(ctx), &hole);
                for (index, element) in elements.iter().enumerate() {
                    array = array.store(&Int::from_u64(ctx, index as u64), element);
                }
                Ok(Typed {
                    term: Dynamic::from_ast(&array),
                    sort: Some(FieldSort::Array(Box::new(element_sort))),
                })
            }
            Expression::Value(Value::Function(v)) => {
                let (decl, result) = self.oracle.functions.get(&v.function.name).ok_or_else(|| {
                    OracleError::new(
                        format!("function `{}` has no solver declaration", self.name(v.function.name)),
                        Some(v.span),
                    )
                })?;
                if decl.arity() != v.arguments.len() {
                    return Err(OracleError::new(
                        "partial application cannot be compared by the solver",
                        Some(v.span),
                    ));
                }
                let mut args = Vec::with_capacity(v.arguments.len());
                for argument in &v.arguments {
                    args.push(self.translate(argument, None)?.term);
                }
                let arg_refs: Vec<&dyn Ast<'static>> =
                    args.iter().map(|a| a as &dyn Ast<'static>).collect();
                let term = decl.apply(&arg_refs);
                let result = result.clone();
                self.constrain_unsigned(&term, &result);
                Ok(Typed {
                    term,
                    sort: Some(result),
                })
            }
            Expression::Type(ty) => Err(OracleError::new(
                "a type cannot be compared as a value",
                Some(ty.span),
            )),
        }
    }

    fn var_access(&mut self, access: &VarAccess) -> Result<Typed, OracleError> {
        let (mut term, mut sort) = self.variable(access)?;
        for field in &access.fields {
            let FieldSort::Named(owner) = sort else {
                return Err(OracleError::new(
                    format!("`{}` is not a datatype field access", access.pretty(self.env.interner())),
                    Some(access.span),
                ));
            };
            let accessor = self.oracle.accessor(owner, field.name).ok_or_else(|| {
                OracleError::new(
                    format!("no accessor for field `{}`", self.name(field.name)),
                    Some(field.span),
                )
            })?;
            term = accessor.decl.apply(&[&term]);
            sort = accessor.sort.clone();
            self.constrain_unsigned(&term, &sort);
        }
        Ok(Typed {
            term,
            sort: Some(sort),
        })
    }

    fn variable(&mut self, access: &VarAccess) -> Result<(Dynamic<'static>, FieldSort), OracleError> {
        let var = access.var.name;
        if let Some(known) = self.vars.get(&var) {
            return Ok(known.clone());
        }
        let sort = self.env.var_sort(var).ok_or_else(|| {
            OracleError::new(
                format!("variable `{}` has no value sort", self.name(var)),
                Some(access.var.span),
            )
        })?;
        let z3_sort = self.oracle.sort_of(&sort)?;
        let term = FuncDecl::new(self.ctx(), self.name(var), &[], &z3_sort).apply(&[]);
        self.constrain_unsigned(&term, &sort);
        self.vars.insert(var, (term.clone(), sort.clone()));
        Ok((term, sort))
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Dynamic<'static>,
        right: &Dynamic<'static>,
        span: Span,
    ) -> Result<Dynamic<'static>, OracleError> {
        let ctx = self.ctx();
        let unsupported =
            || OracleError::new(format!("operator `{}` has no solver encoding here", op.as_str()), Some(span));

        if op == BinaryOp::In {
            let set = right.as_set().ok_or_else(unsupported)?;
            return Ok(Dynamic::from_ast(&set.member(left)));
        }
        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            let term = match op {
                BinaryOp::Add => Int::add(ctx, &[&a, &b]),
                BinaryOp::Sub => Int::sub(ctx, &[&a, &b]),
                BinaryOp::Mul => Int::mul(ctx, &[&a, &b]),
                BinaryOp::Div => a.div(&b),
                _ => return Err(unsupported()),
            };
            return Ok(Dynamic::from_ast(&term));
        }
        if let (Some(a), Some(b)) = (left.as_float(), right.as_float()) {
            let term = match op {
                BinaryOp::Add => a.add_towards_zero(&b),
                BinaryOp::Sub => a.sub_towards_zero(&b),
                BinaryOp::Mul => a.mul_towards_zero(&b),
                BinaryOp::Div => a.div_towards_zero(&b),
                _ => return Err(unsupported()),
            };
            return Ok(Dynamic::from_ast(&term));
        }
        if let (Some(a), Some(b)) = (left.as_string(), right.as_string()) {
            return match op {
                BinaryOp::Add => Ok(Dynamic::from_ast(&z3::ast::String::concat(ctx, &[&a, &b]))),
                _ => Err(unsupported()),
            };
        }
        if let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) {
            let term = match op {
                BinaryOp::And => Bool::and(ctx, &[&a, &b]),
                BinaryOp::Or => Bool::or(ctx, &[&a, &b]),
                _ => return Err(unsupported()),
            };
            return Ok(Dynamic::from_ast(&term));
        }
        if let (Some(a), Some(b)) = (left.as_set(), right.as_set()) {
            let term = match op {
                BinaryOp::Union => Set::set_union(ctx, &[&a, &b]),
                BinaryOp::Intersect => Set::intersect(ctx, &[&a, &b]),
                BinaryOp::Difference => a.difference(&b),
                _ => return Err(unsupported()),
            };
            return Ok(Dynamic::from_ast(&term));
        }
        Err(unsupported())
    }
}
