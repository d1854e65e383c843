//! Enum rule selection.
//!
//! The actual type parameters of an enum value are matched against the
//! input patterns of each rule in declaration order. The first rule whose
//! inputs all match decides which constructors may be used.

use std::rc::Rc;

use dbuf_ast::{
    Enum, ExprRef, Expression, Identifier, InputPattern, PrettyPrint, Rule, TypeDefinition, Value,
};
use dbuf_verify::EqualityOracle;

use crate::error::SemanticError;
use crate::substitutor::Substitutor;
use crate::type_checker::{CheckResult, TypeChecker};

impl<O: EqualityOracle> TypeChecker<'_, O> {
    /// Finds the rule for `params` and checks that it offers `constructor`.
    /// Names bound by the rule's patterns are added to `local`.
    pub(crate) fn select_rule(
        &mut self,
        ast_enum: &Enum,
        constructor: Identifier,
        params: &[ExprRef],
        local: &mut Substitutor,
    ) -> CheckResult {
        for (index, rule) in ast_enum.pattern_mapping.iter().enumerate() {
            let mut attempt = local.clone();
            if !self.rule_matches(rule, params, &mut attempt)? {
                tracing::trace!(
                    enum_name = %ast_enum.identifier.pretty(self.interner),
                    rule = index,
                    "rule does not match"
                );
                continue;
            }
            tracing::debug!(
                enum_name = %ast_enum.identifier.pretty(self.interner),
                rule = index,
                constructor = %constructor.pretty(self.interner),
                "rule matched"
            );
            if rule.constructor(constructor.name).is_some() {
                *local = attempt;
                return Ok(());
            }
            break;
        }
        Err(SemanticError::new(
            format!(
                "Constructor \"{}\" cannot be used in this context",
                constructor.pretty(self.interner)
            ),
            constructor.span,
        ))
    }

    fn rule_matches(
        &mut self,
        rule: &Rule,
        params: &[ExprRef],
        bindings: &mut Substitutor,
    ) -> CheckResult<bool> {
        if rule.inputs.len() != params.len() {
            return Ok(false);
        }
        for (input, actual) in rule.inputs.iter().zip(params) {
            let InputPattern::Pattern(pattern) = input else {
                continue;
            };
            if !self.match_pattern(actual, pattern, bindings)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Matches one actual value against one pattern. Bare variables in the
    /// pattern match anything and are bound in `bindings`.
    pub(crate) fn match_pattern(
        &mut self,
        actual: &ExprRef,
        pattern: &ExprRef,
        bindings: &mut Substitutor,
    ) -> CheckResult<bool> {
        if let Some(alias) = pattern.as_bare_var() {
            bindings.add_closed_substitution(alias.name, actual);
            return Ok(true);
        }

        match (&**actual, &**pattern) {
            (
                Expression::Value(Value::Constructed(value)),
                Expression::Value(Value::Constructed(expected)),
            ) => {
                if value.constructor.name != expected.constructor.name {
                    return Ok(false);
                }
                for init in &expected.fields {
                    let Some(field_value) = value.field(init.name.name) else {
                        return Ok(false);
                    };
                    if !self.match_pattern(field_value, &init.value, bindings)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Expression::VarAccess(access), Expression::Value(Value::Constructed(expected))) => {
                let Some((TypeDefinition::Message(_), _)) =
                    self.ast.constructor(expected.constructor.name)
                else {
                    return Ok(false);
                };
                for init in &expected.fields {
                    let mut field_access = access.clone();
                    field_access.fields.push(init.name);
                    let field_value: ExprRef = Rc::new(field_access.into());
                    if !self.match_pattern(&field_value, &init.value, bindings)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Expression::Value(Value::Constructed(_)), _)
            | (_, Expression::Value(Value::Constructed(_))) => Ok(false),
            _ => {
                let equal = self.oracle_equal(pattern, actual)?;
                tracing::trace!(
                    pattern = %pattern.pretty(self.interner),
                    actual = %actual.pretty(self.interner),
                    equal,
                    "pattern compared by oracle"
                );
                Ok(equal)
            }
        }
    }
}
