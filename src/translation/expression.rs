//! Sub-expression lowering
//!
//! Recursively lowers predicate, projection and sort-key expressions into
//! document values. Lowering is pure; unsupported shapes fail immediately
//! and name the offending construct.
//!
//! Predicate context (inside `$match`):
//! - `e.F == v`           → `{ F: { $eq: v } }` (operator form always)
//! - `a && b`, `a || b`   → `{ $and: [..] }`, `{ $or: [..] }`
//! - `e.Flag`, `!e.Flag`  → `{ Flag: { $eq: true } }`, `{ Flag: { $ne: true } }`
//! - `!p`                 → `{ $nor: [p] }`
//! - `[..].contains(e.F)` → `{ F: { $in: [..] } }`
//!
//! Projection context (inside `$project`):
//! - `e.F`                → `"$F"`
//! - constant             → `{ $literal: v }`
//! - `new { A = e.F }`    → `{ A: "$F" }`

use serde_json::{Map, Value};

use crate::config::ConnectiveFlattening;
use crate::expression::{CompareOp, Expr, Literal, LogicalOp};

use super::errors::{TranslationError, TranslationResult};
use super::field_path::{FieldPathResolver, FieldScope};

/// A lowered predicate document
pub type PredicateDocument = Map<String, Value>;

/// Methods callable inside a query expression
const REGISTERED_METHODS: &[&str] = &["contains"];

/// Lowers sub-expressions against one field scope
pub struct ExpressionTranslator<'a> {
    resolver: FieldPathResolver<'a>,
    scope: &'a FieldScope,
    flattening: ConnectiveFlattening,
}

impl<'a> ExpressionTranslator<'a> {
    pub fn new(
        resolver: FieldPathResolver<'a>,
        scope: &'a FieldScope,
        flattening: ConnectiveFlattening,
    ) -> Self {
        Self {
            resolver,
            scope,
            flattening,
        }
    }

    /// Resolves a member access to its dotted wire path
    pub fn field_path(&self, expr: &Expr) -> TranslationResult<String> {
        let chain = expr.member_chain().ok_or_else(|| {
            TranslationError::unsupported(format!("{} where a field was expected", expr.describe()))
        })?;
        self.resolver.resolve(self.scope, &chain)
    }

    // =========================================================================
    // Predicate context
    // =========================================================================

    /// Lowers a boolean expression into a `$match` document
    pub fn predicate(&self, expr: &Expr) -> TranslationResult<PredicateDocument> {
        match expr {
            Expr::Compare { op, left, right } => self.comparison(*op, left, right),
            Expr::Logical { op, left, right } => self.connective(*op, left, right),
            Expr::Not(inner) => self.negation(inner),
            Expr::Member { .. } => {
                let path = self.field_path(expr)?;
                Ok(field_condition(path, CompareOp::Eq, Value::Bool(true)))
            }
            Expr::Call {
                method,
                target,
                args,
            } => self.call_predicate(method, target, args),
            other => Err(TranslationError::unsupported(format!(
                "{} as predicate",
                other.describe()
            ))),
        }
    }

    fn comparison(
        &self,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
    ) -> TranslationResult<PredicateDocument> {
        match (left, right) {
            (Expr::Constant(_), Expr::Constant(_)) => Err(TranslationError::unsupported(
                "comparison between two constants",
            )),
            (field, Expr::Constant(value)) => {
                let path = self.field_path(field)?;
                Ok(field_condition(path, op, constant(value)?))
            }
            (Expr::Constant(value), field) => {
                let path = self.field_path(field)?;
                Ok(field_condition(path, op.mirrored(), constant(value)?))
            }
            (l, r) => Err(TranslationError::unsupported(format!(
                "comparison between {} and {}",
                l.describe(),
                r.describe()
            ))),
        }
    }

    fn connective(
        &self,
        op: LogicalOp,
        left: &Expr,
        right: &Expr,
    ) -> TranslationResult<PredicateDocument> {
        let operands: Vec<&Expr> = match self.flattening {
            ConnectiveFlattening::Nested => vec![left, right],
            ConnectiveFlattening::Flatten | ConnectiveFlattening::Merge => {
                let mut out = Vec::new();
                collect_operands(op, left, &mut out);
                collect_operands(op, right, &mut out);
                out
            }
        };

        let lowered = operands
            .into_iter()
            .map(|operand| self.predicate(operand))
            .collect::<TranslationResult<Vec<_>>>()?;

        if self.flattening == ConnectiveFlattening::Merge && op == LogicalOp::And {
            if let Some(merged) = merge_disjoint(&lowered) {
                return Ok(merged);
            }
        }

        let mut doc = Map::new();
        doc.insert(
            op.operator().to_string(),
            Value::Array(lowered.into_iter().map(Value::Object).collect()),
        );
        Ok(doc)
    }

    fn negation(&self, inner: &Expr) -> TranslationResult<PredicateDocument> {
        if let Expr::Member { .. } = inner {
            let path = self.field_path(inner)?;
            return Ok(field_condition(path, CompareOp::Ne, Value::Bool(true)));
        }

        let lowered = self.predicate(inner)?;
        let mut doc = Map::new();
        doc.insert("$nor".into(), Value::Array(vec![Value::Object(lowered)]));
        Ok(doc)
    }

    fn call_predicate(
        &self,
        method: &str,
        target: &Expr,
        args: &[Expr],
    ) -> TranslationResult<PredicateDocument> {
        if !REGISTERED_METHODS.contains(&method) {
            return Err(TranslationError::unsupported(format!(
                "method call `{}`",
                method
            )));
        }

        match (target, args) {
            (Expr::Constant(Literal::Array(items)), [member]) => {
                let path = self.field_path(member)?;
                let values = items.iter().map(constant).collect::<TranslationResult<_>>()?;
                let mut condition = Map::new();
                condition.insert("$in".into(), Value::Array(values));
                let mut doc = Map::new();
                doc.insert(path, Value::Object(condition));
                Ok(doc)
            }
            _ => Err(TranslationError::unsupported(format!(
                "`contains` on {} with {} argument(s)",
                target.describe(),
                args.len()
            ))),
        }
    }

    // =========================================================================
    // Projection context
    // =========================================================================

    /// Lowers a projection expression into a `$project` value
    pub fn projection(&self, expr: &Expr) -> TranslationResult<Value> {
        match expr {
            Expr::Member { .. } => Ok(Value::String(format!("${}", self.field_path(expr)?))),
            Expr::Constant(value) => {
                let mut doc = Map::new();
                doc.insert("$literal".into(), constant(value)?);
                Ok(Value::Object(doc))
            }
            Expr::New(members) => {
                let mut doc = Map::new();
                for (name, member) in members {
                    if doc.contains_key(name) {
                        return Err(TranslationError::unsupported(format!(
                            "duplicate member `{}` in object construction",
                            name
                        )));
                    }
                    doc.insert(name.clone(), self.projection(member)?);
                }
                Ok(Value::Object(doc))
            }
            Expr::Compare { op, left, right } => Ok(operator_expression(
                op.operator(),
                vec![self.projection_operand(left)?, self.projection_operand(right)?],
            )),
            Expr::Logical { op, left, right } => {
                let operands: Vec<&Expr> = match self.flattening {
                    ConnectiveFlattening::Nested => vec![left.as_ref(), right.as_ref()],
                    _ => {
                        let mut out = Vec::new();
                        collect_operands(*op, left, &mut out);
                        collect_operands(*op, right, &mut out);
                        out
                    }
                };
                let lowered = operands
                    .into_iter()
                    .map(|operand| self.projection(operand))
                    .collect::<TranslationResult<Vec<_>>>()?;
                Ok(operator_expression(op.operator(), lowered))
            }
            Expr::Not(inner) => Ok(operator_expression("$not", vec![self.projection(inner)?])),
            other => Err(TranslationError::unsupported(format!(
                "{} in projection",
                other.describe()
            ))),
        }
    }

    /// Operands of aggregation operators carry constants bare unless they
    /// would be mistaken for a field reference
    fn projection_operand(&self, expr: &Expr) -> TranslationResult<Value> {
        match expr {
            Expr::Constant(Literal::String(s)) if s.starts_with('$') => self.projection(expr),
            Expr::Constant(value) => constant(value),
            _ => self.projection(expr),
        }
    }

    // =========================================================================
    // Sort-key context
    // =========================================================================

    /// Lowers a sort-key selector into a field path
    pub fn sort_key(&self, expr: &Expr) -> TranslationResult<String> {
        match expr {
            Expr::Member { .. } => self.field_path(expr),
            other => Err(TranslationError::unsupported(format!(
                "{} as sort key",
                other.describe()
            ))),
        }
    }
}

fn constant(value: &Literal) -> TranslationResult<Value> {
    value
        .to_document_value()
        .ok_or_else(|| TranslationError::unsupported("non-finite float constant"))
}

fn field_condition(path: String, op: CompareOp, value: Value) -> PredicateDocument {
    let mut condition = Map::new();
    condition.insert(op.operator().to_string(), value);
    let mut doc = Map::new();
    doc.insert(path, Value::Object(condition));
    doc
}

fn operator_expression(operator: &str, operands: Vec<Value>) -> Value {
    let mut doc = Map::new();
    doc.insert(operator.to_string(), Value::Array(operands));
    Value::Object(doc)
}

fn collect_operands<'e>(op: LogicalOp, expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Logical {
            op: inner,
            left,
            right,
        } if *inner == op => {
            collect_operands(op, left, out);
            collect_operands(op, right, out);
        }
        other => out.push(other),
    }
}

/// Merges field predicates into one document when no key repeats and no
/// operand is itself a connective
fn merge_disjoint(operands: &[PredicateDocument]) -> Option<PredicateDocument> {
    let mut merged = Map::new();
    for doc in operands {
        for (key, value) in doc {
            if key.starts_with('$') || merged.contains_key(key) {
                return None;
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{field, lit, new_object};
    use crate::mapping::{EntityMapping, MappingRegistry};
    use serde_json::json;

    fn registry() -> MappingRegistry {
        MappingRegistry::new()
            .with(
                EntityMapping::new("User")
                    .members(["Id", "Name", "Age", "Active"])
                    .nested("Address", "Address"),
            )
            .with(EntityMapping::new("Address").members(["City"]))
    }

    fn lower_predicate(expr: &Expr, mode: ConnectiveFlattening) -> TranslationResult<Value> {
        let registry = registry();
        let scope = FieldScope::Entity("User".into());
        let translator = ExpressionTranslator::new(FieldPathResolver::new(&registry), &scope, mode);
        translator.predicate(expr).map(Value::Object)
    }

    fn lower_projection(expr: &Expr) -> TranslationResult<Value> {
        let registry = registry();
        let scope = FieldScope::Entity("User".into());
        let translator = ExpressionTranslator::new(
            FieldPathResolver::new(&registry),
            &scope,
            ConnectiveFlattening::Flatten,
        );
        translator.projection(expr)
    }

    fn flat(expr: &Expr) -> Value {
        lower_predicate(expr, ConnectiveFlattening::Flatten).unwrap()
    }

    #[test]
    fn test_equality_uses_operator_form() {
        assert_eq!(flat(&field("Id").eq("")), json!({ "Id": { "$eq": "" } }));
    }

    #[test]
    fn test_all_comparison_operators() {
        let cases = [
            (field("Age").ne(1), "$ne"),
            (field("Age").lt(1), "$lt"),
            (field("Age").lte(1), "$lte"),
            (field("Age").gt(1), "$gt"),
            (field("Age").gte(1), "$gte"),
        ];
        for (expr, op) in cases {
            assert_eq!(flat(&expr), json!({ "Age": { op: 1 } }));
        }
    }

    #[test]
    fn test_constant_on_left_mirrors_operator() {
        assert_eq!(flat(&lit(18).lt(field("Age"))), json!({ "Age": { "$gt": 18 } }));
    }

    #[test]
    fn test_nested_member_path() {
        assert_eq!(
            flat(&field("Address.City").eq("Oslo")),
            json!({ "Address.City": { "$eq": "Oslo" } })
        );
    }

    #[test]
    fn test_flatten_collapses_same_connective() {
        let expr = field("Age")
            .gt(1)
            .and(field("Name").eq("a"))
            .and(field("Active").eq(true));
        assert_eq!(
            flat(&expr),
            json!({ "$and": [
                { "Age": { "$gt": 1 } },
                { "Name": { "$eq": "a" } },
                { "Active": { "$eq": true } }
            ]})
        );
    }

    #[test]
    fn test_flatten_keeps_mixed_connectives_nested() {
        let expr = field("Age").gt(1).and(field("Name").eq("a").or(field("Name").eq("b")));
        assert_eq!(
            flat(&expr),
            json!({ "$and": [
                { "Age": { "$gt": 1 } },
                { "$or": [ { "Name": { "$eq": "a" } }, { "Name": { "$eq": "b" } } ] }
            ]})
        );
    }

    #[test]
    fn test_nested_mode_keeps_binary_arrays() {
        let expr = field("Age")
            .gt(1)
            .and(field("Name").eq("a"))
            .and(field("Active").eq(true));
        let lowered = lower_predicate(&expr, ConnectiveFlattening::Nested).unwrap();
        assert_eq!(
            lowered,
            json!({ "$and": [
                { "$and": [ { "Age": { "$gt": 1 } }, { "Name": { "$eq": "a" } } ] },
                { "Active": { "$eq": true } }
            ]})
        );
    }

    #[test]
    fn test_merge_mode_merges_disjoint_fields() {
        let expr = field("Age").gt(1).and(field("Name").eq("a"));
        let lowered = lower_predicate(&expr, ConnectiveFlattening::Merge).unwrap();
        assert_eq!(
            lowered,
            json!({ "Age": { "$gt": 1 }, "Name": { "$eq": "a" } })
        );
    }

    #[test]
    fn test_merge_mode_falls_back_on_repeated_field() {
        let expr = field("Age").gt(1).and(field("Age").lt(9));
        let lowered = lower_predicate(&expr, ConnectiveFlattening::Merge).unwrap();
        assert_eq!(
            lowered,
            json!({ "$and": [ { "Age": { "$gt": 1 } }, { "Age": { "$lt": 9 } } ] })
        );
    }

    #[test]
    fn test_boolean_member_and_negation() {
        assert_eq!(flat(&field("Active")), json!({ "Active": { "$eq": true } }));
        assert_eq!(flat(&field("Active").not()), json!({ "Active": { "$ne": true } }));
        assert_eq!(
            flat(&field("Age").gt(1).not()),
            json!({ "$nor": [ { "Age": { "$gt": 1 } } ] })
        );
    }

    #[test]
    fn test_contains_lowers_to_in() {
        let expr = lit(Literal::array(["a", "b"])).contains(field("Name"));
        assert_eq!(flat(&expr), json!({ "Name": { "$in": ["a", "b"] } }));
    }

    #[test]
    fn test_unregistered_method_rejected() {
        let expr = field("Name").call("StartsWith", vec![lit("a")]);
        let err = lower_predicate(&expr, ConnectiveFlattening::Flatten).unwrap_err();
        assert_eq!(err, TranslationError::unsupported("method call `StartsWith`"));
    }

    #[test]
    fn test_field_to_field_comparison_rejected() {
        let err =
            lower_predicate(&field("Age").eq(field("Id")), ConnectiveFlattening::Flatten).unwrap_err();
        assert!(matches!(err, TranslationError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_unknown_field_in_predicate() {
        let err =
            lower_predicate(&field("Missing").eq(1), ConnectiveFlattening::Flatten).unwrap_err();
        assert_eq!(err, TranslationError::unknown_field("User", "Missing"));
    }

    #[test]
    fn test_projection_of_member_and_object() {
        assert_eq!(lower_projection(&field("Id")).unwrap(), json!("$Id"));
        assert_eq!(
            lower_projection(&new_object([
                ("CustomPropertyName", field("Id")),
                ("Where", new_object([("City", field("Address.City"))])),
            ]))
            .unwrap(),
            json!({ "CustomPropertyName": "$Id", "Where": { "City": "$Address.City" } })
        );
    }

    #[test]
    fn test_projection_constants_and_comparisons() {
        assert_eq!(lower_projection(&lit(3)).unwrap(), json!({ "$literal": 3 }));
        assert_eq!(
            lower_projection(&field("Age").gte(18)).unwrap(),
            json!({ "$gte": ["$Age", 18] })
        );
        assert_eq!(
            lower_projection(&field("Name").eq("$x")).unwrap(),
            json!({ "$eq": ["$Name", { "$literal": "$x" }] })
        );
    }

    #[test]
    fn test_non_finite_constants_rejected() {
        let nan = TranslationError::unsupported("non-finite float constant");
        let flatten = ConnectiveFlattening::Flatten;

        assert_eq!(lower_predicate(&field("Age").eq(f64::NAN), flatten), Err(nan.clone()));
        assert_eq!(lower_predicate(&lit(f64::INFINITY).lt(field("Age")), flatten), Err(nan.clone()));
        let within = lit(Literal::array([1.0, f64::NAN])).contains(field("Age"));
        assert_eq!(lower_predicate(&within, flatten), Err(nan.clone()));
        assert_eq!(lower_projection(&lit(f64::NEG_INFINITY)), Err(nan.clone()));
        assert_eq!(lower_projection(&field("Age").gt(f64::NAN)), Err(nan));
    }

    #[test]
    fn test_projection_rejects_duplicate_members() {
        let expr = new_object([("A", field("Id")), ("A", field("Name"))]);
        assert!(matches!(
            lower_projection(&expr),
            Err(TranslationError::UnsupportedExpression(_))
        ));
    }
}
