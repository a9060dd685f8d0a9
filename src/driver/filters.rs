//! Predicate filtering for in-memory execution
//!
//! Evaluates `$match` documents. No type coercion: a string never equals a
//! number, and ordering operators only compare values of the same type.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::document::lookup;
use super::errors::{DriverError, DriverResult};
use super::sorter::{is_extended, ResultSorter};

/// Evaluates `$match` documents against documents
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if `document` satisfies every entry of `predicate` (AND semantics)
    pub fn matches(document: &Value, predicate: &Map<String, Value>) -> DriverResult<bool> {
        for (key, condition) in predicate {
            if !Self::matches_entry(document, key, condition)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_entry(document: &Value, key: &str, condition: &Value) -> DriverResult<bool> {
        match key {
            "$and" => {
                for clause in Self::clauses(key, condition)? {
                    if !Self::matches(document, clause)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            "$or" => {
                for clause in Self::clauses(key, condition)? {
                    if Self::matches(document, clause)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            "$nor" => {
                for clause in Self::clauses(key, condition)? {
                    if Self::matches(document, clause)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ if key.starts_with('$') => Err(DriverError::malformed(
                "$match",
                format!("unsupported top-level operator {}", key),
            )),
            path => Self::matches_field(lookup(document, path), condition),
        }
    }

    fn clauses<'a>(operator: &str, value: &'a Value) -> DriverResult<Vec<&'a Map<String, Value>>> {
        let items = value.as_array().ok_or_else(|| {
            DriverError::malformed("$match", format!("{} expects an array", operator))
        })?;
        items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    DriverError::malformed("$match", format!("{} expects documents", operator))
                })
            })
            .collect()
    }

    /// Checks one field against `{ $op: value, ... }` or an implicit equality
    fn matches_field(actual: Option<&Value>, condition: &Value) -> DriverResult<bool> {
        let operators = match condition.as_object() {
            Some(map)
                if !map.is_empty()
                    && map.keys().all(|k| k.starts_with('$'))
                    && !is_extended(condition) =>
            {
                map
            }
            _ => return Ok(Self::eq_match(actual, condition)),
        };

        for (operator, operand) in operators {
            let matched = match operator.as_str() {
                "$eq" => Self::eq_match(actual, operand),
                "$ne" => !Self::eq_match(actual, operand),
                "$gt" => Self::order_match(actual, operand, |o| o == Ordering::Greater),
                "$gte" => Self::order_match(actual, operand, |o| o != Ordering::Less),
                "$lt" => Self::order_match(actual, operand, |o| o == Ordering::Less),
                "$lte" => Self::order_match(actual, operand, |o| o != Ordering::Greater),
                "$in" => {
                    let candidates = operand.as_array().ok_or_else(|| {
                        DriverError::malformed("$match", "$in expects an array")
                    })?;
                    candidates
                        .iter()
                        .any(|candidate| Self::eq_match(actual, candidate))
                }
                other => {
                    return Err(DriverError::malformed(
                        "$match",
                        format!("unsupported query operator {}", other),
                    ))
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Exact equality; a missing field equals null, an array field matches
    /// if any element does
    fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
        match actual {
            None => expected.is_null(),
            Some(value) if Self::values_equal(value, expected) => true,
            Some(Value::Array(items)) => {
                items.iter().any(|item| Self::values_equal(item, expected))
            }
            Some(_) => false,
        }
    }

    /// Numbers compare by value so `30.0` equals `30`, as the ordering
    /// operators already treat them
    fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(_), Value::Number(_)) => {
                ResultSorter::compare_same_type(a, b) == Some(Ordering::Equal)
            }
            _ => a == b,
        }
    }

    /// Ordering comparison; missing fields and mismatched types never match
    fn order_match(
        actual: Option<&Value>,
        bound: &Value,
        accept: impl Fn(Ordering) -> bool,
    ) -> bool {
        actual
            .and_then(|value| ResultSorter::compare_same_type(value, bound))
            .map_or(false, accept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(doc: &Value, predicate: Value) -> bool {
        PredicateFilter::matches(doc, predicate.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_equality_match() {
        let doc = json!({"name": "Alice", "age": 30});
        assert!(matches(&doc, json!({"name": {"$eq": "Alice"}})));
        assert!(!matches(&doc, json!({"name": {"$eq": "Bob"}})));
        assert!(matches(&doc, json!({"name": "Alice"})));
    }

    #[test]
    fn test_no_type_coercion() {
        let doc = json!({"value": 123});
        assert!(!matches(&doc, json!({"value": {"$eq": "123"}})));
        assert!(matches(&doc, json!({"value": {"$eq": 123}})));
        assert!(!matches(&doc, json!({"value": {"$gt": "100"}})));
    }

    #[test]
    fn test_range_predicates() {
        let doc = json!({"age": 25});
        assert!(matches(&doc, json!({"age": {"$gte": 18}})));
        assert!(matches(&doc, json!({"age": {"$lte": 30}})));
        assert!(!matches(&doc, json!({"age": {"$gt": 25}})));
        assert!(!matches(&doc, json!({"age": {"$lt": 25}})));
        assert!(matches(&doc, json!({"age": {"$gt": 18, "$lt": 30}})));
    }

    #[test]
    fn test_mixed_integer_and_float() {
        let doc = json!({"score": 2.5});
        assert!(matches(&doc, json!({"score": {"$gt": 2}})));
        assert!(matches(&doc, json!({"score": {"$lt": 3}})));
    }

    #[test]
    fn test_numeric_equality_ignores_representation() {
        let doc = json!({"age": 30.0, "scores": [1.0, 2.5]});
        assert!(matches(&doc, json!({"age": {"$eq": 30}})));
        assert!(matches(&doc, json!({"age": 30})));
        assert!(!matches(&doc, json!({"age": {"$ne": 30}})));
        assert!(matches(&doc, json!({"age": {"$in": [10, 30]}})));
        assert!(matches(&doc, json!({"scores": {"$eq": 1}})));
        assert!(!matches(&doc, json!({"age": {"$eq": 30.5}})));
    }

    #[test]
    fn test_connectives() {
        let doc = json!({"age": 25, "active": true});
        assert!(matches(
            &doc,
            json!({"$and": [{"age": {"$gte": 18}}, {"active": {"$eq": true}}]})
        ));
        assert!(matches(
            &doc,
            json!({"$or": [{"age": {"$lt": 18}}, {"active": {"$eq": true}}]})
        ));
        assert!(!matches(&doc, json!({"$nor": [{"active": {"$eq": true}}]})));
    }

    #[test]
    fn test_missing_field() {
        let doc = json!({"name": "Alice"});
        assert!(!matches(&doc, json!({"age": {"$eq": 30}})));
        assert!(matches(&doc, json!({"age": {"$eq": null}})));
        assert!(matches(&doc, json!({"age": {"$ne": 30}})));
        assert!(!matches(&doc, json!({"age": {"$lt": 30}})));
    }

    #[test]
    fn test_dotted_path() {
        let doc = json!({"Address": {"City": "London"}});
        assert!(matches(&doc, json!({"Address.City": {"$eq": "London"}})));
    }

    #[test]
    fn test_in_operator() {
        let doc = json!({"Id": "b"});
        assert!(matches(&doc, json!({"Id": {"$in": ["a", "b"]}})));
        assert!(!matches(&doc, json!({"Id": {"$in": ["c"]}})));
    }

    #[test]
    fn test_array_field_equality() {
        let doc = json!({"tags": ["red", "blue"]});
        assert!(matches(&doc, json!({"tags": {"$eq": "blue"}})));
    }

    #[test]
    fn test_extended_json_values() {
        let doc = json!({"at": {"$date": "2024-01-01T00:00:00Z"}});
        assert!(matches(
            &doc,
            json!({"at": {"$eq": {"$date": "2024-01-01T00:00:00Z"}}})
        ));
        assert!(matches(
            &doc,
            json!({"at": {"$gt": {"$date": "2023-01-01T00:00:00Z"}}})
        ));
    }

    #[test]
    fn test_implicit_equality_with_extended_value() {
        let doc = json!({"Id": {"$oid": "507f1f77bcf86cd799439011"}});
        assert!(matches(&doc, json!({"Id": {"$oid": "507f1f77bcf86cd799439011"}})));
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let doc = json!({"name": "Alice"});
        let predicate = json!({"name": {"$regex": "A.*"}});
        let result = PredicateFilter::matches(&doc, predicate.as_object().unwrap());
        assert!(result.is_err());
    }
}
