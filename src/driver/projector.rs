//! Projection for in-memory execution
//!
//! Evaluates `$project` bodies. Supported member specs:
//!
//! - `1` / `true`: include the field at the member's path
//! - `0` / `false`: exclude, `_id` only
//! - `"$path"`: copy the referenced field
//! - `{ "$literal": v }`, comparison, `$and`/`$or`/`$not` expressions
//! - nested documents of the above
//!
//! `_id` is included unless it is excluded or computed explicitly.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::document::{lookup, set_path};
use super::errors::{DriverError, DriverResult};
use super::sorter::{is_extended, ResultSorter};

/// Evaluates `$project` bodies against documents
pub struct Projector;

impl Projector {
    /// Reshapes `document` according to `shape`
    pub fn project(document: &Value, shape: &Map<String, Value>) -> DriverResult<Value> {
        let mut output = Map::new();

        if !shape.contains_key("_id") {
            if let Some(id) = lookup(document, "_id") {
                output.insert("_id".into(), id.clone());
            }
        }

        for (path, member) in shape {
            match member {
                Value::Number(_) | Value::Bool(_) => {
                    if is_truthy(member) {
                        if let Some(value) = lookup(document, path) {
                            set_path(&mut output, path, value.clone());
                        }
                    } else if path != "_id" {
                        return Err(DriverError::malformed(
                            "$project",
                            format!("exclusion of '{}' in an inclusion projection", path),
                        ));
                    }
                }
                _ => {
                    if let Some(value) = Self::evaluate(document, member)? {
                        set_path(&mut output, path, value);
                    }
                }
            }
        }

        Ok(Value::Object(output))
    }

    /// Evaluates a projection expression; `None` when it references a
    /// missing field
    fn evaluate(document: &Value, expr: &Value) -> DriverResult<Option<Value>> {
        match expr {
            Value::String(s) if s.starts_with('$') => Ok(lookup(document, &s[1..]).cloned()),
            Value::Object(map) if is_extended(expr) => Ok(Some(Value::Object(map.clone()))),
            Value::Object(map) if map.len() == 1 && map.keys().all(|k| k.starts_with('$')) => {
                let Some((operator, operand)) = map.iter().next() else {
                    return Ok(None);
                };
                Self::operator(document, operator, operand).map(Some)
            }
            Value::Object(map) => {
                let mut nested = Map::new();
                for (name, member) in map {
                    if let Some(value) = Self::evaluate(document, member)? {
                        nested.insert(name.clone(), value);
                    }
                }
                Ok(Some(Value::Object(nested)))
            }
            other => Ok(Some(other.clone())),
        }
    }

    fn operator(document: &Value, operator: &str, operand: &Value) -> DriverResult<Value> {
        if operator == "$literal" {
            return Ok(operand.clone());
        }

        let args = operand
            .as_array()
            .ok_or_else(|| {
                DriverError::malformed("$project", format!("{} expects an array", operator))
            })?
            .iter()
            .map(|arg| Self::evaluate(document, arg))
            .collect::<DriverResult<Vec<_>>>()?;

        let result = match operator {
            "$and" => args.iter().all(|arg| arg.as_ref().map_or(false, is_truthy)),
            "$or" => args.iter().any(|arg| arg.as_ref().map_or(false, is_truthy)),
            "$not" => match args.as_slice() {
                [arg] => !arg.as_ref().map_or(false, is_truthy),
                _ => return Err(DriverError::malformed("$project", "$not expects one argument")),
            },
            "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" => {
                let [left, right] = args.as_slice() else {
                    return Err(DriverError::malformed(
                        "$project",
                        format!("{} expects two arguments", operator),
                    ));
                };
                let ordering = ResultSorter::compare_values(left.as_ref(), right.as_ref());
                match operator {
                    "$eq" => ordering == Ordering::Equal && left == right,
                    "$ne" => left != right,
                    "$gt" => ordering == Ordering::Greater,
                    "$gte" => ordering != Ordering::Less,
                    "$lt" => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
            other => {
                return Err(DriverError::malformed(
                    "$project",
                    format!("unsupported expression operator {}", other),
                ))
            }
        };
        Ok(Value::Bool(result))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        _ => true,
    }
}
