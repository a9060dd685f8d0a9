//! Result sorting for in-memory execution
//!
//! Applies `$sort` stages. Sorting is stable, so documents with equal keys
//! keep their input order.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::document::lookup;
use super::errors::{DriverError, DriverResult};

/// Extended JSON wrappers compared by their inner value
const EXTENDED_TYPES: &[&str] = &["$date", "$uuid", "$oid"];

/// Sorts result documents
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts documents by a `$sort` body: `{ path: 1 | -1, ... }`.
    ///
    /// Keys apply in document order; later keys break ties of earlier ones.
    pub fn sort(documents: &mut [Value], sort_doc: &Map<String, Value>) -> DriverResult<()> {
        let keys = sort_doc
            .iter()
            .map(|(path, direction)| match direction.as_i64() {
                Some(1) => Ok((path.as_str(), false)),
                Some(-1) => Ok((path.as_str(), true)),
                _ => Err(DriverError::malformed(
                    "$sort",
                    format!("direction for '{}' must be 1 or -1, got {}", path, direction),
                )),
            })
            .collect::<DriverResult<Vec<_>>>()?;

        documents.sort_by(|a, b| {
            for (path, descending) in &keys {
                let ordering = Self::compare_values(lookup(a, path), lookup(b, path));
                let ordering = if *descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(())
    }

    /// Compares two values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string < extended < array < object
    /// - For same types, natural ordering
    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let a_type = type_order(a_val);
                let b_type = type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }
                Self::compare_same_type(a_val, b_val).unwrap_or(Ordering::Equal)
            }
        }
    }

    /// Orders two values of the same type class, `None` if they are not
    /// comparable (different types, arrays, plain documents)
    pub fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a_b), Value::Bool(b_b)) => Some(a_b.cmp(b_b)),
            (Value::Number(a_n), Value::Number(b_n)) => {
                if let (Some(ai), Some(bi)) = (a_n.as_i64(), b_n.as_i64()) {
                    return Some(ai.cmp(&bi));
                }
                let a_f = a_n.as_f64()?;
                let b_f = b_n.as_f64()?;
                a_f.partial_cmp(&b_f)
            }
            (Value::String(a_s), Value::String(b_s)) => Some(a_s.cmp(b_s)),
            _ => match (extended(a), extended(b)) {
                (Some((a_tag, a_inner)), Some((b_tag, b_inner))) if a_tag == b_tag => {
                    Some(a_inner.cmp(b_inner))
                }
                _ => None,
            },
        }
    }
}

fn type_order(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 5,
        Value::Object(_) if is_extended(value) => 4,
        Value::Object(_) => 6,
    }
}

/// Returns true for `{ "$date" | "$uuid" | "$oid": "..." }` values
pub fn is_extended(value: &Value) -> bool {
    extended(value).is_some()
}

/// Splits `{ "$date": "..." }` style wrappers into tag and inner string
fn extended(value: &Value) -> Option<(&str, &str)> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let (tag, inner) = object.iter().next()?;
    if !EXTENDED_TYPES.contains(&tag.as_str()) {
        return None;
    }
    Some((tag.as_str(), inner.as_str()?))
}
