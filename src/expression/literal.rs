//! Literal and captured-constant values
//!
//! Literals lower to their native document representation. Dates, UUIDs and
//! ObjectIds use the extended-JSON wrappers understood by the document store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// A constant appearing in a query expression
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer beyond the `i64` range
    UInt(u64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    /// 24 hex character document identifier
    ObjectId(String),
    Array(Vec<Literal>),
}

impl Literal {
    /// Creates an ObjectId literal, returning None unless `hex` is 24 hex digits
    pub fn object_id(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        if hex.len() == 24 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Literal::ObjectId(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Creates an array literal from any iterator of literal-convertible values
    pub fn array<I, L>(items: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Literal::Array(items.into_iter().map(Into::into).collect())
    }

    /// Returns the non-negative integer value, if this literal is one
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Literal::Int(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::UInt(_) => "uint",
            Literal::Float(_) => "float",
            Literal::String(_) => "string",
            Literal::DateTime(_) => "date",
            Literal::Uuid(_) => "uuid",
            Literal::ObjectId(_) => "objectId",
            Literal::Array(_) => "array",
        }
    }

    /// Lowers the literal into its document representation
    ///
    /// Returns None when the literal, or any array element, is a NaN or
    /// infinite float. Those have no document form.
    pub fn to_document_value(&self) -> Option<Value> {
        let value = match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::from(*n),
            Literal::UInt(n) => Value::from(*n),
            Literal::Float(f) => Value::Number(serde_json::Number::from_f64(*f)?),
            Literal::String(s) => Value::String(s.clone()),
            Literal::DateTime(dt) => {
                json!({ "$date": dt.to_rfc3339_opts(SecondsFormat::Millis, true) })
            }
            Literal::Uuid(id) => json!({ "$uuid": id.hyphenated().to_string() }),
            Literal::ObjectId(hex) => json!({ "$oid": hex }),
            Literal::Array(items) => Value::Array(
                items
                    .iter()
                    .map(Literal::to_document_value)
                    .collect::<Option<Vec<_>>>()?,
            ),
        };
        Some(value)
    }
}

macro_rules! literal_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Literal {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

literal_from! {
    bool => |v| Literal::Bool(v),
    i32 => |v| Literal::Int(v as i64),
    i64 => |v| Literal::Int(v),
    u32 => |v| Literal::Int(v as i64),
    u64 => |v| i64::try_from(v).map(Literal::Int).unwrap_or(Literal::UInt(v)),
    usize => |v| i64::try_from(v).map(Literal::Int).unwrap_or(Literal::UInt(v as u64)),
    f64 => |v| Literal::Float(v),
    &str => |v| Literal::String(v.to_string()),
    String => |v| Literal::String(v),
    DateTime<Utc> => |v| Literal::DateTime(v),
    Uuid => |v| Literal::Uuid(v),
}

impl<L: Into<Literal>> From<Option<L>> for Literal {
    fn from(value: Option<L>) -> Self {
        value.map(Into::into).unwrap_or(Literal::Null)
    }
}
