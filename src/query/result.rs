//! Result items

use serde_json::Value;

/// One element of a query's result sequence
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem<T> {
    /// A materialized entity; has passed through the processor chain
    Entity(T),
    /// A document reshaped by `Select`; never reaches processors
    Projection(Value),
}

impl<T> QueryItem<T> {
    pub fn is_entity(&self) -> bool {
        matches!(self, QueryItem::Entity(_))
    }

    pub fn as_entity(&self) -> Option<&T> {
        match self {
            QueryItem::Entity(entity) => Some(entity),
            QueryItem::Projection(_) => None,
        }
    }

    pub fn into_entity(self) -> Option<T> {
        match self {
            QueryItem::Entity(entity) => Some(entity),
            QueryItem::Projection(_) => None,
        }
    }

    pub fn as_projection(&self) -> Option<&Value> {
        match self {
            QueryItem::Entity(_) => None,
            QueryItem::Projection(document) => Some(document),
        }
    }

    pub fn into_projection(self) -> Option<Value> {
        match self {
            QueryItem::Entity(_) => None,
            QueryItem::Projection(document) => Some(document),
        }
    }
}
