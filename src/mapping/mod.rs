//! Field mapping collaborator for aeroquery
//!
//! Entity-to-document mapping is owned by the caller. The translator only
//! asks one question: what is member `m` of entity type `t` called on the
//! wire, and what type does it hold?
//!
//! [`MappingRegistry`] is a minimal in-memory implementation.

mod registry;

pub use registry::{EntityMapping, MappingRegistry};

/// A member known to the mapping
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappedMember {
    /// Wire name override; None keeps the declared name
    pub element_name: Option<String>,
    /// Entity type of the member's value, for nested access
    pub nested_type: Option<String>,
}

impl MappedMember {
    /// Member stored under its declared name
    pub fn plain() -> Self {
        Self::default()
    }

    /// Member stored under a different wire name
    pub fn renamed(element_name: impl Into<String>) -> Self {
        Self {
            element_name: Some(element_name.into()),
            nested_type: None,
        }
    }

    /// Sets the nested entity type
    pub fn with_nested_type(mut self, nested_type: impl Into<String>) -> Self {
        self.nested_type = Some(nested_type.into());
        self
    }

    /// Returns the name used on the wire
    pub fn wire_name<'a>(&'a self, declared: &'a str) -> &'a str {
        self.element_name.as_deref().unwrap_or(declared)
    }
}

/// Resolves entity members to their wire representation
pub trait FieldMapping: Send + Sync {
    /// Returns None if `member` is not a mapped member of `entity_type`
    fn resolve(&self, entity_type: &str, member: &str) -> Option<MappedMember>;
}
