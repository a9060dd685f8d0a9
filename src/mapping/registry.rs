//! In-memory field mapping registry

use std::collections::HashMap;

use super::{FieldMapping, MappedMember};

/// Mapping of a single entity type
#[derive(Debug, Clone)]
pub struct EntityMapping {
    entity_type: String,
    members: HashMap<String, MappedMember>,
}

impl EntityMapping {
    /// Creates an empty mapping for `entity_type`
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            members: HashMap::new(),
        }
    }

    /// Adds members stored under their declared names
    pub fn members<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.members.insert(name.into(), MappedMember::plain());
        }
        self
    }

    /// Adds a member stored under a different wire name
    pub fn renamed(mut self, name: impl Into<String>, element_name: impl Into<String>) -> Self {
        self.members
            .insert(name.into(), MappedMember::renamed(element_name));
        self
    }

    /// Adds a member holding an embedded entity of `nested_type`
    pub fn nested(mut self, name: impl Into<String>, nested_type: impl Into<String>) -> Self {
        self.members
            .insert(name.into(), MappedMember::plain().with_nested_type(nested_type));
        self
    }

    /// Adds a fully specified member
    pub fn member(mut self, name: impl Into<String>, member: MappedMember) -> Self {
        self.members.insert(name.into(), member);
        self
    }

    /// Returns the entity type name
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Returns the number of mapped members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if no members are mapped
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Registry of entity mappings keyed by entity type
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    entities: HashMap<String, EntityMapping>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a mapping
    pub fn register(&mut self, mapping: EntityMapping) {
        self.entities.insert(mapping.entity_type.clone(), mapping);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, mapping: EntityMapping) -> Self {
        self.register(mapping);
        self
    }

    /// Returns true if `entity_type` has a mapping
    pub fn contains(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }
}

impl FieldMapping for MappingRegistry {
    fn resolve(&self, entity_type: &str, member: &str) -> Option<MappedMember> {
        self.entities
            .get(entity_type)
            .and_then(|mapping| mapping.members.get(member))
            .cloned()
    }
}
