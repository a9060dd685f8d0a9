//! Entity types
//!
//! An entity is a typed document stored in a collection. Query results
//! whose shape is still the entity's are decoded into it and routed through
//! the entity processor chain.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A typed document the query layer can materialize
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Entity type name, as registered in the field mapping
    const ENTITY_TYPE: &'static str;

    /// Identity used by change tracking. Entities without one are not tracked.
    fn entity_key(&self) -> Option<String> {
        None
    }
}
