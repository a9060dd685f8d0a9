//! Change tracking
//!
//! [`TrackingProcessor`] records a snapshot of every materialized entity in
//! a shared [`ChangeTracker`]. Comparing an entity against its snapshot
//! later tells whether the application modified it.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::entity::Entity;

use super::errors::{ProcessorError, ProcessorResult};
use super::EntityProcessor;

/// State of a tracked entity relative to its snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unchanged,
    Modified,
}

/// Snapshot of one entity as it was materialized
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntry {
    pub entity_type: String,
    pub key: String,
    pub snapshot: Value,
}

/// Snapshots of materialized entities, keyed by entity type and identity
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: Mutex<BTreeMap<(String, String), TrackedEntry>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a processor feeding this tracker
    pub fn processor<T: Entity>(self: &Arc<Self>) -> TrackingProcessor<T> {
        TrackingProcessor::new(Arc::clone(self))
    }

    /// Records `snapshot`, replacing an earlier one for the same entity
    pub fn track(&self, entity_type: &str, key: &str, snapshot: Value) {
        let entry = TrackedEntry {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
            snapshot,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((entity_type.to_string(), key.to_string()), entry);
    }

    /// Returns the entry recorded for `entity_type` / `key`
    pub fn get(&self, entity_type: &str, key: &str) -> Option<TrackedEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(entity_type.to_string(), key.to_string()))
            .cloned()
    }

    /// Compares `entity` against its snapshot; `None` if it is not tracked
    pub fn state_of<T: Entity>(&self, entity: &T) -> Option<EntryState> {
        let key = entity.entity_key()?;
        let entry = self.get(T::ENTITY_TYPE, &key)?;
        let current = serde_json::to_value(entity).ok()?;
        if current == entry.snapshot {
            Some(EntryState::Unchanged)
        } else {
            Some(EntryState::Modified)
        }
    }

    /// Returns true if `entity` is tracked and differs from its snapshot
    pub fn is_modified<T: Entity>(&self, entity: &T) -> bool {
        self.state_of(entity) == Some(EntryState::Modified)
    }

    /// All entries, ordered by entity type then key
    pub fn entries(&self) -> Vec<TrackedEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every snapshot
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Records an `Unchanged` snapshot of each entity that has an identity
pub struct TrackingProcessor<T> {
    tracker: Arc<ChangeTracker>,
    _entity: PhantomData<fn(&mut T)>,
}

impl<T> TrackingProcessor<T> {
    pub fn new(tracker: Arc<ChangeTracker>) -> Self {
        Self {
            tracker,
            _entity: PhantomData,
        }
    }

    pub fn tracker(&self) -> &Arc<ChangeTracker> {
        &self.tracker
    }
}

impl<T: Entity> EntityProcessor<T> for TrackingProcessor<T> {
    fn name(&self) -> &str {
        "change-tracking"
    }

    fn process(&self, entity: &mut T) -> ProcessorResult<()> {
        let Some(key) = entity.entity_key() else {
            return Ok(());
        };
        let snapshot = serde_json::to_value(&*entity)
            .map_err(|e| ProcessorError::failed(self.name(), e.to_string()))?;
        self.tracker.track(T::ENTITY_TYPE, &key, snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Account {
        id: String,
        balance: i64,
    }

    impl Entity for Account {
        const ENTITY_TYPE: &'static str = "Account";

        fn entity_key(&self) -> Option<String> {
            Some(self.id.clone())
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Entity for Note {
        const ENTITY_TYPE: &'static str = "Note";
    }

    #[test]
    fn test_tracking_records_unchanged_snapshot() {
        let tracker = Arc::new(ChangeTracker::new());
        let processor = tracker.processor::<Account>();
        let mut account = Account {
            id: "a1".into(),
            balance: 10,
        };

        processor.process(&mut account).unwrap();

        let entry = tracker.get("Account", "a1").unwrap();
        assert_eq!(entry.snapshot, json!({"id": "a1", "balance": 10}));
        assert_eq!(tracker.state_of(&account), Some(EntryState::Unchanged));
        assert!(!tracker.is_modified(&account));
    }

    #[test]
    fn test_modification_detected() {
        let tracker = Arc::new(ChangeTracker::new());
        let mut account = Account {
            id: "a1".into(),
            balance: 10,
        };
        tracker.processor::<Account>().process(&mut account).unwrap();

        account.balance = 20;
        assert!(tracker.is_modified(&account));
    }

    #[test]
    fn test_entities_without_identity_are_skipped() {
        let tracker = Arc::new(ChangeTracker::new());
        let mut note = Note {
            text: "hello".into(),
        };
        tracker.processor::<Note>().process(&mut note).unwrap();
        assert!(tracker.is_empty());
        assert_eq!(tracker.state_of(&note), None);
    }

    #[test]
    fn test_retracking_replaces_snapshot() {
        let tracker = Arc::new(ChangeTracker::new());
        let processor = tracker.processor::<Account>();
        let mut account = Account {
            id: "a1".into(),
            balance: 10,
        };
        processor.process(&mut account).unwrap();
        account.balance = 5;
        processor.process(&mut account).unwrap();

        assert_eq!(tracker.len(), 1);
        assert!(!tracker.is_modified(&account));

        tracker.clear();
        assert!(tracker.entries().is_empty());
    }
}
