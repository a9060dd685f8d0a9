//! Entity processor chain
//!
//! Processors are registered during setup and run in registration order
//! once per materialized entity. The first enumeration seals the chain;
//! registering afterwards fails instead of racing the running enumeration.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::observability::{self, Event};
use crate::query::{QueryError, QueryResult};

use super::errors::ProcessorResult;
use super::EntityProcessor;

/// Ordered, append-only list of entity processors
pub struct EntityProcessorChain<T> {
    processors: RwLock<Vec<Arc<dyn EntityProcessor<T>>>>,
    sealed: AtomicBool,
}

impl<T: 'static> EntityProcessorChain<T> {
    pub fn new() -> Self {
        Self {
            processors: RwLock::new(Vec::new()),
            sealed: AtomicBool::new(false),
        }
    }

    /// Appends `processor` to the chain.
    ///
    /// Fails with [`QueryError::ProcessorChainSealed`] once any query
    /// sharing this chain has started enumerating.
    pub fn add(&self, processor: impl EntityProcessor<T> + 'static) -> QueryResult<()> {
        self.add_shared(Arc::new(processor))
    }

    /// Appends an already shared processor
    pub fn add_shared(&self, processor: Arc<dyn EntityProcessor<T>>) -> QueryResult<()> {
        let mut processors = self
            .processors
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Checked under the write lock so a concurrent seal cannot slip between
        if self.sealed.load(Ordering::SeqCst) {
            return Err(QueryError::ProcessorChainSealed);
        }

        observability::log_event_with_fields(
            Event::ProcessorRegistered,
            &[("processor", processor.name())],
        );
        processors.push(processor);
        Ok(())
    }

    /// Freezes the chain and returns its processors in registration order
    pub fn seal(&self) -> SealedChain<T> {
        let processors = self
            .processors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.sealed.store(true, Ordering::SeqCst);
        SealedChain {
            processors: processors.clone(),
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the registered processors, in order
    pub fn names(&self) -> Vec<String> {
        self.processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }
}

impl<T: 'static> Default for EntityProcessorChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for EntityProcessorChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProcessorChain")
            .field("processors", &self.names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

/// Frozen view of a chain, used by one enumeration
pub struct SealedChain<T> {
    processors: Vec<Arc<dyn EntityProcessor<T>>>,
}

impl<T> SealedChain<T> {
    /// Runs every processor over `entity`, stopping at the first failure
    pub fn process(&self, entity: &mut T) -> ProcessorResult<()> {
        for processor in &self.processors {
            if let Err(err) = processor.process(entity) {
                observability::log_event_with_fields(
                    Event::ProcessorFailed,
                    &[
                        ("code", err.code()),
                        ("processor", processor.name()),
                        ("reason", err.reason()),
                    ],
                );
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}
