//! Entity processor subsystem for aeroquery
//!
//! Entity processors are post-fetch hooks run once per materialized entity
//! while a query is enumerated. They may observe or mutate the entity but
//! never filter or reorder results.
//!
//! # Rules
//!
//! 1. Processors run in registration order
//! 2. Projected (`Select`) results never reach processors
//! 3. A failing processor aborts the enumeration
//! 4. Registration is closed once the first enumeration starts

mod chain;
mod errors;
mod tracking;

use std::fmt;
use std::marker::PhantomData;

pub use chain::{EntityProcessorChain, SealedChain};
pub use errors::{ProcessorError, ProcessorResult};
pub use tracking::{ChangeTracker, EntryState, TrackedEntry, TrackingProcessor};

/// A post-fetch hook over entities of type `T`
pub trait EntityProcessor<T>: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Observes or mutates one materialized entity
    fn process(&self, entity: &mut T) -> ProcessorResult<()>;
}

/// Processor backed by a closure
pub struct FnProcessor<T, F> {
    name: String,
    f: F,
    _entity: PhantomData<fn(&mut T)>,
}

impl<T, F> EntityProcessor<T> for FnProcessor<T, F>
where
    F: Fn(&mut T) -> ProcessorResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, entity: &mut T) -> ProcessorResult<()> {
        (self.f)(entity)
    }
}

impl<T, F> fmt::Debug for FnProcessor<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor").field("name", &self.name).finish()
    }
}

/// Wraps a closure as a named entity processor
pub fn processor_fn<T, F>(name: impl Into<String>, f: F) -> FnProcessor<T, F>
where
    F: Fn(&mut T) -> ProcessorResult<()> + Send + Sync,
{
    FnProcessor {
        name: name.into(),
        f,
        _entity: PhantomData,
    }
}
