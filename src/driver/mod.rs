//! Driver subsystem for aeroquery
//!
//! The underlying driver executes compiled pipelines and hands back raw
//! result documents. The query layer never talks to a database directly.
//!
//! # Execution Flow
//!
//! 1. `aggregate` receives a fully compiled pipeline
//! 2. The driver returns a cursor over result documents
//! 3. Documents are pulled one at a time; a failed pull ends the cursor
//!
//! [`MemoryDriver`] evaluates pipelines over an in-memory collection.

mod document;
mod errors;
mod filters;
mod memory;
mod projector;
mod sorter;

use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::translation::Pipeline;

pub use errors::{DriverError, DriverResult};
pub use filters::PredicateFilter;
pub use memory::MemoryDriver;
pub use projector::Projector;
pub use sorter::ResultSorter;

/// One-shot cursor over raw result documents
pub type DocumentCursor = Box<dyn Iterator<Item = DriverResult<Value>> + Send>;

/// Executes aggregation pipelines
pub trait PipelineDriver: Send + Sync {
    /// Runs `pipeline` and returns a cursor over its results
    fn aggregate(&self, pipeline: &Pipeline) -> DriverResult<DocumentCursor>;

    /// Async form of [`aggregate`](Self::aggregate).
    ///
    /// The default wraps the synchronous cursor; a failure to start the
    /// pipeline becomes the stream's only item.
    fn aggregate_stream(&self, pipeline: &Pipeline) -> BoxStream<'static, DriverResult<Value>> {
        match self.aggregate(pipeline) {
            Ok(cursor) => stream::iter(cursor).boxed(),
            Err(err) => stream::once(future::ready(Err(err))).boxed(),
        }
    }
}
