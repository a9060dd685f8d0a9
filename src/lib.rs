//! aeroquery - Deferred document queries compiled to aggregation pipelines
//!
//! Queries are chains of declarative operations (filter, project, sort,
//! skip, take). Nothing runs until enumeration begins; the chain is then
//! compiled into an aggregation pipeline, executed by a driver, and each
//! materialized entity is passed through the entity processor chain.

pub mod config;
pub mod driver;
pub mod entity;
pub mod expression;
pub mod mapping;
pub mod observability;
pub mod processor;
pub mod query;
pub mod translation;

pub use config::{ConnectiveFlattening, QueryConfig};
pub use driver::{DriverError, MemoryDriver, PipelineDriver};
pub use entity::Entity;
pub use expression::{field, lit, new_object, Expr, Literal};
pub use mapping::{EntityMapping, FieldMapping, MappedMember, MappingRegistry};
pub use processor::{
    processor_fn, ChangeTracker, EntityProcessor, EntityProcessorChain, ProcessorError,
    TrackingProcessor,
};
pub use query::{QueryError, QueryItem, QueryResult, QueryState, Queryable};
pub use translation::{Pipeline, PipelineStage, TranslationError};
