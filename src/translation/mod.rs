//! Translation subsystem for aeroquery
//!
//! Lowers an operation chain into an aggregation pipeline.
//!
//! # Design Principles
//!
//! - Deterministic: same chain and mapping → same pipeline, byte for byte
//! - Ordered: one stage per operation, in append order
//! - Atomic: a single failing operation fails the whole compile
//! - Closed: anything outside the supported grammar is rejected, never guessed
//!
//! # Stage Mapping
//!
//! 1. Where → `$match`
//! 2. Select → `$project`
//! 3. OrderBy / OrderByDescending → `$sort`
//! 4. Skip → `$skip`
//! 5. Take → `$limit`

mod errors;
mod expression;
mod field_path;
mod operations;
mod pipeline;

pub use errors::{TranslationError, TranslationResult};
pub use expression::{ExpressionTranslator, PredicateDocument};
pub use field_path::{FieldPathResolver, FieldScope, ProjectedShape};
pub use operations::{
    OperationRegistry, OperationTranslator, OrderByTranslator, SelectTranslator, SkipTranslator,
    TakeTranslator, TranslationContext, WhereTranslator,
};
pub use pipeline::{CompiledPipeline, Pipeline, PipelineBuilder, PipelineStage};
