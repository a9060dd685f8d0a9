//! Query provider
//!
//! Owns the chain-building protocol. Appending an operation returns a new
//! provider whose tip is a new node over the previous tip; the processor
//! chain, driver, mapping and config are shared, never copied.
//!
//! # Execution Flow (strict order)
//!
//! 1. Seal the processor chain
//! 2. Compile the whole operation chain
//! 3. Hand the pipeline to the driver
//! 4. Materialize each result document as it is pulled
//! 5. Run processors over entities only

use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use serde_json::Value;

use crate::config::QueryConfig;
use crate::driver::{DocumentCursor, PipelineDriver};
use crate::entity::Entity;
use crate::mapping::FieldMapping;
use crate::observability::{self, Event};
use crate::processor::{EntityProcessorChain, SealedChain};
use crate::translation::{CompiledPipeline, OperationRegistry, PipelineBuilder};

use super::errors::{QueryError, QueryResult};
use super::operation::{QueryNode, QueryOperation};
use super::result::QueryItem;

/// Chain tip plus everything needed to compile and execute it
pub struct QueryProvider<T> {
    tip: Option<Arc<QueryNode>>,
    processors: Arc<EntityProcessorChain<T>>,
    driver: Arc<dyn PipelineDriver>,
    mapping: Arc<dyn FieldMapping>,
    config: Arc<QueryConfig>,
}

impl<T> Clone for QueryProvider<T> {
    fn clone(&self) -> Self {
        Self {
            tip: self.tip.clone(),
            processors: Arc::clone(&self.processors),
            driver: Arc::clone(&self.driver),
            mapping: Arc::clone(&self.mapping),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: Entity> QueryProvider<T> {
    /// Creates a root provider with an empty chain and no processors
    pub fn new(
        driver: Arc<dyn PipelineDriver>,
        mapping: Arc<dyn FieldMapping>,
        config: QueryConfig,
    ) -> Self {
        Self {
            tip: None,
            processors: Arc::new(EntityProcessorChain::new()),
            driver,
            mapping,
            config: Arc::new(config),
        }
    }

    /// Returns a provider with `operation` appended after the current tip
    pub fn append(&self, operation: QueryOperation) -> Self {
        Self {
            tip: Some(Arc::new(QueryNode::new(self.tip.clone(), operation))),
            ..self.clone()
        }
    }

    /// Returns a copy of this provider using `config`
    pub fn with_config(&self, config: QueryConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..self.clone()
        }
    }

    pub fn tip(&self) -> Option<&Arc<QueryNode>> {
        self.tip.as_ref()
    }

    /// The processor chain shared by every provider derived from the root
    pub fn processors(&self) -> &Arc<EntityProcessorChain<T>> {
        &self.processors
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Operations from the root to the tip
    pub fn operations(&self) -> Vec<&QueryOperation> {
        self.tip.as_deref().map(QueryNode::chain).unwrap_or_default()
    }

    /// Compiles the chain without executing it
    pub fn compile(&self) -> QueryResult<CompiledPipeline> {
        let builder = PipelineBuilder::new(
            OperationRegistry::standard(),
            self.mapping.as_ref(),
            &self.config,
        );
        Ok(builder.build(T::ENTITY_TYPE, &self.operations())?)
    }

    /// Compiles and executes the chain, returning a lazy one-shot cursor
    pub fn execute(&self) -> QueryResult<QueryCursor<T>> {
        let (compiled, materializer) = self.prepare()?;
        let documents = self
            .driver
            .aggregate(&compiled.pipeline)
            .map_err(|err| log_execution_failure(err.into()))?;
        Ok(QueryCursor {
            documents,
            materializer,
            yielded: 0,
            done: false,
        })
    }

    /// Async form of [`execute`](Self::execute). Compile and driver
    /// failures arrive as the stream's only item; the stream ends after
    /// the first error.
    pub fn execute_stream(&self) -> BoxStream<'static, QueryResult<QueryItem<T>>> {
        let (compiled, materializer) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(err) => return futures_util::stream::once(future::ready(Err(err))).boxed(),
        };

        self.driver
            .aggregate_stream(&compiled.pipeline)
            .map(move |document| match document {
                Ok(document) => materializer.materialize(document),
                Err(err) => Err(log_execution_failure(err.into())),
            })
            .scan(false, |faulted, item| {
                if *faulted {
                    return future::ready(None);
                }
                *faulted = item.is_err();
                future::ready(Some(item))
            })
            .boxed()
    }

    fn prepare(&self) -> QueryResult<(CompiledPipeline, Materializer<T>)> {
        let processors = self.processors.seal();
        let compiled = self.compile()?;

        let stages = compiled.pipeline.len().to_string();
        observability::log_event_with_fields(
            Event::QueryExecuted,
            &[("entity", T::ENTITY_TYPE), ("stages", stages.as_str())],
        );

        let materializer = Materializer {
            yields_entities: compiled.yields_entities(),
            processors,
        };
        Ok((compiled, materializer))
    }
}

fn log_execution_failure(err: QueryError) -> QueryError {
    let message = err.to_string();
    observability::log_event_with_fields(
        Event::ExecutionFailed,
        &[("code", err.code()), ("message", message.as_str())],
    );
    err
}

/// Turns raw documents into result items
struct Materializer<T> {
    yields_entities: bool,
    processors: SealedChain<T>,
}

impl<T: Entity> Materializer<T> {
    fn materialize(&self, document: Value) -> QueryResult<QueryItem<T>> {
        if !self.yields_entities {
            return Ok(QueryItem::Projection(document));
        }

        let mut entity: T = serde_json::from_value(document)
            .map_err(|e| QueryError::materialization(T::ENTITY_TYPE, e.to_string()))?;
        self.processors.process(&mut entity)?;
        Ok(QueryItem::Entity(entity))
    }
}

/// One-shot cursor over the results of one execution.
///
/// Ends after the first error.
pub struct QueryCursor<T> {
    documents: DocumentCursor,
    materializer: Materializer<T>,
    yielded: usize,
    done: bool,
}

impl<T: Entity> Iterator for QueryCursor<T> {
    type Item = QueryResult<QueryItem<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = match self.documents.next() {
            Some(Ok(document)) => self.materializer.materialize(document),
            Some(Err(err)) => Err(log_execution_failure(err.into())),
            None => {
                self.done = true;
                let yielded = self.yielded.to_string();
                observability::log_event_with_fields(
                    Event::EnumerationComplete,
                    &[("entity", T::ENTITY_TYPE), ("yielded", yielded.as_str())],
                );
                return None;
            }
        };

        match &item {
            Ok(_) => self.yielded += 1,
            Err(_) => self.done = true,
        }
        Some(item)
    }
}
