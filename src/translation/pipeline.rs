//! Pipeline assembly
//!
//! Translates an operation chain root-first, one stage per operation.
//! Stage order is exactly append order; there is no reordering pass.
//! Compilation is atomic: any failing operation fails the whole build.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::QueryConfig;
use crate::mapping::FieldMapping;
use crate::observability::{self, Event, Logger, Severity};
use crate::query::QueryOperation;

use super::errors::TranslationResult;
use super::field_path::{FieldPathResolver, FieldScope};
use super::operations::{OperationRegistry, TranslationContext};

/// A single aggregation stage, e.g. `{ "$match": { .. } }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PipelineStage {
    document: Map<String, Value>,
}

impl PipelineStage {
    /// Creates the stage `{ operator: body }`
    pub fn new(operator: &str, body: Value) -> Self {
        let mut document = Map::new();
        document.insert(operator.to_string(), body);
        Self { document }
    }

    /// Returns the stage operator (`$match`, `$project`, ...)
    pub fn operator(&self) -> &str {
        self.document.keys().next().map(String::as_str).unwrap_or("")
    }

    /// Returns the stage body
    pub fn body(&self) -> &Value {
        self.document.values().next().unwrap_or(&Value::Null)
    }

    /// Returns the stage as a document value
    pub fn to_document(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.document.clone()))
    }
}

/// An ordered sequence of stages
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineStage> {
        self.stages.iter()
    }

    /// Returns the stages as document values
    pub fn to_documents(&self) -> Vec<Value> {
        self.stages.iter().map(PipelineStage::to_document).collect()
    }

    /// Stable string form: a JSON array of stages, member order preserved
    pub fn to_query_string(&self) -> String {
        Value::Array(self.to_documents()).to_string()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

/// Output of a successful compile
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub pipeline: Pipeline,
    /// Shape of the documents the pipeline yields
    pub output_scope: FieldScope,
}

impl CompiledPipeline {
    /// Returns true if results are still documents of the root entity type
    pub fn yields_entities(&self) -> bool {
        self.output_scope.is_entity()
    }
}

/// Builds pipelines from operation chains
pub struct PipelineBuilder<'a> {
    registry: &'a OperationRegistry,
    mapping: &'a dyn FieldMapping,
    config: &'a QueryConfig,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        registry: &'a OperationRegistry,
        mapping: &'a dyn FieldMapping,
        config: &'a QueryConfig,
    ) -> Self {
        Self {
            registry,
            mapping,
            config,
        }
    }

    /// Compiles `operations` (root first) for documents of `entity_type`
    pub fn build(
        &self,
        entity_type: &str,
        operations: &[&QueryOperation],
    ) -> TranslationResult<CompiledPipeline> {
        let mut scope = FieldScope::Entity(entity_type.to_string());
        let mut stages = Vec::with_capacity(operations.len());

        for (index, operation) in operations.iter().enumerate() {
            let ctx = TranslationContext {
                mapping: self.mapping,
                scope: &scope,
                config: self.config,
            };

            // A Select changes the shape later operations resolve against
            let translated = self.registry.translate(operation, &ctx).and_then(|stage| {
                let next_scope = match operation {
                    QueryOperation::Select { projection } => Some(
                        FieldPathResolver::new(self.mapping).projected_scope(&scope, projection)?,
                    ),
                    _ => None,
                };
                Ok((stage, next_scope))
            });

            let (stage, next_scope) = match translated {
                Ok(step) => step,
                Err(err) => {
                    let message = err.to_string();
                    let position = index.to_string();
                    observability::log_event_with_fields(
                        Event::TranslationFailed,
                        &[
                            ("code", err.code()),
                            ("entity", entity_type),
                            ("message", message.as_str()),
                            ("operation", operation.kind().as_str()),
                            ("position", position.as_str()),
                        ],
                    );
                    return Err(err);
                }
            };

            if let Some(next_scope) = next_scope {
                scope = next_scope;
            }
            stages.push(stage);
        }

        let pipeline = Pipeline::new(stages);
        self.log_compiled(entity_type, &pipeline);

        Ok(CompiledPipeline {
            pipeline,
            output_scope: scope,
        })
    }

    fn log_compiled(&self, entity_type: &str, pipeline: &Pipeline) {
        let severity = if self.config.log_pipelines {
            Severity::Info
        } else {
            Severity::Trace
        };
        if !Logger::enabled(severity) {
            return;
        }

        let query = pipeline.to_query_string();
        let stages = pipeline.len().to_string();
        Logger::log(
            severity,
            Event::PipelineCompiled.as_str(),
            &[
                ("entity", entity_type),
                ("query", query.as_str()),
                ("stages", stages.as_str()),
            ],
        );
    }
}
