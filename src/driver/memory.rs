//! In-memory pipeline driver
//!
//! Holds a collection of JSON documents and evaluates pipelines over a
//! snapshot of it. Execution count and injected failures make it usable as
//! a test double for a remote driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use serde_json::Value;

use crate::translation::{Pipeline, PipelineStage};

use super::errors::{DriverError, DriverResult};
use super::filters::PredicateFilter;
use super::projector::Projector;
use super::sorter::ResultSorter;
use super::{DocumentCursor, PipelineDriver};

/// Failure injected into the next executions
#[derive(Debug, Clone)]
enum Failure {
    /// `aggregate` itself fails
    OnAggregate(String),
    /// The cursor yields `after` documents, then an error
    MidStream { after: usize, message: String },
}

/// Evaluates pipelines over an in-memory collection
#[derive(Debug, Default)]
pub struct MemoryDriver {
    documents: RwLock<Vec<Value>>,
    executions: AtomicUsize,
    failure: Mutex<Option<Failure>>,
}

impl MemoryDriver {
    /// Creates a driver over `documents`
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
            executions: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Appends a document to the collection
    pub fn insert(&self, document: Value) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(document);
    }

    /// Number of documents in the collection
    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pipelines handed to this driver so far
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Makes every later `aggregate` call fail with `message`
    pub fn fail_on_aggregate(&self, message: impl Into<String>) {
        self.set_failure(Some(Failure::OnAggregate(message.into())));
    }

    /// Makes every later cursor fail after yielding `after` documents
    pub fn fail_after(&self, after: usize, message: impl Into<String>) {
        self.set_failure(Some(Failure::MidStream {
            after,
            message: message.into(),
        }));
    }

    /// Removes any injected failure
    pub fn clear_failure(&self) {
        self.set_failure(None);
    }

    fn set_failure(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = failure;
    }

    /// Runs every stage of `pipeline` over a snapshot of the collection
    pub fn evaluate(&self, pipeline: &Pipeline) -> DriverResult<Vec<Value>> {
        let mut documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for stage in pipeline.iter() {
            documents = Self::apply(stage, documents)?;
        }
        Ok(documents)
    }

    fn apply(stage: &PipelineStage, mut documents: Vec<Value>) -> DriverResult<Vec<Value>> {
        let operator = stage.operator();
        let body = stage.body();

        match operator {
            "$match" => {
                let predicate = body
                    .as_object()
                    .ok_or_else(|| DriverError::malformed(operator, "expected a document"))?;
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if PredicateFilter::matches(&document, predicate)? {
                        kept.push(document);
                    }
                }
                Ok(kept)
            }
            "$project" => {
                let shape = body
                    .as_object()
                    .ok_or_else(|| DriverError::malformed(operator, "expected a document"))?;
                documents
                    .iter()
                    .map(|document| Projector::project(document, shape))
                    .collect()
            }
            "$sort" => {
                let sort_doc = body
                    .as_object()
                    .ok_or_else(|| DriverError::malformed(operator, "expected a document"))?;
                ResultSorter::sort(&mut documents, sort_doc)?;
                Ok(documents)
            }
            "$skip" => {
                let count = Self::count(operator, body)?;
                Ok(documents.into_iter().skip(count).collect())
            }
            "$limit" => {
                let count = Self::count(operator, body)?;
                documents.truncate(count);
                Ok(documents)
            }
            other => Err(DriverError::UnsupportedStage(other.to_string())),
        }
    }

    fn count(operator: &str, body: &Value) -> DriverResult<usize> {
        body.as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| DriverError::malformed(operator, "expected a non-negative integer"))
    }
}

impl PipelineDriver for MemoryDriver {
    fn aggregate(&self, pipeline: &Pipeline) -> DriverResult<DocumentCursor> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match failure {
            Some(Failure::OnAggregate(message)) => Err(DriverError::ExecutionFailed(message)),
            Some(Failure::MidStream { after, message }) => {
                let documents = self.evaluate(pipeline)?;
                let cursor = documents
                    .into_iter()
                    .take(after)
                    .map(Ok)
                    .chain(std::iter::once(Err(DriverError::ExecutionFailed(message))));
                Ok(Box::new(cursor))
            }
            None => {
                let documents = self.evaluate(pipeline)?;
                Ok(Box::new(documents.into_iter().map(Ok)))
            }
        }
    }
}
