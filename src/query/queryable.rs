//! Queryable facade
//!
//! The user-facing query handle. Building a query only appends operations;
//! nothing is compiled or executed until enumeration begins.
//!
//! # State Machine
//!
//! ```text
//! Unmaterialized ──iter/stream──► Enumerating ──► Exhausted
//!                                      │
//!                                      └────────► Faulted
//! ```
//!
//! Every enumeration recompiles and re-executes; results are never cached.
//! Processors must be registered before the first enumeration of any query
//! sharing the chain.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use serde_json::Value;

use crate::config::QueryConfig;
use crate::driver::PipelineDriver;
use crate::entity::Entity;
use crate::expression::Expr;
use crate::mapping::FieldMapping;
use crate::processor::{EntityProcessor, EntityProcessorChain};
use crate::translation::Pipeline;

use super::errors::{QueryError, QueryResult};
use super::operation::QueryOperation;
use super::provider::{QueryCursor, QueryProvider};
use super::result::QueryItem;

/// Lifecycle of a facade's most recent enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Chain built, nothing executed
    Unmaterialized,
    /// Results are being pulled
    Enumerating,
    /// The result sequence was drained
    Exhausted,
    /// Translation, execution or a processor failed
    Faulted,
}

/// Deferred query over entities of type `T`
pub struct Queryable<T> {
    provider: QueryProvider<T>,
    state: Arc<Mutex<QueryState>>,
}

impl<T> Clone for Queryable<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            state: Arc::new(Mutex::new(QueryState::Unmaterialized)),
        }
    }
}

impl<T: Entity> Queryable<T> {
    /// Creates a query over the whole collection of `T`
    pub fn new(driver: Arc<dyn PipelineDriver>, mapping: Arc<dyn FieldMapping>) -> Self {
        Self::from_provider(QueryProvider::new(driver, mapping, QueryConfig::default()))
    }

    /// Wraps an existing provider
    pub fn from_provider(provider: QueryProvider<T>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(QueryState::Unmaterialized)),
        }
    }

    /// Returns this query using `config` for compilation
    pub fn with_config(&self, config: QueryConfig) -> Self {
        Self::from_provider(self.provider.with_config(config))
    }

    fn append(&self, operation: QueryOperation) -> Self {
        Self::from_provider(self.provider.append(operation))
    }

    /// Appends `Where`
    pub fn filter(&self, predicate: Expr) -> Self {
        self.append(QueryOperation::Where { predicate })
    }

    /// Appends `Select`; later results are projections, not entities
    pub fn select(&self, projection: Expr) -> Self {
        self.append(QueryOperation::Select { projection })
    }

    /// Appends `OrderBy`
    pub fn order_by(&self, key: Expr) -> Self {
        self.append(QueryOperation::OrderBy { key })
    }

    /// Appends `OrderByDescending`
    pub fn order_by_descending(&self, key: Expr) -> Self {
        self.append(QueryOperation::OrderByDescending { key })
    }

    /// Appends `Skip`
    pub fn skip(&self, count: impl Into<Expr>) -> Self {
        self.append(QueryOperation::Skip {
            count: count.into(),
        })
    }

    /// Appends `Take`
    pub fn take(&self, count: impl Into<Expr>) -> Self {
        self.append(QueryOperation::Take {
            count: count.into(),
        })
    }

    /// Registers an entity processor on the shared chain
    pub fn add_processor(&self, processor: impl EntityProcessor<T> + 'static) -> QueryResult<()> {
        self.provider.processors().add(processor)
    }

    /// The processor chain shared with every query derived from this one
    pub fn processors(&self) -> &Arc<EntityProcessorChain<T>> {
        self.provider.processors()
    }

    pub fn provider(&self) -> &QueryProvider<T> {
        &self.provider
    }

    /// State of the most recent enumeration started from this handle
    pub fn state(&self) -> QueryState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compiles the chain without executing it
    pub fn pipeline(&self) -> QueryResult<Pipeline> {
        Ok(self.provider.compile()?.pipeline)
    }

    /// Compiles the chain and returns its stable string form
    pub fn to_query(&self) -> QueryResult<String> {
        Ok(self.pipeline()?.to_query_string())
    }

    /// Starts a new enumeration
    pub fn iter(&self) -> Enumeration<T> {
        set_state(&self.state, QueryState::Enumerating);
        match self.provider.execute() {
            Ok(cursor) => Enumeration {
                cursor: Some(cursor),
                pending: None,
                state: Arc::clone(&self.state),
            },
            Err(err) => {
                set_state(&self.state, QueryState::Faulted);
                Enumeration {
                    cursor: None,
                    pending: Some(err),
                    state: Arc::clone(&self.state),
                }
            }
        }
    }

    /// Drains a new enumeration into a list
    pub fn to_list(&self) -> QueryResult<Vec<QueryItem<T>>> {
        self.iter().collect()
    }

    /// Drains a new enumeration, expecting entity results only
    pub fn to_entities(&self) -> QueryResult<Vec<T>> {
        self.iter()
            .map(|item| match item? {
                QueryItem::Entity(entity) => Ok(entity),
                QueryItem::Projection(_) => Err(QueryError::materialization(
                    T::ENTITY_TYPE,
                    "query yields projected documents",
                )),
            })
            .collect()
    }

    /// Drains a new enumeration, expecting projected documents only
    pub fn to_projections(&self) -> QueryResult<Vec<Value>> {
        self.iter()
            .map(|item| match item? {
                QueryItem::Projection(document) => Ok(document),
                QueryItem::Entity(_) => Err(QueryError::materialization(
                    T::ENTITY_TYPE,
                    "query yields entities, not projections",
                )),
            })
            .collect()
    }

    /// Starts a new asynchronous enumeration
    pub fn stream(&self) -> BoxStream<'static, QueryResult<QueryItem<T>>> {
        set_state(&self.state, QueryState::Enumerating);
        let finished = Arc::clone(&self.state);
        let faulted = Arc::clone(&self.state);

        self.provider
            .execute_stream()
            .map(move |item| {
                if item.is_err() {
                    set_state(&faulted, QueryState::Faulted);
                }
                Some(item)
            })
            .chain(futures_util::stream::once(future::lazy(move |_| {
                let mut state = finished.lock().unwrap_or_else(PoisonError::into_inner);
                if *state == QueryState::Enumerating {
                    *state = QueryState::Exhausted;
                }
                None
            })))
            .filter_map(future::ready)
            .boxed()
    }
}

impl<T: Entity> IntoIterator for &Queryable<T> {
    type Item = QueryResult<QueryItem<T>>;
    type IntoIter = Enumeration<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn set_state(state: &Mutex<QueryState>, next: QueryState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// One enumeration of a [`Queryable`]
pub struct Enumeration<T> {
    cursor: Option<QueryCursor<T>>,
    pending: Option<QueryError>,
    state: Arc<Mutex<QueryState>>,
}

impl<T: Entity> Iterator for Enumeration<T> {
    type Item = QueryResult<QueryItem<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            set_state(&self.state, QueryState::Faulted);
            return Some(Err(err));
        }

        let cursor = self.cursor.as_mut()?;
        match cursor.next() {
            Some(Ok(item)) => Some(Ok(item)),
            Some(Err(err)) => {
                self.cursor = None;
                set_state(&self.state, QueryState::Faulted);
                Some(Err(err))
            }
            None => {
                self.cursor = None;
                set_state(&self.state, QueryState::Exhausted);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;
    use crate::expression::field;
    use crate::mapping::{EntityMapping, MappingRegistry};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Item {
        id: String,
        rank: i64,
    }

    impl Entity for Item {
        const ENTITY_TYPE: &'static str = "Item";
    }

    fn items() -> (Arc<MemoryDriver>, Queryable<Item>) {
        let driver = Arc::new(MemoryDriver::new(vec![
            json!({"Id": "a", "Rank": 2}),
            json!({"Id": "b", "Rank": 1}),
        ]));
        let mapping =
            Arc::new(MappingRegistry::new().with(EntityMapping::new("Item").members(["Id", "Rank"])));
        let query = Queryable::new(driver.clone(), mapping);
        (driver, query)
    }

    #[test]
    fn test_building_is_deferred() {
        let (driver, query) = items();
        let derived = query.filter(field("Rank").gt(0)).order_by(field("Rank")).take(1);
        assert_eq!(derived.state(), QueryState::Unmaterialized);
        assert_eq!(driver.execution_count(), 0);
    }

    #[test]
    fn test_state_transitions() {
        let (_, query) = items();
        let mut enumeration = query.iter();
        assert_eq!(query.state(), QueryState::Enumerating);
        while enumeration.next().is_some() {}
        assert_eq!(query.state(), QueryState::Exhausted);

        let broken = query.order_by(field("Missing"));
        assert!(broken.to_list().is_err());
        assert_eq!(broken.state(), QueryState::Faulted);
    }

    #[test]
    fn test_compile_failure_faults_before_first_pull() {
        let (driver, query) = items();
        let broken = query.filter(field("Missing").eq(1));

        let mut enumeration = broken.iter();
        assert_eq!(broken.state(), QueryState::Faulted);
        assert!(matches!(enumeration.next(), Some(Err(QueryError::Translation(_)))));
        assert!(enumeration.next().is_none());
        assert_eq!(broken.state(), QueryState::Faulted);
        assert_eq!(driver.execution_count(), 0);
    }

    #[test]
    fn test_reenumeration_reexecutes() {
        let (driver, query) = items();
        assert_eq!(query.to_list().unwrap().len(), 2);
        driver.insert(json!({"Id": "c", "Rank": 3}));
        assert_eq!(query.to_list().unwrap().len(), 3);
        assert_eq!(driver.execution_count(), 2);
    }

    #[test]
    fn test_to_entities_and_projections() {
        let (_, query) = items();
        let ranked = query.order_by(field("Rank"));
        let ids: Vec<_> = ranked
            .to_entities()
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);

        let projected = ranked.select(field("Id"));
        assert_eq!(
            projected.to_projections().unwrap(),
            vec![json!({"Id": "b"}), json!({"Id": "a"})]
        );
        assert!(projected.to_entities().is_err());
    }

    #[test]
    fn test_to_query() {
        let (_, query) = items();
        assert_eq!(
            query.skip(5).take(5).to_query().unwrap(),
            r#"[{"$skip":5},{"$limit":5}]"#
        );
    }
}
