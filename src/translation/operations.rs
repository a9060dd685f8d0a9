//! Operation translators
//!
//! One translator per query operation, each producing exactly one stage:
//!
//! | Operation                     | Stage      |
//! |-------------------------------|------------|
//! | Where                         | `$match`   |
//! | Select                        | `$project` |
//! | OrderBy / OrderByDescending   | `$sort`    |
//! | Skip                          | `$skip`    |
//! | Take                          | `$limit`   |
//!
//! Dispatch goes through a static registry keyed by [`OperationKind`].
//! Adding an operation means adding a translator and registering it here.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::config::QueryConfig;
use crate::expression::{Expr, Literal};
use crate::mapping::FieldMapping;
use crate::query::{OperationKind, QueryOperation};

use super::errors::{TranslationError, TranslationResult};
use super::expression::ExpressionTranslator;
use super::field_path::{FieldPathResolver, FieldScope};
use super::pipeline::PipelineStage;

/// Everything a translator may consult
pub struct TranslationContext<'a> {
    pub mapping: &'a dyn FieldMapping,
    /// Shape of the documents entering this stage
    pub scope: &'a FieldScope,
    pub config: &'a QueryConfig,
}

impl<'a> TranslationContext<'a> {
    /// Returns a sub-expression translator bound to this context
    pub fn expressions(&self) -> ExpressionTranslator<'a> {
        ExpressionTranslator::new(
            FieldPathResolver::new(self.mapping),
            self.scope,
            self.config.connective_flattening,
        )
    }
}

/// Lowers one kind of query operation into a pipeline stage
pub trait OperationTranslator: Send + Sync {
    /// Operation kinds handled by this translator
    fn kinds(&self) -> &'static [OperationKind];

    /// Translates `operation` into a single stage
    fn translate(
        &self,
        operation: &QueryOperation,
        ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage>;
}

fn mismatched(translator: &str, operation: &QueryOperation) -> TranslationError {
    TranslationError::unsupported(format!(
        "{} cannot translate {}",
        translator,
        operation.kind()
    ))
}

/// `Where` → `$match`
pub struct WhereTranslator;

impl OperationTranslator for WhereTranslator {
    fn kinds(&self) -> &'static [OperationKind] {
        &[OperationKind::Where]
    }

    fn translate(
        &self,
        operation: &QueryOperation,
        ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage> {
        let QueryOperation::Where { predicate } = operation else {
            return Err(mismatched("WhereTranslator", operation));
        };
        let lowered = ctx.expressions().predicate(predicate)?;
        Ok(PipelineStage::new("$match", Value::Object(lowered)))
    }
}

/// `Select` → `$project`, with `_id` suppressed unless projected
pub struct SelectTranslator;

impl OperationTranslator for SelectTranslator {
    fn kinds(&self) -> &'static [OperationKind] {
        &[OperationKind::Select]
    }

    fn translate(
        &self,
        operation: &QueryOperation,
        ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage> {
        let QueryOperation::Select { projection } = operation else {
            return Err(mismatched("SelectTranslator", operation));
        };
        let expressions = ctx.expressions();

        let mut shape = match projection {
            Expr::Member { .. } => {
                let path = expressions.field_path(projection)?;
                let mut shape = Map::new();
                shape.insert(path.clone(), Value::String(format!("${}", path)));
                shape
            }
            Expr::New(_) => match expressions.projection(projection)? {
                Value::Object(shape) => shape,
                other => {
                    return Err(TranslationError::unsupported(format!(
                        "projection lowered to non-document {}",
                        other
                    )))
                }
            },
            other => {
                return Err(TranslationError::unsupported(format!(
                    "{} as Select projection",
                    other.describe()
                )))
            }
        };

        if shape.is_empty() {
            return Err(TranslationError::unsupported("empty object construction"));
        }
        if !shape.contains_key("_id") {
            shape.insert("_id".into(), Value::from(0));
        }
        Ok(PipelineStage::new("$project", Value::Object(shape)))
    }
}

/// `OrderBy` / `OrderByDescending` → single-key `$sort`
pub struct OrderByTranslator;

impl OperationTranslator for OrderByTranslator {
    fn kinds(&self) -> &'static [OperationKind] {
        &[OperationKind::OrderBy, OperationKind::OrderByDescending]
    }

    fn translate(
        &self,
        operation: &QueryOperation,
        ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage> {
        let (key, direction) = match operation {
            QueryOperation::OrderBy { key } => (key, 1),
            QueryOperation::OrderByDescending { key } => (key, -1),
            _ => return Err(mismatched("OrderByTranslator", operation)),
        };

        let path = ctx.expressions().sort_key(key)?;
        let mut sort = Map::new();
        sort.insert(path, Value::from(direction));
        Ok(PipelineStage::new("$sort", Value::Object(sort)))
    }
}

/// Reads a skip/take count: a non-negative integer constant
fn count_argument(operation: OperationKind, count: &Expr) -> TranslationResult<u64> {
    match count {
        Expr::Constant(Literal::UInt(n)) => Err(TranslationError::invalid_argument(format!(
            "{} count {} exceeds i64::MAX",
            operation, n
        ))),
        Expr::Constant(literal) => literal.as_count().ok_or_else(|| {
            TranslationError::invalid_argument(format!(
                "{} count must be a non-negative integer, got {:?}",
                operation, literal
            ))
        }),
        other => Err(TranslationError::invalid_argument(format!(
            "{} count must be a constant, got {}",
            operation,
            other.describe()
        ))),
    }
}

/// `Skip` → `$skip`
pub struct SkipTranslator;

impl OperationTranslator for SkipTranslator {
    fn kinds(&self) -> &'static [OperationKind] {
        &[OperationKind::Skip]
    }

    fn translate(
        &self,
        operation: &QueryOperation,
        _ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage> {
        let QueryOperation::Skip { count } = operation else {
            return Err(mismatched("SkipTranslator", operation));
        };
        let count = count_argument(OperationKind::Skip, count)?;
        Ok(PipelineStage::new("$skip", Value::from(count)))
    }
}

/// `Take` → `$limit`
pub struct TakeTranslator;

impl OperationTranslator for TakeTranslator {
    fn kinds(&self) -> &'static [OperationKind] {
        &[OperationKind::Take]
    }

    fn translate(
        &self,
        operation: &QueryOperation,
        _ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage> {
        let QueryOperation::Take { count } = operation else {
            return Err(mismatched("TakeTranslator", operation));
        };
        let count = count_argument(OperationKind::Take, count)?;
        Ok(PipelineStage::new("$limit", Value::from(count)))
    }
}

static WHERE: WhereTranslator = WhereTranslator;
static SELECT: SelectTranslator = SelectTranslator;
static ORDER_BY: OrderByTranslator = OrderByTranslator;
static SKIP: SkipTranslator = SkipTranslator;
static TAKE: TakeTranslator = TakeTranslator;

/// Translator dispatch table keyed by operation kind
pub struct OperationRegistry {
    translators: HashMap<OperationKind, &'static dyn OperationTranslator>,
}

impl OperationRegistry {
    /// Creates a registry with no translators
    pub fn empty() -> Self {
        Self {
            translators: HashMap::new(),
        }
    }

    /// Returns the shared registry of built-in translators
    pub fn standard() -> &'static OperationRegistry {
        static STANDARD: OnceLock<OperationRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = OperationRegistry::empty();
            registry.register(&WHERE);
            registry.register(&SELECT);
            registry.register(&ORDER_BY);
            registry.register(&SKIP);
            registry.register(&TAKE);
            registry
        })
    }

    /// Registers `translator` for every kind it declares, replacing any
    /// previous translator for those kinds
    pub fn register(&mut self, translator: &'static dyn OperationTranslator) {
        for kind in translator.kinds() {
            self.translators.insert(*kind, translator);
        }
    }

    /// Returns true if `kind` has a translator
    pub fn supports(&self, kind: OperationKind) -> bool {
        self.translators.contains_key(&kind)
    }

    /// Dispatches `operation` to its translator
    pub fn translate(
        &self,
        operation: &QueryOperation,
        ctx: &TranslationContext<'_>,
    ) -> TranslationResult<PipelineStage> {
        let kind = operation.kind();
        let translator = self.translators.get(&kind).ok_or_else(|| {
            TranslationError::unsupported(format!("no translator registered for {}", kind))
        })?;
        translator.translate(operation, ctx)
    }
}
