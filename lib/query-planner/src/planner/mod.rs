use std::num::NonZeroUsize;
use std::sync::Arc;

use graphql_tools::parser::query as parser;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::instrument;

use crate::ast::document::{prepare_operation, DocumentError};
use crate::ast::hash::ast_hash;
use crate::ast::operation::{OperationDefinition, OperationKind};
use crate::plan::{PlanError, QueryPlan};
use crate::schema::{ComposedSchema, SchemaName};

mod walker;

use walker::Walker;

const PLAN_CACHE_SIZE: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("failed to prepare operation: {0}")]
    Document(#[from] DocumentError),
    #[error("failed to assemble plan: {0}")]
    Plan(#[from] PlanError),
    #[error("no source schema can serve field '{type_name}.{field_name}'")]
    UnresolvableField {
        type_name: String,
        field_name: String,
    },
    #[error("type '{type_name}' has no lookup into source schema '{schema}'")]
    NonEntityReference {
        type_name: String,
        schema: SchemaName,
    },
    #[error("the composed schema declares no root type for '{0}' operations")]
    MissingRootType(OperationKind),
    #[error("variable '${0}' is not declared by the operation")]
    UndefinedVariable(String),
    #[error("unknown composite type '{0}' in fragment condition")]
    UnknownType(String),
    #[error("planner invariant violated: {0}")]
    Internal(String),
}

/// Turns prepared client operations into query plans. Plans are immutable
/// and cached by a structural hash of the operation, so concurrent requests
/// for the same shape share one plan.
pub struct Planner {
    schema: ComposedSchema,
    cache: Mutex<LruCache<u64, Arc<QueryPlan>>>,
}

impl Planner {
    pub fn new(schema: ComposedSchema) -> Self {
        Planner {
            schema,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(PLAN_CACHE_SIZE).unwrap())),
        }
    }

    pub fn schema(&self) -> &ComposedSchema {
        &self.schema
    }

    #[instrument(level = "trace", skip_all, fields(operation_name))]
    pub fn plan(
        &self,
        document: &parser::Document<'static, String>,
        operation_name: Option<&str>,
    ) -> Result<Arc<QueryPlan>, PlannerError> {
        let operation = prepare_operation(document, operation_name)?;
        let key = ast_hash(&operation);

        if let Some(plan) = self.cache.lock().get(&key) {
            return Ok(plan.clone());
        }

        let plan = Arc::new(self.plan_operation(operation)?);
        self.cache.lock().put(key, plan.clone());
        Ok(plan)
    }

    /// Plans without touching the cache. Used by tests and by callers that
    /// manage caching themselves.
    pub fn plan_uncached(
        &self,
        document: &parser::Document<'static, String>,
        operation_name: Option<&str>,
    ) -> Result<QueryPlan, PlannerError> {
        let operation = prepare_operation(document, operation_name)?;
        self.plan_operation(operation)
    }

    fn plan_operation(&self, operation: OperationDefinition) -> Result<QueryPlan, PlannerError> {
        Walker::new(&self.schema, operation).walk()
    }
}
