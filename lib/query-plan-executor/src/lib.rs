use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use seam_query_planner::plan::QueryPlan;
use seam_query_planner::schema::ComposedSchema;

use crate::executors::map::SourceExecutorMap;

mod binding;
mod deep_merge;
mod error_normalization;
pub mod executors;
mod projection;
mod scheduler;
pub mod variables;

#[cfg(test)]
mod tests;

/// Runtime knobs for a single plan execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently in-flight sub-requests.
    pub max_concurrent_fetches: usize,
    /// Per-sub-request deadline; expiry fails that operation and its
    /// dependents, never the whole request.
    pub fetch_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_concurrent_fetches: 16,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Request-fatal failures. Everything else is reported as GraphQL errors
/// inside the result.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    VariableCoercion(String),
    #[error("skip/include variable '${0}' was not provided")]
    ConditionVariableMissing(String),
    #[error("skip/include variable '${0}' must be a boolean")]
    ConditionVariableNotBoolean(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
    pub fn new(
        data: Option<Value>,
        errors: Option<Vec<GraphQLError>>,
        extensions: Option<Map<String, Value>>,
    ) -> ExecutionResult {
        let final_data = match data {
            Some(data) if data.is_null() => None,
            _ => data,
        };
        let final_errors = match errors {
            Some(errors) if errors.is_empty() => None,
            _ => errors,
        };
        let final_extensions = match extensions {
            Some(extensions) if extensions.is_empty() => None,
            _ => extensions,
        };
        ExecutionResult {
            data: final_data,
            errors: final_errors,
            extensions: final_extensions,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GraphQLErrorLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>, // Path segments are strings or numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> GraphQLError {
        GraphQLError {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    pub fn at_path(message: impl Into<String>, path: Vec<Value>) -> GraphQLError {
        GraphQLError {
            message: message.into(),
            locations: None,
            path: Some(path),
            extensions: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GraphQLErrorLocation {
    pub line: usize,
    pub column: usize,
}

/// Executes a finished query plan against the given source schemas and
/// assembles one response in the client operation's shape.
///
/// The plan itself stays immutable and may be shared across requests; all
/// per-request state lives inside this call.
#[instrument(level = "debug", skip_all, fields(operation_name = ?plan.operation.name))]
pub async fn execute_query_plan(
    plan: &QueryPlan,
    schema: &ComposedSchema,
    executors: &SourceExecutorMap,
    variables: Option<Map<String, Value>>,
    config: &ExecutorConfig,
    cancel: &CancellationToken,
) -> Result<ExecutionResult, ExecuteError> {
    let variable_values = variables::collect_variable_values(&plan.operation, variables, schema)
        .map_err(ExecuteError::VariableCoercion)?;

    let outcome = scheduler::run(plan, executors, &variable_values, config, cancel).await?;

    let data =
        projection::project_by_operation(&plan.operation, schema, &variable_values, &outcome.data);
    Ok(ExecutionResult::new(
        Some(data),
        Some(outcome.errors),
        None,
    ))
}
