use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::GraphQLError;

/// One sub-request on its way to a source schema.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SourceRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

/// A GraphQL-shaped response from a source schema. Transport failures are
/// reported the same way: no data, one error describing the failure.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SourceResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl SourceResponse {
    pub fn from_data(data: Value) -> SourceResponse {
        SourceResponse {
            data: Some(data),
            errors: None,
            extensions: None,
        }
    }

    pub fn from_error_message(message: String) -> SourceResponse {
        SourceResponse {
            data: None,
            errors: Some(vec![GraphQLError::new(message)]),
            extensions: None,
        }
    }
}

/// The dispatch capability for one source schema. Implementations own the
/// transport and are expected to honor the cancellation token.
#[async_trait]
pub trait SourceSchemaExecutor {
    async fn execute(&self, request: SourceRequest, cancel: &CancellationToken) -> SourceResponse;
}

pub type SourceExecutorArc = Arc<dyn SourceSchemaExecutor + Send + Sync>;
