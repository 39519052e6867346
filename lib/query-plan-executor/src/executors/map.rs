use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::executors::common::{SourceExecutorArc, SourceRequest, SourceResponse};

/// Source-schema name to executor. Built once at startup and shared by all
/// requests.
pub struct SourceExecutorMap {
    inner: HashMap<String, SourceExecutorArc>,
}

impl Default for SourceExecutorMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceExecutorMap {
    pub fn new() -> Self {
        SourceExecutorMap {
            inner: HashMap::new(),
        }
    }

    pub fn insert(&mut self, schema_name: impl Into<String>, executor: SourceExecutorArc) {
        self.inner.insert(schema_name.into(), executor);
    }

    #[instrument(level = "trace", name = "source_execute", skip_all, fields(schema_name = %schema_name))]
    pub async fn execute(
        &self,
        schema_name: &str,
        request: SourceRequest,
        cancel: &CancellationToken,
    ) -> SourceResponse {
        match self.inner.get(schema_name) {
            Some(executor) => executor.execute(request, cancel).await,
            None => {
                warn!("No executor registered for source schema: {}", schema_name);
                SourceResponse::from_error_message(format!(
                    "No executor registered for source schema: {}",
                    schema_name
                ))
            }
        }
    }
}

impl FromIterator<(String, SourceExecutorArc)> for SourceExecutorMap {
    fn from_iter<I: IntoIterator<Item = (String, SourceExecutorArc)>>(iter: I) -> Self {
        SourceExecutorMap {
            inner: iter.into_iter().collect(),
        }
    }
}
