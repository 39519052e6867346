use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seam_query_planner::plan::QueryPlan;
use seam_query_planner::planner::Planner;
use seam_query_planner::schema::ComposedSchema;
use seam_query_planner::utils::parsing::{parse_operation, parse_schema};

use crate::executors::common::{SourceRequest, SourceResponse, SourceSchemaExecutor};
use crate::executors::map::SourceExecutorMap;
use crate::{execute_query_plan, ExecuteError, ExecutionResult, ExecutorConfig};

fn init_test_logger_internal() {
    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_bracketed_fields(true)
        .with_deferred_spans(false)
        .with_wraparound(25)
        .with_indent_lines(true)
        .with_timer(tracing_tree::time::Uptime::default())
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_targets(false);

    tracing_subscriber::registry()
        .with(tree_layer)
        .with(EnvFilter::from_default_env())
        .init();
}

lazy_static! {
    static ref TRACING_INIT: Once = Once::new();
}

pub fn init_logger() {
    TRACING_INIT.call_once(|| {
        init_test_logger_internal();
    });
}

pub fn federation_schema() -> ComposedSchema {
    let sdl_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src/tests/fixtures/federation.supergraph.graphql");
    let sdl = std::fs::read_to_string(sdl_path).expect("Unable to read input file");
    ComposedSchema::new(&parse_schema(&sdl)).expect("failed to build composed schema")
}

pub fn plan_for(operation: &str) -> (Planner, QueryPlan) {
    let planner = Planner::new(federation_schema());
    let plan = planner
        .plan_uncached(&parse_operation(operation), None)
        .expect("failed to plan operation");
    (planner, plan)
}

pub fn vars(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Runs a plan with default limits and a fresh cancellation token.
pub async fn execute(
    plan: &QueryPlan,
    schema: &ComposedSchema,
    executors: &SourceExecutorMap,
    variables: Option<Map<String, Value>>,
) -> Result<ExecutionResult, ExecuteError> {
    execute_query_plan(
        plan,
        schema,
        executors,
        variables,
        &ExecutorConfig::default(),
        &CancellationToken::new(),
    )
    .await
}

/// Replays one canned response and records every request it served.
pub struct StaticResponder {
    response: SourceResponse,
    calls: Mutex<Vec<SourceRequest>>,
}

impl StaticResponder {
    pub fn new(data: Value) -> Arc<StaticResponder> {
        Arc::new(StaticResponder {
            response: SourceResponse::from_data(data),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<StaticResponder> {
        Arc::new(StaticResponder {
            response: SourceResponse::from_error_message(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("responder lock poisoned").len()
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("responder lock poisoned")
            .iter()
            .map(|request| request.query.clone())
            .collect()
    }

    pub fn recorded_variables(&self) -> Vec<Option<Map<String, Value>>> {
        self.calls
            .lock()
            .expect("responder lock poisoned")
            .iter()
            .map(|request| request.variables.clone())
            .collect()
    }
}

#[async_trait]
impl SourceSchemaExecutor for StaticResponder {
    async fn execute(&self, request: SourceRequest, _cancel: &CancellationToken) -> SourceResponse {
        self.calls
            .lock()
            .expect("responder lock poisoned")
            .push(request);
        self.response.clone()
    }
}

/// Picks a canned response by the value of one request variable.
pub struct KeyedResponder {
    variable: String,
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<SourceRequest>>,
}

impl KeyedResponder {
    pub fn new(variable: &str, responses: Vec<(&str, Value)>) -> Arc<KeyedResponder> {
        Arc::new(KeyedResponder {
            variable: variable.to_string(),
            responses: responses
                .into_iter()
                .map(|(key, data)| (key.to_string(), data))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("responder lock poisoned").len()
    }

    pub fn recorded_variables(&self) -> Vec<Option<Map<String, Value>>> {
        self.calls
            .lock()
            .expect("responder lock poisoned")
            .iter()
            .map(|request| request.variables.clone())
            .collect()
    }
}

#[async_trait]
impl SourceSchemaExecutor for KeyedResponder {
    async fn execute(&self, request: SourceRequest, _cancel: &CancellationToken) -> SourceResponse {
        let key = request
            .variables
            .as_ref()
            .and_then(|variables| variables.get(&self.variable))
            .and_then(Value::as_str)
            .map(str::to_string);
        self.calls
            .lock()
            .expect("responder lock poisoned")
            .push(request);
        match key.and_then(|key| self.responses.get(&key)) {
            Some(data) => SourceResponse::from_data(data.clone()),
            None => SourceResponse::from_error_message(format!(
                "no canned response keyed by ${}",
                self.variable
            )),
        }
    }
}

/// Never answers; exercises deadline handling.
pub struct HangingResponder;

#[async_trait]
impl SourceSchemaExecutor for HangingResponder {
    async fn execute(&self, _request: SourceRequest, _cancel: &CancellationToken) -> SourceResponse {
        std::future::pending().await
    }
}

/// Shared high-water mark for requests in flight across responders.
pub struct FlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl FlightGauge {
    pub fn new() -> Arc<FlightGauge> {
        Arc::new(FlightGauge {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Answers after a short pause while reporting to a shared gauge.
pub struct GaugeResponder {
    data: Value,
    gauge: Arc<FlightGauge>,
}

impl GaugeResponder {
    pub fn new(data: Value, gauge: Arc<FlightGauge>) -> Arc<GaugeResponder> {
        Arc::new(GaugeResponder { data, gauge })
    }
}

#[async_trait]
impl SourceSchemaExecutor for GaugeResponder {
    async fn execute(&self, _request: SourceRequest, _cancel: &CancellationToken) -> SourceResponse {
        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        SourceResponse::from_data(self.data.clone())
    }
}

/// Cancels the whole request from inside a sub-request, then never answers.
pub struct CancelThenHang {
    calls: AtomicUsize,
}

impl CancelThenHang {
    pub fn new() -> Arc<CancelThenHang> {
        Arc::new(CancelThenHang {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceSchemaExecutor for CancelThenHang {
    async fn execute(&self, _request: SourceRequest, cancel: &CancellationToken) -> SourceResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        cancel.cancel();
        std::future::pending().await
    }
}
