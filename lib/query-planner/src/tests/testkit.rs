use std::path::PathBuf;
use std::sync::Once;

use lazy_static::lazy_static;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::plan::QueryPlan;
use crate::planner::{Planner, PlannerError};
use crate::schema::ComposedSchema;
use crate::utils::parsing::parse_schema;

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

pub fn read_composition(fixture_path: &str) -> ComposedSchema {
    let sdl_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(fixture_path);
    let sdl = std::fs::read_to_string(sdl_path).expect("Unable to read input file");
    ComposedSchema::new(&parse_schema(&sdl)).expect("failed to build composed schema")
}

pub fn build_query_plan(
    fixture_path: &str,
    document: graphql_tools::parser::query::Document<'static, String>,
) -> Result<QueryPlan, PlannerError> {
    let planner = Planner::new(read_composition(fixture_path));
    planner.plan_uncached(&document, None)
}
