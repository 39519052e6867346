use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace};

use seam_query_planner::ast::selection_item::SelectionItem;
use seam_query_planner::ast::selection_set::SelectionSet;
use seam_query_planner::plan::{ConditionNode, OperationNode, PlanNode, PlanNodeId, QueryPlan};

use crate::binding::{bind_requirements, collect_contexts, value_at_mut, ConcretePath, PathPart};
use crate::deep_merge::deep_merge;
use crate::error_normalization::rebase_source_errors;
use crate::executors::common::{SourceRequest, SourceResponse};
use crate::executors::map::SourceExecutorMap;
use crate::{ExecuteError, ExecutorConfig, GraphQLError};

/// The merged source data plus every error raised on the way there.
pub struct SchedulerOutcome {
    pub data: Value,
    pub errors: Vec<GraphQLError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OpState {
    Pending,
    Ready,
    Dispatched,
    Completed,
    Failed,
    Skipped,
}

struct OpRun {
    state: OpState,
    /// Unfinished upstream operations.
    remaining: usize,
    /// Sub-requests still in flight for this operation.
    outstanding: usize,
    successes: usize,
}

/// A bound sub-request waiting for dispatch capacity.
struct PendingUnit {
    op_id: PlanNodeId,
    context: ConcretePath,
    schema_name: String,
    request: SourceRequest,
}

struct UnitOutcome {
    op_id: PlanNodeId,
    context: ConcretePath,
    /// `None` when the sub-request hit the configured deadline.
    response: Option<SourceResponse>,
}

/// Drives every operation of the plan to a terminal state, merging source
/// data into one buffer as responses arrive. Operations become ready when
/// all upstream operations they require data from have completed; a failed
/// or skipped upstream settles its dependents without dispatching them.
#[instrument(level = "debug", skip_all, fields(operations = plan.operation_order().len()))]
pub async fn run(
    plan: &QueryPlan,
    executors: &SourceExecutorMap,
    variable_values: &Option<HashMap<String, Value>>,
    config: &ExecutorConfig,
    cancel: &CancellationToken,
) -> Result<SchedulerOutcome, ExecuteError> {
    if cancel.is_cancelled() {
        return Err(ExecuteError::Cancelled);
    }
    check_condition_variables(plan, variable_values)?;

    let mut runs: HashMap<PlanNodeId, OpRun> = HashMap::new();
    let mut dependents: HashMap<PlanNodeId, Vec<PlanNodeId>> = HashMap::new();
    for (id, _) in plan.operations() {
        let upstream = plan.operation_dependencies(id);
        for dep in &upstream {
            dependents.entry(*dep).or_default().push(id);
        }
        runs.insert(
            id,
            OpRun {
                state: OpState::Pending,
                remaining: upstream.len(),
                outstanding: 0,
                successes: 0,
            },
        );
    }

    let mut errors: Vec<GraphQLError> = Vec::new();
    let mut buffer = Value::Object(Map::new());
    let mut ready: VecDeque<PlanNodeId> = VecDeque::new();
    let mut queue: VecDeque<PendingUnit> = VecDeque::new();

    let mut skipped = BTreeSet::new();
    for root in plan.roots() {
        collect_skipped(plan, variable_values, *root, true, &mut skipped);
    }
    for id in &skipped {
        settle(&mut runs, &dependents, &mut ready, *id, OpState::Skipped);
    }

    for id in plan.operation_order() {
        if let Some(run) = runs.get_mut(id) {
            if run.state == OpState::Pending && run.remaining == 0 {
                run.state = OpState::Ready;
                ready.push_back(*id);
            }
        }
    }

    let capacity = config.max_concurrent_fetches.max(1);
    let mut in_flight = FuturesUnordered::new();
    loop {
        while let Some(id) = ready.pop_front() {
            prepare_dispatch(
                plan,
                variable_values,
                &buffer,
                id,
                &mut runs,
                &dependents,
                &mut ready,
                &mut queue,
                &mut errors,
            );
        }
        while in_flight.len() < capacity {
            let Some(unit) = queue.pop_front() else {
                break;
            };
            in_flight.push(dispatch_unit(executors, cancel, config.fetch_timeout, unit));
        }
        if in_flight.is_empty() {
            break;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecuteError::Cancelled),
            Some(outcome) = in_flight.next() => {
                absorb_unit(
                    plan,
                    outcome,
                    &mut buffer,
                    &mut runs,
                    &dependents,
                    &mut ready,
                    &mut errors,
                );
            }
        }
    }

    Ok(SchedulerOutcome {
        data: buffer,
        errors,
    })
}

/// Fans the operation out over its concrete contexts, binds requirement
/// values, and queues one sub-request per bindable context.
fn prepare_dispatch(
    plan: &QueryPlan,
    variable_values: &Option<HashMap<String, Value>>,
    buffer: &Value,
    id: PlanNodeId,
    runs: &mut HashMap<PlanNodeId, OpRun>,
    dependents: &HashMap<PlanNodeId, Vec<PlanNodeId>>,
    ready: &mut VecDeque<PlanNodeId>,
    queue: &mut VecDeque<PendingUnit>,
    errors: &mut Vec<GraphQLError>,
) {
    let Some(operation) = plan.operation(id) else {
        return;
    };
    let contexts = if operation.context_path.is_root() {
        vec![Vec::new()]
    } else {
        collect_contexts(buffer, &operation.context_path)
    };
    if contexts.is_empty() {
        // Nothing upstream produced an entity to extend.
        trace!(?id, "no contexts to serve, completing");
        settle(runs, dependents, ready, id, OpState::Completed);
        return;
    }

    let mut bound = Vec::with_capacity(contexts.len());
    for context in contexts {
        match bind_requirements(plan, operation, buffer, &context) {
            Ok(bindings) => bound.push((context, bindings)),
            Err(error) => errors.push(error),
        }
    }
    if bound.is_empty() {
        settle(runs, dependents, ready, id, OpState::Failed);
        return;
    }

    let query = plan.operation_document(id);
    let unit_count = bound.len();
    trace!(?id, schema = %operation.schema, units = unit_count, "dispatching");
    for (context, bindings) in bound {
        let variables = assemble_variables(operation, variable_values, &bindings);
        queue.push_back(PendingUnit {
            op_id: id,
            context,
            schema_name: operation.schema.as_str().to_string(),
            request: SourceRequest {
                query: query.clone(),
                operation_name: None,
                variables,
            },
        });
    }
    if let Some(run) = runs.get_mut(&id) {
        run.state = OpState::Dispatched;
        run.outstanding = unit_count;
    }
}

async fn dispatch_unit(
    executors: &SourceExecutorMap,
    cancel: &CancellationToken,
    fetch_timeout: Duration,
    unit: PendingUnit,
) -> UnitOutcome {
    let PendingUnit {
        op_id,
        context,
        schema_name,
        request,
    } = unit;
    let response = tokio::time::timeout(fetch_timeout, executors.execute(&schema_name, request, cancel))
        .await
        .ok();
    UnitOutcome {
        op_id,
        context,
        response,
    }
}

/// Folds one finished sub-request into the buffer and the error list, and
/// settles the operation once its last unit is in.
fn absorb_unit(
    plan: &QueryPlan,
    outcome: UnitOutcome,
    buffer: &mut Value,
    runs: &mut HashMap<PlanNodeId, OpRun>,
    dependents: &HashMap<PlanNodeId, Vec<PlanNodeId>>,
    ready: &mut VecDeque<PlanNodeId>,
    errors: &mut Vec<GraphQLError>,
) {
    let UnitOutcome {
        op_id,
        context,
        response,
    } = outcome;
    let Some(operation) = plan.operation(op_id) else {
        return;
    };
    let mut mount_path = context.clone();
    if let Some(key) = operation
        .lookup
        .as_ref()
        .and_then(|lookup| lookup.mount_key.as_deref())
    {
        mount_path.push(PathPart::Key(key.to_string()));
    }

    let mut succeeded = false;
    match response {
        None => {
            let message = format!("Request to source schema '{}' timed out", operation.schema);
            errors.extend(rebase_source_errors(
                operation.schema.as_str(),
                &mount_path,
                None,
                vec![GraphQLError::new(message)],
            ));
        }
        Some(response) => {
            if let Some(source_errors) = response.errors {
                let lookup_field = operation.lookup.as_ref().map(|lookup| lookup.field.as_str());
                errors.extend(rebase_source_errors(
                    operation.schema.as_str(),
                    &mount_path,
                    lookup_field,
                    source_errors,
                ));
            }
            match response.data {
                Some(data) if !data.is_null() => {
                    succeeded = true;
                    merge_unit_data(operation, buffer, &context, data);
                }
                _ => {}
            }
        }
    }

    let mut settled = None;
    if let Some(run) = runs.get_mut(&op_id) {
        if succeeded {
            run.successes += 1;
        }
        run.outstanding = run.outstanding.saturating_sub(1);
        if run.outstanding == 0 {
            settled = Some(if run.successes > 0 {
                OpState::Completed
            } else {
                OpState::Failed
            });
        }
    }
    if let Some(state) = settled {
        settle(runs, dependents, ready, op_id, state);
    }
}

fn merge_unit_data(
    operation: &OperationNode,
    buffer: &mut Value,
    context: &[PathPart],
    data: Value,
) {
    let Some(lookup) = &operation.lookup else {
        deep_merge(buffer, data);
        return;
    };
    let Value::Object(mut data_map) = data else {
        return;
    };
    let Some(lookup_value) = data_map.remove(&lookup.field) else {
        return;
    };
    if lookup_value.is_null() {
        // The source could not resolve this entity; leave the buffer as is.
        return;
    }
    match &lookup.mount_key {
        None => {
            if let Some(target) = value_at_mut(buffer, context) {
                deep_merge(target, lookup_value);
            }
        }
        Some(key) => {
            let Some(parent) = value_at_mut(buffer, context).and_then(Value::as_object_mut) else {
                return;
            };
            match parent.get_mut(key) {
                Some(existing) => deep_merge(existing, lookup_value),
                None => {
                    parent.insert(key.clone(), lookup_value);
                }
            }
        }
    }
}

fn assemble_variables(
    operation: &OperationNode,
    variable_values: &Option<HashMap<String, Value>>,
    bindings: &Map<String, Value>,
) -> Option<Map<String, Value>> {
    let mut variables = Map::new();
    for name in operation.variables.keys() {
        if let Some(value) = bindings.get(name) {
            variables.insert(name.clone(), value.clone());
        } else if let Some(value) = variable_values.as_ref().and_then(|values| values.get(name)) {
            variables.insert(name.clone(), value.clone());
        }
        // A declared variable with neither a binding nor a client value
        // stays absent, which is not the same as null.
    }
    if variables.is_empty() {
        None
    } else {
        Some(variables)
    }
}

/// Moves `id` (and, for failures and skips, its pending dependents) to a
/// terminal state. Completion releases dependents whose upstreams are all
/// done.
fn settle(
    runs: &mut HashMap<PlanNodeId, OpRun>,
    dependents: &HashMap<PlanNodeId, Vec<PlanNodeId>>,
    ready: &mut VecDeque<PlanNodeId>,
    id: PlanNodeId,
    state: OpState,
) {
    let mut worklist = vec![(id, state)];
    while let Some((id, state)) = worklist.pop() {
        let Some(run) = runs.get_mut(&id) else {
            continue;
        };
        if matches!(
            run.state,
            OpState::Completed | OpState::Failed | OpState::Skipped
        ) {
            continue;
        }
        run.state = state;
        let Some(downstream) = dependents.get(&id) else {
            continue;
        };
        match state {
            OpState::Completed => {
                for dependent in downstream {
                    let Some(dep_run) = runs.get_mut(dependent) else {
                        continue;
                    };
                    dep_run.remaining = dep_run.remaining.saturating_sub(1);
                    if dep_run.remaining == 0 && dep_run.state == OpState::Pending {
                        dep_run.state = OpState::Ready;
                        ready.push_back(*dependent);
                    }
                }
            }
            OpState::Failed | OpState::Skipped => {
                // Dependents can never bind their requirements now; settle
                // them quietly instead of piling on derived errors.
                for dependent in downstream {
                    if runs.get(dependent).map(|run| run.state) == Some(OpState::Pending) {
                        worklist.push((*dependent, state));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Every skip/include variable, whether it gates a whole operation or a
/// single field, must arrive as a boolean before anything is dispatched.
fn check_condition_variables(
    plan: &QueryPlan,
    variable_values: &Option<HashMap<String, Value>>,
) -> Result<(), ExecuteError> {
    let mut names = BTreeSet::new();
    for root in plan.roots() {
        collect_plan_condition_variables(plan, *root, &mut names);
    }
    collect_selection_condition_variables(&plan.operation.selection_set, &mut names);
    for name in names {
        match variable_values.as_ref().and_then(|values| values.get(&name)) {
            Some(Value::Bool(_)) => {}
            Some(_) => return Err(ExecuteError::ConditionVariableNotBoolean(name)),
            None => return Err(ExecuteError::ConditionVariableMissing(name)),
        }
    }
    Ok(())
}

fn collect_plan_condition_variables(plan: &QueryPlan, id: PlanNodeId, out: &mut BTreeSet<String>) {
    match plan.node(id) {
        PlanNode::Condition(condition) => {
            out.insert(condition.variable.clone());
            for child in &condition.nodes {
                collect_plan_condition_variables(plan, *child, out);
            }
        }
        PlanNode::Operation(operation) => {
            for child in &operation.children {
                collect_plan_condition_variables(plan, *child, out);
            }
        }
        _ => {}
    }
}

fn collect_selection_condition_variables(selections: &SelectionSet, out: &mut BTreeSet<String>) {
    for item in &selections.items {
        match item {
            SelectionItem::Field(field) => {
                if let Some(variable) = &field.skip_if {
                    out.insert(variable.clone());
                }
                if let Some(variable) = &field.include_if {
                    out.insert(variable.clone());
                }
                collect_selection_condition_variables(&field.selections, out);
            }
            SelectionItem::InlineFragment(fragment) => {
                if let Some(variable) = &fragment.skip_if {
                    out.insert(variable.clone());
                }
                if let Some(variable) = &fragment.include_if {
                    out.insert(variable.clone());
                }
                collect_selection_condition_variables(&fragment.selections, out);
            }
        }
    }
}

/// Marks operations sitting under a failing condition gate. Operations
/// nested below a skipped one are skipped with it.
fn collect_skipped(
    plan: &QueryPlan,
    variable_values: &Option<HashMap<String, Value>>,
    id: PlanNodeId,
    active: bool,
    skipped: &mut BTreeSet<PlanNodeId>,
) {
    match plan.node(id) {
        PlanNode::Condition(condition) => {
            let passes = condition_passes(variable_values, condition);
            for child in &condition.nodes {
                collect_skipped(plan, variable_values, *child, active && passes, skipped);
            }
        }
        PlanNode::Operation(operation) => {
            if !active {
                skipped.insert(id);
            }
            for child in &operation.children {
                collect_skipped(plan, variable_values, *child, active, skipped);
            }
        }
        _ => {}
    }
}

fn condition_passes(
    variable_values: &Option<HashMap<String, Value>>,
    condition: &ConditionNode,
) -> bool {
    let value = matches!(
        variable_values.as_ref().and_then(|values| values.get(&condition.variable)),
        Some(Value::Bool(true))
    );
    value == condition.passing_value
}
