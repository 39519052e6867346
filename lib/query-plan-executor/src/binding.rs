use serde_json::{Map, Number, Value};

use seam_query_planner::ast::response_path::{PathSegment, ResponsePath};
use seam_query_planner::plan::{OperationNode, QueryPlan};
use seam_query_planner::schema::SchemaName;

use crate::GraphQLError;

/// One step of a concrete location in the response buffer, with list
/// positions resolved to element indices.
#[derive(Debug, Clone, PartialEq)]
pub enum PathPart {
    Key(String),
    Index(usize),
}

pub type ConcretePath = Vec<PathPart>;

pub fn to_error_path(path: &[PathPart]) -> Vec<Value> {
    path.iter()
        .map(|part| match part {
            PathPart::Key(key) => Value::String(key.clone()),
            PathPart::Index(index) => Value::Number(Number::from(*index)),
        })
        .collect()
}

pub fn value_at<'a>(buffer: &'a Value, path: &[PathPart]) -> Option<&'a Value> {
    let mut current = buffer;
    for part in path {
        current = match part {
            PathPart::Key(key) => current.as_object()?.get(key)?,
            PathPart::Index(index) => current.as_array()?.get(*index)?,
        };
    }
    Some(current)
}

pub fn value_at_mut<'a>(buffer: &'a mut Value, path: &[PathPart]) -> Option<&'a mut Value> {
    let mut current = buffer;
    for part in path {
        current = match part {
            PathPart::Key(key) => current.as_object_mut()?.get_mut(key)?,
            PathPart::Index(index) => current.as_array_mut()?.get_mut(*index)?,
        };
    }
    Some(current)
}

/// Enumerates the concrete locations an operation's context path stands for
/// in the current buffer. List segments fan out into one context per
/// element; null or missing branches contribute none.
pub fn collect_contexts(buffer: &Value, context_path: &ResponsePath) -> Vec<ConcretePath> {
    let mut contexts: Vec<ConcretePath> = vec![Vec::new()];
    for segment in context_path.segments() {
        let mut extended = Vec::new();
        for context in contexts {
            let Some(value) = value_at(buffer, &context) else {
                continue;
            };
            match segment {
                PathSegment::Field(name) => {
                    if let Value::Object(map) = value {
                        if map.get(name).map_or(false, |field| !field.is_null()) {
                            let mut next = context;
                            next.push(PathPart::Key(name.clone()));
                            extended.push(next);
                        }
                    }
                }
                PathSegment::List => {
                    if let Value::Array(items) = value {
                        for (index, item) in items.iter().enumerate() {
                            if !item.is_null() {
                                let mut next = context.clone();
                                next.push(PathPart::Index(index));
                                extended.push(next);
                            }
                        }
                    }
                }
            }
        }
        contexts = extended;
    }
    // Sub-request data only ever merges into objects.
    contexts.retain(|context| value_at(buffer, context).map_or(false, Value::is_object));
    contexts
}

/// Resolves every requirement of `operation` for one concrete context,
/// producing the values its requirement-fed variables are bound to.
///
/// A requirement's field path starts at the upstream operation's data root;
/// the leading segments shared with this operation's context are already
/// resolved by the context itself and are skipped.
pub fn bind_requirements(
    plan: &QueryPlan,
    operation: &OperationNode,
    buffer: &Value,
    context: &[PathPart],
) -> Result<Map<String, Value>, GraphQLError> {
    let mut bound = Map::new();
    for requirement_id in &operation.requirements {
        let Some(requirement) = plan.requirement(*requirement_id) else {
            continue;
        };
        let Some(upstream) = plan.operation(requirement.depends_on) else {
            continue;
        };
        if !operation.context_path.starts_with(&upstream.context_path) {
            return Err(binding_error(&requirement.name, &operation.schema, context));
        }
        let relative = operation.context_path.suffix_after(&upstream.context_path);
        let resolved_by_context = relative
            .segments()
            .iter()
            .filter(|segment| matches!(segment, PathSegment::Field(_)))
            .count();

        let mut value = value_at(buffer, context);
        for key in requirement.field_path.iter().skip(resolved_by_context) {
            value = value.and_then(Value::as_object).and_then(|map| map.get(key));
        }
        match value {
            Some(value) if !value.is_null() => {
                bound.insert(requirement.name.clone(), value.clone());
            }
            _ => return Err(binding_error(&requirement.name, &operation.schema, context)),
        }
    }
    Ok(bound)
}

fn binding_error(name: &str, schema: &SchemaName, context: &[PathPart]) -> GraphQLError {
    let message = format!(
        "Could not resolve requirement '${}' for source schema '{}'",
        name, schema
    );
    if context.is_empty() {
        GraphQLError::new(message)
    } else {
        GraphQLError::at_path(message, to_error_path(context))
    }
}
