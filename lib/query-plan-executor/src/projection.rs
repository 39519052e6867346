use std::collections::HashMap;

use serde_json::{Map, Value};

use seam_query_planner::ast::operation::OperationDefinition;
use seam_query_planner::ast::selection_item::SelectionItem;
use seam_query_planner::ast::selection_set::SelectionSet;
use seam_query_planner::schema::{ComposedSchema, TypeNode};

const TYPENAME_FIELD: &str = "__typename";

struct ProjectionContext<'a> {
    schema: &'a ComposedSchema,
    variables: &'a Option<HashMap<String, Value>>,
}

/// Shapes the merged buffer by the client operation's selections: aliases
/// honored, `__typename` answered, skip/include variables applied, values
/// the client never asked for (injected key fields) dropped, and non-null
/// violations propagated GraphQL-style within their own subtree.
pub fn project_by_operation(
    operation: &OperationDefinition,
    schema: &ComposedSchema,
    variables: &Option<HashMap<String, Value>>,
    buffer: &Value,
) -> Value {
    let context = ProjectionContext { schema, variables };
    let root_type = schema
        .root_type(operation.operation_kind)
        .unwrap_or("Query");
    let Some(object) = buffer.as_object() else {
        return Value::Null;
    };
    let mut projected = Map::new();
    if !project_fields_into(
        &context,
        root_type,
        object,
        &operation.selection_set,
        &mut projected,
    ) {
        return Value::Null;
    }
    Value::Object(projected)
}

/// Returns false when a non-null field nulled out, which nulls the
/// enclosing object.
fn project_fields_into(
    context: &ProjectionContext<'_>,
    type_name: &str,
    object: &Map<String, Value>,
    selections: &SelectionSet,
    out: &mut Map<String, Value>,
) -> bool {
    for item in &selections.items {
        match item {
            SelectionItem::Field(field) => {
                if !passes_conditions(context, &field.skip_if, &field.include_if) {
                    continue;
                }
                let key = field.response_key();
                if field.name == TYPENAME_FIELD {
                    out.insert(
                        key.to_string(),
                        Value::String(concrete_type(object, type_name)),
                    );
                    continue;
                }
                let Some(field_type) = context.schema.field_type(type_name, &field.name) else {
                    continue;
                };
                match project_value(context, field_type, object.get(key), &field.selections) {
                    Some(value) => {
                        out.insert(key.to_string(), value);
                    }
                    None => return false,
                }
            }
            SelectionItem::InlineFragment(fragment) => {
                if !passes_conditions(context, &fragment.skip_if, &fragment.include_if) {
                    continue;
                }
                if !fragment_applies(context, object, type_name, &fragment.type_condition) {
                    continue;
                }
                if !project_fields_into(
                    context,
                    &fragment.type_condition,
                    object,
                    &fragment.selections,
                    out,
                ) {
                    return false;
                }
            }
        }
    }
    true
}

/// `None` signals a non-null violation to the caller.
fn project_value(
    context: &ProjectionContext<'_>,
    declared_type: &TypeNode,
    value: Option<&Value>,
    selections: &SelectionSet,
) -> Option<Value> {
    match declared_type {
        TypeNode::NonNull(inner) => match project_value(context, inner, value, selections) {
            Some(Value::Null) => None,
            other => other,
        },
        TypeNode::List(inner) => match value {
            Some(Value::Array(items)) => {
                let mut projected = Vec::with_capacity(items.len());
                for item in items {
                    match project_value(context, inner, Some(item), selections) {
                        Some(item) => projected.push(item),
                        // A violated non-null element nulls the whole list
                        None => return Some(Value::Null),
                    }
                }
                Some(Value::Array(projected))
            }
            _ => Some(Value::Null),
        },
        TypeNode::Named(name) => {
            let Some(value) = value else {
                return Some(Value::Null);
            };
            if value.is_null() {
                return Some(Value::Null);
            }
            if selections.is_empty() {
                return Some(project_leaf(context, name, value));
            }
            let Some(object) = value.as_object() else {
                return Some(Value::Null);
            };
            let mut projected = Map::new();
            if !project_fields_into(context, name, object, selections, &mut projected) {
                return Some(Value::Null);
            }
            Some(Value::Object(projected))
        }
    }
}

fn project_leaf(context: &ProjectionContext<'_>, type_name: &str, value: &Value) -> Value {
    if let Some(enum_values) = context.schema.enum_values(type_name) {
        return match value.as_str() {
            Some(raw) if enum_values.contains(raw) => value.clone(),
            _ => Value::Null,
        };
    }
    value.clone()
}

fn passes_conditions(
    context: &ProjectionContext<'_>,
    skip_if: &Option<String>,
    include_if: &Option<String>,
) -> bool {
    if let Some(variable) = skip_if {
        if variable_is_true(context.variables, variable) {
            return false;
        }
    }
    if let Some(variable) = include_if {
        if !variable_is_true(context.variables, variable) {
            return false;
        }
    }
    true
}

fn variable_is_true(variables: &Option<HashMap<String, Value>>, name: &str) -> bool {
    matches!(
        variables.as_ref().and_then(|values| values.get(name)),
        Some(Value::Bool(true))
    )
}

fn concrete_type(object: &Map<String, Value>, static_type: &str) -> String {
    object
        .get(TYPENAME_FIELD)
        .and_then(Value::as_str)
        .unwrap_or(static_type)
        .to_string()
}

fn fragment_applies(
    context: &ProjectionContext<'_>,
    object: &Map<String, Value>,
    type_name: &str,
    condition: &str,
) -> bool {
    if condition == type_name {
        return true;
    }
    match object.get(TYPENAME_FIELD).and_then(Value::as_str) {
        Some(concrete) => context.schema.is_possible_type(condition, concrete),
        // Without a runtime type in the data the narrowing cannot be
        // re-checked; the source schema already applied it.
        None => true,
    }
}
