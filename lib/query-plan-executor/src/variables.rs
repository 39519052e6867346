use std::collections::HashMap;

use serde_json::{Map, Value};

use seam_query_planner::ast::operation::OperationDefinition;
use seam_query_planner::schema::{ComposedSchema, TypeNode};

/// Coerces the client-supplied variables against the operation's declared
/// definitions: defaults applied, non-null enforced, value kinds checked.
/// Runs before any dispatch; a failure here fails the whole request.
pub fn collect_variable_values(
    operation: &OperationDefinition,
    variables: Option<Map<String, Value>>,
    schema: &ComposedSchema,
) -> Result<Option<HashMap<String, Value>>, String> {
    if operation.variable_definitions.is_empty() {
        return Ok(None);
    }

    let mut supplied = variables.unwrap_or_default();
    let mut collected: HashMap<String, Value> = HashMap::new();

    for definition in &operation.variable_definitions {
        if let Some(value) = supplied.remove(&definition.name) {
            validate_runtime_value(&value, &definition.variable_type, schema)?;
            collected.insert(definition.name.clone(), value);
            continue;
        }
        if let Some(default_value) = &definition.default_value {
            let coerced: Value = default_value.into();
            validate_runtime_value(&coerced, &definition.variable_type, schema)?;
            collected.insert(definition.name.clone(), coerced);
            continue;
        }
        if definition.variable_type.is_non_null() {
            return Err(format!(
                "Variable '{}' is non-nullable but no value was provided",
                definition.name
            ));
        }
    }

    if collected.is_empty() {
        Ok(None)
    } else {
        Ok(Some(collected))
    }
}

fn validate_runtime_value(
    value: &Value,
    type_node: &TypeNode,
    schema: &ComposedSchema,
) -> Result<(), String> {
    match type_node {
        TypeNode::NonNull(inner) => {
            if value.is_null() {
                return Err(format!(
                    "Expected a non-null value of type '{}', got null",
                    inner
                ));
            }
            validate_runtime_value(value, inner, schema)
        }
        TypeNode::List(inner) => {
            if value.is_null() {
                return Ok(());
            }
            match value {
                Value::Array(items) => {
                    for item in items {
                        validate_runtime_value(item, inner, schema)?;
                    }
                    Ok(())
                }
                // A single value coerces to a one-item list
                other => validate_runtime_value(other, inner, schema),
            }
        }
        TypeNode::Named(name) => {
            if value.is_null() {
                return Ok(());
            }
            if let Some(enum_values) = schema.enum_values(name) {
                if let Value::String(raw) = value {
                    if !enum_values.contains(raw) {
                        return Err(format!(
                            "Value '{}' is not a valid enum value for type '{}'",
                            raw, name
                        ));
                    }
                    Ok(())
                } else {
                    Err(format!(
                        "Expected a string for enum type '{}', got {:?}",
                        name, value
                    ))
                }
            } else {
                match name.as_str() {
                    "String" => {
                        if value.is_string() {
                            Ok(())
                        } else {
                            Err(format!(
                                "Expected a string for type '{}', got {:?}",
                                name, value
                            ))
                        }
                    }
                    "ID" => {
                        if value.is_string() || value.is_number() {
                            Ok(())
                        } else {
                            Err(format!(
                                "Expected a string or number for type '{}', got {:?}",
                                name, value
                            ))
                        }
                    }
                    "Int" => {
                        if value.as_number().map_or(false, |num| num.is_i64()) {
                            Ok(())
                        } else {
                            Err(format!(
                                "Expected an integer for type '{}', got {:?}",
                                name, value
                            ))
                        }
                    }
                    "Float" => {
                        if value.is_number() {
                            Ok(())
                        } else {
                            Err(format!(
                                "Expected a number for type '{}', got {:?}",
                                name, value
                            ))
                        }
                    }
                    "Boolean" => {
                        if value.is_boolean() {
                            Ok(())
                        } else {
                            Err(format!(
                                "Expected a boolean for type '{}', got {:?}",
                                name, value
                            ))
                        }
                    }
                    // Custom scalars and input objects pass through unchecked
                    _ => Ok(()),
                }
            }
        }
    }
}
