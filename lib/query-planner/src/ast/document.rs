use std::collections::HashMap;

use graphql_tools::parser::query as parser;

use super::arguments::ArgumentsMap;
use super::operation::{OperationDefinition, OperationKind};
use super::selection_item::SelectionItem;
use super::selection_set::{FieldSelection, InlineFragmentSelection, SelectionSet};

#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("document contains no executable operation")]
    MissingOperation,
    #[error("operation '{0}' not found in document")]
    OperationNotFound(String),
    #[error("operation name is required when a document contains multiple operations")]
    OperationNameRequired,
    #[error("unknown fragment '{0}'")]
    UnknownFragment(String),
    #[error("fragment cycle detected through '{0}'")]
    FragmentCycle(String),
    #[error("inline fragment without a type condition")]
    MissingTypeCondition,
}

/// Picks the requested operation out of a parsed document and converts it
/// into the planner's AST. Fragment spreads are inlined, and selections with
/// literal `@skip(if: true)` / `@include(if: false)` are folded away.
pub fn prepare_operation(
    document: &parser::Document<'static, String>,
    operation_name: Option<&str>,
) -> Result<OperationDefinition, DocumentError> {
    let mut fragments: HashMap<&str, &parser::FragmentDefinition<'static, String>> =
        HashMap::new();
    let mut operations: Vec<&parser::OperationDefinition<'static, String>> = Vec::new();

    for definition in &document.definitions {
        match definition {
            parser::Definition::Operation(operation) => operations.push(operation),
            parser::Definition::Fragment(fragment) => {
                fragments.insert(fragment.name.as_str(), fragment);
            }
        }
    }

    let operation = match operation_name {
        Some(name) => operations
            .iter()
            .find(|op| operation_parts(op).0 == Some(name))
            .ok_or_else(|| DocumentError::OperationNotFound(name.to_string()))?,
        None => match operations.len() {
            0 => return Err(DocumentError::MissingOperation),
            1 => &operations[0],
            _ => return Err(DocumentError::OperationNameRequired),
        },
    };

    let (name, kind, variable_definitions, selection_set) = destructure_operation(operation);
    let mut inlining_stack = Vec::new();
    let selection_set = convert_selection_set(selection_set, &fragments, &mut inlining_stack)?;

    Ok(OperationDefinition {
        name: name.cloned(),
        operation_kind: kind,
        selection_set,
        variable_definitions: variable_definitions
            .iter()
            .map(|def| def.into())
            .collect(),
    })
}

fn operation_parts<'a>(
    operation: &'a parser::OperationDefinition<'static, String>,
) -> (Option<&'a str>, OperationKind) {
    match operation {
        parser::OperationDefinition::SelectionSet(_) => (None, OperationKind::Query),
        parser::OperationDefinition::Query(query) => {
            (query.name.as_deref(), OperationKind::Query)
        }
        parser::OperationDefinition::Mutation(mutation) => {
            (mutation.name.as_deref(), OperationKind::Mutation)
        }
        parser::OperationDefinition::Subscription(subscription) => {
            (subscription.name.as_deref(), OperationKind::Subscription)
        }
    }
}

type OperationPieces<'a> = (
    Option<&'a String>,
    OperationKind,
    &'a [parser::VariableDefinition<'static, String>],
    &'a parser::SelectionSet<'static, String>,
);

fn destructure_operation<'a>(
    operation: &'a parser::OperationDefinition<'static, String>,
) -> OperationPieces<'a> {
    match operation {
        parser::OperationDefinition::SelectionSet(selection_set) => {
            (None, OperationKind::Query, &[], selection_set)
        }
        parser::OperationDefinition::Query(query) => (
            query.name.as_ref(),
            OperationKind::Query,
            &query.variable_definitions,
            &query.selection_set,
        ),
        parser::OperationDefinition::Mutation(mutation) => (
            mutation.name.as_ref(),
            OperationKind::Mutation,
            &mutation.variable_definitions,
            &mutation.selection_set,
        ),
        parser::OperationDefinition::Subscription(subscription) => (
            subscription.name.as_ref(),
            OperationKind::Subscription,
            &subscription.variable_definitions,
            &subscription.selection_set,
        ),
    }
}

/// What the skip/include directives on a selection decide at conversion time.
enum Disposition {
    Drop,
    Keep {
        skip_if: Option<String>,
        include_if: Option<String>,
    },
}

fn condition_disposition(directives: &[parser::Directive<'static, String>]) -> Disposition {
    let mut skip_if = None;
    let mut include_if = None;

    for directive in directives {
        let if_arg = directive
            .arguments
            .iter()
            .find_map(|(name, value)| (name == "if").then_some(value));

        match (directive.name.as_str(), if_arg) {
            ("skip", Some(parser::Value::Boolean(true))) => return Disposition::Drop,
            ("skip", Some(parser::Value::Variable(var))) => skip_if = Some(var.clone()),
            ("include", Some(parser::Value::Boolean(false))) => return Disposition::Drop,
            ("include", Some(parser::Value::Variable(var))) => include_if = Some(var.clone()),
            _ => {}
        }
    }

    Disposition::Keep {
        skip_if,
        include_if,
    }
}

fn convert_selection_set(
    selection_set: &parser::SelectionSet<'static, String>,
    fragments: &HashMap<&str, &parser::FragmentDefinition<'static, String>>,
    inlining_stack: &mut Vec<String>,
) -> Result<SelectionSet, DocumentError> {
    let mut items = Vec::with_capacity(selection_set.items.len());

    for selection in &selection_set.items {
        match selection {
            parser::Selection::Field(field) => {
                let (skip_if, include_if) = match condition_disposition(&field.directives) {
                    Disposition::Drop => continue,
                    Disposition::Keep {
                        skip_if,
                        include_if,
                    } => (skip_if, include_if),
                };

                let selections =
                    convert_selection_set(&field.selection_set, fragments, inlining_stack)?;
                // A composite field whose children all folded away is dropped
                // with them, an empty selection set would not be valid GraphQL.
                if !field.selection_set.items.is_empty() && selections.is_empty() {
                    continue;
                }

                items.push(SelectionItem::Field(FieldSelection {
                    name: field.name.clone(),
                    alias: field.alias.clone(),
                    arguments: match field.arguments.len() {
                        0 => None,
                        _ => Some(ArgumentsMap::from(&field.arguments)),
                    },
                    selections,
                    skip_if,
                    include_if,
                }));
            }
            parser::Selection::InlineFragment(fragment) => {
                let type_condition = match &fragment.type_condition {
                    Some(parser::TypeCondition::On(name)) => name.clone(),
                    None => return Err(DocumentError::MissingTypeCondition),
                };

                if let Some(item) = convert_fragment_body(
                    type_condition,
                    &fragment.directives,
                    &fragment.selection_set,
                    fragments,
                    inlining_stack,
                )? {
                    items.push(item);
                }
            }
            parser::Selection::FragmentSpread(spread) => {
                let fragment = fragments
                    .get(spread.fragment_name.as_str())
                    .ok_or_else(|| DocumentError::UnknownFragment(spread.fragment_name.clone()))?;

                if inlining_stack.contains(&spread.fragment_name) {
                    return Err(DocumentError::FragmentCycle(spread.fragment_name.clone()));
                }

                let parser::TypeCondition::On(type_condition) = &fragment.type_condition;
                inlining_stack.push(spread.fragment_name.clone());
                let item = convert_fragment_body(
                    type_condition.clone(),
                    &spread.directives,
                    &fragment.selection_set,
                    fragments,
                    inlining_stack,
                )?;
                inlining_stack.pop();

                if let Some(item) = item {
                    items.push(item);
                }
            }
        }
    }

    Ok(SelectionSet { items })
}

fn convert_fragment_body(
    type_condition: String,
    directives: &[parser::Directive<'static, String>],
    selection_set: &parser::SelectionSet<'static, String>,
    fragments: &HashMap<&str, &parser::FragmentDefinition<'static, String>>,
    inlining_stack: &mut Vec<String>,
) -> Result<Option<SelectionItem>, DocumentError> {
    let (skip_if, include_if) = match condition_disposition(directives) {
        Disposition::Drop => return Ok(None),
        Disposition::Keep {
            skip_if,
            include_if,
        } => (skip_if, include_if),
    };

    let selections = convert_selection_set(selection_set, fragments, inlining_stack)?;
    if selections.is_empty() {
        return Ok(None);
    }

    Ok(Some(SelectionItem::InlineFragment(
        InlineFragmentSelection {
            type_condition,
            selections,
            skip_if,
            include_if,
        },
    )))
}
