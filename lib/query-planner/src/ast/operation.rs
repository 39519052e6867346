use std::fmt::Display;

use graphql_tools::parser::query as parser;
use serde::{Deserialize, Serialize};

use crate::schema::TypeNode;

use super::selection_set::SelectionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// A client operation after preparation: fragment spreads inlined,
/// literal skip/include conditions folded away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub name: Option<String>,
    pub operation_kind: OperationKind,
    pub selection_set: SelectionSet,
    pub variable_definitions: Vec<VariableDefinition>,
}

impl OperationDefinition {
    pub fn variable_definition(&self, name: &str) -> Option<&VariableDefinition> {
        self.variable_definitions.iter().find(|def| def.name == name)
    }
}

impl Display for OperationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.operation_kind)?;

        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }

        if !self.variable_definitions.is_empty() {
            write!(f, "(")?;
            for (i, variable_definition) in self.variable_definitions.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", variable_definition)?;
            }
            write!(f, ")")?;
        }

        write!(f, " {}", self.selection_set)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    pub variable_type: TypeNode,
    pub default_value: Option<super::value::Value>,
}

impl Display for VariableDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.default_value {
            Some(default_value) => {
                write!(f, "${}:{}={}", self.name, self.variable_type, default_value)
            }
            None => write!(f, "${}:{}", self.name, self.variable_type),
        }
    }
}

impl From<&parser::VariableDefinition<'_, String>> for VariableDefinition {
    fn from(value: &parser::VariableDefinition<'_, String>) -> Self {
        VariableDefinition {
            name: value.name.clone(),
            variable_type: (&value.var_type).into(),
            default_value: value.default_value.as_ref().map(|v| v.into()),
        }
    }
}
