use std::collections::BTreeSet;
use std::fmt::Display;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::arguments::ArgumentsMap;
use super::selection_item::SelectionItem;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SelectionSet {
    pub items: Vec<SelectionItem>,
}

impl SelectionSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        for item in &self.items {
            item.collect_variables(out);
        }
    }

    pub fn variable_usages(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }
}

impl Display for SelectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.items.is_empty() {
            return Ok(());
        }

        write!(f, "{{")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldSelection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<ArgumentsMap>,
    pub selections: SelectionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_if: Option<String>,
}

impl FieldSelection {
    /// A plain key field, as injected for downstream requirements.
    pub fn key_field(name: &str) -> Self {
        FieldSelection {
            name: name.to_string(),
            alias: None,
            arguments: None,
            selections: SelectionSet::default(),
            skip_if: None,
            include_if: None,
        }
    }

    /// The key under which this field appears in the response data.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_leaf(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        if let Some(arguments) = &self.arguments {
            arguments.collect_variables(out);
        }
        if let Some(var) = &self.skip_if {
            out.insert(var.clone());
        }
        if let Some(var) = &self.include_if {
            out.insert(var.clone());
        }
        self.selections.collect_variables(out);
    }

    fn fmt_head(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(alias) = &self.alias {
            write!(f, "{}: ", alias)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(arguments) = &self.arguments {
            write!(f, "{}", arguments)?;
        }
        if let Some(var) = &self.skip_if {
            write!(f, " @skip(if: ${})", var)?;
        }
        if let Some(var) = &self.include_if {
            write!(f, " @include(if: ${})", var)?;
        }
        Ok(())
    }
}

impl Display for FieldSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_head(f)?;
        if !self.selections.is_empty() {
            write!(f, " {}", self.selections)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InlineFragmentSelection {
    pub type_condition: String,
    pub selections: SelectionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_if: Option<String>,
}

impl InlineFragmentSelection {
    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        if let Some(var) = &self.skip_if {
            out.insert(var.clone());
        }
        if let Some(var) = &self.include_if {
            out.insert(var.clone());
        }
        self.selections.collect_variables(out);
    }

    fn fmt_head(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "... on {}", self.type_condition)?;
        if let Some(var) = &self.skip_if {
            write!(f, " @skip(if: ${})", var)?;
        }
        if let Some(var) = &self.include_if {
            write!(f, " @include(if: ${})", var)?;
        }
        Ok(())
    }
}

impl Display for InlineFragmentSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_head(f)?;
        write!(f, " {}", self.selections)
    }
}

impl Hash for SelectionSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

impl Hash for FieldSelection {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.alias.hash(state);
        self.selections.hash(state);
    }
}

impl Hash for InlineFragmentSelection {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_condition.hash(state);
        self.selections.hash(state);
    }
}
