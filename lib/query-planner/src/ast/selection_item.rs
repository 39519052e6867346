use std::collections::BTreeSet;
use std::fmt::Display;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::selection_set::{FieldSelection, InlineFragmentSelection};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind")]
pub enum SelectionItem {
    Field(FieldSelection),
    InlineFragment(InlineFragmentSelection),
}

impl SelectionItem {
    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            SelectionItem::Field(field) => field.collect_variables(out),
            SelectionItem::InlineFragment(fragment) => fragment.collect_variables(out),
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, SelectionItem::Field(_))
    }
}

impl Hash for SelectionItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            SelectionItem::Field(field) => field.hash(state),
            SelectionItem::InlineFragment(fragment) => fragment.hash(state),
        }
    }
}

impl Display for SelectionItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionItem::Field(field_selection) => write!(f, "{}", field_selection),
            SelectionItem::InlineFragment(fragment_selection) => {
                write!(f, "{}", fragment_selection)
            }
        }
    }
}
