use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::Xxh3;

use crate::ast::arguments::ArgumentsMap;
use crate::ast::operation::{OperationDefinition, OperationKind, VariableDefinition};
use crate::ast::selection_item::SelectionItem;
use crate::ast::selection_set::{FieldSelection, InlineFragmentSelection, SelectionSet};
use crate::ast::value::Value;
use crate::schema::TypeNode;

/// Order-dependent structural hashing. Positions are never included, so two
/// operations that differ only in whitespace hash the same.
pub trait ASTHash {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H);
}

/// Cache key for a prepared operation. Stable across processes: everything
/// hashed is either ordered in the AST or kept in ordered maps.
pub fn ast_hash(operation: &OperationDefinition) -> u64 {
    let mut hasher = Xxh3::new();
    operation.ast_hash(&mut hasher);
    hasher.finish()
}

impl ASTHash for OperationKind {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            OperationKind::Query => "Query".hash(hasher),
            OperationKind::Mutation => "Mutation".hash(hasher),
            OperationKind::Subscription => "Subscription".hash(hasher),
        }
    }
}

impl ASTHash for OperationDefinition {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.operation_kind.ast_hash(hasher);
        self.selection_set.ast_hash(hasher);
        for variable in &self.variable_definitions {
            variable.ast_hash(hasher);
        }
    }
}

impl<T: ASTHash> ASTHash for Option<T> {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            None => false.hash(hasher),
            Some(t) => {
                true.hash(hasher);
                t.ast_hash(hasher);
            }
        }
    }
}

impl ASTHash for SelectionSet {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        for item in &self.items {
            item.ast_hash(hasher);
        }
    }
}

impl ASTHash for SelectionItem {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            SelectionItem::Field(field) => field.ast_hash(hasher),
            SelectionItem::InlineFragment(fragment) => fragment.ast_hash(hasher),
        }
    }
}

impl ASTHash for FieldSelection {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.name.hash(hasher);
        self.alias.hash(hasher);
        self.selections.ast_hash(hasher);

        if let Some(args) = &self.arguments {
            args.ast_hash(hasher);
        }

        if let Some(var_name) = self.include_if.as_ref() {
            "@include".hash(hasher);
            var_name.hash(hasher);
        }
        if let Some(var_name) = self.skip_if.as_ref() {
            "@skip".hash(hasher);
            var_name.hash(hasher);
        }
    }
}

impl ASTHash for InlineFragmentSelection {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.type_condition.hash(hasher);
        self.selections.ast_hash(hasher);
        if let Some(var_name) = self.include_if.as_ref() {
            "@include".hash(hasher);
            var_name.hash(hasher);
        }
        if let Some(var_name) = self.skip_if.as_ref() {
            "@skip".hash(hasher);
            var_name.hash(hasher);
        }
    }
}

impl ASTHash for ArgumentsMap {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        // BTreeMap iteration is already ordered by key.
        for (key, value) in self.iter() {
            key.hash(hasher);
            value.ast_hash(hasher);
        }
    }
}

impl ASTHash for VariableDefinition {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        self.name.hash(hasher);
        self.variable_type.ast_hash(hasher);
        self.default_value.ast_hash(hasher);
    }
}

impl ASTHash for TypeNode {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            TypeNode::Named(name) => name.hash(hasher),
            TypeNode::List(inner) => {
                "list".hash(hasher);
                inner.ast_hash(hasher);
            }
            TypeNode::NonNull(inner) => {
                "non_null".hash(hasher);
                inner.ast_hash(hasher);
            }
        }
    }
}

impl ASTHash for Value {
    fn ast_hash<H: Hasher>(&self, hasher: &mut H) {
        match self {
            Value::List(values) => {
                for value in values {
                    value.ast_hash(hasher);
                }
            }
            Value::Object(map) => {
                for (name, value) in map {
                    name.hash(hasher);
                    value.ast_hash(hasher);
                }
            }
            Value::Null => {
                "null".hash(hasher);
            }
            Value::Int(value) => value.hash(hasher),
            Value::Float(value) => value.to_bits().hash(hasher),
            Value::Enum(value) => value.hash(hasher),
            Value::Boolean(value) => value.hash(hasher),
            Value::String(value) => value.hash(hasher),
            Value::Variable(value) => value.hash(hasher),
        }
    }
}
