use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::{PlanNode, PlanNodeId, QueryPlan};

/// Nested JSON form of the plan: every node carries a `kind` tag, its own
/// fields, and a `nodes` array when it owns children. Operation ids match
/// the flat artifact's breadth-first numbering so requirement edges read
/// the same in both forms.
impl Serialize for QueryPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ids: HashMap<PlanNodeId, usize> = self
            .operations_breadth_first()
            .into_iter()
            .enumerate()
            .map(|(position, id)| (id, position))
            .collect();

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", "Request")?;
        map.serialize_entry("operation", &self.operation.to_string())?;
        map.serialize_entry(
            "nodes",
            &NodeSeq {
                plan: self,
                ids: &ids,
                nodes: self.roots(),
            },
        )?;
        map.end()
    }
}

struct NodeSeq<'a> {
    plan: &'a QueryPlan,
    ids: &'a HashMap<PlanNodeId, usize>,
    nodes: &'a [PlanNodeId],
}

impl Serialize for NodeSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.nodes.len()))?;
        for id in self.nodes {
            seq.serialize_element(&NodeRef {
                plan: self.plan,
                ids: self.ids,
                id: *id,
            })?;
        }
        seq.end()
    }
}

struct NodeRef<'a> {
    plan: &'a QueryPlan,
    ids: &'a HashMap<PlanNodeId, usize>,
    id: PlanNodeId,
}

impl NodeRef<'_> {
    fn nested<'a>(&'a self, nodes: &'a [PlanNodeId]) -> NodeSeq<'a> {
        NodeSeq {
            plan: self.plan,
            ids: self.ids,
            nodes,
        }
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.plan.node(self.id);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", node.kind())?;

        match node {
            PlanNode::Operation(operation) => {
                map.serialize_entry("id", &self.ids[&self.id])?;
                map.serialize_entry("schema", &operation.schema)?;
                map.serialize_entry("path", &operation.context_path)?;
                map.serialize_entry("operation", &self.plan.operation_document(self.id))?;
                let owned: Vec<PlanNodeId> = operation
                    .selections
                    .iter()
                    .chain(&operation.requirements)
                    .chain(&operation.children)
                    .copied()
                    .collect();
                if !owned.is_empty() {
                    map.serialize_entry("nodes", &self.nested(&owned))?;
                }
            }
            PlanNode::Condition(condition) => {
                map.serialize_entry("variable", &condition.variable)?;
                map.serialize_entry("passingValue", &condition.passing_value)?;
                map.serialize_entry("nodes", &self.nested(&condition.nodes))?;
            }
            PlanNode::Field(field) => {
                map.serialize_entry("type", &field.type_name)?;
                map.serialize_entry("name", &field.name)?;
                if let Some(alias) = &field.alias {
                    map.serialize_entry("alias", alias)?;
                }
                if let Some(arguments) = &field.arguments {
                    map.serialize_entry("arguments", &arguments.to_string())?;
                }
                if let Some(var) = &field.skip_if {
                    map.serialize_entry("skipIf", var)?;
                }
                if let Some(var) = &field.include_if {
                    map.serialize_entry("includeIf", var)?;
                }
                if !field.selections.is_empty() {
                    map.serialize_entry("nodes", &self.nested(&field.selections))?;
                }
            }
            PlanNode::InlineFragment(fragment) => {
                map.serialize_entry("typeCondition", &fragment.type_condition)?;
                if let Some(var) = &fragment.skip_if {
                    map.serialize_entry("skipIf", var)?;
                }
                if let Some(var) = &fragment.include_if {
                    map.serialize_entry("includeIf", var)?;
                }
                if !fragment.selections.is_empty() {
                    map.serialize_entry("nodes", &self.nested(&fragment.selections))?;
                }
            }
            PlanNode::Requirement(requirement) => {
                map.serialize_entry("name", &requirement.name)?;
                map.serialize_entry("dependsOn", &self.ids[&requirement.depends_on])?;
                map.serialize_entry("field", &requirement.field_path)?;
                map.serialize_entry("type", &requirement.ty.to_string())?;
            }
        }

        map.end()
    }
}
