use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt::Display;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::ast::arguments::ArgumentsMap;
use crate::ast::operation::{OperationDefinition, OperationKind};
use crate::ast::response_path::ResponsePath;
use crate::schema::{SchemaName, TypeNode};

pub mod artifact;
pub mod display;
pub mod serialize;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("operations may only be nested under the plan root, a condition, or another operation")]
    OperationUnderSelection,
    #[error("plan node {0} is already attached elsewhere")]
    NodeReattached(PlanNodeId),
    #[error("plan node {0} does not exist")]
    UnknownNode(PlanNodeId),
    #[error("plan node {0} is not an operation")]
    NotAnOperation(PlanNodeId),
    #[error("requirement depends on unknown operation {0}")]
    UnknownDependency(PlanNodeId),
    #[error("operation {0} cannot require data from itself")]
    SelfRequirement(PlanNodeId),
    #[error("requirement dependencies of operation {0} form a cycle")]
    RequirementCycle(PlanNodeId),
    #[error("attaching plan node {0} here would create an ownership cycle")]
    OwnershipCycle(PlanNodeId),
    #[error("a {child} node cannot be attached under a {parent} node")]
    InvalidAttachment {
        parent: &'static str,
        child: &'static str,
    },
}

/// Index into the plan's node arena. Stable for the lifetime of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanNodeId(usize);

impl PlanNodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for PlanNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum PlanNode {
    Operation(OperationNode),
    Condition(ConditionNode),
    Field(FieldNode),
    InlineFragment(InlineFragmentNode),
    Requirement(FieldRequirement),
}

impl PlanNode {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Operation(_) => "Operation",
            PlanNode::Condition(_) => "Condition",
            PlanNode::Field(_) => "Field",
            PlanNode::InlineFragment(_) => "InlineFragment",
            PlanNode::Requirement(_) => "Requirement",
        }
    }
}

/// One sub-operation against a single source schema.
#[derive(Debug, Clone)]
pub struct OperationNode {
    pub schema: SchemaName,
    /// Composite type the selections are declared on.
    pub type_name: String,
    pub operation_kind: OperationKind,
    /// Present on downstream operations reached through a lookup root field.
    pub lookup: Option<LookupPlan>,
    /// Where the produced data merges into the response buffer. List
    /// segments fan out into one sub-request per concrete element.
    pub context_path: ResponsePath,
    /// Field / InlineFragment nodes.
    pub selections: Vec<PlanNodeId>,
    /// Requirement nodes; their `depends_on` edges drive scheduling.
    pub requirements: Vec<PlanNodeId>,
    /// Nested Operation / Condition nodes.
    pub children: Vec<PlanNodeId>,
    /// Variables the rendered document declares, requirement-fed and
    /// client-supplied alike.
    pub variables: BTreeMap<String, TypeNode>,
}

impl OperationNode {
    pub fn new(
        schema: SchemaName,
        type_name: impl Into<String>,
        operation_kind: OperationKind,
        context_path: ResponsePath,
        lookup: Option<LookupPlan>,
    ) -> Self {
        OperationNode {
            schema,
            type_name: type_name.into(),
            operation_kind,
            lookup,
            context_path,
            selections: Vec::new(),
            requirements: Vec::new(),
            children: Vec::new(),
            variables: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupPlan {
    pub field: String,
    /// Key-fed argument bindings, each rendered as `name: $variable`.
    pub arguments: Vec<LookupArgumentPlan>,
    /// Client-supplied arguments carried over from the original field,
    /// rendered after the key bindings.
    pub extra_arguments: Option<ArgumentsMap>,
    /// `Some(key)`: the lookup value mounts under this response key beneath
    /// the operation's context (field-level lookup). `None`: the lookup
    /// resolves the entity itself and selections merge at the context.
    pub mount_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LookupArgumentPlan {
    pub name: String,
    /// Requirement name bound to this argument, rendered as `$name`.
    pub variable: String,
}

/// Gates a subtree behind a boolean variable matching `passing_value`.
#[derive(Debug, Clone)]
pub struct ConditionNode {
    pub variable: String,
    pub passing_value: bool,
    pub nodes: Vec<PlanNodeId>,
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    /// Composite type declaring the field.
    pub type_name: String,
    pub name: String,
    pub alias: Option<String>,
    pub arguments: Option<ArgumentsMap>,
    pub skip_if: Option<String>,
    pub include_if: Option<String>,
    pub selections: Vec<PlanNodeId>,
}

impl FieldNode {
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct InlineFragmentNode {
    pub type_condition: String,
    pub skip_if: Option<String>,
    pub include_if: Option<String>,
    pub selections: Vec<PlanNodeId>,
}

/// A cross-operation data dependency: a named value the owning operation
/// binds as a variable, read from the upstream operation's data.
#[derive(Debug, Clone)]
pub struct FieldRequirement {
    pub name: String,
    pub depends_on: PlanNodeId,
    /// Path of response keys relative to the upstream operation's data
    /// root. List traversal is implied by the data, never spelled out.
    pub field_path: Vec<String>,
    pub ty: TypeNode,
}

/// A fully wired request plan. Immutable once finalized; shared across
/// requests through the plan cache.
#[derive(Debug)]
pub struct QueryPlan {
    /// The prepared client operation, kept for response projection.
    pub operation: OperationDefinition,
    nodes: Vec<PlanNode>,
    roots: Vec<PlanNodeId>,
    operation_order: Vec<PlanNodeId>,
}

impl QueryPlan {
    pub fn node(&self, id: PlanNodeId) -> &PlanNode {
        &self.nodes[id.0]
    }

    pub fn operation(&self, id: PlanNodeId) -> Option<&OperationNode> {
        match self.node(id) {
            PlanNode::Operation(operation) => Some(operation),
            _ => None,
        }
    }

    pub fn requirement(&self, id: PlanNodeId) -> Option<&FieldRequirement> {
        match self.node(id) {
            PlanNode::Requirement(requirement) => Some(requirement),
            _ => None,
        }
    }

    pub fn roots(&self) -> &[PlanNodeId] {
        &self.roots
    }

    /// All operations, topologically ordered by their requirement edges.
    pub fn operation_order(&self) -> &[PlanNodeId] {
        &self.operation_order
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn operations(&self) -> impl Iterator<Item = (PlanNodeId, &OperationNode)> {
        self.nodes.iter().enumerate().filter_map(|(i, node)| match node {
            PlanNode::Operation(operation) => Some((PlanNodeId(i), operation)),
            _ => None,
        })
    }

    /// Upstream operations this operation requires data from, deduplicated,
    /// in requirement order.
    pub fn operation_dependencies(&self, id: PlanNodeId) -> Vec<PlanNodeId> {
        let Some(operation) = self.operation(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut dependencies = Vec::new();
        for requirement_id in &operation.requirements {
            if let Some(requirement) = self.requirement(*requirement_id) {
                if seen.insert(requirement.depends_on) {
                    dependencies.push(requirement.depends_on);
                }
            }
        }
        dependencies
    }

    /// Operations in breadth-first order from the root; the position in the
    /// returned vector is the operation's stable serialized id.
    pub fn operations_breadth_first(&self) -> Vec<PlanNodeId> {
        let mut queue: VecDeque<PlanNodeId> = self.roots.iter().copied().collect();
        let mut operations = Vec::new();

        while let Some(id) = queue.pop_front() {
            match self.node(id) {
                PlanNode::Operation(operation) => {
                    operations.push(id);
                    queue.extend(operation.children.iter().copied());
                }
                PlanNode::Condition(condition) => {
                    queue.extend(condition.nodes.iter().copied());
                }
                _ => {}
            }
        }

        operations
    }

    /// Renders the sub-operation's GraphQL document, single line.
    pub fn operation_document(&self, id: PlanNodeId) -> String {
        display::render_operation_document(self, id)
    }
}

/// Wires plan nodes under construction, enforcing the single-owner rule and
/// rejecting invalid nestings and cyclic requirements as they appear.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    nodes: Vec<PlanNode>,
    roots: Vec<PlanNodeId>,
    attached: Vec<bool>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: PlanNode) -> PlanNodeId {
        let id = PlanNodeId(self.nodes.len());
        self.nodes.push(node);
        self.attached.push(false);
        id
    }

    pub fn add_operation(&mut self, operation: OperationNode) -> PlanNodeId {
        self.push(PlanNode::Operation(operation))
    }

    pub fn add_condition(&mut self, variable: impl Into<String>, passing_value: bool) -> PlanNodeId {
        self.push(PlanNode::Condition(ConditionNode {
            variable: variable.into(),
            passing_value,
            nodes: Vec::new(),
        }))
    }

    pub fn add_field(&mut self, field: FieldNode) -> PlanNodeId {
        self.push(PlanNode::Field(field))
    }

    pub fn add_inline_fragment(&mut self, fragment: InlineFragmentNode) -> PlanNodeId {
        self.push(PlanNode::InlineFragment(fragment))
    }

    pub fn node(&self, id: PlanNodeId) -> &PlanNode {
        &self.nodes[id.0]
    }

    pub fn operation(&self, id: PlanNodeId) -> Option<&OperationNode> {
        match self.node(id) {
            PlanNode::Operation(operation) => Some(operation),
            _ => None,
        }
    }

    pub fn attach_root(&mut self, id: PlanNodeId) -> Result<(), PlanError> {
        self.check_exists(id)?;
        match self.node(id) {
            PlanNode::Operation(_) | PlanNode::Condition(_) => {}
            other => {
                return Err(PlanError::InvalidAttachment {
                    parent: "Request",
                    child: other.kind(),
                })
            }
        }
        self.claim(id)?;
        self.roots.push(id);
        Ok(())
    }

    pub fn attach_child(&mut self, parent: PlanNodeId, child: PlanNodeId) -> Result<(), PlanError> {
        self.check_exists(parent)?;
        self.check_exists(child)?;

        let parent_kind = self.node(parent).kind();
        let child_kind = self.node(child).kind();

        enum Slot {
            Selections,
            Children,
            ConditionNodes,
        }

        let slot = match (self.node(parent), self.node(child)) {
            (PlanNode::Operation(_), PlanNode::Field(_) | PlanNode::InlineFragment(_)) => {
                Slot::Selections
            }
            (PlanNode::Operation(_), PlanNode::Operation(_) | PlanNode::Condition(_)) => {
                Slot::Children
            }
            (PlanNode::Condition(_), PlanNode::Operation(_) | PlanNode::Condition(_)) => {
                Slot::ConditionNodes
            }
            (
                PlanNode::Field(_) | PlanNode::InlineFragment(_),
                PlanNode::Field(_) | PlanNode::InlineFragment(_),
            ) => Slot::Selections,
            (
                PlanNode::Field(_) | PlanNode::InlineFragment(_),
                PlanNode::Operation(_) | PlanNode::Condition(_),
            ) => return Err(PlanError::OperationUnderSelection),
            _ => {
                return Err(PlanError::InvalidAttachment {
                    parent: parent_kind,
                    child: child_kind,
                })
            }
        };

        if self.owns_transitively(child, parent) {
            return Err(PlanError::OwnershipCycle(child));
        }
        self.claim(child)?;

        match (&mut self.nodes[parent.0], slot) {
            (PlanNode::Operation(operation), Slot::Selections) => operation.selections.push(child),
            (PlanNode::Operation(operation), Slot::Children) => operation.children.push(child),
            (PlanNode::Condition(condition), Slot::ConditionNodes) => condition.nodes.push(child),
            (PlanNode::Field(field), Slot::Selections) => field.selections.push(child),
            (PlanNode::InlineFragment(fragment), Slot::Selections) => {
                fragment.selections.push(child)
            }
            _ => unreachable!("slot chosen from the same node kinds"),
        }

        Ok(())
    }

    /// Creates a requirement on `operation`, validating the dependency edge
    /// before it is wired in.
    pub fn add_requirement(
        &mut self,
        operation: PlanNodeId,
        name: impl Into<String>,
        depends_on: PlanNodeId,
        field_path: Vec<String>,
        ty: TypeNode,
    ) -> Result<PlanNodeId, PlanError> {
        self.check_exists(operation)?;
        if self.operation(operation).is_none() {
            return Err(PlanError::NotAnOperation(operation));
        }
        if depends_on.0 >= self.nodes.len() || self.operation(depends_on).is_none() {
            return Err(PlanError::UnknownDependency(depends_on));
        }
        if depends_on == operation {
            return Err(PlanError::SelfRequirement(operation));
        }
        if self.depends_transitively(depends_on, operation) {
            return Err(PlanError::RequirementCycle(operation));
        }

        let id = self.push(PlanNode::Requirement(FieldRequirement {
            name: name.into(),
            depends_on,
            field_path,
            ty,
        }));
        self.attached[id.0] = true;
        match &mut self.nodes[operation.0] {
            PlanNode::Operation(op) => op.requirements.push(id),
            _ => unreachable!("checked above"),
        }
        Ok(id)
    }

    pub fn declare_variable(
        &mut self,
        operation: PlanNodeId,
        name: impl Into<String>,
        ty: TypeNode,
    ) -> Result<(), PlanError> {
        self.check_exists(operation)?;
        match &mut self.nodes[operation.0] {
            PlanNode::Operation(op) => {
                op.variables.insert(name.into(), ty);
                Ok(())
            }
            _ => Err(PlanError::NotAnOperation(operation)),
        }
    }

    fn check_exists(&self, id: PlanNodeId) -> Result<(), PlanError> {
        if id.0 >= self.nodes.len() {
            return Err(PlanError::UnknownNode(id));
        }
        Ok(())
    }

    fn claim(&mut self, id: PlanNodeId) -> Result<(), PlanError> {
        if self.attached[id.0] {
            return Err(PlanError::NodeReattached(id));
        }
        self.attached[id.0] = true;
        Ok(())
    }

    /// Walks ownership edges from `start` looking for `target`.
    fn owns_transitively(&self, start: PlanNodeId, target: PlanNodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            match self.node(current) {
                PlanNode::Operation(operation) => {
                    stack.extend(operation.selections.iter().copied());
                    stack.extend(operation.children.iter().copied());
                }
                PlanNode::Condition(condition) => stack.extend(condition.nodes.iter().copied()),
                PlanNode::Field(field) => stack.extend(field.selections.iter().copied()),
                PlanNode::InlineFragment(fragment) => {
                    stack.extend(fragment.selections.iter().copied())
                }
                PlanNode::Requirement(_) => {}
            }
        }
        false
    }

    /// Walks requirement edges from `start` looking for `target`.
    fn depends_transitively(&self, start: PlanNodeId, target: PlanNodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let PlanNode::Operation(operation) = self.node(current) {
                for requirement_id in &operation.requirements {
                    if let PlanNode::Requirement(requirement) = self.node(*requirement_id) {
                        stack.push(requirement.depends_on);
                    }
                }
            }
        }
        false
    }

    /// Orders operations topologically and seals the plan. The dependency
    /// graph is re-validated as a whole; a cycle that slipped past the
    /// incremental checks is caught here.
    pub fn finalize(self, operation: OperationDefinition) -> Result<QueryPlan, PlanError> {
        let mut graph: DiGraph<PlanNodeId, ()> = DiGraph::new();
        let mut indices: HashMap<PlanNodeId, NodeIndex> = HashMap::new();

        for (i, node) in self.nodes.iter().enumerate() {
            if matches!(node, PlanNode::Operation(_)) {
                let id = PlanNodeId(i);
                indices.insert(id, graph.add_node(id));
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let PlanNode::Operation(op) = node else {
                continue;
            };
            let dependent = indices[&PlanNodeId(i)];
            for requirement_id in &op.requirements {
                if let PlanNode::Requirement(requirement) = self.node(*requirement_id) {
                    graph.add_edge(indices[&requirement.depends_on], dependent, ());
                }
            }
        }

        let operation_order = toposort(&graph, None)
            .map_err(|cycle| PlanError::RequirementCycle(graph[cycle.node_id()]))?
            .into_iter()
            .map(|index| graph[index])
            .collect();

        Ok(QueryPlan {
            operation,
            nodes: self.nodes,
            roots: self.roots,
            operation_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::operation::OperationKind;
    use crate::ast::selection_set::SelectionSet;

    fn client_operation() -> OperationDefinition {
        OperationDefinition {
            name: None,
            operation_kind: OperationKind::Query,
            selection_set: SelectionSet::default(),
            variable_definitions: Vec::new(),
        }
    }

    fn operation(schema: &str) -> OperationNode {
        OperationNode::new(
            SchemaName(schema.to_string()),
            "Query",
            OperationKind::Query,
            ResponsePath::root(),
            None,
        )
    }

    fn field(name: &str) -> FieldNode {
        FieldNode {
            type_name: "Query".to_string(),
            name: name.to_string(),
            alias: None,
            arguments: None,
            skip_if: None,
            include_if: None,
            selections: Vec::new(),
        }
    }

    #[test]
    fn rejects_operations_nested_under_field_selections() {
        let mut builder = PlanBuilder::new();
        let root = builder.add_operation(operation("a"));
        let user = builder.add_field(field("user"));
        let nested = builder.add_operation(operation("b"));

        builder.attach_root(root).unwrap();
        builder.attach_child(root, user).unwrap();
        assert_eq!(
            builder.attach_child(user, nested),
            Err(PlanError::OperationUnderSelection)
        );
    }

    #[test]
    fn rejects_self_requirements() {
        let mut builder = PlanBuilder::new();
        let op = builder.add_operation(operation("a"));
        builder.attach_root(op).unwrap();

        let result = builder.add_requirement(
            op,
            "r0",
            op,
            vec!["id".to_string()],
            TypeNode::Named("ID".to_string()),
        );
        assert_eq!(result, Err(PlanError::SelfRequirement(op)));
    }

    #[test]
    fn rejects_requirement_cycles() {
        let mut builder = PlanBuilder::new();
        let a = builder.add_operation(operation("a"));
        let b = builder.add_operation(operation("b"));
        builder.attach_root(a).unwrap();
        builder.attach_root(b).unwrap();

        builder
            .add_requirement(
                b,
                "r0",
                a,
                vec!["id".to_string()],
                TypeNode::Named("ID".to_string()),
            )
            .unwrap();
        let result = builder.add_requirement(
            a,
            "r1",
            b,
            vec!["id".to_string()],
            TypeNode::Named("ID".to_string()),
        );
        assert_eq!(result, Err(PlanError::RequirementCycle(a)));
    }

    #[test]
    fn rejects_attaching_a_node_twice() {
        let mut builder = PlanBuilder::new();
        let root = builder.add_operation(operation("a"));
        let shared = builder.add_field(field("user"));
        builder.attach_root(root).unwrap();
        builder.attach_child(root, shared).unwrap();

        assert_eq!(
            builder.attach_child(root, shared),
            Err(PlanError::NodeReattached(shared))
        );
    }

    #[test]
    fn orders_operations_before_their_dependents() {
        let mut builder = PlanBuilder::new();
        let a = builder.add_operation(operation("a"));
        let c = builder.add_operation(operation("c"));
        let b = builder.add_operation(operation("b"));
        builder.attach_root(a).unwrap();
        builder.attach_root(c).unwrap();
        builder.attach_child(a, b).unwrap();
        builder
            .add_requirement(
                b,
                "r0",
                a,
                vec!["id".to_string()],
                TypeNode::Named("ID".to_string()),
            )
            .unwrap();

        let plan = builder.finalize(client_operation()).unwrap();
        let order = plan.operation_order();
        let position = |id: PlanNodeId| order.iter().position(|other| *other == id).unwrap();
        assert!(position(a) < position(b));
        assert_eq!(order.len(), 3);
    }
}
