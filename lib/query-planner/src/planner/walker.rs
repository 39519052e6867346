use std::collections::{BTreeSet, HashMap};

use crate::ast::arguments::ArgumentsMap;
use crate::ast::operation::{OperationDefinition, OperationKind};
use crate::ast::response_path::{PathSegment, ResponsePath};
use crate::ast::selection_item::SelectionItem;
use crate::ast::selection_set::{FieldSelection, InlineFragmentSelection};
use crate::plan::{
    FieldNode, InlineFragmentNode, LookupArgumentPlan, LookupPlan, OperationNode, PlanBuilder,
    PlanNode, PlanNodeId, QueryPlan,
};
use crate::schema::{ComposedSchema, Lookup, SchemaName, TypeNode};

use super::PlannerError;

/// One `@skip`/`@include` gate a spawned operation sits behind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConditionGate {
    variable: String,
    passing_value: bool,
}

type Scope = Vec<ConditionGate>;

/// Identity of a downstream operation for reuse: two unresolvable selections
/// landing on the same schema, context, gates and lookup share one
/// sub-operation instead of fetching the entity twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OperationKey {
    schema: SchemaName,
    context: ResponsePath,
    scope: Scope,
    lookup_field: Option<String>,
    mount_key: Option<String>,
}

/// Where an unresolvable selection was encountered: the operation it could
/// not be planned under and the selection node that owns it there.
struct SpawnSite<'b> {
    op: PlanNodeId,
    attach_to: PlanNodeId,
    parent_type: &'b str,
    path: &'b ResponsePath,
}

pub(super) struct Walker<'a> {
    schema: &'a ComposedSchema,
    operation: OperationDefinition,
    builder: PlanBuilder,
    operations: HashMap<OperationKey, PlanNodeId>,
    conditions: HashMap<(Option<PlanNodeId>, String, bool), PlanNodeId>,
    op_scopes: HashMap<PlanNodeId, Scope>,
    client_variables: HashMap<PlanNodeId, BTreeSet<String>>,
    declared_variables: BTreeSet<String>,
    requirement_counter: usize,
}

impl<'a> Walker<'a> {
    pub(super) fn new(schema: &'a ComposedSchema, operation: OperationDefinition) -> Self {
        let declared_variables = operation
            .variable_definitions
            .iter()
            .map(|definition| definition.name.clone())
            .collect();
        Walker {
            schema,
            operation,
            builder: PlanBuilder::new(),
            operations: HashMap::new(),
            conditions: HashMap::new(),
            op_scopes: HashMap::new(),
            client_variables: HashMap::new(),
            declared_variables,
            requirement_counter: 0,
        }
    }

    pub(super) fn walk(mut self) -> Result<QueryPlan, PlannerError> {
        let kind = self.operation.operation_kind;
        let root_type = self
            .schema
            .root_type(kind)
            .ok_or(PlannerError::MissingRootType(kind))?
            .to_string();

        let items = self.operation.selection_set.items.clone();

        // Group top-level selections by the schema that serves them first;
        // `__typename` is deferred since any schema can answer it.
        let mut groups: HashMap<SchemaName, Vec<&SelectionItem>> = HashMap::new();
        let mut typename_fields: Vec<&FieldSelection> = Vec::new();
        for item in &items {
            match item {
                SelectionItem::Field(field) if field.name == "__typename" => {
                    typename_fields.push(field);
                }
                SelectionItem::Field(field) => {
                    let servers = self.schema.field_servers(&root_type, &field.name);
                    let Some((schema_name, _)) = servers.first() else {
                        return Err(PlannerError::UnresolvableField {
                            type_name: root_type.clone(),
                            field_name: field.name.clone(),
                        });
                    };
                    groups.entry((*schema_name).clone()).or_default().push(item);
                }
                SelectionItem::InlineFragment(fragment) => {
                    let schema_name = self.fragment_first_server(fragment)?;
                    groups.entry(schema_name).or_default().push(item);
                }
            }
        }

        let mut first_root: Option<PlanNodeId> = None;
        let schema_ref = self.schema;
        for schema_name in &schema_ref.schemas {
            let Some(group) = groups.remove(schema_name) else {
                continue;
            };
            let op = self.root_operation(schema_name.clone(), &root_type, kind, &[])?;
            if first_root.is_none() {
                first_root = Some(op);
            }
            for item in group {
                match item {
                    SelectionItem::Field(field) => {
                        self.attach_field(op, op, &root_type, field, &ResponsePath::root(), &[])?
                    }
                    SelectionItem::InlineFragment(fragment) => self.attach_fragment(
                        op,
                        op,
                        &root_type,
                        fragment,
                        &ResponsePath::root(),
                        &[],
                    )?,
                }
            }
        }

        // With no other root operation there is nothing to fetch; projection
        // answers `__typename` from the root type on its own.
        if let Some(op) = first_root {
            for field in typename_fields {
                self.attach_field(op, op, &root_type, field, &ResponsePath::root(), &[])?;
            }
        }

        self.finalize_client_variables()?;

        Ok(self.builder.finalize(self.operation)?)
    }

    fn attach_selections(
        &mut self,
        op: PlanNodeId,
        attach_to: PlanNodeId,
        parent_type: &str,
        items: &[SelectionItem],
        path: &ResponsePath,
        scope: &[ConditionGate],
    ) -> Result<(), PlannerError> {
        for item in items {
            match item {
                SelectionItem::Field(field) => {
                    self.attach_field(op, attach_to, parent_type, field, path, scope)?
                }
                SelectionItem::InlineFragment(fragment) => {
                    self.attach_fragment(op, attach_to, parent_type, fragment, path, scope)?
                }
            }
        }
        Ok(())
    }

    fn attach_field(
        &mut self,
        op: PlanNodeId,
        attach_to: PlanNodeId,
        parent_type: &str,
        field: &FieldSelection,
        path: &ResponsePath,
        scope: &[ConditionGate],
    ) -> Result<(), PlannerError> {
        if field.name != "__typename" {
            let schema_name = self.op_schema(op)?;
            if !self.schema.resolves_in(parent_type, &field.name, &schema_name) {
                return self.resolve_elsewhere(op, attach_to, parent_type, field, path, scope);
            }
        }

        let node = self.builder.add_field(FieldNode {
            type_name: parent_type.to_string(),
            name: field.name.clone(),
            alias: field.alias.clone(),
            arguments: field.arguments.clone(),
            skip_if: field.skip_if.clone(),
            include_if: field.include_if.clone(),
            selections: Vec::new(),
        });
        self.builder.attach_child(attach_to, node)?;
        self.note_field_variables(op, field);

        if field.selections.is_empty() || field.name == "__typename" {
            return Ok(());
        }

        let field_type = self
            .schema
            .field_type(parent_type, &field.name)
            .cloned()
            .ok_or_else(|| {
                PlannerError::Internal(format!(
                    "no type recorded for field '{}.{}'",
                    parent_type, field.name
                ))
            })?;
        let inner = field_type.inner_type().to_string();
        let child_path = extend_path(path, field.response_key(), &field_type);
        self.attach_selections(op, node, &inner, &field.selections.items, &child_path, scope)
    }

    fn attach_fragment(
        &mut self,
        op: PlanNodeId,
        attach_to: PlanNodeId,
        parent_type: &str,
        fragment: &InlineFragmentSelection,
        path: &ResponsePath,
        scope: &[ConditionGate],
    ) -> Result<(), PlannerError> {
        let fragment_type = fragment.type_condition.as_str();
        if !self.schema.is_composite(fragment_type) {
            return Err(PlannerError::UnknownType(fragment_type.to_string()));
        }

        // `... on T` inside T without directives adds nothing.
        if fragment_type == parent_type
            && fragment.skip_if.is_none()
            && fragment.include_if.is_none()
        {
            return self.attach_selections(
                op,
                attach_to,
                fragment_type,
                &fragment.selections.items,
                path,
                scope,
            );
        }

        // Unlike a conditional field, a conditional fragment does not remove
        // its parent objects from the response, so operations spawned from
        // inside it must carry the fragment's gates explicitly.
        let inner_scope = extended_scope(scope, &fragment.skip_if, &fragment.include_if);

        let schema_name = self.op_schema(op)?;
        if self.serves_any(fragment_type, &fragment.selections.items, &schema_name) {
            let node = self.builder.add_inline_fragment(InlineFragmentNode {
                type_condition: fragment_type.to_string(),
                skip_if: fragment.skip_if.clone(),
                include_if: fragment.include_if.clone(),
                selections: Vec::new(),
            });
            self.builder.attach_child(attach_to, node)?;
            self.note_condition_variables(op, &fragment.skip_if, &fragment.include_if);
            self.attach_selections(
                op,
                node,
                fragment_type,
                &fragment.selections.items,
                path,
                &inner_scope,
            )
        } else {
            self.spawn_items(
                op,
                attach_to,
                fragment_type,
                &fragment.selections.items,
                path,
                &inner_scope,
            )
        }
    }

    /// Routes selections that the current schema cannot serve at all, one
    /// spawn per field, composing fragment gates along the way.
    fn spawn_items(
        &mut self,
        op: PlanNodeId,
        attach_to: PlanNodeId,
        parent_type: &str,
        items: &[SelectionItem],
        path: &ResponsePath,
        scope: &[ConditionGate],
    ) -> Result<(), PlannerError> {
        for item in items {
            match item {
                SelectionItem::Field(field) => {
                    self.resolve_elsewhere(op, attach_to, parent_type, field, path, scope)?
                }
                SelectionItem::InlineFragment(fragment) => {
                    if !self.schema.is_composite(&fragment.type_condition) {
                        return Err(PlannerError::UnknownType(fragment.type_condition.clone()));
                    }
                    let inner_scope =
                        extended_scope(scope, &fragment.skip_if, &fragment.include_if);
                    self.spawn_items(
                        op,
                        attach_to,
                        &fragment.type_condition,
                        &fragment.selections.items,
                        path,
                        &inner_scope,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// The requirement resolver: finds a schema serving the field, spawns or
    /// reuses a downstream operation there and replans the selection under
    /// it, wiring requirements for the entity keys.
    fn resolve_elsewhere(
        &mut self,
        op: PlanNodeId,
        attach_to: PlanNodeId,
        parent_type: &str,
        field: &FieldSelection,
        path: &ResponsePath,
        scope: &[ConditionGate],
    ) -> Result<(), PlannerError> {
        let current = self.op_schema(op)?;
        let servers = self.schema.field_servers(parent_type, &field.name);
        if servers.iter().any(|(schema_name, _)| **schema_name == current) {
            return Err(PlannerError::Internal(format!(
                "field '{}.{}' is already servable by schema '{}'",
                parent_type, field.name, current
            )));
        }
        let Some((target, field_lookup)) = servers
            .first()
            .map(|(schema_name, lookup)| ((*schema_name).clone(), lookup.cloned()))
        else {
            return Err(PlannerError::UnresolvableField {
                type_name: parent_type.to_string(),
                field_name: field.name.clone(),
            });
        };

        let spawn_scope = extended_scope(scope, &field.skip_if, &field.include_if);

        // A root-type field hops to another root operation, no entity join
        // involved.
        let kind = self.operation.operation_kind;
        if path.is_root() && self.schema.root_type(kind) == Some(parent_type) {
            let target_op = self.root_operation(target, parent_type, kind, &spawn_scope)?;
            let bare = stripped(field);
            return self.attach_field(target_op, target_op, parent_type, &bare, path, &spawn_scope);
        }

        let site = SpawnSite {
            op,
            attach_to,
            parent_type,
            path,
        };
        match field_lookup {
            Some(lookup) => self.spawn_field_lookup(site, field, spawn_scope, target, lookup),
            None => self.spawn_entity_hop(site, field, spawn_scope, target),
        }
    }

    fn spawn_entity_hop(
        &mut self,
        site: SpawnSite<'_>,
        field: &FieldSelection,
        scope: Scope,
        target: SchemaName,
    ) -> Result<(), PlannerError> {
        let Some(lookup) = self.schema.entity_lookup(site.parent_type, &target).cloned() else {
            return Err(PlannerError::NonEntityReference {
                type_name: site.parent_type.to_string(),
                schema: target,
            });
        };

        let key = OperationKey {
            schema: target.clone(),
            context: site.path.clone(),
            scope: scope.clone(),
            lookup_field: Some(lookup.field.clone()),
            mount_key: None,
        };
        let target_op = if let Some(existing) = self.operations.get(&key) {
            *existing
        } else {
            let created = self.create_lookup_operation(&site, &scope, target, &lookup, None, None)?;
            self.operations.insert(key, created);
            created
        };

        let bare = stripped(field);
        self.attach_field(target_op, target_op, site.parent_type, &bare, site.path, &scope)
    }

    fn spawn_field_lookup(
        &mut self,
        site: SpawnSite<'_>,
        field: &FieldSelection,
        scope: Scope,
        target: SchemaName,
        lookup: Lookup,
    ) -> Result<(), PlannerError> {
        let mount_key = field.response_key().to_string();
        let key = OperationKey {
            schema: target.clone(),
            context: site.path.clone(),
            scope: scope.clone(),
            lookup_field: Some(lookup.field.clone()),
            mount_key: Some(mount_key.clone()),
        };
        let target_op = if let Some(existing) = self.operations.get(&key) {
            *existing
        } else {
            let created = self.create_lookup_operation(
                &site,
                &scope,
                target,
                &lookup,
                Some(mount_key.clone()),
                field.arguments.clone(),
            )?;
            self.operations.insert(key, created);
            created
        };

        if let Some(arguments) = &field.arguments {
            let variables = self.client_variables.entry(target_op).or_default();
            arguments.collect_variables(variables);
        }

        if field.selections.is_empty() {
            return Ok(());
        }
        let field_type = self
            .schema
            .field_type(site.parent_type, &field.name)
            .cloned()
            .ok_or_else(|| {
                PlannerError::Internal(format!(
                    "no type recorded for field '{}.{}'",
                    site.parent_type, field.name
                ))
            })?;
        let inner = field_type.inner_type().to_string();
        let child_path = extend_path(site.path, &mount_key, &field_type);
        self.attach_selections(
            target_op,
            target_op,
            &inner,
            &field.selections.items,
            &child_path,
            &scope,
        )
    }

    /// Creates a downstream lookup operation: allocates requirement names
    /// for the entity keys, injects those keys into the upstream selection
    /// set and mounts the new operation under its condition gates.
    fn create_lookup_operation(
        &mut self,
        site: &SpawnSite<'_>,
        scope: &Scope,
        target: SchemaName,
        lookup: &Lookup,
        mount_key: Option<String>,
        extra_arguments: Option<ArgumentsMap>,
    ) -> Result<PlanNodeId, PlannerError> {
        let upstream = site.op;
        let upstream_context = self
            .builder
            .operation(upstream)
            .map(|operation| operation.context_path.clone())
            .ok_or_else(|| {
                PlannerError::Internal("spawn site is not an operation".to_string())
            })?;
        let relative: Vec<String> = site
            .path
            .suffix_after(&upstream_context)
            .segments()
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Field(name) => Some(name.clone()),
                PathSegment::List => None,
            })
            .collect();

        // Requirement names are allocated before the node exists so the
        // lookup argument bindings can reference them.
        let mut bindings = Vec::with_capacity(lookup.arguments.len());
        let mut requirements = Vec::with_capacity(lookup.arguments.len());
        for argument in &lookup.arguments {
            let ty = self
                .schema
                .field_type(site.parent_type, &argument.key_field)
                .cloned()
                .ok_or_else(|| {
                    PlannerError::Internal(format!(
                        "key field '{}.{}' is not defined",
                        site.parent_type, argument.key_field
                    ))
                })?;
            let name = self.next_requirement_name();
            let mut field_path = relative.clone();
            field_path.push(argument.key_field.clone());
            bindings.push(LookupArgumentPlan {
                name: argument.name.clone(),
                variable: name.clone(),
            });
            requirements.push((name, field_path, ty, argument.key_field.clone()));
        }

        let target_op = self.builder.add_operation(OperationNode::new(
            target,
            site.parent_type,
            OperationKind::Query,
            site.path.clone(),
            Some(LookupPlan {
                field: lookup.field.clone(),
                arguments: bindings,
                extra_arguments,
                mount_key,
            }),
        ));

        for (name, field_path, ty, key_field) in requirements {
            self.builder
                .add_requirement(target_op, name.clone(), upstream, field_path, ty.clone())?;
            self.builder.declare_variable(target_op, name, ty)?;
            self.ensure_key_field(site.attach_to, site.parent_type, &key_field)?;
        }

        let base = self.op_scopes.get(&upstream).map(Vec::len).unwrap_or(0);
        let chain = if scope.len() > base {
            scope[base..].to_vec()
        } else {
            Vec::new()
        };
        self.mount_under_conditions(Some(upstream), target_op, &chain)?;
        self.op_scopes.insert(target_op, scope.clone());
        Ok(target_op)
    }

    fn root_operation(
        &mut self,
        schema_name: SchemaName,
        root_type: &str,
        kind: OperationKind,
        scope: &[ConditionGate],
    ) -> Result<PlanNodeId, PlannerError> {
        let key = OperationKey {
            schema: schema_name.clone(),
            context: ResponsePath::root(),
            scope: scope.to_vec(),
            lookup_field: None,
            mount_key: None,
        };
        if let Some(existing) = self.operations.get(&key) {
            return Ok(*existing);
        }
        let op = self.builder.add_operation(OperationNode::new(
            schema_name,
            root_type,
            kind,
            ResponsePath::root(),
            None,
        ));
        self.mount_under_conditions(None, op, scope)?;
        self.operations.insert(key, op);
        self.op_scopes.insert(op, scope.to_vec());
        Ok(op)
    }

    /// Wires `op` beneath a chain of condition nodes, one per gate, creating
    /// and caching chain links as needed. An empty chain attaches directly.
    fn mount_under_conditions(
        &mut self,
        anchor: Option<PlanNodeId>,
        op: PlanNodeId,
        gates: &[ConditionGate],
    ) -> Result<(), PlannerError> {
        let mut parent = anchor;
        for gate in gates {
            let key = (parent, gate.variable.clone(), gate.passing_value);
            let condition = if let Some(existing) = self.conditions.get(&key) {
                *existing
            } else {
                let condition = self
                    .builder
                    .add_condition(gate.variable.clone(), gate.passing_value);
                match parent {
                    Some(parent_id) => self.builder.attach_child(parent_id, condition)?,
                    None => self.builder.attach_root(condition)?,
                }
                self.conditions.insert(key, condition);
                condition
            };
            parent = Some(condition);
        }
        match parent {
            Some(parent_id) => self.builder.attach_child(parent_id, op)?,
            None => self.builder.attach_root(op)?,
        }
        Ok(())
    }

    /// Makes sure the upstream operation selects an entity key so the
    /// downstream requirement has a value to bind. Injected fields are later
    /// pruned by response projection unless the client asked for them.
    fn ensure_key_field(
        &mut self,
        attach_to: PlanNodeId,
        entity_type: &str,
        key_field: &str,
    ) -> Result<(), PlannerError> {
        let declared = self.node_declared_type(attach_to)?;
        let host = if declared == entity_type {
            attach_to
        } else {
            self.ensure_fragment(attach_to, entity_type)?
        };

        for id in selection_ids(self.builder.node(host)) {
            if let PlanNode::Field(existing) = self.builder.node(id) {
                if existing.name == key_field && existing.alias.is_none() {
                    return Ok(());
                }
            }
        }
        let node = self.builder.add_field(FieldNode {
            type_name: entity_type.to_string(),
            name: key_field.to_string(),
            alias: None,
            arguments: None,
            skip_if: None,
            include_if: None,
            selections: Vec::new(),
        });
        self.builder.attach_child(host, node)?;
        Ok(())
    }

    fn ensure_fragment(
        &mut self,
        attach_to: PlanNodeId,
        type_condition: &str,
    ) -> Result<PlanNodeId, PlannerError> {
        for id in selection_ids(self.builder.node(attach_to)) {
            if let PlanNode::InlineFragment(fragment) = self.builder.node(id) {
                if fragment.type_condition == type_condition
                    && fragment.skip_if.is_none()
                    && fragment.include_if.is_none()
                {
                    return Ok(id);
                }
            }
        }
        let node = self.builder.add_inline_fragment(InlineFragmentNode {
            type_condition: type_condition.to_string(),
            skip_if: None,
            include_if: None,
            selections: Vec::new(),
        });
        self.builder.attach_child(attach_to, node)?;
        Ok(node)
    }

    fn fragment_first_server(
        &self,
        fragment: &InlineFragmentSelection,
    ) -> Result<SchemaName, PlannerError> {
        let fragment_type = fragment.type_condition.as_str();
        if !self.schema.is_composite(fragment_type) {
            return Err(PlannerError::UnknownType(fragment_type.to_string()));
        }
        for schema_name in &self.schema.schemas {
            if self.serves_any(fragment_type, &fragment.selections.items, schema_name) {
                return Ok(schema_name.clone());
            }
        }
        Err(first_unservable(fragment))
    }

    fn serves_any(
        &self,
        type_name: &str,
        items: &[SelectionItem],
        schema_name: &SchemaName,
    ) -> bool {
        items.iter().any(|item| match item {
            SelectionItem::Field(field) => {
                field.name == "__typename"
                    || self.schema.resolves_in(type_name, &field.name, schema_name)
            }
            SelectionItem::InlineFragment(fragment) => {
                self.schema.is_composite(&fragment.type_condition)
                    && self.serves_any(
                        &fragment.type_condition,
                        &fragment.selections.items,
                        schema_name,
                    )
            }
        })
    }

    fn node_declared_type(&self, id: PlanNodeId) -> Result<String, PlannerError> {
        match self.builder.node(id) {
            PlanNode::Operation(operation) => Ok(operation.type_name.clone()),
            PlanNode::Field(field) => self
                .schema
                .field_type(&field.type_name, &field.name)
                .map(|ty| ty.inner_type().to_string())
                .ok_or_else(|| {
                    PlannerError::Internal(format!(
                        "no type recorded for field '{}.{}'",
                        field.type_name, field.name
                    ))
                }),
            PlanNode::InlineFragment(fragment) => Ok(fragment.type_condition.clone()),
            other => Err(PlannerError::Internal(format!(
                "selections cannot live under a {} node",
                other.kind()
            ))),
        }
    }

    fn op_schema(&self, op: PlanNodeId) -> Result<SchemaName, PlannerError> {
        self.builder
            .operation(op)
            .map(|operation| operation.schema.clone())
            .ok_or_else(|| {
                PlannerError::Internal("selections must attach under an operation".to_string())
            })
    }

    fn note_field_variables(&mut self, op: PlanNodeId, field: &FieldSelection) {
        let variables = self.client_variables.entry(op).or_default();
        if let Some(arguments) = &field.arguments {
            arguments.collect_variables(variables);
        }
        if let Some(variable) = &field.skip_if {
            variables.insert(variable.clone());
        }
        if let Some(variable) = &field.include_if {
            variables.insert(variable.clone());
        }
    }

    fn note_condition_variables(
        &mut self,
        op: PlanNodeId,
        skip_if: &Option<String>,
        include_if: &Option<String>,
    ) {
        let variables = self.client_variables.entry(op).or_default();
        if let Some(variable) = skip_if {
            variables.insert(variable.clone());
        }
        if let Some(variable) = include_if {
            variables.insert(variable.clone());
        }
    }

    /// Requirement names are fresh `r{n}` identifiers that never collide
    /// with variables the client operation declares.
    fn next_requirement_name(&mut self) -> String {
        loop {
            let name = format!("r{}", self.requirement_counter);
            self.requirement_counter += 1;
            if !self.declared_variables.contains(&name) {
                return name;
            }
        }
    }

    /// Declares every client variable an operation's document mentions,
    /// with the type the client operation declared for it.
    fn finalize_client_variables(&mut self) -> Result<(), PlannerError> {
        let mut per_op: Vec<(PlanNodeId, BTreeSet<String>)> =
            self.client_variables.drain().collect();
        per_op.sort_by_key(|(id, _)| *id);
        for (op, names) in per_op {
            for name in names {
                let Some(definition) = self.operation.variable_definition(&name) else {
                    return Err(PlannerError::UndefinedVariable(name));
                };
                let ty = definition.variable_type.clone();
                self.builder.declare_variable(op, name, ty)?;
            }
        }
        Ok(())
    }
}

fn first_unservable(fragment: &InlineFragmentSelection) -> PlannerError {
    for item in &fragment.selections.items {
        match item {
            SelectionItem::Field(field) => {
                return PlannerError::UnresolvableField {
                    type_name: fragment.type_condition.clone(),
                    field_name: field.name.clone(),
                }
            }
            SelectionItem::InlineFragment(nested) => return first_unservable(nested),
        }
    }
    PlannerError::UnresolvableField {
        type_name: fragment.type_condition.clone(),
        field_name: String::new(),
    }
}

fn selection_ids(node: &PlanNode) -> Vec<PlanNodeId> {
    match node {
        PlanNode::Operation(operation) => operation.selections.clone(),
        PlanNode::Field(field) => field.selections.clone(),
        PlanNode::InlineFragment(fragment) => fragment.selections.clone(),
        _ => Vec::new(),
    }
}

fn stripped(field: &FieldSelection) -> FieldSelection {
    FieldSelection {
        skip_if: None,
        include_if: None,
        ..field.clone()
    }
}

fn extended_scope(
    scope: &[ConditionGate],
    skip_if: &Option<String>,
    include_if: &Option<String>,
) -> Scope {
    let mut extended = scope.to_vec();
    if let Some(variable) = skip_if {
        extended.push(ConditionGate {
            variable: variable.clone(),
            passing_value: false,
        });
    }
    if let Some(variable) = include_if {
        extended.push(ConditionGate {
            variable: variable.clone(),
            passing_value: true,
        });
    }
    extended
}

fn extend_path(path: &ResponsePath, response_key: &str, ty: &TypeNode) -> ResponsePath {
    let mut extended = path.push_field(response_key);
    for _ in 0..list_depth(ty) {
        extended = extended.push_list();
    }
    extended
}

fn list_depth(ty: &TypeNode) -> usize {
    match ty {
        TypeNode::List(inner) => 1 + list_depth(inner),
        TypeNode::NonNull(inner) => list_depth(inner),
        TypeNode::Named(_) => 0,
    }
}
