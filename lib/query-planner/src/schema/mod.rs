use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use graphql_tools::parser::query as query_input;
use graphql_tools::parser::schema as input;
use graphql_tools::ast::SchemaDocumentExtension;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ast::operation::OperationKind;

mod directives;

use directives::{JoinFieldDirective, JoinSchemaDirective, JoinTypeDirective, SchemaDirective};

static BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

pub type SchemaDocument = input::Document<'static, String>;

#[derive(Debug, thiserror::Error, Clone)]
pub enum SchemaError {
    #[error("composed schema declares no source schemas (missing join__Schema enum)")]
    MissingSchemaRegistry,
    #[error("unknown source schema id: '{0}'")]
    UnknownSchema(String),
    #[error("malformed lookup on type '{type_name}': '{lookup}'")]
    MalformedLookup { type_name: String, lookup: String },
    #[error("lookup on type '{type_name}' references '${reference}' which is not a key field")]
    InvalidLookupKey {
        type_name: String,
        reference: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaName(pub String);

impl Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SchemaName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeNode {
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
    Named(String),
}

impl TypeNode {
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeNode::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeNode::List(_) => true,
            TypeNode::NonNull(inner) => inner.as_ref().is_list(),
            TypeNode::Named(_) => false,
        }
    }

    pub fn inner_type(&self) -> &str {
        match self {
            TypeNode::List(inner) => inner.as_ref().inner_type(),
            TypeNode::NonNull(inner) => inner.as_ref().inner_type(),
            TypeNode::Named(name) => name,
        }
    }
}

impl Display for TypeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeNode::List(inner) => write!(f, "[{}]", inner),
            TypeNode::NonNull(inner) => write!(f, "{}!", inner),
            TypeNode::Named(name) => write!(f, "{}", name),
        }
    }
}

impl<'a, T: input::Text<'a>> From<&input::Type<'a, T>> for TypeNode {
    fn from(input_type: &input::Type<'a, T>) -> Self {
        match input_type {
            input::Type::ListType(inner) => TypeNode::List(Box::new(inner.as_ref().into())),
            input::Type::NonNullType(inner) => TypeNode::NonNull(Box::new(inner.as_ref().into())),
            input::Type::NamedType(name) => TypeNode::Named(name.as_ref().to_string()),
        }
    }
}

/// How a source schema resolves an entity or a single field: a root field
/// plus the key fields bound to its arguments, declared in the SDL as e.g.
/// `userById(id: $id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub field: String,
    pub arguments: Vec<LookupArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupArgument {
    pub name: String,
    pub key_field: String,
}

#[derive(Debug, Clone)]
pub struct TypeMembership {
    pub schema: SchemaName,
    pub key: Option<Vec<String>>,
    pub lookup: Option<Lookup>,
}

#[derive(Debug, Clone)]
pub struct FieldServer {
    pub schema: SchemaName,
    pub lookup: Option<Lookup>,
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub ty: TypeNode,
    /// Empty means "every schema the declaring type is a member of".
    pub servers: Vec<FieldServer>,
}

#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub memberships: Vec<TypeMembership>,
    pub fields: HashMap<String, FieldDefinition>,
}

/// The read-only model of an annotated composed schema. Built once at
/// startup, shared by the planner and the executor.
#[derive(Debug)]
pub struct ComposedSchema {
    /// Source schemas in declaration order; this order breaks ties whenever
    /// several schemas can serve the same field.
    pub schemas: Vec<SchemaName>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    definitions: HashMap<String, TypeDefinition>,
    enum_values: HashMap<String, BTreeSet<String>>,
    known_scalars: HashSet<String>,
    interface_implementors: HashMap<String, BTreeSet<String>>,
}

impl ComposedSchema {
    #[instrument(level = "trace", skip(schema), name = "build_composed_schema")]
    pub fn new(schema: &SchemaDocument) -> Result<Self, SchemaError> {
        let (schemas, schema_ids) = Self::extract_schema_registry(schema)?;

        let mut instance = Self {
            schemas,
            query_type: schema.query_type().name.to_string(),
            mutation_type: schema.mutation_type().map(|t| t.name.to_string()),
            subscription_type: schema.subscription_type().map(|t| t.name.to_string()),
            definitions: HashMap::new(),
            enum_values: HashMap::new(),
            known_scalars: HashSet::new(),
            interface_implementors: HashMap::new(),
        };

        for definition in &schema.definitions {
            let input::Definition::TypeDefinition(type_definition) = definition else {
                continue;
            };
            match type_definition {
                input::TypeDefinition::Object(object) => {
                    let def = instance.build_type_definition(
                        &object.name,
                        &object.directives,
                        &object.fields,
                        &schema_ids,
                    )?;
                    instance.definitions.insert(object.name.clone(), def);
                    for interface in &object.implements_interfaces {
                        instance
                            .interface_implementors
                            .entry(interface.clone())
                            .or_default()
                            .insert(object.name.clone());
                    }
                }
                input::TypeDefinition::Interface(interface) => {
                    let def = instance.build_type_definition(
                        &interface.name,
                        &interface.directives,
                        &interface.fields,
                        &schema_ids,
                    )?;
                    instance.definitions.insert(interface.name.clone(), def);
                }
                input::TypeDefinition::Enum(enum_type) => {
                    if enum_type.name == "join__Schema" {
                        continue;
                    }
                    instance.enum_values.insert(
                        enum_type.name.clone(),
                        enum_type
                            .values
                            .iter()
                            .map(|value| value.name.clone())
                            .collect(),
                    );
                }
                input::TypeDefinition::Scalar(scalar) => {
                    instance.known_scalars.insert(scalar.name.clone());
                }
                _ => {}
            }
        }

        instance.validate_lookups()?;

        Ok(instance)
    }

    fn extract_schema_registry(
        schema: &SchemaDocument,
    ) -> Result<(Vec<SchemaName>, HashMap<String, SchemaName>), SchemaError> {
        let mut names = Vec::new();
        let mut ids = HashMap::new();

        for definition in &schema.definitions {
            let input::Definition::TypeDefinition(input::TypeDefinition::Enum(enum_type)) =
                definition
            else {
                continue;
            };
            if enum_type.name != "join__Schema" {
                continue;
            }

            for value in &enum_type.values {
                let Some(directive) = value
                    .directives
                    .iter()
                    .find(|directive| JoinSchemaDirective::is(directive))
                else {
                    continue;
                };
                let parsed = JoinSchemaDirective::parse(directive);
                let name = SchemaName(parsed.name);
                ids.insert(value.name.clone(), name.clone());
                names.push(name);
            }
        }

        if names.is_empty() {
            return Err(SchemaError::MissingSchemaRegistry);
        }

        Ok((names, ids))
    }

    fn build_type_definition(
        &self,
        type_name: &str,
        directives: &[input::Directive<'static, String>],
        fields: &[input::Field<'static, String>],
        schema_ids: &HashMap<String, SchemaName>,
    ) -> Result<TypeDefinition, SchemaError> {
        let mut memberships = Vec::new();
        for directive in directives.iter().filter(|d| JoinTypeDirective::is(d)) {
            let parsed = JoinTypeDirective::parse(directive);
            let schema = resolve_schema_id(&parsed.schema_id, schema_ids)?;
            let lookup = parsed
                .lookup
                .map(|raw| parse_lookup(type_name, &raw))
                .transpose()?;
            memberships.push(TypeMembership {
                schema,
                key: parsed
                    .key
                    .map(|key| key.split_whitespace().map(str::to_string).collect()),
                lookup,
            });
        }
        if memberships.is_empty() {
            // Types without join annotations belong everywhere, which is what
            // root types and shared value types rely on.
            memberships = self
                .schemas
                .iter()
                .map(|schema| TypeMembership {
                    schema: schema.clone(),
                    key: None,
                    lookup: None,
                })
                .collect();
        } else {
            self.sort_by_schema_order(&mut memberships, |membership| &membership.schema);
        }

        let mut field_definitions = HashMap::with_capacity(fields.len());
        for field in fields {
            let mut servers = Vec::new();
            for directive in field.directives.iter().filter(|d| JoinFieldDirective::is(d)) {
                let parsed = JoinFieldDirective::parse(directive);
                let schema = resolve_schema_id(&parsed.schema_id, schema_ids)?;
                let lookup = parsed
                    .lookup
                    .map(|raw| parse_lookup(type_name, &raw))
                    .transpose()?;
                servers.push(FieldServer { schema, lookup });
            }
            self.sort_by_schema_order(&mut servers, |server| &server.schema);

            field_definitions.insert(
                field.name.clone(),
                FieldDefinition {
                    ty: TypeNode::from(&field.field_type),
                    servers,
                },
            );
        }

        Ok(TypeDefinition {
            name: type_name.to_string(),
            memberships,
            fields: field_definitions,
        })
    }

    fn sort_by_schema_order<T>(&self, items: &mut [T], schema_of: impl Fn(&T) -> &SchemaName) {
        items.sort_by_key(|item| {
            self.schemas
                .iter()
                .position(|schema| schema == schema_of(item))
                .unwrap_or(usize::MAX)
        });
    }

    fn validate_lookups(&self) -> Result<(), SchemaError> {
        for definition in self.definitions.values() {
            let key_fields: HashSet<&str> = definition
                .memberships
                .iter()
                .flat_map(|membership| membership.key.iter().flatten())
                .map(String::as_str)
                .collect();

            let lookups = definition
                .memberships
                .iter()
                .filter_map(|membership| membership.lookup.as_ref())
                .chain(
                    definition
                        .fields
                        .values()
                        .flat_map(|field| &field.servers)
                        .filter_map(|server| server.lookup.as_ref()),
                );

            for lookup in lookups {
                for argument in &lookup.arguments {
                    if !key_fields.contains(argument.key_field.as_str()) {
                        return Err(SchemaError::InvalidLookupKey {
                            type_name: definition.name.clone(),
                            reference: argument.key_field.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => Some(&self.query_type),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    pub fn type_definition(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.definitions.get(type_name)
    }

    pub fn field_type(&self, type_name: &str, field_name: &str) -> Option<&TypeNode> {
        self.definitions
            .get(type_name)?
            .fields
            .get(field_name)
            .map(|field| &field.ty)
    }

    /// Schemas able to serve the given field, in declaration order, with the
    /// field-level lookup when one is declared.
    pub fn field_servers(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Vec<(&SchemaName, Option<&Lookup>)> {
        let Some(definition) = self.definitions.get(type_name) else {
            return Vec::new();
        };
        let Some(field) = definition.fields.get(field_name) else {
            return Vec::new();
        };

        if field.servers.is_empty() {
            definition
                .memberships
                .iter()
                .map(|membership| (&membership.schema, None))
                .collect()
        } else {
            field
                .servers
                .iter()
                .map(|server| (&server.schema, server.lookup.as_ref()))
                .collect()
        }
    }

    pub fn resolves_in(&self, type_name: &str, field_name: &str, schema: &SchemaName) -> bool {
        if field_name == "__typename" {
            return true;
        }
        self.field_servers(type_name, field_name)
            .iter()
            .any(|(server, _)| *server == schema)
    }

    pub fn entity_lookup(&self, type_name: &str, schema: &SchemaName) -> Option<&Lookup> {
        self.definitions
            .get(type_name)?
            .memberships
            .iter()
            .find(|membership| &membership.schema == schema)?
            .lookup
            .as_ref()
    }

    pub fn is_composite(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    pub fn enum_values(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.enum_values.get(type_name)
    }

    /// True when a value of concrete type `concrete` satisfies a selection
    /// narrowed to `condition`: the same type, or an implementor of it.
    pub fn is_possible_type(&self, condition: &str, concrete: &str) -> bool {
        if condition == concrete {
            return true;
        }
        self.interface_implementors
            .get(condition)
            .map_or(false, |implementors| implementors.contains(concrete))
    }

    pub fn is_scalar_type(&self, type_name: &str) -> bool {
        if BUILTIN_SCALARS.contains(&type_name) {
            return true;
        }
        self.known_scalars.contains(type_name)
    }
}

fn resolve_schema_id(
    schema_id: &str,
    schema_ids: &HashMap<String, SchemaName>,
) -> Result<SchemaName, SchemaError> {
    schema_ids
        .get(schema_id)
        .cloned()
        .ok_or_else(|| SchemaError::UnknownSchema(schema_id.to_string()))
}

fn parse_lookup(type_name: &str, raw: &str) -> Result<Lookup, SchemaError> {
    let malformed = || SchemaError::MalformedLookup {
        type_name: type_name.to_string(),
        lookup: raw.to_string(),
    };

    let wrapped = format!("{{ {} }}", raw);
    let document = graphql_tools::parser::parse_query::<String>(&wrapped).map_err(|_| malformed())?;

    let selection_set = match document.definitions.as_slice() {
        [query_input::Definition::Operation(query_input::OperationDefinition::SelectionSet(
            selection_set,
        ))] => selection_set,
        _ => return Err(malformed()),
    };

    let field = match selection_set.items.as_slice() {
        [query_input::Selection::Field(field)] => field,
        _ => return Err(malformed()),
    };

    let mut arguments = Vec::with_capacity(field.arguments.len());
    for (name, value) in &field.arguments {
        let query_input::Value::Variable(key_field) = value else {
            return Err(malformed());
        };
        arguments.push(LookupArgument {
            name: name.clone(),
            key_field: key_field.clone(),
        });
    }
    if arguments.is_empty() {
        return Err(malformed());
    }

    Ok(Lookup {
        field: field.name.clone(),
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parsing::parse_schema;

    fn accounts() -> SchemaName {
        SchemaName("accounts".to_string())
    }

    fn reviews() -> SchemaName {
        SchemaName("reviews".to_string())
    }

    const SDL: &str = r#"
    schema { query: Query }

    enum join__Schema {
      ACCOUNTS @join__schema(name: "accounts")
      REVIEWS @join__schema(name: "reviews")
    }

    type Query {
      userById(id: ID!): User @join__field(schema: ACCOUNTS)
      topReviews(limit: Int): [Review] @join__field(schema: REVIEWS)
    }

    type User
      @join__type(schema: ACCOUNTS, key: "id", lookup: "userById(id: $id)")
      @join__type(schema: REVIEWS, key: "id")
    {
      id: ID!
      name: String! @join__field(schema: ACCOUNTS)
      reviews: [Review!] @join__field(schema: REVIEWS, lookup: "reviewsByUserId(userId: $id)")
    }

    type Review @join__type(schema: REVIEWS, key: "id") {
      id: ID!
      body: String!
    }
    "#;

    #[test]
    fn registry_keeps_declaration_order() {
        let schema = ComposedSchema::new(&parse_schema(SDL)).unwrap();
        assert_eq!(schema.schemas, vec![accounts(), reviews()]);
        assert_eq!(schema.query_type, "Query");
    }

    #[test]
    fn field_servers_fall_back_to_type_memberships() {
        let schema = ComposedSchema::new(&parse_schema(SDL)).unwrap();
        // `User.id` carries no join__field, so both member schemas serve it.
        let servers = schema.field_servers("User", "id");
        let names: Vec<&SchemaName> = servers.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec![&accounts(), &reviews()]);

        let servers = schema.field_servers("User", "name");
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].0, &accounts());
    }

    #[test]
    fn lookups_are_parsed_into_argument_bindings() {
        let schema = ComposedSchema::new(&parse_schema(SDL)).unwrap();
        let lookup = schema.entity_lookup("User", &accounts()).unwrap();
        assert_eq!(lookup.field, "userById");
        assert_eq!(lookup.arguments.len(), 1);
        assert_eq!(lookup.arguments[0].name, "id");
        assert_eq!(lookup.arguments[0].key_field, "id");

        assert!(schema.entity_lookup("User", &reviews()).is_none());

        let servers = schema.field_servers("User", "reviews");
        let lookup = servers[0].1.unwrap();
        assert_eq!(lookup.field, "reviewsByUserId");
        assert_eq!(lookup.arguments[0].name, "userId");
        assert_eq!(lookup.arguments[0].key_field, "id");
    }

    #[test]
    fn rejects_lookup_arguments_that_are_not_keys() {
        let sdl = r#"
        schema { query: Query }
        enum join__Schema {
          A @join__schema(name: "a")
        }
        type Query { thing: Thing @join__field(schema: A) }
        type Thing @join__type(schema: A, key: "id", lookup: "thingByName(name: $name)") {
          id: ID!
          name: String
        }
        "#;
        let err = ComposedSchema::new(&parse_schema(sdl)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidLookupKey { ref reference, .. } if reference == "name"
        ));
    }

    #[test]
    fn interface_implementors_are_recorded() {
        let sdl = r#"
        schema { query: Query }
        enum join__Schema {
          A @join__schema(name: "a")
        }
        type Query { search: [Node] @join__field(schema: A) }
        interface Node { id: ID! }
        type User implements Node @join__type(schema: A, key: "id", lookup: "userById(id: $id)") {
          id: ID!
        }
        "#;
        let schema = ComposedSchema::new(&parse_schema(sdl)).unwrap();
        assert!(schema.is_possible_type("Node", "User"));
        assert!(schema.is_possible_type("User", "User"));
        assert!(!schema.is_possible_type("User", "Node"));
    }

    #[test]
    fn rejects_unknown_schema_ids() {
        let sdl = r#"
        schema { query: Query }
        enum join__Schema {
          A @join__schema(name: "a")
        }
        type Query { thing: String @join__field(schema: MISSING) }
        "#;
        let err = ComposedSchema::new(&parse_schema(sdl)).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownSchema(ref id) if id == "MISSING"));
    }
}
