use graphql_tools::parser::schema::{Directive, Value};

pub trait SchemaDirective<'a> {
    fn directive_name() -> &'a str;
    fn is(directive: &Directive<'_, String>) -> bool {
        Self::directive_name() == directive.name
    }
    fn parse(directive: &Directive<'_, String>) -> Self
    where
        Self: Sized;
}

/// `@join__schema(name: "accounts")` on a `join__Schema` enum value. The
/// enum's declaration order doubles as the deterministic tie-break order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JoinSchemaDirective {
    pub name: String,
}

impl JoinSchemaDirective {
    pub const NAME: &str = "join__schema";
}

impl<'a> SchemaDirective<'a> for JoinSchemaDirective {
    fn directive_name() -> &'a str {
        Self::NAME
    }

    fn parse(directive: &Directive<'_, String>) -> Self {
        let mut result = Self::default();

        for (arg_name, arg_value) in &directive.arguments {
            if arg_name.eq("name") {
                if let Value::String(value) = arg_value {
                    result.name = value.clone()
                }
            }
        }

        result
    }
}

/// `@join__type(schema: ACCOUNTS, key: "id", lookup: "userById(id: $id)")`
/// on an object or interface type.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JoinTypeDirective {
    pub schema_id: String,
    pub key: Option<String>,
    pub lookup: Option<String>,
}

impl JoinTypeDirective {
    pub const NAME: &str = "join__type";
}

impl<'a> SchemaDirective<'a> for JoinTypeDirective {
    fn directive_name() -> &'a str {
        Self::NAME
    }

    fn parse(directive: &Directive<'_, String>) -> Self {
        let mut result = Self::default();

        for (arg_name, arg_value) in &directive.arguments {
            if arg_name.eq("schema") {
                match arg_value {
                    Value::String(value) => result.schema_id = value.clone(),
                    Value::Enum(value) => result.schema_id = value.clone(),
                    _ => {}
                }
            } else if arg_name.eq("key") {
                if let Value::String(value) = arg_value {
                    result.key = Some(value.clone())
                }
            } else if arg_name.eq("lookup") {
                if let Value::String(value) = arg_value {
                    result.lookup = Some(value.clone())
                }
            }
        }

        result
    }
}

/// `@join__field(schema: REVIEWS, lookup: "reviewsByUserId(userId: $id)")`
/// on a field definition.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct JoinFieldDirective {
    pub schema_id: String,
    pub lookup: Option<String>,
}

impl JoinFieldDirective {
    pub const NAME: &str = "join__field";
}

impl<'a> SchemaDirective<'a> for JoinFieldDirective {
    fn directive_name() -> &'a str {
        Self::NAME
    }

    fn parse(directive: &Directive<'_, String>) -> Self {
        let mut result = Self::default();

        for (arg_name, arg_value) in &directive.arguments {
            if arg_name.eq("schema") {
                match arg_value {
                    Value::String(value) => result.schema_id = value.clone(),
                    Value::Enum(value) => result.schema_id = value.clone(),
                    _ => {}
                }
            } else if arg_name.eq("lookup") {
                if let Value::String(value) = arg_value {
                    result.lookup = Some(value.clone())
                }
            }
        }

        result
    }
}
