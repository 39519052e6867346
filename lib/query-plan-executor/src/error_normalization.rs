use serde_json::{Map, Value};

use crate::binding::{to_error_path, PathPart};
use crate::GraphQLError;

/// Rewrites a sub-response's errors into the client's response space.
///
/// A source schema reports paths from its own data root, e.g.
/// `["reviewsByUserId", 0, "body"]`. The lookup envelope is stripped and the
/// operation's concrete mount location is prefixed, giving e.g.
/// `["userById", "reviews", 0, "body"]`. Errors without a path are pinned to
/// the mount location itself. Every error is tagged with the source schema
/// it came from.
pub fn rebase_source_errors(
    schema_name: &str,
    mount_path: &[PathPart],
    lookup_field: Option<&str>,
    errors: Vec<GraphQLError>,
) -> Vec<GraphQLError> {
    errors
        .into_iter()
        .map(|mut error| {
            let base = to_error_path(mount_path);
            error.path = match error.path.take() {
                Some(path) => {
                    let mut rest = path.as_slice();
                    if let (Some(field), Some(Value::String(head))) = (lookup_field, path.first()) {
                        if head == field {
                            rest = &path[1..];
                        }
                    }
                    let mut rebased = base;
                    rebased.extend_from_slice(rest);
                    Some(rebased)
                }
                None if base.is_empty() => None,
                None => Some(base),
            };
            let extensions = error.extensions.get_or_insert_with(Map::new);
            extensions.insert(
                "code".to_string(),
                Value::String("SOURCE_SCHEMA_ERROR".to_string()),
            );
            extensions.insert(
                "schema".to_string(),
                Value::String(schema_name.to_string()),
            );
            error
        })
        .collect()
}

#[test]
fn test_rebase_source_errors() {
    use serde_json::json;

    let mount_path = vec![
        PathPart::Key("userById".to_string()),
        PathPart::Key("reviews".to_string()),
    ];
    let errors = vec![
        GraphQLError::at_path(
            "Boom",
            vec![json!("reviewsByUserId"), json!(0), json!("body")],
        ),
        GraphQLError::new("Connection reset"),
    ];

    let rebased = rebase_source_errors("reviews", &mount_path, Some("reviewsByUserId"), errors);
    assert_eq!(rebased.len(), 2);
    assert_eq!(
        rebased[0].path,
        Some(vec![
            json!("userById"),
            json!("reviews"),
            json!(0),
            json!("body"),
        ])
    );
    assert_eq!(
        rebased[1].path,
        Some(vec![json!("userById"), json!("reviews")])
    );
    let extensions = rebased[0].extensions.as_ref().unwrap();
    assert_eq!(extensions.get("code"), Some(&json!("SOURCE_SCHEMA_ERROR")));
    assert_eq!(extensions.get("schema"), Some(&json!("reviews")));
}
