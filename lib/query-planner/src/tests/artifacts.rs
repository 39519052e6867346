use crate::{
    plan::artifact::PlanArtifact,
    tests::testkit::{build_query_plan, init_logger},
    utils::parsing::parse_operation,
};
use std::error::Error;

#[test]
fn operations_are_numbered_breadth_first() -> Result<(), Box<dyn Error>> {
    init_logger();
    let document = parse_operation(
        r#"
        query {
          topProducts {
            name
            reviews {
              body
              author {
                name
              }
            }
          }
        }
        "#,
    );
    let query_plan = build_query_plan(
        "src/tests/fixtures/storefront.supergraph.graphql",
        document,
    )?;
    let artifact = PlanArtifact::from_plan(&query_plan);

    insta::assert_snapshot!(serde_json::to_string_pretty(&artifact)?, @r#"
    {
      "nodes": [
        {
          "id": 0,
          "schema": "products",
          "operation": "query {topProducts {name upc}}"
        },
        {
          "id": 1,
          "schema": "reviews",
          "operation": "query($r0:ID!) {productByUpc(upc: $r0) {reviews {body author {id}}}}",
          "requirements": [
            {
              "name": "r0",
              "dependsOn": 0,
              "field": [
                "topProducts",
                "upc"
              ],
              "type": "ID!"
            }
          ]
        },
        {
          "id": 2,
          "schema": "accounts",
          "operation": "query($r1:ID!) {userById(id: $r1) {name}}",
          "requirements": [
            {
              "name": "r1",
              "dependsOn": 1,
              "field": [
                "reviews",
                "author",
                "id"
              ],
              "type": "ID!"
            }
          ]
        }
      ]
    }
    "#);

    Ok(())
}

#[test]
fn gated_operations_keep_their_edges() -> Result<(), Box<dyn Error>> {
    init_logger();
    let document = parse_operation(
        r#"
        query ($withReviews: Boolean!) {
          userById(id: "1") {
            name
            reviews @include(if: $withReviews) {
              id
            }
          }
        }
        "#,
    );
    let query_plan = build_query_plan(
        "src/tests/fixtures/storefront.supergraph.graphql",
        document,
    )?;
    let artifact = PlanArtifact::from_plan(&query_plan);

    insta::assert_snapshot!(serde_json::to_string_pretty(&artifact)?, @r#"
    {
      "nodes": [
        {
          "id": 0,
          "schema": "accounts",
          "operation": "query {userById(id: \"1\") {name id}}"
        },
        {
          "id": 1,
          "schema": "reviews",
          "operation": "query($r0:ID!) {reviewsByUserId(userId: $r0) {id}}",
          "requirements": [
            {
              "name": "r0",
              "dependsOn": 0,
              "field": [
                "userById",
                "id"
              ],
              "type": "ID!"
            }
          ]
        }
      ]
    }
    "#);

    Ok(())
}

#[test]
fn nested_form_tags_every_node() -> Result<(), Box<dyn Error>> {
    init_logger();
    let document = parse_operation(
        r#"
        query {
          userById(id: "1") {
            name
            reviews {
              id
            }
          }
        }
        "#,
    );
    let query_plan = build_query_plan(
        "src/tests/fixtures/storefront.supergraph.graphql",
        document,
    )?;

    insta::assert_snapshot!(serde_json::to_string_pretty(&query_plan)?, @r#"
    {
      "kind": "Request",
      "operation": "query {userById(id: \"1\") {name reviews {id}}}",
      "nodes": [
        {
          "kind": "Operation",
          "id": 0,
          "schema": "accounts",
          "path": "",
          "operation": "query {userById(id: \"1\") {name id}}",
          "nodes": [
            {
              "kind": "Field",
              "type": "Query",
              "name": "userById",
              "arguments": "(id: \"1\")",
              "nodes": [
                {
                  "kind": "Field",
                  "type": "User",
                  "name": "name"
                },
                {
                  "kind": "Field",
                  "type": "User",
                  "name": "id"
                }
              ]
            },
            {
              "kind": "Operation",
              "id": 1,
              "schema": "reviews",
              "path": "userById",
              "operation": "query($r0:ID!) {reviewsByUserId(userId: $r0) {id}}",
              "nodes": [
                {
                  "kind": "Field",
                  "type": "Review",
                  "name": "id"
                },
                {
                  "kind": "Requirement",
                  "name": "r0",
                  "dependsOn": 0,
                  "field": [
                    "userById",
                    "id"
                  ],
                  "type": "ID!"
                }
              ]
            }
          ]
        }
      ]
    }
    "#);

    Ok(())
}

#[test]
fn artifacts_survive_a_json_round_trip() -> Result<(), Box<dyn Error>> {
    init_logger();
    let document = parse_operation(
        r#"
        query {
          topProducts {
            name
            reviews {
              body
              author {
                name
              }
            }
          }
        }
        "#,
    );
    let query_plan = build_query_plan(
        "src/tests/fixtures/storefront.supergraph.graphql",
        document,
    )?;
    let artifact = PlanArtifact::from_plan(&query_plan);

    let reparsed: PlanArtifact = serde_json::from_str(&serde_json::to_string(&artifact)?)?;

    assert_eq!(reparsed, artifact);
    assert_eq!(reparsed.nodes.len(), query_plan.operation_order().len());

    Ok(())
}

#[test]
fn identical_shapes_produce_identical_artifacts() -> Result<(), Box<dyn Error>> {
    init_logger();
    let query = r#"
    query {
      topProducts {
        name
        reviews {
          body
        }
      }
    }
    "#;
    let first = build_query_plan(
        "src/tests/fixtures/storefront.supergraph.graphql",
        parse_operation(query),
    )?;
    let second = build_query_plan(
        "src/tests/fixtures/storefront.supergraph.graphql",
        parse_operation(query),
    )?;

    assert_eq!(
        serde_json::to_string(&PlanArtifact::from_plan(&first))?,
        serde_json::to_string(&PlanArtifact::from_plan(&second))?
    );

    Ok(())
}
