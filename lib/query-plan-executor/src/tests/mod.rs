mod conditions;
mod testkit;
mod variable_handling;

use serde_json::json;

use crate::executors::map::SourceExecutorMap;
use crate::tests::testkit::{execute, init_logger, plan_for, vars, KeyedResponder, StaticResponder};

#[test]
fn dashboard_operation() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(
            r#"
            query Dashboard($withReviews: Boolean!, $limit: Int = 2) {
              userById(id: "1") {
                __typename
                name
                role
                reviews(limit: $limit) @include(if: $withReviews) {
                  id
                  body
                  product {
                    name
                  }
                }
              }
            }
            "#,
        );
        let accounts = StaticResponder::new(json!({
            "userById": {"__typename": "User", "id": "1", "name": "Ann", "role": "ADMIN"}
        }));
        let reviews = StaticResponder::new(json!({
            "reviewsByUserId": [
                {"id": "r1", "body": "Great", "product": {"id": "p1"}},
                {"id": "r2", "body": "Meh", "product": {"id": "p2"}}
            ]
        }));
        let products = KeyedResponder::new(
            "r1",
            vec![
                ("p1", json!({"productById": {"name": "Lamp"}})),
                ("p2", json!({"productById": {"name": "Desk"}})),
            ],
        );
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());
        executors.insert("reviews", reviews.clone());
        executors.insert("products", products.clone());

        let result = execute(
            &plan,
            planner.schema(),
            &executors,
            vars(json!({"withReviews": true})),
        )
        .await
        .expect("execution failed");

        assert_eq!(accounts.call_count(), 1);
        assert_eq!(
            reviews.recorded_variables(),
            vec![vars(json!({"limit": 2, "r0": "1"}))]
        );
        assert_eq!(
            products.recorded_variables(),
            vec![vars(json!({"r1": "p1"})), vars(json!({"r1": "p2"}))]
        );
        insta::assert_snapshot!(
            serde_json::to_string_pretty(&result).expect("result must serialize"),
            @r#"
        {
          "data": {
            "userById": {
              "__typename": "User",
              "name": "Ann",
              "role": "ADMIN",
              "reviews": [
                {
                  "id": "r1",
                  "body": "Great",
                  "product": {
                    "name": "Lamp"
                  }
                },
                {
                  "id": "r2",
                  "body": "Meh",
                  "product": {
                    "name": "Desk"
                  }
                }
              ]
            }
          }
        }
        "#
        );
    });
}
