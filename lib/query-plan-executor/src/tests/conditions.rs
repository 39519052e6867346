use serde_json::json;

use crate::executors::map::SourceExecutorMap;
use crate::tests::testkit::{execute, init_logger, plan_for, vars, StaticResponder};
use crate::ExecuteError;

const GATED_REVIEWS: &str = r#"
    query($withReviews: Boolean!) {
      userById(id: "1") {
        name
        reviews @include(if: $withReviews) {
          id
        }
      }
    }
"#;

#[test]
fn passing_gate_dispatches_the_downstream_operation() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(GATED_REVIEWS);
        let accounts = StaticResponder::new(json!({"userById": {"id": "1", "name": "Ann"}}));
        let reviews = StaticResponder::new(json!({"reviewsByUserId": [{"id": "r1"}]}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());
        executors.insert("reviews", reviews.clone());

        let result = execute(
            &plan,
            planner.schema(),
            &executors,
            vars(json!({"withReviews": true})),
        )
        .await
        .expect("execution failed");

        assert_eq!(reviews.call_count(), 1);
        assert_eq!(
            serde_json::to_value(&result).expect("result must serialize"),
            json!({
                "data": {
                    "userById": {"name": "Ann", "reviews": [{"id": "r1"}]}
                }
            })
        );
    });
}

#[test]
fn failing_gate_skips_without_errors() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(GATED_REVIEWS);
        let accounts = StaticResponder::new(json!({"userById": {"id": "1", "name": "Ann"}}));
        let reviews = StaticResponder::new(json!({"reviewsByUserId": [{"id": "r1"}]}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());
        executors.insert("reviews", reviews.clone());

        let result = execute(
            &plan,
            planner.schema(),
            &executors,
            vars(json!({"withReviews": false})),
        )
        .await
        .expect("execution failed");

        assert_eq!(reviews.call_count(), 0);
        assert_eq!(
            serde_json::to_value(&result).expect("result must serialize"),
            json!({"data": {"userById": {"name": "Ann"}}})
        );
    });
}

#[test]
fn skip_gates_invert_the_passing_value() {
    init_logger();
    tokio_test::block_on(async {
        let operation = r#"
            query($noReviews: Boolean!) {
              userById(id: "1") {
                name
                reviews @skip(if: $noReviews) {
                  id
                }
              }
            }
        "#;

        for (no_reviews, expected_calls) in [(true, 0), (false, 1)] {
            let (planner, plan) = plan_for(operation);
            let accounts = StaticResponder::new(json!({"userById": {"id": "1", "name": "Ann"}}));
            let reviews = StaticResponder::new(json!({"reviewsByUserId": [{"id": "r1"}]}));
            let mut executors = SourceExecutorMap::new();
            executors.insert("accounts", accounts.clone());
            executors.insert("reviews", reviews.clone());

            execute(
                &plan,
                planner.schema(),
                &executors,
                vars(json!({"noReviews": no_reviews})),
            )
            .await
            .expect("execution failed");

            assert_eq!(reviews.call_count(), expected_calls);
        }
    });
}

#[test]
fn missing_condition_variable_fails_before_any_dispatch() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(
            r#"
            query($withReviews: Boolean) {
              userById(id: "1") {
                name
                reviews @include(if: $withReviews) {
                  id
                }
              }
            }
            "#,
        );
        let accounts = StaticResponder::new(json!({"userById": {"id": "1", "name": "Ann"}}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());

        let result = execute(&plan, planner.schema(), &executors, None).await;

        match result {
            Err(ExecuteError::ConditionVariableMissing(name)) => {
                assert_eq!(name, "withReviews");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(accounts.call_count(), 0);
    });
}

#[test]
fn non_boolean_condition_variable_fails_before_any_dispatch() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(
            r#"
            query($withReviews: String) {
              userById(id: "1") {
                name
                reviews @include(if: $withReviews) {
                  id
                }
              }
            }
            "#,
        );
        let accounts = StaticResponder::new(json!({"userById": {"id": "1", "name": "Ann"}}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());

        let result = execute(
            &plan,
            planner.schema(),
            &executors,
            vars(json!({"withReviews": "yes"})),
        )
        .await;

        match result {
            Err(ExecuteError::ConditionVariableNotBoolean(name)) => {
                assert_eq!(name, "withReviews");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(accounts.call_count(), 0);
    });
}

#[test]
fn same_schema_skip_rides_along_in_the_sub_request() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(
            r#"
            query($hideEmail: Boolean!) {
              userById(id: "1") {
                name
                email @skip(if: $hideEmail)
              }
            }
            "#,
        );
        let accounts = StaticResponder::new(json!({"userById": {"name": "Ann"}}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());

        let result = execute(
            &plan,
            planner.schema(),
            &executors,
            vars(json!({"hideEmail": true})),
        )
        .await
        .expect("execution failed");

        assert_eq!(accounts.call_count(), 1);
        assert!(accounts.recorded_queries()[0].contains("@skip(if: $hideEmail)"));
        assert_eq!(
            accounts.recorded_variables(),
            vec![vars(json!({"hideEmail": true}))]
        );
        assert_eq!(
            serde_json::to_value(&result).expect("result must serialize"),
            json!({"data": {"userById": {"name": "Ann"}}})
        );
    });
}
