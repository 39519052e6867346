use serde_json::json;

use crate::executors::map::SourceExecutorMap;
use crate::tests::testkit::{execute, init_logger, plan_for, vars, StaticResponder};
use crate::ExecuteError;

#[test]
fn missing_non_null_variable_rejects_the_request() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(r#"query($id: ID!) { userById(id: $id) { name } }"#);
        let accounts = StaticResponder::new(json!({"userById": {"name": "Ann"}}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());

        let result = execute(&plan, planner.schema(), &executors, None).await;

        match result {
            Err(ExecuteError::VariableCoercion(message)) => {
                assert_eq!(
                    message,
                    "Variable 'id' is non-nullable but no value was provided"
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(accounts.call_count(), 0);
    });
}

#[test]
fn defaults_flow_into_sub_requests() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) =
            plan_for(r#"query($limit: Int = 2) { latestReviews(limit: $limit) { id } }"#);
        let reviews = StaticResponder::new(json!({"latestReviews": [{"id": "r1"}, {"id": "r2"}]}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("reviews", reviews.clone());

        let result = execute(&plan, planner.schema(), &executors, None)
            .await
            .expect("execution failed");

        assert_eq!(reviews.recorded_variables(), vec![vars(json!({"limit": 2}))]);
        assert_eq!(
            serde_json::to_value(&result).expect("result must serialize"),
            json!({"data": {"latestReviews": [{"id": "r1"}, {"id": "r2"}]}})
        );
    });
}

#[test]
fn enum_variables_are_validated_against_the_declared_values() {
    init_logger();
    tokio_test::block_on(async {
        let (planner, plan) = plan_for(r#"query($role: Role!) { userById(id: "1") { role } }"#);
        let accounts = StaticResponder::new(json!({"userById": {"role": "ADMIN"}}));
        let mut executors = SourceExecutorMap::new();
        executors.insert("accounts", accounts.clone());

        let result = execute(
            &plan,
            planner.schema(),
            &executors,
            vars(json!({"role": "SUPERADMIN"})),
        )
        .await;

        match result {
            Err(ExecuteError::VariableCoercion(message)) => {
                assert_eq!(
                    message,
                    "Value 'SUPERADMIN' is not a valid enum value for type 'Role'"
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(accounts.call_count(), 0);
    });
}
