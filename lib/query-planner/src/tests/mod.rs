mod artifacts;
mod testkit;

use crate::{
    tests::testkit::{build_query_plan, init_logger},
    utils::parsing::parse_operation,
};
use std::error::Error;

#[test]
fn storefront_operation() -> Result<(), Box<dyn Error>> {
    init_logger();
    let document = parse_operation(
        r#"
        query Storefront($withReviews: Boolean!) {
          topProducts {
            name
            price
            reviews @include(if: $withReviews) {
              body
              author {
                name
                reviews {
                  id
                }
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

    insta::assert_snapshot!(format!("{}", query_plan), @r#"
    RequestPlan {
      #0 Operation(schema: "products") {
        query {topProducts {name price upc}}
        Condition($withReviews == true) {
          #4 Operation(schema: "reviews", path: "topProducts.@") {
            require $r0 = #0.topProducts.upc (ID!)
            query($r0:ID!) {productByUpc(upc: $r0) {reviews {body author {id reviews {id}}}}}
            #11 Operation(schema: "accounts", path: "topProducts.@.reviews.@.author") {
              require $r1 = #4.reviews.author.id (ID!)
              query($r1:ID!) {userById(id: $r1) {name}}
            }
          }
        }
      }
    }
    "#);

    Ok(())
}
