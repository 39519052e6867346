//! Wrappers over the `graphql_tools` parsers that hand back owned documents,
//! so callers never carry the parser's borrowed lifetimes around.

use graphql_tools::parser;

pub fn parse_schema(sdl: &str) -> parser::schema::Document<'static, String> {
    parser::parse_schema(sdl)
        .expect("invalid schema document")
        .into_static()
}

pub fn parse_operation(source: &str) -> parser::query::Document<'static, String> {
    parser::parse_query(source)
        .expect("invalid operation document")
        .into_static()
}
