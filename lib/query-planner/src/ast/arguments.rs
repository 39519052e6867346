use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::value::Value;
use graphql_tools::parser::query::Value as ParserValue;

/// Field arguments keyed by name. The map is ordered so that rendering
/// and hashing stay deterministic.
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct ArgumentsMap {
    arguments_map: BTreeMap<String, Value>,
}

impl From<&Vec<(String, ParserValue<'_, String>)>> for ArgumentsMap {
    fn from(args: &Vec<(String, ParserValue<'_, String>)>) -> Self {
        let mut arguments_map = BTreeMap::new();
        for (key, value) in args {
            arguments_map.insert(key.to_string(), Value::from(value));
        }
        Self { arguments_map }
    }
}

impl ArgumentsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_argument(&mut self, key: String, value: Value) {
        self.arguments_map.insert(key, value);
    }

    pub fn get_argument(&self, key: &str) -> Option<&Value> {
        self.arguments_map.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.arguments_map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.arguments_map.iter()
    }

    pub fn collect_variables(&self, out: &mut std::collections::BTreeSet<String>) {
        for value in self.arguments_map.values() {
            value.collect_variables(out);
        }
    }
}

impl Display for ArgumentsMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.arguments_map.is_empty() {
            return Ok(());
        }

        write!(f, "(")?;
        for (i, (name, value)) in self.arguments_map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, ")")
    }
}
