use std::collections::BTreeMap;
use std::fmt::Display;

use graphql_tools::parser::query::Value as ParserValue;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn variable_usage(&self) -> Option<&str> {
        match self {
            Value::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn collect_variables(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            Value::Variable(name) => {
                out.insert(name.clone());
            }
            Value::List(items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Value::Object(fields) => {
                for value in fields.values() {
                    value.collect_variables(out);
                }
            }
            _ => {}
        }
    }
}

impl From<&ParserValue<'_, String>> for Value {
    fn from(value: &ParserValue<'_, String>) -> Self {
        match value {
            ParserValue::Variable(name) => Value::Variable(name.to_owned()),
            ParserValue::Int(i) => Value::Int(i.as_i64().unwrap_or_default()),
            ParserValue::Float(f) => Value::Float(f.to_owned()),
            ParserValue::String(s) => Value::String(s.to_owned()),
            ParserValue::Boolean(b) => Value::Boolean(b.to_owned()),
            ParserValue::Null => Value::Null,
            ParserValue::Enum(e) => Value::Enum(e.to_owned()),
            ParserValue::List(l) => Value::List(l.iter().map(Value::from).collect()),
            ParserValue::Object(o) => {
                let mut map = BTreeMap::new();
                for (k, v) in o {
                    map.insert(k.to_string(), Value::from(v));
                }
                Value::Object(map)
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            // A variable reference has no runtime value of its own.
            Value::Variable(_) => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::Enum(e) => serde_json::Value::String(e.clone()),
            Value::List(l) => serde_json::Value::Array(l.iter().map(Into::into).collect()),
            Value::Object(o) => serde_json::Value::Object(
                o.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Variable(name) => write!(f, "${}", name),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Enum(e) => write!(f, "{}", e),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
