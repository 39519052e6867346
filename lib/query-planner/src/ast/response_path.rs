use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// One step of a path into response data. List segments are rendered as `@`
/// and stand for "every element" until execution substitutes a concrete
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    List,
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::List => write!(f, "@"),
        }
    }
}

/// A path into the merged response buffer, e.g. `users.@.reviews`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResponsePath {
    segments: Vec<PathSegment>,
}

impl ResponsePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push_field(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self { segments }
    }

    pub fn push_list(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::List);
        Self { segments }
    }

    pub fn concat(&self, other: &ResponsePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn starts_with(&self, prefix: &ResponsePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// The remainder of `self` after stripping `prefix`. Callers guarantee the
    /// prefix relation; the planner only computes suffixes against the
    /// enclosing operation's own path.
    pub fn suffix_after(&self, prefix: &ResponsePath) -> Self {
        debug_assert!(self.starts_with(prefix));
        Self {
            segments: self.segments[prefix.segments.len()..].to_vec(),
        }
    }
}

impl From<Vec<PathSegment>> for ResponsePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

impl Display for ResponsePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for ResponsePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResponsePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(ResponsePath::root());
        }
        Ok(ResponsePath {
            segments: raw
                .split('.')
                .map(|part| match part {
                    "@" => PathSegment::List,
                    name => PathSegment::Field(name.to_string()),
                })
                .collect(),
        })
    }
}
