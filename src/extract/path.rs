// SPDX-License-Identifier: Apache-2.0

//! Path expressions
//!
//! A small XPath-like language shared by every response format:
//!
//! - `/a/b` is anchored at the document root, `a/b` at the context node
//! - `//a` selects descendants named `a`
//! - `*` matches any name, `.` is the context node
//! - `@name` selects an attribute (a field for JSON), `text()` selects text
//!
//! Attribute and text steps may only appear last. Predicates are not supported.

use std::fmt;
use std::str::FromStr;

use apifed_core::{FederationError, FederationResult};

/// How a step moves away from its context nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

/// What a step selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Name(String),
    AnyName,
    Attribute(String),
    Text,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl PathExpr {
    pub fn parse(source: &str) -> FederationResult<Self> {
        let trimmed = source.trim();
        let invalid = |reason: &str| {
            FederationError::config(format!("Invalid path expression '{source}': {reason}"))
        };

        if trimmed.is_empty() {
            return Err(invalid("path is empty"));
        }

        let (absolute, mut axis, mut rest) = if let Some(rest) = trimmed.strip_prefix("//") {
            (true, Axis::Descendant, rest)
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            (true, Axis::Child, rest)
        } else {
            (false, Axis::Child, trimmed)
        };

        let mut steps = Vec::new();
        loop {
            let (segment, tail) = match rest.find('/') {
                Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
                None => (rest, None),
            };
            steps.push(Step {
                axis,
                test: parse_test(segment).map_err(|reason| invalid(reason.as_str()))?,
            });

            match tail {
                None => break,
                Some(tail) => match tail.strip_prefix('/') {
                    Some(after) => {
                        axis = Axis::Descendant;
                        rest = after;
                    }
                    None => {
                        axis = Axis::Child;
                        rest = tail;
                    }
                },
            }
        }

        let last = steps.len() - 1;
        for step in &steps[..last] {
            if matches!(step.test, NodeTest::Attribute(_) | NodeTest::Text) {
                return Err(invalid("attribute and text() steps must come last"));
            }
        }

        Ok(Self {
            source: trimmed.to_string(),
            absolute,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// True when the expression selects structural nodes rather than
    /// attribute values or text, i.e. it can locate result items.
    pub fn selects_nodes(&self) -> bool {
        !matches!(
            self.steps.last().map(|s| &s.test),
            Some(NodeTest::Attribute(_) | NodeTest::Text)
        )
    }
}

fn parse_test(segment: &str) -> Result<NodeTest, String> {
    match segment {
        "" => Err("empty step".to_string()),
        "." => Ok(NodeTest::Context),
        "*" => Ok(NodeTest::AnyName),
        "text()" => Ok(NodeTest::Text),
        _ => {
            if let Some(attr) = segment.strip_prefix('@') {
                validate_name(attr)?;
                Ok(NodeTest::Attribute(attr.to_string()))
            } else {
                validate_name(segment)?;
                Ok(NodeTest::Name(segment.to_string()))
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("missing name".to_string());
    }
    if name.contains('[') {
        return Err(format!("predicates are not supported in '{name}'"));
    }
    match name
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(*c, '_' | '-' | '.' | ':')))
    {
        Some(c) => Err(format!("unexpected character '{c}' in '{name}'")),
        None => Ok(()),
    }
}

impl FromStr for PathExpr {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
