// SPDX-License-Identifier: Apache-2.0

//! JSON response extraction
//!
//! A key-path walker over `serde_json::Value`. Name steps that meet an array
//! apply to each element, and arrays selected as items are flattened, so
//! `/query/pages` yields one item per page.

use std::fmt;
use std::sync::Arc;

use apifed_core::{FederationError, FederationResult, Value};

use super::path::{Axis, NodeTest, PathExpr, Step};
use super::{PathExtractor, ResultItem};

type Json = serde_json::Value;

fn evaluate<'a>(root: &'a Json, context: &'a Json, path: &PathExpr) -> Vec<&'a Json> {
    let start = if path.is_absolute() { root } else { context };
    path.steps()
        .iter()
        .fold(vec![start], |current, step| apply_step(current, step))
}

fn apply_step<'a>(current: Vec<&'a Json>, step: &Step) -> Vec<&'a Json> {
    let mut out = Vec::new();
    for node in current {
        match (step.axis, &step.test) {
            (Axis::Child, NodeTest::Context) => out.push(node),
            (Axis::Child, NodeTest::Name(name) | NodeTest::Attribute(name)) => {
                member(node, name, &mut out)
            }
            (Axis::Child, NodeTest::AnyName) => children(node, &mut out),
            (Axis::Child, NodeTest::Text) => {
                if is_scalar(node) {
                    out.push(node)
                }
            }
            (Axis::Descendant, NodeTest::Context) => {
                out.push(node);
                descendants(node, &mut out);
            }
            (Axis::Descendant, NodeTest::Name(name) | NodeTest::Attribute(name)) => {
                named_descendants(node, name, &mut out)
            }
            (Axis::Descendant, NodeTest::AnyName) => descendants(node, &mut out),
            (Axis::Descendant, NodeTest::Text) => {
                let mut all = vec![node];
                descendants(node, &mut all);
                out.extend(all.into_iter().filter(|v| is_scalar(v)));
            }
        }
    }
    out
}

fn member<'a>(node: &'a Json, name: &str, out: &mut Vec<&'a Json>) {
    match node {
        Json::Object(map) => out.extend(map.get(name)),
        Json::Array(elements) => {
            for element in elements {
                if let Json::Object(map) = element {
                    out.extend(map.get(name));
                }
            }
        }
        _ => {}
    }
}

fn children<'a>(node: &'a Json, out: &mut Vec<&'a Json>) {
    match node {
        Json::Object(map) => out.extend(map.values()),
        Json::Array(elements) => out.extend(elements.iter()),
        _ => {}
    }
}

fn descendants<'a>(node: &'a Json, out: &mut Vec<&'a Json>) {
    let mut direct = Vec::new();
    children(node, &mut direct);
    for child in direct {
        out.push(child);
        descendants(child, out);
    }
}

fn named_descendants<'a>(node: &'a Json, name: &str, out: &mut Vec<&'a Json>) {
    match node {
        Json::Object(map) => {
            for (key, child) in map {
                if key == name {
                    out.push(child);
                }
                named_descendants(child, name, out);
            }
        }
        Json::Array(elements) => {
            for element in elements {
                named_descendants(element, name, out);
            }
        }
        _ => {}
    }
}

fn is_scalar(node: &Json) -> bool {
    matches!(node, Json::String(_) | Json::Number(_) | Json::Bool(_))
}

/// Converts a selected JSON node into a row value; `null` stays unbound.
fn to_value(node: &Json) -> Option<Value> {
    match node {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => Some(match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n
                .as_f64()
                .map(Value::Float)
                .unwrap_or_else(|| Value::Text(n.to_string())),
        }),
        Json::String(s) => Some(Value::Text(s.clone())),
        Json::Array(_) | Json::Object(_) => Some(Value::Json(node.clone())),
    }
}

/// One value selected from a JSON response
pub struct JsonItem {
    root: Arc<Json>,
    node: Json,
}

impl fmt::Debug for JsonItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonItem").field(&self.node).finish()
    }
}

impl ResultItem for JsonItem {
    fn extract(&self, path: &PathExpr) -> Option<Value> {
        evaluate(&self.root, &self.node, path)
            .into_iter()
            .find_map(to_value)
    }
}

/// Extractor for JSON responses
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExtractor;

impl JsonExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PathExtractor for JsonExtractor {
    fn format(&self) -> &'static str {
        "json"
    }

    fn extract_items(
        &self,
        body: &str,
        path: &PathExpr,
    ) -> FederationResult<Vec<Box<dyn ResultItem>>> {
        let root: Json = serde_json::from_str(body)
            .map_err(|e| FederationError::transport(format!("Unparsable JSON response: {e}")))?;
        let root = Arc::new(root);

        let mut items: Vec<Box<dyn ResultItem>> = Vec::new();
        for selected in evaluate(&root, &root, path) {
            let nodes: Vec<&Json> = match selected {
                Json::Array(elements) => elements.iter().collect(),
                other => vec![other],
            };
            // A null is an absent item, not an item with every variable unbound.
            for node in nodes.into_iter().filter(|node| !node.is_null()) {
                items.push(Box::new(JsonItem {
                    root: Arc::clone(&root),
                    node: node.clone(),
                }));
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = r#"{
        "batchcomplete": true,
        "query": {
            "searchinfo": {"totalhits": 2},
            "search": [
                {"ns": 0, "title": "Albert Einstein", "pageid": 736, "score": 0.5},
                {"ns": 0, "title": "Einstein family", "pageid": 2139, "redirect": null}
            ]
        }
    }"#;

    fn path(s: &str) -> PathExpr {
        PathExpr::parse(s).unwrap()
    }

    #[test]
    fn test_array_items_are_flattened() {
        let items = JsonExtractor::new()
            .extract_items(SEARCH, &path("/query/search"))
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].extract(&path("title")),
            Some(Value::Text("Albert Einstein".into()))
        );
        assert_eq!(items[1].extract(&path("@pageid")), Some(Value::Int(2139)));
        assert_eq!(items[0].extract(&path("score")), Some(Value::Float(0.5)));
    }

    #[test]
    fn test_null_and_missing_members_are_unbound() {
        let items = JsonExtractor::new()
            .extract_items(SEARCH, &path("//search"))
            .unwrap();
        assert_eq!(items[1].extract(&path("redirect")), None);
        assert_eq!(items[0].extract(&path("missing")), None);
    }

    #[test]
    fn test_descendant_and_absolute_paths() {
        let items = JsonExtractor::new()
            .extract_items(SEARCH, &path("//searchinfo"))
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].extract(&path("totalhits")), Some(Value::Int(2)));
        assert_eq!(
            items[0].extract(&path("/batchcomplete")),
            Some(Value::Bool(true))
        );
        assert_eq!(
            items[0].extract(&path("/query/search/title")),
            Some(Value::Text("Albert Einstein".into()))
        );
    }

    #[test]
    fn test_composite_values_are_json() {
        let items = JsonExtractor::new()
            .extract_items(SEARCH, &path("/query"))
            .unwrap();
        assert_eq!(
            items[0].extract(&path("searchinfo")),
            Some(Value::Json(serde_json::json!({"totalhits": 2})))
        );
    }

    #[test]
    fn test_missing_items_path_is_empty() {
        let items = JsonExtractor::new()
            .extract_items(SEARCH, &path("/query/pages"))
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_null_items_are_skipped() {
        let extractor = JsonExtractor::new();
        let items = extractor
            .extract_items(r#"{"query": {"search": null}}"#, &path("/query/search"))
            .unwrap();
        assert!(items.is_empty());

        let items = extractor
            .extract_items(
                r#"{"query": {"search": [null, {"title": "Albert Einstein"}, null]}}"#,
                &path("/query/search"),
            )
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].extract(&path("title")),
            Some(Value::Text("Albert Einstein".into()))
        );
    }

    #[test]
    fn test_unparsable_body_is_transport_error() {
        let err = JsonExtractor::new()
            .extract_items("<html>", &path("/query"))
            .unwrap_err();
        assert!(err.is_transport());
    }
}
