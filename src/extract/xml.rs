// SPDX-License-Identifier: Apache-2.0

//! XML response extraction
//!
//! Builds an owned element tree with quick-xml and evaluates path
//! expressions against it. Items share the parsed tree through `Arc`, so an
//! item can still resolve absolute paths against its document.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use apifed_core::{FederationError, FederationResult, Value};

use super::path::{Axis, NodeTest, PathExpr, Step};
use super::{PathExtractor, ResultItem};

#[derive(Debug)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

#[derive(Debug)]
enum XmlNode {
    Element(Arc<XmlElement>),
    Text(String),
}

enum Selected {
    Element(Arc<XmlElement>),
    Attribute(String),
    Text(String),
}

impl XmlElement {
    /// The unnamed node above the root element.
    fn document() -> Self {
        Self {
            name: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn open(start: &BytesStart<'_>) -> FederationResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                FederationError::transport(format!("Malformed XML attribute in <{name}>: {e}"))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| {
                    FederationError::transport(format!(
                        "Malformed XML attribute value {key} in <{name}>: {e}"
                    ))
                })?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child_elements(&self) -> impl Iterator<Item = &Arc<XmlElement>> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Text(text) => Some(text.as_str()),
            XmlNode::Element(_) => None,
        })
    }

    /// All elements below this one, in document order.
    fn collect_descendants(&self, out: &mut Vec<Arc<XmlElement>>) {
        for child in self.child_elements() {
            out.push(Arc::clone(child));
            child.collect_descendants(out);
        }
    }

    /// Concatenated text of this element and everything below it.
    fn string_value(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.string_value(out),
            }
        }
    }
}

impl Selected {
    fn into_string(self) -> String {
        match self {
            Selected::Element(el) => {
                let mut out = String::new();
                el.string_value(&mut out);
                out
            }
            Selected::Attribute(value) | Selected::Text(value) => value,
        }
    }
}

/// Deepest element nesting accepted in a response.
const MAX_DEPTH: usize = 512;

fn parse_document(body: &str) -> FederationResult<Arc<XmlElement>> {
    let mut reader = Reader::from_str(body);

    let mut stack = vec![XmlElement::document()];
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(FederationError::transport(format!(
                    "Unparsable XML response at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Start(start) => {
                // The stack also holds the document node.
                if stack.len() > MAX_DEPTH {
                    return Err(FederationError::transport(format!(
                        "Unparsable XML response: elements nested more than {MAX_DEPTH} levels deep"
                    )));
                }
                stack.push(XmlElement::open(&start)?)
            }
            Event::Empty(start) => {
                let element = XmlElement::open(&start)?;
                attach(&mut stack, XmlNode::Element(Arc::new(element)))?;
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(FederationError::transport(
                        "Unparsable XML response: unexpected closing tag",
                    ));
                }
                if let Some(element) = stack.pop() {
                    attach(&mut stack, XmlNode::Element(Arc::new(element)))?;
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| {
                    FederationError::transport(format!("Unparsable XML text: {e}"))
                })?;
                // Indentation between elements is not content.
                if !text.trim().is_empty() {
                    attach(&mut stack, XmlNode::Text(text.into_owned()))?;
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                attach(&mut stack, XmlNode::Text(text))?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(document), true) => Ok(Arc::new(document)),
        _ => Err(FederationError::transport(
            "Unparsable XML response: unclosed element",
        )),
    }
}

fn attach(stack: &mut [XmlElement], node: XmlNode) -> FederationResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => Err(FederationError::transport(
            "Unparsable XML response: content outside the document",
        )),
    }
}

fn evaluate(root: &Arc<XmlElement>, context: &Arc<XmlElement>, path: &PathExpr) -> Vec<Selected> {
    let start = if path.is_absolute() { root } else { context };
    let mut current = vec![Arc::clone(start)];

    for step in path.steps() {
        match &step.test {
            NodeTest::Attribute(name) => {
                return scope(&current, step.axis)
                    .iter()
                    .filter_map(|el| el.attribute(name))
                    .map(|value| Selected::Attribute(value.to_string()))
                    .collect();
            }
            NodeTest::Text => {
                return scope(&current, step.axis)
                    .iter()
                    .flat_map(|el| el.texts().map(str::to_string).collect::<Vec<_>>())
                    .map(Selected::Text)
                    .collect();
            }
            _ => current = select_elements(&current, step),
        }
    }

    current.into_iter().map(Selected::Element).collect()
}

/// Elements whose attributes or text a final step looks at.
fn scope(current: &[Arc<XmlElement>], axis: Axis) -> Vec<Arc<XmlElement>> {
    match axis {
        Axis::Child => current.to_vec(),
        Axis::Descendant => dedup(current.iter().flat_map(|el| {
            let mut all = vec![Arc::clone(el)];
            el.collect_descendants(&mut all);
            all
        })),
    }
}

fn select_elements(current: &[Arc<XmlElement>], step: &Step) -> Vec<Arc<XmlElement>> {
    let accepts = |el: &XmlElement| match &step.test {
        NodeTest::Name(name) => el.name == *name,
        _ => true,
    };

    match (step.axis, &step.test) {
        (Axis::Child, NodeTest::Context) => current.to_vec(),
        (Axis::Descendant, NodeTest::Context) => scope(current, Axis::Descendant),
        (Axis::Child, _) => dedup(
            current
                .iter()
                .flat_map(|el| el.child_elements().cloned().collect::<Vec<_>>())
                .filter(|el| accepts(&**el)),
        ),
        (Axis::Descendant, _) => dedup(
            current
                .iter()
                .flat_map(|el| {
                    let mut all = Vec::new();
                    el.collect_descendants(&mut all);
                    all
                })
                .filter(|el| accepts(&**el)),
        ),
    }
}

fn dedup(elements: impl Iterator<Item = Arc<XmlElement>>) -> Vec<Arc<XmlElement>> {
    let mut seen = HashSet::new();
    elements
        .filter(|el| seen.insert(Arc::as_ptr(el)))
        .collect()
}

/// One element selected from an XML response
pub struct XmlItem {
    root: Arc<XmlElement>,
    node: Arc<XmlElement>,
}

impl fmt::Debug for XmlItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlItem")
            .field("name", &self.node.name)
            .field("attributes", &self.node.attributes)
            .finish()
    }
}

impl ResultItem for XmlItem {
    fn extract(&self, path: &PathExpr) -> Option<Value> {
        evaluate(&self.root, &self.node, path)
            .into_iter()
            .next()
            .map(|selected| Value::Text(selected.into_string()))
    }
}

/// Extractor for XML responses
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlExtractor;

impl XmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PathExtractor for XmlExtractor {
    fn format(&self) -> &'static str {
        "xml"
    }

    fn extract_items(
        &self,
        body: &str,
        path: &PathExpr,
    ) -> FederationResult<Vec<Box<dyn ResultItem>>> {
        let root = parse_document(body)?;
        let items = evaluate(&root, &root, path)
            .into_iter()
            .filter_map(|selected| match selected {
                Selected::Element(node) => Some(Box::new(XmlItem {
                    root: Arc::clone(&root),
                    node,
                }) as Box<dyn ResultItem>),
                _ => None,
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORIES: &str = r#"<?xml version="1.0"?>
<api batchcomplete="">
  <query>
    <pages>
      <page _idx="736" pageid="736" ns="0" title="Albert Einstein">
        <categories>
          <cl ns="14" title="Category:1879 births" />
          <cl ns="14" title="Category:1955 deaths" />
        </categories>
      </page>
    </pages>
  </query>
</api>"#;

    fn path(s: &str) -> PathExpr {
        PathExpr::parse(s).unwrap()
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    #[test]
    fn test_descendant_items_and_attributes() {
        let items = XmlExtractor::new()
            .extract_items(CATEGORIES, &path("//cl"))
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].extract(&path("@title")), text("Category:1879 births"));
        assert_eq!(items[1].extract(&path("@title")), text("Category:1955 deaths"));
        assert_eq!(items[1].extract(&path("@missing")), None);
    }

    #[test]
    fn test_absolute_items_path() {
        let items = XmlExtractor::new()
            .extract_items(CATEGORIES, &path("/api/query/pages/page"))
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].extract(&path("@pageid")), text("736"));
        assert_eq!(
            items[0].extract(&path("categories/cl/@title")),
            text("Category:1879 births")
        );
        // Absolute paths from an item resolve against its document.
        assert_eq!(items[0].extract(&path("/api/@batchcomplete")), text(""));
    }

    #[test]
    fn test_no_match_yields_no_items() {
        let items = XmlExtractor::new()
            .extract_items(CATEGORIES, &path("//search/p"))
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_text_values_are_unescaped() {
        let body = "<api><revs><rev id=\"1\">fish &amp; chips</rev><rev id=\"2\"><![CDATA[<raw>]]></rev></revs></api>";
        let items = XmlExtractor::new()
            .extract_items(body, &path("//rev"))
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].extract(&path(".")), text("fish & chips"));
        assert_eq!(items[0].extract(&path("text()")), text("fish & chips"));
        assert_eq!(items[1].extract(&path(".")), text("<raw>"));
    }

    #[test]
    fn test_element_value_concatenates_descendant_text() {
        let body = "<r><item><a>one</a><b>two</b></item></r>";
        let items = XmlExtractor::new().extract_items(body, &path("/r/item")).unwrap();
        assert_eq!(items[0].extract(&path(".")), text("onetwo"));
        assert_eq!(items[0].extract(&path("*")), text("one"));
        assert_eq!(items[0].extract(&path("b")), text("two"));
    }

    #[test]
    fn test_mixed_content_keeps_inner_whitespace() {
        let body = "<api>\n  <rev> fish and <b>chips</b> please</rev>\n</api>";
        let items = XmlExtractor::new().extract_items(body, &path("//rev")).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].extract(&path(".")), text(" fish and chips please"));
        assert_eq!(items[0].extract(&path("text()")), text(" fish and "));

        let root = XmlExtractor::new().extract_items(body, &path("/api")).unwrap();
        assert_eq!(root[0].extract(&path("text()")), None);
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        let nested = |depth: usize| format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        let items = XmlExtractor::new()
            .extract_items(&nested(MAX_DEPTH), &path("//b"))
            .unwrap();
        assert!(items.is_empty());

        for depth in [MAX_DEPTH + 1, 20_000] {
            let err = XmlExtractor::new()
                .extract_items(&nested(depth), &path("//b"))
                .unwrap_err();
            assert!(err.is_transport(), "unexpected error: {err:?}");
            assert!(err.message().contains("nested"), "{err}");
        }
    }

    #[test]
    fn test_nested_descendants_are_not_duplicated() {
        let body = "<r><a><a><b/></a></a></r>";
        let items = XmlExtractor::new().extract_items(body, &path("//a//b")).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_malformed_body_is_transport_error() {
        let err = XmlExtractor::new()
            .extract_items("<api><query></api>", &path("//page"))
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");

        let err = XmlExtractor::new()
            .extract_items("<api><query>", &path("//page"))
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
    }
}
