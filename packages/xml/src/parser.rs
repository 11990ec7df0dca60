//! XML text → [`Document`]
//!
//! Reading is delegated to `roxmltree`; the read-only tree it produces is
//! copied into an owned [`Fragment`] and then into the arena. Comments,
//! processing instructions and whitespace-only text are dropped.

use crate::error::{XmlError, XmlResult};
use crate::tree::{Attribute, Document, Fragment};

const XML_PREFIX: &str = "xml";

/// Parse a complete XML document
pub fn parse(source: &str) -> XmlResult<Document> {
    let fragment = parse_fragment(source)?;
    Ok(Document::from_fragment(&fragment))
}

/// Parse an XML snippet with a single root element into a fragment
pub fn parse_fragment(source: &str) -> XmlResult<Fragment> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let xml = roxmltree::Document::parse_with_options(source, options)
        .map_err(|e| XmlError::parse(e.to_string()))?;

    Ok(convert_element(xml.root_element()))
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> Fragment {
    let mut fragment = Fragment::new(qualified_name(node));

    for (prefix, uri) in local_namespaces(node) {
        let name = match prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        fragment.attributes.push(Attribute::new(name, uri));
    }

    for attr in node.attributes() {
        let name = match attr.namespace().and_then(|ns| node.lookup_prefix(ns)) {
            Some(prefix) => format!("{}:{}", prefix, attr.name()),
            None => attr.name().to_string(),
        };
        fragment.attributes.push(Attribute::new(name, attr.value()));
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            fragment.children.push(convert_element(child));
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        }
    }

    if !text.trim().is_empty() {
        fragment.text = Some(text);
    }

    fragment
}

fn qualified_name(node: roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.name()),
        _ => tag.name().to_string(),
    }
}

/// Namespaces declared on `node` itself (not inherited from its parent)
fn local_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(Option<String>, String)> {
    let inherited = node
        .parent_element()
        .map(namespace_list)
        .unwrap_or_default();

    namespace_list(node)
        .into_iter()
        .filter(|(prefix, _)| prefix.as_deref() != Some(XML_PREFIX))
        .filter(|declared| !inherited.contains(declared))
        .collect()
}

fn namespace_list(node: roxmltree::Node<'_, '_>) -> Vec<(Option<String>, String)> {
    node.namespaces()
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}
