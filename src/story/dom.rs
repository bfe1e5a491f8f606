//! Thin helpers over the kuchiki tree standing in for the browser DOM.

use kuchiki::traits::*;
use kuchiki::NodeRef;
use std::rc::Rc;

const BLOCK_LEVEL_TAGS: &[&str] = &[
    "p", "div", "ul", "ol", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "table", "pre",
    "figure", "section", "iframe", "hr",
];

pub(crate) fn is_block_level(tag: &str) -> bool {
    BLOCK_LEVEL_TAGS.contains(&tag)
}

/// Parse an HTML fragment and return the `<body>` that holds it.
pub(crate) fn parse_fragment(html: &str) -> Option<NodeRef> {
    let document = kuchiki::parse_html().one(html.to_string());
    let body = document.select_first("body").ok()?;
    Some(body.as_node().clone())
}

/// Parse markup and detach its top-level nodes so they can be grafted elsewhere.
pub(crate) fn fragment_nodes(html: &str) -> Vec<NodeRef> {
    let Some(body) = parse_fragment(html) else {
        return Vec::new();
    };
    let nodes: Vec<NodeRef> = body.children().collect();
    for node in &nodes {
        node.detach();
    }
    nodes
}

/// Identity of a node for the lifetime of its tree.
pub(crate) fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(&node.0) as usize
}

pub(crate) fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|el| el.name.local.as_ref().to_ascii_lowercase())
}

pub(crate) fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let el = node.as_element()?;
    let attrs = el.attributes.borrow();
    attrs.get(name).map(str::to_string)
}

pub(crate) fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

pub(crate) fn outer_html(node: &NodeRef) -> String {
    node.to_string()
}

pub(crate) fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

pub(crate) fn first_descendant(node: &NodeRef, tag: &str) -> Option<NodeRef> {
    node.inclusive_descendants()
        .find(|candidate| tag_name(candidate).as_deref() == Some(tag))
}
