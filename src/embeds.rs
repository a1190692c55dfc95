//! Embedded visualization discovery.
//!
//! Posts embed interactive charts as inline frames:
//!
//! ```html
//! <iframe src="https://example.org/grapher/co2-emissions?tab=map"></iframe>
//! ```
//!
//! [`scan`] parses the markup with html5ever (which accepts any input the way
//! a browser does), walks every `iframe` element and returns the `src` values
//! that contain the visualization route, deduplicated in first-occurrence
//! order.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::HashSet;

/// Route segment that marks an iframe as a visualization embed.
pub const DEFAULT_ROUTE: &str = "/grapher/";

/// Whether an iframe `src` points at a visualization.
pub fn is_visualization_src(src: &str, route: &str) -> bool {
    !route.is_empty() && src.contains(route)
}

/// Distinct visualization references embedded in `markup`.
pub fn scan(markup: &str, route: &str) -> Vec<String> {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    iframe_sources(&parse(markup).document)
        .into_iter()
        .filter(|src| is_visualization_src(src, route))
        .filter(|src| seen.insert(src.clone()))
        .collect()
}

/// Decoded `src` of a single iframe tag, read the same way [`scan`] reads
/// it: unquoted values are accepted and character references resolved.
pub fn iframe_src(tag: &str) -> Option<String> {
    iframe_sources(&parse(tag).document).into_iter().next()
}

fn parse(markup: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .one(markup.as_bytes())
}

/// `src` of every iframe under `root`, in document order.
fn iframe_sources(root: &Handle) -> Vec<String> {
    let mut sources = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
            && name.local.as_ref() == "iframe"
            && let Some(src) = attrs
                .borrow()
                .iter()
                .find(|a| a.name.local.as_ref() == "src")
        {
            sources.push(src.value.to_string());
        }

        // Reverse so the first child is popped first.
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    sources
}
