use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};
use tracing::{debug, warn};

use super::marker::Marker;
use crate::utils::escape_text;

static CLASS_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)(?:-section)?").unwrap());

/// Where a block boundary came from. Manual markers win over structural detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Manual,
    Auto,
}

/// A direct child of the content area that ends up inside a block.
#[derive(Debug, Clone, Copy)]
pub enum SpanNode<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
    Comment(&'a str),
}

impl SpanNode<'_> {
    fn to_html(self) -> String {
        match self {
            SpanNode::Element(el) => el.html(),
            SpanNode::Text(text) => escape_text(text),
            SpanNode::Comment(text) => format!("<!--{}-->", text),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, SpanNode::Text(t) if t.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct BlockSpan<'a> {
    pub block_type: String,
    pub provenance: Provenance,
    pub draggable: bool,
    pub nodes: Vec<SpanNode<'a>>,
}

impl<'a> BlockSpan<'a> {
    /// Serialized markup of the span, the text the template is built from.
    pub fn raw_html(&self) -> String {
        self.nodes.iter().map(|n| n.to_html()).collect()
    }

    /// Every element in the span, roots included, in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'a>> + '_ {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                SpanNode::Element(el) => Some(*el),
                _ => None,
            })
            .flat_map(|el| el.descendants().filter_map(ElementRef::wrap))
    }

    pub fn has_editable(&self, editable_attr: &str) -> bool {
        self.elements().any(|el| el.value().attr(editable_attr).is_some())
    }
}

/// Split the content area into ordered blocks.
///
/// One top-to-bottom pass over the body's children. A `BLOCK:<type>` comment
/// with a matching `/BLOCK:<type>` among the following siblings claims every
/// node in between as a manual block. Other elements become auto blocks,
/// except elements that contain a marker somewhere inside: those are walked
/// in place so the marker gets to claim its span.
pub fn segment<'a>(body: ElementRef<'a>, editable_attr: &str) -> Vec<BlockSpan<'a>> {
    let mut walker = Walker::default();
    walker.walk(body);

    let mut spans = walker.spans;
    spans.retain(|span| {
        let keep = span.draggable || span.has_editable(editable_attr);
        if !keep {
            debug!(block = %span.block_type, "no editable elements, skipping block");
        }
        keep
    });
    dedupe_types(&mut spans);
    spans
}

#[derive(Default)]
struct Walker<'a> {
    spans: Vec<BlockSpan<'a>>,
    auto_counter: usize,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, container: ElementRef<'a>) {
        let nodes: Vec<SpanNode<'a>> = container
            .children()
            .filter_map(|child| match child.value() {
                Node::Element(_) => ElementRef::wrap(child).map(SpanNode::Element),
                Node::Text(text) => Some(SpanNode::Text(text)),
                Node::Comment(comment) => Some(SpanNode::Comment(comment)),
                _ => None,
            })
            .collect();

        let mut i = 0;
        while i < nodes.len() {
            match nodes[i] {
                SpanNode::Comment(text) => match Marker::parse(text) {
                    Some(Marker::Open { name, draggable }) => {
                        match find_close(&nodes[i + 1..], &name) {
                            Some(offset) => {
                                let end = i + 1 + offset;
                                self.push_manual(name, draggable, &nodes[i + 1..end]);
                                i = end + 1;
                                continue;
                            }
                            None => warn!(block = %name, "BLOCK marker has no matching close, ignored"),
                        }
                    }
                    Some(Marker::Close { name }) => {
                        debug!(block = %name, "stray close marker, ignored");
                    }
                    None => {}
                },
                SpanNode::Element(el) => {
                    if contains_closed_marker(el) {
                        debug!(tag = el.value().name(), "container holds block markers, descending");
                        self.walk(el);
                    } else {
                        self.push_auto(el);
                    }
                }
                SpanNode::Text(_) => {}
            }
            i += 1;
        }
    }

    fn push_manual(&mut self, name: String, draggable: bool, nodes: &[SpanNode<'a>]) {
        let nodes = trim_blank(nodes);
        debug!(block = %name, draggable, nodes = nodes.len(), "manual block");
        self.spans.push(BlockSpan {
            block_type: name,
            provenance: Provenance::Manual,
            draggable,
            nodes: nodes.to_vec(),
        });
    }

    fn push_auto(&mut self, el: ElementRef<'a>) {
        self.auto_counter += 1;
        let block_type = auto_block_type(el, self.auto_counter);
        debug!(block = %block_type, "auto block");
        self.spans.push(BlockSpan {
            block_type,
            provenance: Provenance::Auto,
            draggable: false,
            nodes: vec![SpanNode::Element(el)],
        });
    }
}

/// Offset of the `/BLOCK:<name>` comment among `following` siblings.
fn find_close(following: &[SpanNode<'_>], name: &str) -> Option<usize> {
    following.iter().position(|n| {
        matches!(n, SpanNode::Comment(c) if Marker::parse(c).is_some_and(|m| m.closes(name)))
    })
}

/// True when some element inside `el` (or `el` itself) has an open marker
/// child with its matching close marker among the same children. Unclosed
/// markers do not count.
fn contains_closed_marker(el: ElementRef<'_>) -> bool {
    el.descendants().filter_map(ElementRef::wrap).any(|container| {
        let comments: Vec<Marker> = container
            .children()
            .filter_map(|child| match child.value() {
                Node::Comment(c) => Marker::parse(c),
                _ => None,
            })
            .collect();
        comments.iter().enumerate().any(|(i, m)| match m {
            Marker::Open { name, .. } => comments[i + 1..].iter().any(|later| later.closes(name)),
            Marker::Close { .. } => false,
        })
    })
}

fn trim_blank<'s, 'a>(mut nodes: &'s [SpanNode<'a>]) -> &'s [SpanNode<'a>] {
    while let Some((first, rest)) = nodes.split_first() {
        if !first.is_blank() {
            break;
        }
        nodes = rest;
    }
    while let Some((last, rest)) = nodes.split_last() {
        if !last.is_blank() {
            break;
        }
        nodes = rest;
    }
    nodes
}

fn auto_block_type(el: ElementRef<'_>, n: usize) -> String {
    let element = el.value();
    match element.name() {
        "section" => {
            if let Some(id) = element.attr("id").map(str::trim).filter(|s| !s.is_empty()) {
                return id.to_string();
            }
            element
                .attr("class")
                .and_then(|class| CLASS_TOKEN_RE.captures(class))
                .map(|caps| caps[1].to_string())
                .unwrap_or_else(|| format!("section-{}", n))
        }
        "nav" => "navigation".to_string(),
        "footer" => "footer".to_string(),
        "header" => "header".to_string(),
        tag => format!("{}-{}", tag, n),
    }
}

/// Suffix repeated types with `-2`, `-3`, … so every type is unique within the page.
/// Manual blocks claim their marker names first; auto blocks yield on collision.
fn dedupe_types(spans: &mut [BlockSpan<'_>]) {
    let mut taken: HashSet<String> = HashSet::new();
    for provenance in [Provenance::Manual, Provenance::Auto] {
        for span in spans.iter_mut().filter(|s| s.provenance == provenance) {
            claim_type(span, &mut taken);
        }
    }
}

fn claim_type(span: &mut BlockSpan<'_>, taken: &mut HashSet<String>) {
    if !taken.insert(span.block_type.clone()) {
        let mut k = 2;
        loop {
            let candidate = format!("{}-{}", span.block_type, k);
            if taken.insert(candidate.clone()) {
                debug!(from = %span.block_type, to = %candidate, "renamed duplicate block type");
                span.block_type = candidate;
                break;
            }
            k += 1;
        }
    }
}

// ── Tests ──
