use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::{ElementRef, Node};
use tracing::warn;

use super::fields::Editable;
use crate::model::Field;
use crate::utils::{escape_attr, escape_text};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").unwrap());

/// Elements whose text children the serializer writes unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub html: String,
    /// Fields whose value could not be located; they have no token in `html`.
    pub unbound: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filled {
    pub html: String,
    /// Tokens in the template with no matching field.
    pub missing: Vec<String>,
}

/// Half-open byte range of `raw_html` replaced by `{{name}}`.
struct Binding {
    start: usize,
    end: usize,
    token: String,
}

impl Binding {
    fn conflicts(&self, start: usize, end: usize) -> bool {
        start == self.start || (start < self.end && self.start < end)
    }
}

/// Replace each field's value inside `raw_html` with its `{{fieldName}}` token.
///
/// Every field is bound inside the serialized span of its own element, so two
/// fields with the same value never claim each other's occurrence. Editables
/// must be in document order.
pub fn build_template(raw_html: &str, editables: &[Editable<'_>]) -> Template {
    if TOKEN_RE.is_match(raw_html) {
        warn!("block markup already contains placeholder-like text; it will not survive rendering");
    }

    let mut bindings: Vec<Binding> = Vec::new();
    let mut unbound = Vec::new();
    let mut cursor = 0;

    for ed in editables {
        let name = &ed.field.field_name;
        let outer = ed.element.html();
        let Some(rel) = raw_html[cursor..].find(&outer) else {
            warn!(field = %name, "editable element not found in block markup");
            unbound.push(name.clone());
            continue;
        };
        let el_start = cursor + rel;
        // next element may start inside this one when editables are nested
        cursor = el_start + 1;

        let Some((s, e)) = value_span(ed, &outer) else {
            warn!(field = %name, value = %ed.field.value, "value not found as a literal, field left unbound");
            unbound.push(name.clone());
            continue;
        };
        let (start, end) = (el_start + s, el_start + e);
        if bindings.iter().any(|b| b.conflicts(start, end)) {
            warn!(field = %name, "value overlaps an earlier field, field left unbound");
            unbound.push(name.clone());
            continue;
        }
        bindings.push(Binding {
            start,
            end,
            token: ed.field.placeholder(),
        });
    }

    bindings.sort_by_key(|b| b.start);
    let mut html = String::with_capacity(raw_html.len());
    let mut pos = 0;
    for b in &bindings {
        html.push_str(&raw_html[pos..b.start]);
        html.push_str(&b.token);
        pos = b.end;
    }
    html.push_str(&raw_html[pos..]);

    Template { html, unbound }
}

/// Byte range of the field's serialized value within the element's outer markup.
fn value_span(ed: &Editable<'_>, outer: &str) -> Option<(usize, usize)> {
    let element = ed.element;
    let tag = element.value().name();
    let raw_text = RAW_TEXT_ELEMENTS.contains(&tag);

    // children serialized the way they appear inside `outer`
    let children: Vec<(bool, String)> = element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) if raw_text => Some((true, String::from(&**text))),
            Node::Text(text) => Some((true, escape_text(text))),
            Node::Element(_) => ElementRef::wrap(child).map(|el| (false, el.html())),
            Node::Comment(comment) => Some((false, format!("<!--{}-->", &**comment))),
            _ => None,
        })
        .collect();

    let end_tag = format!("</{}>", tag);
    let is_void = !outer.ends_with(&end_tag);
    let inner_start = if is_void {
        outer.len()
    } else {
        let inner_len: usize = children.iter().map(|(_, s)| s.len()).sum();
        outer.len().checked_sub(end_tag.len() + inner_len)?
    };

    if let Some(attr) = ed.field.field_type.value_attribute() {
        let needle = format!(" {}=\"", attr);
        let escaped = escape_attr(&ed.field.value);
        let start_tag = &outer[..inner_start];
        let at = start_tag.find(&needle)? + needle.len();
        return start_tag[at..]
            .starts_with(&format!("{}\"", escaped))
            .then_some((at, at + escaped.len()));
    }

    let value = &ed.field.value;
    let needle = if raw_text { value.clone() } else { escape_text(value) };
    let mut offset = inner_start;
    for (is_text, serialized) in &children {
        if *is_text {
            if let Some(pos) = serialized.find(&needle) {
                return Some((offset + pos, offset + pos + needle.len()));
            }
        }
        offset += serialized.len();
    }

    // empty value and no text child: the token goes at the start of the content
    (value.is_empty() && !is_void).then_some((inner_start, inner_start))
}

/// Substitute every `{{name}}` token with the escaped value of the field of
/// that name. Tokens with no field are reported and replaced by an empty
/// string, unless they look like an asset path, which is kept as plain text.
pub fn fill(template: &str, fields: &[Field]) -> Filled {
    let by_name: HashMap<&str, &Field> = fields.iter().map(|f| (f.field_name.as_str(), f)).collect();
    let mut missing = Vec::new();

    let html = TOKEN_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match by_name.get(name) {
                Some(field) => serialize_value(field),
                None => {
                    missing.push(name.to_string());
                    if name.contains("assets/") {
                        name.to_string()
                    } else {
                        String::new()
                    }
                }
            }
        })
        .into_owned();

    Filled { html, missing }
}

/// The value in the form the serializer would have written it in place.
fn serialize_value(field: &Field) -> String {
    match field.field_type.value_attribute() {
        Some(_) => escape_attr(&field.value),
        None => escape_text(&field.value),
    }
}

// ── Tests ──
