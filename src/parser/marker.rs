use std::sync::LazyLock;

use regex::Regex;

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(/)?BLOCK:(\w+)(?::(\w+))?\s*$").unwrap());

/// A block marker comment: `<!-- BLOCK:hero:draggable -->` … `<!-- /BLOCK:hero -->`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Open { name: String, draggable: bool },
    Close { name: String },
}

impl Marker {
    /// Parse the text of a comment node. Anything that is not a well-formed marker is `None`.
    pub fn parse(comment: &str) -> Option<Marker> {
        let caps = MARKER_RE.captures(comment)?;
        let name = caps[2].to_string();
        let modifier = caps.get(3).map(|m| m.as_str());
        if caps.get(1).is_some() {
            // a close marker carries no modifier
            return match modifier {
                None => Some(Marker::Close { name }),
                Some(_) => None,
            };
        }
        Some(Marker::Open {
            name,
            draggable: modifier == Some("draggable"),
        })
    }

    pub fn closes(&self, open_name: &str) -> bool {
        matches!(self, Marker::Close { name } if name == open_name)
    }
}
