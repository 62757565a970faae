use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Image,
    Link,
}

impl FieldType {
    /// Tag-based inference; anything unrecognised is plain text.
    pub fn infer(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "img" => FieldType::Image,
            "a" => FieldType::Link,
            "p" | "div" => FieldType::Textarea,
            _ => FieldType::Text,
        }
    }

    /// Attribute that carries the value, if the value is not the element's text.
    pub fn value_attribute(self) -> Option<&'static str> {
        match self {
            FieldType::Image => Some("src"),
            FieldType::Link => Some("href"),
            FieldType::Text | FieldType::Textarea => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Image => "image",
            FieldType::Link => "link",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "image" => Ok(FieldType::Image),
            "link" => Ok(FieldType::Link),
            other => Err(format!("unknown field type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub field_name: String,
    pub display_name: String,
    pub field_type: FieldType,
    pub value: String,
}

impl Field {
    pub fn placeholder(&self) -> String {
        format!("{{{{{}}}}}", self.field_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: i64,
    #[serde(rename = "type")]
    pub block_type: String,
    pub order: u32,
    pub draggable: bool,
    pub html_template: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub head_content: String,
    pub published: bool,
    pub blocks: Vec<Block>,
}
