use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ImportError;
use crate::utils::capitalize;

static BODY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body[\s>/]").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static HEAD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("head").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// One imported HTML file. Owns its parse tree; nothing is shared between documents.
pub struct Document {
    html: Html,
    pub title: String,
    pub head_content: String,
}

impl Document {
    pub fn parse(raw: &str, slug: &str) -> Result<Document, ImportError> {
        // html5ever synthesizes a <body> for any input, so check the source itself
        if !BODY_TAG_RE.is_match(raw) {
            return Err(ImportError::MissingBody);
        }

        let html = Html::parse_document(raw);

        let title = html
            .select(&TITLE_SEL)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| capitalize(slug));

        let head_content = html
            .select(&HEAD_SEL)
            .next()
            .map(|h| h.inner_html())
            .unwrap_or_default();

        Ok(Document {
            html,
            title,
            head_content,
        })
    }

    pub fn body(&self) -> Result<ElementRef<'_>, ImportError> {
        self.html.select(&BODY_SEL).next().ok_or(ImportError::MissingBody)
    }
}
