use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::model::{Block, Page};
use crate::parser::template;

static ASSET_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(src|href)=(["'])(?:\./)?assets/"#).unwrap());
static ASSET_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\(\s*(["']?)(?:\./)?assets/"#).unwrap());
static STYLESHEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bhref=(["'])(?:\./)?styles\.css(["'])"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub head: String,
    pub body: String,
}

impl RenderedPage {
    /// Body fragment alone, or the full document around it.
    pub fn to_markup(&self, standalone: bool) -> String {
        if standalone {
            format!(
                "<!DOCTYPE html>\n<html>\n<head>\n{}\n</head>\n<body>\n{}</body>\n</html>\n",
                self.head.trim(),
                self.body
            )
        } else {
            self.body.clone()
        }
    }
}

/// Assemble a page from its stored blocks. Pure: the page is not touched and
/// nothing is carried between calls.
pub fn render(page: &Page) -> RenderedPage {
    let mut blocks: Vec<&Block> = page.blocks.iter().collect();
    blocks.sort_by_key(|b| b.order);

    let mut body = String::new();
    for block in blocks {
        let filled = template::fill(&block.html_template, &block.fields);
        for token in &filled.missing {
            warn!(
                page = %page.slug,
                block = block.id,
                block_type = %block.block_type,
                token = %token,
                "template token has no field"
            );
        }
        body.push_str(&filled.html);
        body.push('\n');
    }

    debug!(page = %page.slug, bytes = body.len(), "rendered body");

    RenderedPage {
        head: rewrite_assets(&page.head_content, &page.slug),
        body: rewrite_assets(&body, &page.slug),
    }
}

pub fn render_markup(page: &Page, standalone: bool) -> String {
    render(page).to_markup(standalone)
}

/// Point relative `assets/` references and the `styles.css` link at the
/// page's published locations.
pub fn rewrite_assets(markup: &str, slug: &str) -> String {
    let out = STYLESHEET_RE.replace_all(markup, |c: &Captures| {
        format!("href={}/css/{}.css{}", &c[1], slug, &c[2])
    });
    let out = ASSET_ATTR_RE.replace_all(&out, |c: &Captures| {
        format!("{}={}/assets/{}/", &c[1], &c[2], slug)
    });
    rewrite_css_urls(&out, slug)
}

/// `url(assets/...)` → `url(/assets/<slug>/...)`, quotes preserved.
pub fn rewrite_css_urls(css: &str, slug: &str) -> String {
    ASSET_URL_RE
        .replace_all(css, |c: &Captures| format!("url({}/assets/{}/", &c[1], slug))
        .into_owned()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, FieldType};
    use crate::parser::process_document;

    fn block(id: i64, order: u32, template: &str, fields: Vec<Field>) -> Block {
        Block {
            id,
            block_type: format!("b{}", id),
            order,
            draggable: false,
            html_template: template.into(),
            fields,
        }
    }

    fn field(name: &str, field_type: FieldType, value: &str) -> Field {
        Field {
            field_name: name.into(),
            display_name: name.into(),
            field_type,
            value: value.into(),
        }
    }

    fn page(slug: &str, head: &str, blocks: Vec<Block>) -> Page {
        Page {
            id: 1,
            slug: slug.into(),
            title: "T".into(),
            head_content: head.into(),
            published: true,
            blocks,
        }
    }

    #[test]
    fn image_asset_is_rewritten() {
        let p = page(
            "acme",
            "",
            vec![block(1, 1, "<img src=\"{{logo}}\">", vec![field("logo", FieldType::Image, "assets/logo.png")])],
        );
        assert_eq!(render(&p).body, "<img src=\"/assets/acme/logo.png\">\n");
    }

    #[test]
    fn blocks_sorted_by_order() {
        let p = page(
            "x",
            "",
            vec![
                block(1, 3, "<p>c</p>", vec![]),
                block(2, 1, "<p>a</p>", vec![]),
                block(3, 2, "<p>b</p>", vec![]),
            ],
        );
        assert_eq!(render(&p).body, "<p>a</p>\n<p>b</p>\n<p>c</p>\n");
    }

    #[test]
    fn every_occurrence_is_substituted() {
        let p = page(
            "x",
            "",
            vec![block(1, 1, "<h1>{{t}}</h1><title>{{t}}</title>", vec![field("t", FieldType::Text, "Hi")])],
        );
        assert_eq!(render(&p).body, "<h1>Hi</h1><title>Hi</title>\n");
    }

    #[test]
    fn missing_token_renders_empty() {
        let p = page("x", "", vec![block(1, 1, "<h1>{{gone}}</h1>", vec![])]);
        assert_eq!(render(&p).body, "<h1></h1>\n");
    }

    #[test]
    fn head_links_and_css_urls() {
        let head = "<link rel=\"stylesheet\" href=\"styles.css\"><link rel=\"icon\" href='assets/favicon.png'>";
        let p = page(
            "acme",
            head,
            vec![block(1, 1, "<section style=\"background: url('assets/bg.jpg')\"></section>", vec![])],
        );
        let out = render(&p);
        assert_eq!(
            out.head,
            "<link rel=\"stylesheet\" href=\"/css/acme.css\"><link rel=\"icon\" href='/assets/acme/favicon.png'>"
        );
        assert_eq!(out.body, "<section style=\"background: url('/assets/acme/bg.jpg')\"></section>\n");
    }

    #[test]
    fn rewriting_is_idempotent_and_leaves_absolute_urls() {
        let once = rewrite_assets("<img src=\"assets/a.png\"><a href=\"https://x.test/assets/y\">", "s");
        assert_eq!(once, "<img src=\"/assets/s/a.png\"><a href=\"https://x.test/assets/y\">");
        assert_eq!(rewrite_assets(&once, "s"), once);
    }

    #[test]
    fn standalone_and_fragment_share_body() {
        let p = page("x", "<title>T</title>", vec![block(1, 1, "<p>a</p>", vec![])]);
        let fragment = render_markup(&p, false);
        let full = render_markup(&p, true);
        assert_eq!(fragment, "<p>a</p>\n");
        assert!(full.starts_with("<!DOCTYPE html>"));
        assert!(full.contains("<head>\n<title>T</title>\n</head>"));
        assert!(full.contains(&fragment));
    }

    #[test]
    fn rendering_is_repeatable() {
        let p = page(
            "acme",
            "",
            vec![block(1, 1, "<h1>{{t}}</h1>", vec![field("t", FieldType::Text, "a < b")])],
        );
        assert_eq!(render(&p), render(&p));
        assert_eq!(render(&p).body, "<h1>a &lt; b</h1>\n");
    }

    #[test]
    fn landing_renders_back_to_source_blocks() {
        let html = std::fs::read_to_string("tests/fixtures/landing.html").unwrap();
        let parsed = process_document(&html, "acme", "data-editable").unwrap();
        let blocks = parsed
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| Block {
                id: i as i64 + 1,
                block_type: b.block_type.clone(),
                order: i as u32 + 1,
                draggable: b.draggable,
                html_template: b.html_template.clone(),
                fields: b.fields.clone(),
            })
            .collect();
        let p = Page {
            id: 1,
            slug: "acme".into(),
            title: parsed.title.clone(),
            head_content: parsed.head_content.clone(),
            published: true,
            blocks,
        };
        let out = render(&p);
        assert!(!out.body.contains("{{"));
        assert!(out.body.contains("src=\"/assets/acme/logo.png\""));
        assert!(out.body.contains("url(/assets/acme/hero.jpg)"));
        assert!(out.body.contains("Build faster with Acme"));
        assert!(out.body.contains("Fast &amp; reliable"));
        assert!(!out.body.contains("Static banner"));
        assert!(out.head.contains("href=\"/css/acme.css\""));
        assert!(out.head.contains("href=\"/assets/acme/favicon.png\""));
    }
}
