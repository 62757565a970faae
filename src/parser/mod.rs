pub mod document;
pub mod fields;
pub mod marker;
pub mod segment;
pub mod template;

use tracing::{debug, info};

use crate::error::ImportError;
use crate::model::Field;
use document::Document;
use segment::Provenance;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub block_type: String,
    pub provenance: Provenance,
    pub draggable: bool,
    pub html_template: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub slug: String,
    pub title: String,
    pub head_content: String,
    pub blocks: Vec<ParsedBlock>,
}

/// Three-pass pipeline: document → block spans → fields → templates.
///
/// Pure function of its input; each call owns its own parse tree.
pub fn process_document(raw: &str, slug: &str, editable_attr: &str) -> Result<ParsedPage, ImportError> {
    let doc = Document::parse(raw, slug)?;
    let body = doc.body()?;

    let blocks: Vec<ParsedBlock> = segment::segment(body, editable_attr)
        .iter()
        .map(|span| {
            let raw_html = span.raw_html();
            let editables = fields::extract_fields(span, editable_attr);
            let template = template::build_template(&raw_html, &editables);
            debug!(
                block = %span.block_type,
                fields = editables.len(),
                unbound = template.unbound.len(),
                "built template"
            );
            ParsedBlock {
                block_type: span.block_type.clone(),
                provenance: span.provenance,
                draggable: span.draggable,
                html_template: template.html,
                fields: editables.into_iter().map(|e| e.field).collect(),
            }
        })
        .collect();

    info!(
        "Parsed {}: {} blocks ({} manual)",
        slug,
        blocks.len(),
        blocks.iter().filter(|b| b.provenance == Provenance::Manual).count()
    );

    Ok(ParsedPage {
        slug: slug.to_string(),
        title: doc.title.clone(),
        head_content: doc.head_content.clone(),
        blocks,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    fn landing() -> ParsedPage {
        let html = std::fs::read_to_string("tests/fixtures/landing.html").unwrap();
        process_document(&html, "acme", "data-editable").unwrap()
    }

    #[test]
    fn hero_scenario() {
        let page = process_document(
            "<html><body><!-- BLOCK:hero:draggable --><section><h1 data-editable>Welcome</h1></section><!-- /BLOCK:hero --></body></html>",
            "home",
            "data-editable",
        )
        .unwrap();
        assert_eq!(page.blocks.len(), 1);
        let b = &page.blocks[0];
        assert_eq!(b.block_type, "hero");
        assert!(b.draggable);
        assert_eq!(b.fields.len(), 1);
        assert_eq!(b.fields[0].field_name, "hero-1");
        assert_eq!(b.fields[0].value, "Welcome");
        assert_eq!(b.fields[0].field_type, FieldType::Text);
    }

    #[test]
    fn footer_scenario() {
        let page = process_document(
            "<html><body><section id=\"footer\"><a data-editable=\"contact_link\" href=\"/contact\">Contact</a></section></body></html>",
            "home",
            "data-editable",
        )
        .unwrap();
        let b = &page.blocks[0];
        assert_eq!(b.block_type, "footer");
        assert!(!b.draggable);
        assert_eq!(b.provenance, Provenance::Auto);
        assert_eq!(b.fields[0].field_name, "contact link");
        assert_eq!(b.fields[0].field_type, FieldType::Link);
        assert_eq!(b.fields[0].value, "/contact");
    }

    #[test]
    fn landing_blocks_in_order() {
        let page = landing();
        assert_eq!(page.title, "Acme Landing");
        let types: Vec<(&str, bool)> = page
            .blocks
            .iter()
            .map(|b| (b.block_type.as_str(), b.draggable))
            .collect();
        assert_eq!(
            types,
            vec![
                ("navigation", false),
                ("hero", false),
                ("features", true),
                ("testimonials", true),
                ("pricing", false),
                ("footer", false),
            ]
        );
        let testimonials = &page.blocks[3];
        assert!(testimonials.fields.is_empty());
    }

    #[test]
    fn landing_fields() {
        let page = landing();
        let names = |i: usize| -> Vec<String> {
            page.blocks[i].fields.iter().map(|f| f.field_name.clone()).collect()
        };
        assert_eq!(names(0), vec!["logo", "nav cta"]);
        assert_eq!(names(1), vec!["main title", "hero-2"]);
        assert_eq!(names(2), vec!["features-1", "features-2"]);
        assert_eq!(names(4), vec!["pricing-1", "price note"]);
        assert_eq!(names(5), vec!["copyright", "contact link"]);
        assert_eq!(page.blocks[2].fields[1].value, "Fast & reliable");
        assert_eq!(page.blocks[0].fields[0].field_type, FieldType::Image);
    }

    #[test]
    fn every_token_has_exactly_one_field() {
        let re = regex::Regex::new(r"\{\{([^{}]+)\}\}").unwrap();
        for block in landing().blocks {
            for caps in re.captures_iter(&block.html_template) {
                let n = block.fields.iter().filter(|f| f.field_name == caps[1]).count();
                assert_eq!(n, 1, "token {} in {}", &caps[1], block.block_type);
            }
        }
    }

    #[test]
    fn reimport_is_idempotent() {
        let a = landing();
        let b = landing();
        assert_eq!(a, b);
    }

    #[test]
    fn structure_survives_value_edits_in_source() {
        let html = std::fs::read_to_string("tests/fixtures/landing.html").unwrap();
        let edited = html.replace("Build faster with Acme", "Ship today");
        let a = process_document(&html, "acme", "data-editable").unwrap();
        let b = process_document(&edited, "acme", "data-editable").unwrap();
        let shape = |p: &ParsedPage| -> Vec<(String, Vec<String>)> {
            p.blocks
                .iter()
                .map(|bl| (bl.block_type.clone(), bl.fields.iter().map(|f| f.field_name.clone()).collect()))
                .collect()
        };
        assert_eq!(shape(&a), shape(&b));
        assert_ne!(a.blocks[1].fields[0].value, b.blocks[1].fields[0].value);
    }

    #[test]
    fn missing_body() {
        let err = process_document("<p>fragment</p>", "x", "data-editable").unwrap_err();
        assert!(matches!(err, ImportError::MissingBody));
    }
}
