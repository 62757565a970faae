use std::collections::HashSet;

use scraper::ElementRef;
use tracing::debug;

use super::segment::BlockSpan;
use crate::model::{Field, FieldType};
use crate::utils::display_name;

/// A field together with the element it was read from.
#[derive(Debug, Clone)]
pub struct Editable<'a> {
    pub element: ElementRef<'a>,
    pub field: Field,
}

/// Collect every element flagged with `editable_attr` inside the span, in
/// document order, and turn each into a field.
pub fn extract_fields<'a>(span: &BlockSpan<'a>, editable_attr: &str) -> Vec<Editable<'a>> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    let editables = span
        .elements()
        .filter_map(|el| el.value().attr(editable_attr).map(|name| (el, name)));

    for (i, (element, explicit)) in editables.enumerate() {
        let counter = i + 1;
        let mut field_name = field_name(explicit, &span.block_type, counter);
        if !taken.insert(field_name.clone()) {
            field_name = unique_name(&field_name, counter, &mut taken);
        }

        let field_type = FieldType::infer(element.value().name());
        let value = field_value(element, field_type);
        debug!(block = %span.block_type, field = %field_name, %field_type, "field");

        out.push(Editable {
            element,
            field: Field {
                display_name: display_name(&field_name),
                field_name,
                field_type,
                value,
            },
        });
    }

    out
}

/// Explicit attribute value with `_` → space, or `{block_type}-{counter}`.
///
/// Braces are dropped so a name can never form or break a placeholder token.
pub fn field_name(explicit: &str, block_type: &str, counter: usize) -> String {
    let cleaned: String = explicit
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .map(|c| if c == '_' { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!("{}-{}", block_type, counter)
    } else {
        cleaned.to_string()
    }
}

fn unique_name(base: &str, counter: usize, taken: &mut HashSet<String>) -> String {
    let mut candidate = format!("{}-{}", base, counter);
    while !taken.insert(candidate.clone()) {
        candidate.push('_');
    }
    debug!(from = %base, to = %candidate, "renamed duplicate field");
    candidate
}

pub fn field_value(element: ElementRef<'_>, field_type: FieldType) -> String {
    match field_type.value_attribute() {
        Some(attr) => element.value().attr(attr).unwrap_or_default().to_string(),
        None => element.text().collect::<String>().trim().to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::segment::segment;
    use scraper::{Html, Selector};

    fn fields(html: &str) -> Vec<Vec<Field>> {
        let doc = Html::parse_document(html);
        let body = doc.select(&Selector::parse("body").unwrap()).next().unwrap();
        segment(body, "data-editable")
            .iter()
            .map(|span| {
                extract_fields(span, "data-editable")
                    .into_iter()
                    .map(|e| e.field)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn synthesized_name_from_block_type() {
        let f = fields("<html><body><!-- BLOCK:hero:draggable --><section><h1 data-editable>Welcome</h1></section><!-- /BLOCK:hero --></body></html>");
        assert_eq!(
            f,
            vec![vec![Field {
                field_name: "hero-1".into(),
                display_name: "Hero 1".into(),
                field_type: FieldType::Text,
                value: "Welcome".into(),
            }]]
        );
    }

    #[test]
    fn explicit_name_and_link_value() {
        let f = fields("<html><body><section id=\"footer\"><a data-editable=\"contact_link\" href=\"/contact\">Contact</a></section></body></html>");
        let field = &f[0][0];
        assert_eq!(field.field_name, "contact link");
        assert_eq!(field.display_name, "Contact Link");
        assert_eq!(field.field_type, FieldType::Link);
        assert_eq!(field.value, "/contact");
    }

    #[test]
    fn counter_counts_every_editable() {
        let f = fields(
            "<html><body><section id=\"about\">\
             <h2 data-editable=\"heading\">About</h2>\
             <p data-editable>We build things.</p>\
             <img data-editable src=\"assets/team.jpg\" alt=\"\">\
             </section></body></html>",
        );
        let names: Vec<&str> = f[0].iter().map(|x| x.field_name.as_str()).collect();
        assert_eq!(names, vec!["heading", "about-2", "about-3"]);
        let types: Vec<FieldType> = f[0].iter().map(|x| x.field_type).collect();
        assert_eq!(types, vec![FieldType::Text, FieldType::Textarea, FieldType::Image]);
        assert_eq!(f[0][2].value, "assets/team.jpg");
    }

    #[test]
    fn text_is_trimmed_and_spans_children() {
        let f = fields("<html><body><section id=\"s\"><div data-editable>\n   Hello <b>bold</b> world \n</div></section></body></html>");
        assert_eq!(f[0][0].value, "Hello bold world");
        assert_eq!(f[0][0].field_type, FieldType::Textarea);
    }

    #[test]
    fn missing_attribute_value_is_empty() {
        let f = fields("<html><body><section id=\"s\"><img data-editable=\"logo\"><a data-editable=\"cta\">Go</a></section></body></html>");
        assert_eq!(f[0][0].value, "");
        assert_eq!(f[0][1].value, "");
    }

    #[test]
    fn nested_editables_in_document_order() {
        let f = fields("<html><body><section id=\"card\"><div data-editable=\"outer\"><h3 data-editable=\"inner\">Title</h3></div><span data-editable>After</span></section></body></html>");
        let names: Vec<&str> = f[0].iter().map(|x| x.field_name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner", "card-3"]);
    }

    #[test]
    fn duplicate_explicit_names_are_suffixed() {
        let f = fields("<html><body><section id=\"s\"><h2 data-editable=\"title\">A</h2><h2 data-editable=\"title\">B</h2></section></body></html>");
        let names: Vec<&str> = f[0].iter().map(|x| x.field_name.as_str()).collect();
        assert_eq!(names, vec!["title", "title-2"]);
    }

    #[test]
    fn editable_root_of_manual_span_counts() {
        let f = fields("<html><body><!-- BLOCK:tagline --><p data-editable=\"tag_line\">Fast.</p><!-- /BLOCK:tagline --></body></html>");
        assert_eq!(f[0][0].field_name, "tag line");
        assert_eq!(f[0][0].value, "Fast.");
    }

    #[test]
    fn whitespace_only_name_is_synthesized() {
        assert_eq!(field_name("  ", "hero", 2), "hero-2");
        assert_eq!(field_name("main_title", "hero", 1), "main title");
        assert_eq!(field_name("{{x}}", "hero", 3), "x");
        assert_eq!(field_name("{}", "hero", 4), "hero-4");
    }
}
