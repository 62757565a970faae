/// Escape text content the way the html5ever serializer does outside raw-text elements.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value the way the html5ever serializer does.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// "main_title" → "Main Title", "hero-1" → "Hero 1".
pub fn display_name(field_name: &str) -> String {
    let mut out = String::with_capacity(field_name.len());
    let mut at_word_start = true;
    for c in field_name.chars() {
        let c = if c == '-' || c == '_' { ' ' } else { c };
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Upper-case the first character: "about" → "About".
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(display_name("main_title"), "Main Title");
        assert_eq!(display_name("hero-1"), "Hero 1");
        assert_eq!(display_name("contact link"), "Contact Link");
        assert_eq!(display_name("cta-button_text"), "Cta Button Text");
    }

    #[test]
    fn display_name_keeps_inner_case() {
        assert_eq!(display_name("iPhone promo"), "IPhone Promo");
    }

    #[test]
    fn text_escaping() {
        assert_eq!(escape_text("Fish & <Chips>"), "Fish &amp; &lt;Chips&gt;");
        assert_eq!(escape_text("say \"hi\""), "say \"hi\"");
        assert_eq!(escape_text("a\u{a0}b"), "a&nbsp;b");
    }

    #[test]
    fn attr_escaping() {
        assert_eq!(escape_attr("/search?a=1&b=\"x\""), "/search?a=1&amp;b=&quot;x&quot;");
        assert_eq!(escape_attr("<ok>"), "<ok>");
    }

    #[test]
    fn capitalize_slug() {
        assert_eq!(capitalize("about"), "About");
        assert_eq!(capitalize(""), "");
    }
}
