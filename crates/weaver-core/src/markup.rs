//! Minimal structural scanner for HTML-ish model output.
//!
//! This is not a validator. It finds elements by tag name, balancing nested
//! elements of the same name, which is enough to lift one table, list or
//! diagram out of a noisy reply.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*>").expect("tag regex is valid")
});

static ANY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("strip regex is valid"));

/// Byte ranges of one element inside a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// From the `<` of the opening tag to the `>` of the closing tag.
    pub outer: Range<usize>,
    /// Everything between the opening and the closing tag.
    pub inner: Range<usize>,
}

impl Element {
    /// The opening tag, verbatim.
    pub fn open_tag<'a>(&self, source: &'a str) -> &'a str {
        &source[self.outer.start..self.inner.start]
    }
}

/// Find the first complete `<tag>...</tag>` element in `html`.
pub fn find_element(html: &str, tag: &str) -> Option<Element> {
    find_element_at(html, tag, 0)
}

/// Find the first complete `<tag>...</tag>` element starting at or after
/// byte offset `from`.
///
/// Tag names compare case-insensitively. Nested elements of the same name
/// are balanced; an opening tag that is never closed yields `None`.
pub fn find_element_at(html: &str, tag: &str, from: usize) -> Option<Element> {
    let mut depth = 0usize;
    let mut open: Option<(usize, usize)> = None;

    for caps in TAG_RE.captures_iter(&html[from..]) {
        if !caps[2].eq_ignore_ascii_case(tag) {
            continue;
        }
        let whole = caps.get(0)?;
        let (start, end) = (from + whole.start(), from + whole.end());
        let closing = !caps[1].is_empty();

        match (closing, open) {
            (false, None) => {
                open = Some((start, end));
                depth = 1;
            }
            (false, Some(_)) => depth += 1,
            // Stray closing tag before any opening one.
            (true, None) => {}
            (true, Some((outer_start, inner_start))) => {
                depth -= 1;
                if depth == 0 {
                    return Some(Element {
                        outer: outer_start..end,
                        inner: inner_start..start,
                    });
                }
            }
        }
    }
    None
}

/// Find every top-level `<tag>` element in `html`, in document order.
pub fn find_all(html: &str, tag: &str) -> Vec<Element> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(element) = find_element_at(html, tag, cursor) {
        cursor = element.outer.end;
        found.push(element);
    }
    found
}

/// Remove every tag, leaving only text.
pub fn strip_tags(html: &str) -> String {
    ANY_TAG_RE.replace_all(html, "").into_owned()
}

/// Escape text for safe inclusion inside an HTML element.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_simple_element() {
        let html = "intro <ul><li>a</li></ul> outro";
        let el = find_element(html, "ul").unwrap();
        assert_eq!(&html[el.outer.clone()], "<ul><li>a</li></ul>");
        assert_eq!(&html[el.inner.clone()], "<li>a</li>");
        assert_eq!(el.open_tag(html), "<ul>");
    }

    #[test]
    fn balances_nested_same_name_elements() {
        let html = "<ul><li>a<ul><li>b</li></ul></li></ul><ul><li>c</li></ul>";
        let el = find_element(html, "ul").unwrap();
        assert_eq!(
            &html[el.outer.clone()],
            "<ul><li>a<ul><li>b</li></ul></li></ul>"
        );
    }

    #[test]
    fn tag_names_are_exact_and_case_insensitive() {
        let html = "<THEAD><TR><TH>x</TH></TR></THEAD>";
        let th = find_element(html, "th").unwrap();
        assert_eq!(&html[th.inner.clone()], "x");
        let head = find_element(html, "thead").unwrap();
        assert_eq!(head.outer.start, 0);
    }

    #[test]
    fn keeps_attributes_in_open_tag() {
        let html = r#"<table class="llm-table" border="1"><tr><td>1</td></tr></table>"#;
        let el = find_element(html, "table").unwrap();
        assert_eq!(el.open_tag(html), r#"<table class="llm-table" border="1">"#);
    }

    #[test]
    fn unclosed_element_is_none() {
        assert!(find_element("<table><tr><td>1</td></tr>", "table").is_none());
    }

    #[test]
    fn find_all_returns_siblings_in_order() {
        let html = "<tr><td>1</td><td>2</td></tr>";
        let cells: Vec<&str> = find_all(html, "td")
            .into_iter()
            .map(|el| &html[el.inner])
            .collect();
        assert_eq!(cells, vec!["1", "2"]);
    }

    #[test]
    fn strip_and_escape() {
        assert_eq!(strip_tags("<b>bold</b> <i>x</i>"), "bold x");
        assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
