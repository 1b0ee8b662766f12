//! Output sanitizers: reduce a raw model reply to the one canonical fragment
//! allowed for its task kind.

use std::sync::LazyLock;

use regex::Regex;

use crate::markup::{self, Element};
use crate::planner::TaskKind;

static LEAK_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*<h[1-6][^>]*>\s*optional string\s*</h[1-6]>\s*").expect("leak heading regex")
});
static LEAK_PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*<p[^>]*>\s*optional string\s*</p>\s*").expect("leak paragraph regex")
});
static LEAK_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\s)optional string(\s|$)").expect("leak token regex")
});

static HEADING_1_3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-3]\b[^>]*>.*?</h[1-3]>").expect("title heading regex")
});
static BULLET_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*\u{2022}][ \t]+(.*)$").expect("bullet line regex"));
static NUMBERED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+(.*)$").expect("numbered line regex"));
static ALLOWED_FORMATTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<h([1-6])\b[^>]*>.*?</h[1-6]>|<p\b[^>]*>.*?</p>|<strong>.*?</strong>|<em>.*?</em>",
    )
    .expect("formatting allow-list regex")
});
static MERMAID_DIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\bclass\s*=\s*["'][^"']*\bmermaid\b[^"']*["'][^>]*>"#)
        .expect("mermaid div regex")
});
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:mermaid)?\s*(.*?)```").expect("code fence regex")
});

/// Remove leaked "optional string" schema placeholders from a reply.
///
/// Handles the placeholder as its own heading, as its own paragraph, and as
/// a bare whitespace-delimited token, then trims the result.
pub fn strip_placeholder_leaks(raw: &str) -> String {
    let s = LEAK_HEADING_RE.replace_all(raw, "");
    let s = LEAK_PARAGRAPH_RE.replace_all(&s, "");
    let s = LEAK_TOKEN_RE.replace_all(&s, " ");
    s.trim().to_owned()
}

/// Reduce `raw` to the canonical fragment for `kind`.
pub fn coerce_artifact(kind: TaskKind, raw: &str) -> String {
    let s = strip_placeholder_leaks(raw);
    match kind {
        TaskKind::Table => coerce_table(&s),
        TaskKind::List => coerce_list(&s),
        TaskKind::Formatting => coerce_formatting(&s),
        TaskKind::FlowChart => coerce_flow_chart(&s),
    }
}

/// First table, with the level 1-3 heading that immediately precedes it.
/// Without a table the text is returned unchanged.
pub fn coerce_table(s: &str) -> String {
    let Some(table) = markup::find_element(s, "table") else {
        return s.to_owned();
    };

    let before = &s[..table.outer.start];
    let title = HEADING_1_3_RE
        .find_iter(before)
        .last()
        .filter(|m| before[m.end()..].trim().is_empty())
        .map(|m| m.as_str())
        .unwrap_or_default();

    format!("{title}{}", &s[table.outer]).trim().to_owned()
}

/// First `<ul>` or `<ol>` (whichever starts earlier). Without either,
/// plain bullet or numbered lines become a list of tag-free items.
pub fn coerce_list(s: &str) -> String {
    let earliest = [markup::find_element(s, "ul"), markup::find_element(s, "ol")]
        .into_iter()
        .flatten()
        .min_by_key(|el: &Element| el.outer.start);
    if let Some(list) = earliest {
        return s[list.outer].to_owned();
    }

    if BULLET_LINE_RE.is_match(s) {
        return plain_lines_to_list("ul", &BULLET_LINE_RE, s);
    }
    if NUMBERED_LINE_RE.is_match(s) {
        return plain_lines_to_list("ol", &NUMBERED_LINE_RE, s);
    }
    s.to_owned()
}

fn plain_lines_to_list(tag: &str, line_re: &Regex, s: &str) -> String {
    let items: Vec<String> = line_re
        .captures_iter(s)
        .map(|c| format!("  <li>{}</li>", markup::strip_tags(&c[1]).trim()))
        .collect();
    format!("<{tag}>\n{}\n</{tag}>", items.join("\n"))
}

/// Only headings, paragraphs, `<strong>` and `<em>` fragments, concatenated
/// in document order. A reply with none of them becomes one paragraph of
/// its plain text.
pub fn coerce_formatting(s: &str) -> String {
    let allowed: String = ALLOWED_FORMATTING_RE
        .find_iter(s)
        .map(|m| m.as_str())
        .collect();
    if !allowed.is_empty() {
        return allowed;
    }

    let text = markup::strip_tags(s);
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else {
        format!("<p>{text}</p>")
    }
}

/// A mermaid-classed `<div>`, or the first code fence wrapped in one.
pub fn coerce_flow_chart(s: &str) -> String {
    if let Some(open) = MERMAID_DIV_RE.find(s) {
        if let Some(div) = markup::find_element_at(s, "div", open.start()) {
            return s[div.outer].to_owned();
        }
    }

    if let Some(caps) = FENCE_RE.captures(s) {
        let inner = caps[1].trim();
        return format!("<div class=\"mermaid\">\n{inner}\n</div>");
    }
    s.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_all_three_leak_forms() {
        assert_eq!(
            strip_placeholder_leaks("<h3>optional string</h3><table></table>"),
            "<table></table>"
        );
        assert_eq!(
            strip_placeholder_leaks("<p> Optional String </p>\n<ul></ul>"),
            "<ul></ul>"
        );
        assert_eq!(strip_placeholder_leaks("a optional string b"), "a b");
        assert_eq!(strip_placeholder_leaks("optional stringent"), "optional stringent");
    }

    #[test]
    fn table_with_preceding_heading() {
        let raw = "Sure!\n<h2>Fruit</h2>\n<table><tr><td>Apple</td></tr></table>\nEnjoy.";
        assert_eq!(
            coerce_table(raw),
            "<h2>Fruit</h2><table><tr><td>Apple</td></tr></table>"
        );
    }

    #[test]
    fn table_heading_must_be_adjacent() {
        let raw = "<h2>Fruit</h2><p>note</p><table><tr><td>1</td></tr></table>";
        assert_eq!(coerce_table(raw), "<table><tr><td>1</td></tr></table>");
    }

    #[test]
    fn table_ignores_level_four_headings() {
        let raw = "<h4>Small</h4><table><tr><td>1</td></tr></table>";
        assert_eq!(coerce_table(raw), "<table><tr><td>1</td></tr></table>");
    }

    #[test]
    fn table_without_table_is_unchanged() {
        assert_eq!(coerce_table("no table here"), "no table here");
    }

    #[test]
    fn list_picks_earliest_kind() {
        let raw = "x <ol><li>1</li></ol> y <ul><li>a</li></ul>";
        assert_eq!(coerce_list(raw), "<ol><li>1</li></ol>");
        let raw = "<ul><li>a</li></ul><ol><li>1</li></ol>";
        assert_eq!(coerce_list(raw), "<ul><li>a</li></ul>");
    }

    #[test]
    fn list_keeps_nested_lists_whole() {
        let raw = "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>";
        assert_eq!(coerce_list(raw), raw);
    }

    #[test]
    fn list_from_plain_bullets_strips_markup() {
        let raw = "Here:\n- <b>Apples</b>\n* Pears\n";
        assert_eq!(
            coerce_list(raw),
            "<ul>\n  <li>Apples</li>\n  <li>Pears</li>\n</ul>"
        );
    }

    #[test]
    fn list_from_numbered_lines() {
        let raw = "1. First\n2) Second";
        assert_eq!(
            coerce_list(raw),
            "<ol>\n  <li>First</li>\n  <li>Second</li>\n</ol>"
        );
    }

    #[test]
    fn formatting_keeps_only_allowed_fragments() {
        let raw = "<div><h2>Title</h2><script>x()</script><p>Body <em>it</em></p>\
                   <span>drop</span><strong>Bold</strong></div>";
        assert_eq!(
            coerce_formatting(raw),
            "<h2>Title</h2><p>Body <em>it</em></p><strong>Bold</strong>"
        );
    }

    #[test]
    fn formatting_does_not_confuse_pre_with_p() {
        assert_eq!(coerce_formatting("<pre>code</pre>"), "<p>code</p>");
    }

    #[test]
    fn formatting_plain_text_becomes_paragraph() {
        assert_eq!(coerce_formatting("just text"), "<p>just text</p>");
        assert_eq!(coerce_formatting("   "), "");
    }

    #[test]
    fn flow_chart_prefers_mermaid_div() {
        let raw = "text <div class=\"diagram mermaid\">graph TD\nA-->B</div> more";
        assert_eq!(
            coerce_flow_chart(raw),
            "<div class=\"diagram mermaid\">graph TD\nA-->B</div>"
        );
    }

    #[test]
    fn flow_chart_from_fence() {
        let raw = "```mermaid\nflowchart TD\n  A --> B\n```";
        assert_eq!(
            coerce_flow_chart(raw),
            "<div class=\"mermaid\">\nflowchart TD\n  A --> B\n</div>"
        );
        let raw = "```\ngraph LR\nX-->Y\n```";
        assert_eq!(
            coerce_flow_chart(raw),
            "<div class=\"mermaid\">\ngraph LR\nX-->Y\n</div>"
        );
    }

    #[test]
    fn coerce_dispatches_by_kind() {
        let raw = "<h3>optional string</h3><ul><li>a</li></ul>";
        assert_eq!(coerce_artifact(TaskKind::List, raw), "<ul><li>a</li></ul>");
    }
}
