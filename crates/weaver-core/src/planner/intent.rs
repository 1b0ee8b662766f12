//! Keyword-based intent detection.
//!
//! Used both to gate model-proposed tasks and to drive the rule-based
//! fallback planner.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::TaskKind;

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tables?|grids?|matrix|matrices)\b").expect("table intent regex")
});

static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:lists?|bullets?|bulleted|numbered|ordered)\b").expect("list intent regex")
});

static FORMATTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:format\w*|headings?|bold|italics?|fonts?)\b")
        .expect("formatting intent regex")
});

static FLOW_CHART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:flow\s*charts?|mermaid|diagrams?)\b").expect("flow chart intent regex")
});

/// The keyword pattern for one kind.
pub(crate) fn pattern(kind: TaskKind) -> &'static Regex {
    match kind {
        TaskKind::Table => &TABLE_RE,
        TaskKind::List => &LIST_RE,
        TaskKind::Formatting => &FORMATTING_RE,
        TaskKind::FlowChart => &FLOW_CHART_RE,
    }
}

/// Return the kinds the user explicitly named, in canonical kind order.
pub fn detect_intents(text: &str) -> BTreeSet<TaskKind> {
    TaskKind::ALL
        .into_iter()
        .filter(|kind| pattern(*kind).is_match(text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TaskKind> {
        detect_intents(text).into_iter().collect()
    }

    #[test]
    fn single_keyword_groups() {
        assert_eq!(kinds("Make a 4x4 table of planets"), vec![TaskKind::Table]);
        assert_eq!(kinds("a grid of colors"), vec![TaskKind::Table]);
        assert_eq!(kinds("give me a bulleted summary"), vec![TaskKind::List]);
        assert_eq!(kinds("Use headings and bold text"), vec![TaskKind::Formatting]);
        assert_eq!(kinds("draw a flow chart of checkout"), vec![TaskKind::FlowChart]);
        assert_eq!(kinds("a Flowchart for login"), vec![TaskKind::FlowChart]);
    }

    #[test]
    fn multiple_groups_are_all_detected() {
        assert_eq!(
            kinds("A table and a numbered list, plus a diagram"),
            vec![TaskKind::Table, TaskKind::List, TaskKind::FlowChart]
        );
    }

    #[test]
    fn words_containing_keywords_do_not_count() {
        assert!(kinds("tablet sales were listless").is_empty());
        assert!(kinds("hello there").is_empty());
    }
}
