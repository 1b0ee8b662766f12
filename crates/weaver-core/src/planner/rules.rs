//! Rule-based fallback planner.
//!
//! Builds one task per keyword group found in the request, with parameters
//! pulled from simple phrases ("4x5", "titled Budget", "7 items", ...) and
//! defaults for everything else.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use super::intent::pattern;
use super::{DEFAULT_POSTAMBLE, DEFAULT_PREAMBLE, Plan, Task, TaskKind, detect_intents};

static DIMENSIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:x|\u{00d7}|by)\s*(\d+)").expect("dimensions regex")
});
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btitled?\s+([a-z0-9 _/-]+)").expect("title regex")
});
static ORDERED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ordered|numbered)\b|1\.").expect("ordered regex")
});
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s+(?:items|points|bullets|risks|tasks)").expect("count regex")
});
static SECTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+sections?").expect("sections regex"));
static TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:of|for)\s+([a-z0-9 _/-]+)").expect("topic regex")
});

const DEFAULT_ROWS: u64 = 3;
const DEFAULT_COLS: u64 = 3;
const DEFAULT_LIST_COUNT: u64 = 5;
const DEFAULT_SECTIONS: u64 = 2;
const DEFAULT_FLOW_TOPIC: &str = "Process";

/// Build a plan directly from the request text.
///
/// Always carries the default preamble and postamble; the task list is
/// empty when no keyword group matches.
pub fn plan_with_rules(user_input: &str) -> Plan {
    let tasks = detect_intents(user_input)
        .into_iter()
        .enumerate()
        .map(|(i, kind)| Task {
            id: format!("task_{}", i + 1),
            kind,
            params: params_for(kind, user_input),
        })
        .collect();

    Plan {
        tasks,
        preamble: DEFAULT_PREAMBLE.to_owned(),
        postamble: DEFAULT_POSTAMBLE.to_owned(),
    }
}

fn params_for(kind: TaskKind, text: &str) -> Map<String, Value> {
    let value = match kind {
        TaskKind::Table => {
            let (rows, cols) = DIMENSIONS_RE
                .captures(text)
                .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
                .unwrap_or((DEFAULT_ROWS, DEFAULT_COLS));
            let title = TITLE_RE
                .captures(text)
                .map(|c| clean_phrase(&c[1]))
                .unwrap_or_default();
            json!({"rows": rows, "cols": cols, "title": title})
        }
        TaskKind::List => {
            let count = first_number(&COUNT_RE, text).unwrap_or(DEFAULT_LIST_COUNT);
            json!({"ordered": ORDERED_RE.is_match(text), "count": count, "topic": ""})
        }
        TaskKind::Formatting => {
            let sections = first_number(&SECTIONS_RE, text).unwrap_or(DEFAULT_SECTIONS);
            let lower = text.to_lowercase();
            let mut emphasis = Vec::new();
            if lower.contains("bold") {
                emphasis.push("bold");
            }
            if lower.contains("italic") {
                emphasis.push("italic");
            }
            if emphasis.is_empty() {
                emphasis = vec!["bold", "italic"];
            }
            json!({"title": "", "sections": sections, "emphasis": emphasis})
        }
        TaskKind::FlowChart => json!({"topic": flow_topic(text)}),
    };

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Topic of a flow chart: the phrase after "of"/"for", preferring one that
/// follows the flow-chart keyword itself.
fn flow_topic(text: &str) -> String {
    let after_keyword = pattern(TaskKind::FlowChart)
        .find(text)
        .map(|m| &text[m.end()..])
        .unwrap_or_default();

    TOPIC_RE
        .captures(after_keyword)
        .or_else(|| TOPIC_RE.captures(text))
        .map(|c| clean_phrase(&c[1]))
        .filter(|topic| !topic.is_empty())
        .unwrap_or_else(|| DEFAULT_FLOW_TOPIC.to_owned())
}

fn first_number(re: &Regex, text: &str) -> Option<u64> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

fn clean_phrase(raw: &str) -> String {
    raw.trim().trim_end_matches('.').trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_task(text: &str) -> Task {
        let plan = plan_with_rules(text);
        assert_eq!(plan.tasks.len(), 1, "expected one task for {text:?}");
        plan.tasks.into_iter().next().unwrap()
    }

    #[test]
    fn table_defaults_to_three_by_three() {
        let task = only_task("make a table");
        assert_eq!(task.kind, TaskKind::Table);
        assert_eq!(task.params["rows"], 3);
        assert_eq!(task.params["cols"], 3);
        assert_eq!(task.params["title"], "");
    }

    #[test]
    fn table_dimensions_and_title() {
        let task = only_task("Create a 4x6 table titled Quarterly Revenue.");
        assert_eq!(task.params["rows"], 4);
        assert_eq!(task.params["cols"], 6);
        assert_eq!(task.params["title"], "Quarterly Revenue");

        let task = only_task("a 2 by 5 grid");
        assert_eq!(task.params["rows"], 2);
        assert_eq!(task.params["cols"], 5);
    }

    #[test]
    fn list_defaults_and_ordering() {
        let task = only_task("give me a list of fruits");
        assert_eq!(task.params["count"], 5);
        assert_eq!(task.params["ordered"], false);

        let task = only_task("a numbered list of 7 items");
        assert_eq!(task.params["count"], 7);
        assert_eq!(task.params["ordered"], true);

        let task = only_task("a list like 1. this");
        assert_eq!(task.params["ordered"], true);

        let task = only_task("an unordered list");
        assert_eq!(task.params["ordered"], false);
    }

    #[test]
    fn formatting_emphasis() {
        let task = only_task("format this in 3 sections");
        assert_eq!(task.params["sections"], 3);
        assert_eq!(task.params["emphasis"], json!(["bold", "italic"]));

        let task = only_task("use bold headings");
        assert_eq!(task.params["sections"], 2);
        assert_eq!(task.params["emphasis"], json!(["bold"]));
    }

    #[test]
    fn flow_chart_topic() {
        assert_eq!(only_task("draw a flowchart").params["topic"], "Process");
        assert_eq!(
            only_task("draw a flowchart of user signup.").params["topic"],
            "user signup"
        );
    }

    #[test]
    fn flow_chart_topic_prefers_phrase_after_keyword() {
        let plan = plan_with_rules("a table of prices and a diagram for checkout");
        let flow = plan
            .tasks
            .iter()
            .find(|t| t.kind == TaskKind::FlowChart)
            .unwrap();
        assert_eq!(flow.params["topic"], "checkout");
    }

    #[test]
    fn multiple_kinds_get_sequential_ids() {
        let plan = plan_with_rules("a table, a bulleted list and a flow chart");
        let ids: Vec<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task_1", "task_2", "task_3"]);
        assert_eq!(plan.preamble, DEFAULT_PREAMBLE);
        assert_eq!(plan.postamble, DEFAULT_POSTAMBLE);
    }

    #[test]
    fn no_keywords_no_tasks() {
        let plan = plan_with_rules("tell me a joke");
        assert!(plan.tasks.is_empty());
        assert!(!plan.preamble.is_empty());
        assert!(!plan.postamble.is_empty());
    }
}
