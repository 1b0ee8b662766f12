//! The response envelope: the uniform contract every compose call returns.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::markup::escape_html;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{((?:table|list|formatting|flow_chart)_\d+)\}").expect("placeholder regex")
});

/// Postamble used when the completion service cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str = "LLM service unavailable. Please try again later.";

/// Postamble used when a request arrives with no text.
pub const EMPTY_INPUT_MESSAGE: &str = "No input provided.";

/// Postamble used when no tasks could be planned.
pub const PLANNER_FAILED_MESSAGE: &str = "Planner failed";

/// How the client should present an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Blocked,
    Html,
    Markdown,
}

/// Result of a compose call.
///
/// In html mode every `{name}` placeholder in `final_template` has exactly
/// one entry in `variables`, and every variable is referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub mode: Mode,
    pub preamble: String,
    pub final_template: String,
    pub variables: BTreeMap<String, String>,
    pub postamble: String,
}

impl Envelope {
    /// A refusal or failure carrying only a message.
    pub fn blocked(postamble: impl Into<String>) -> Self {
        Self {
            mode: Mode::Blocked,
            preamble: String::new(),
            final_template: String::new(),
            variables: BTreeMap::new(),
            postamble: postamble.into(),
        }
    }

    pub fn html(
        preamble: impl Into<String>,
        final_template: impl Into<String>,
        variables: BTreeMap<String, String>,
        postamble: impl Into<String>,
    ) -> Self {
        Self {
            mode: Mode::Html,
            preamble: preamble.into(),
            final_template: final_template.into(),
            variables,
            postamble: postamble.into(),
        }
    }

    /// A plain-text message with no artifacts.
    pub fn markdown(preamble: impl Into<String>) -> Self {
        Self {
            mode: Mode::Markdown,
            preamble: preamble.into(),
            final_template: String::new(),
            variables: BTreeMap::new(),
            postamble: String::new(),
        }
    }

    /// Whether placeholders and variables correspond one-to-one.
    pub fn is_consistent(&self) -> bool {
        let mut used = placeholders(&self.final_template);
        used.sort_unstable();
        used.dedup();
        used.len() == self.variables.len()
            && used.iter().all(|name| self.variables.contains_key(*name))
    }

    /// Produce the document a client would display.
    ///
    /// - html: placeholders substituted, preamble and postamble as escaped
    ///   paragraphs around the body.
    /// - markdown: non-empty parts joined by blank lines.
    /// - blocked: the postamble, or a generic denial.
    pub fn render(&self) -> String {
        match self.mode {
            Mode::Html => {
                let mut body = PLACEHOLDER_RE
                    .replace_all(&self.final_template, |caps: &Captures<'_>| {
                        self.variables
                            .get(&caps[1])
                            .cloned()
                            .unwrap_or_else(|| caps[0].to_owned())
                    })
                    .into_owned();
                if !self.preamble.is_empty() {
                    body = format!("<p>{}</p>\n{body}", escape_html(&self.preamble));
                }
                if !self.postamble.is_empty() {
                    body = format!("{body}\n<p>{}</p>", escape_html(&self.postamble));
                }
                body
            }
            Mode::Markdown => [&self.preamble, &self.final_template, &self.postamble]
                .into_iter()
                .filter(|part| !part.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n\n"),
            Mode::Blocked if self.postamble.is_empty() => "Request denied.".to_owned(),
            Mode::Blocked => self.postamble.clone(),
        }
    }
}

/// Artifact placeholder names (`table_1`, `flow_chart_2`, ...) referenced by
/// `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}
