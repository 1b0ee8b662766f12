//! Template assembly: placeholder naming and the final template.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::completion::Completion;
use crate::envelope::placeholders;
use crate::planner::{Task, TaskKind};
use crate::prompts::{PromptLibrary, PromptName};

/// Aggregate token a generative template must contain.
pub const ARTIFACTS_TOKEN: &str = "{artifacts}";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the final template is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStrategy {
    /// Placeholders one per line, in task order.
    #[default]
    Deterministic,
    /// A model-written template with `{artifacts}` substituted by the
    /// deterministic one; falls back to it on any problem.
    Generative,
}

impl fmt::Display for TemplateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deterministic => "deterministic",
            Self::Generative => "generative",
        };
        f.write_str(s)
    }
}

impl FromStr for TemplateStrategy {
    type Err = TemplateStrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deterministic" => Ok(Self::Deterministic),
            "generative" => Ok(Self::Generative),
            other => Err(TemplateStrategyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TemplateStrategy`] string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStrategyParseError(pub String);

impl fmt::Display for TemplateStrategyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid template strategy: {:?} (expected \"deterministic\" or \"generative\")",
            self.0
        )
    }
}

impl std::error::Error for TemplateStrategyParseError {}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// Assigns `{kind}_{n}` names with an independent 1-based counter per kind.
#[derive(Debug, Default)]
pub struct PlaceholderCounter {
    counts: BTreeMap<TaskKind, usize>,
}

impl PlaceholderCounter {
    pub fn next(&mut self, kind: TaskKind) -> String {
        let n = self.counts.entry(kind).or_insert(0);
        *n += 1;
        format!("{kind}_{n}")
    }
}

/// Placeholder names for `tasks`, in task order.
pub fn placeholder_names(tasks: &[Task]) -> Vec<String> {
    let mut counter = PlaceholderCounter::default();
    tasks.iter().map(|t| counter.next(t.kind)).collect()
}

/// One `{name}` token per line.
pub fn deterministic_template(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("{{{n}}}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the completion service for a narrative template around `names`.
///
/// The reply must contain [`ARTIFACTS_TOKEN`], which is replaced by the
/// deterministic template. A failed call, a reply without the token, or a
/// result that references a placeholder not in `names` all yield the
/// deterministic template instead.
pub async fn generative_template(
    completion: &dyn Completion,
    prompts: &PromptLibrary,
    user_input: &str,
    names: &[String],
) -> String {
    let fallback = deterministic_template(names);
    let payload = json!({
        "user_input": user_input,
        "placeholders": names,
    })
    .to_string();

    let reply = match completion
        .generate(&payload, prompts.get(PromptName::FinalTemplate))
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "final template generation failed, using plain template");
            return fallback;
        }
    };

    if !reply.contains(ARTIFACTS_TOKEN) {
        tracing::debug!("final template reply lacks {ARTIFACTS_TOKEN}, using plain template");
        return fallback;
    }

    let template = reply.trim().replace(ARTIFACTS_TOKEN, &fallback);
    if let Some(stray) = placeholders(&template)
        .into_iter()
        .find(|p| !names.iter().any(|n| n == p))
    {
        tracing::debug!(placeholder = stray, "final template references unknown artifact");
        return fallback;
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use async_trait::async_trait;
    use serde_json::Map;

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl Completion for Fixed {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _text: &str, _system: &str) -> Result<String, CompletionError> {
            self.0
                .map(str::to_owned)
                .map_err(|_| CompletionError::Unavailable("offline".into()))
        }
    }

    fn task(kind: TaskKind) -> Task {
        Task {
            id: "t".into(),
            kind,
            params: Map::new(),
        }
    }

    fn names() -> Vec<String> {
        vec!["table_1".into(), "list_1".into()]
    }

    #[test]
    fn counters_are_per_kind() {
        let tasks = [
            task(TaskKind::Table),
            task(TaskKind::List),
            task(TaskKind::Table),
            task(TaskKind::FlowChart),
        ];
        assert_eq!(
            placeholder_names(&tasks),
            vec!["table_1", "list_1", "table_2", "flow_chart_1"]
        );
    }

    #[test]
    fn deterministic_is_one_token_per_line() {
        assert_eq!(deterministic_template(&names()), "{table_1}\n{list_1}");
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!("generative".parse(), Ok(TemplateStrategy::Generative));
        assert_eq!(TemplateStrategy::default(), TemplateStrategy::Deterministic);
        assert!("fancy".parse::<TemplateStrategy>().is_err());
    }

    #[tokio::test]
    async fn generative_substitutes_artifacts_token() {
        let prompts = PromptLibrary::builtin();
        let completion = Fixed(Ok("<p>Your plan:</p>\n{artifacts}\n<p>Enjoy.</p>"));
        let template = generative_template(&completion, &prompts, "x", &names()).await;
        assert_eq!(template, "<p>Your plan:</p>\n{table_1}\n{list_1}\n<p>Enjoy.</p>");
    }

    #[tokio::test]
    async fn generative_falls_back_without_token() {
        let prompts = PromptLibrary::builtin();
        let completion = Fixed(Ok("<p>No token here</p>"));
        let template = generative_template(&completion, &prompts, "x", &names()).await;
        assert_eq!(template, "{table_1}\n{list_1}");
    }

    #[tokio::test]
    async fn generative_falls_back_on_unknown_placeholder() {
        let prompts = PromptLibrary::builtin();
        let completion = Fixed(Ok("{artifacts}\n{flow_chart_1}"));
        let template = generative_template(&completion, &prompts, "x", &names()).await;
        assert_eq!(template, "{table_1}\n{list_1}");
    }

    #[tokio::test]
    async fn generative_falls_back_on_error() {
        let prompts = PromptLibrary::builtin();
        let template = generative_template(&Fixed(Err(())), &prompts, "x", &names()).await;
        assert_eq!(template, "{table_1}\n{list_1}");
    }
}
