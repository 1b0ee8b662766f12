//! Model-driven planning strategy.

use serde_json::{Map, Value};

use crate::completion::Completion;
use crate::extract::{Extracted, extract_object};
use crate::prompts::{PromptLibrary, PromptName};

use super::{DEFAULT_POSTAMBLE, DEFAULT_PREAMBLE, Plan, PlanError, Task, TaskKind, detect_intents};

/// Ask the completion service for a plan.
///
/// Returns `Ok(None)` when the service answers with an error status, or the
/// reply holds no object with a `tasks` array. Tasks of unsupported kinds are
/// dropped, and when the request names specific kinds, tasks of any other
/// kind are dropped too. The returned plan may therefore have no tasks.
///
/// # Errors
///
/// Returns [`PlanError::Unavailable`] when the service cannot be reached.
pub async fn plan_with_model(
    completion: &dyn Completion,
    prompts: &PromptLibrary,
    user_input: &str,
) -> Result<Option<Plan>, PlanError> {
    let reply = match completion
        .generate(user_input, prompts.get(PromptName::Planner))
        .await
    {
        Ok(reply) => reply,
        Err(e) if e.is_unavailable() => return Err(PlanError::Unavailable(e.to_string())),
        Err(e) => {
            tracing::warn!(error = %e, "model planner call failed, using rule-based planner");
            return Ok(None);
        }
    };

    let plan = match extract_object(&reply) {
        Extracted::Parsed(map) => plan_from_object(&map, user_input),
        Extracted::Unparsable => None,
    };
    if plan.is_none() {
        tracing::debug!("model planner reply was not a plan");
    }
    Ok(plan)
}

/// Build a [`Plan`] from a parsed planner reply.
pub(crate) fn plan_from_object(map: &Map<String, Value>, user_input: &str) -> Option<Plan> {
    let raw_tasks = map.get("tasks")?.as_array()?;
    let explicit = detect_intents(user_input);

    let mut tasks = Vec::new();
    for raw in raw_tasks {
        let Some(kind) = raw
            .get("kind")
            .and_then(Value::as_str)
            .and_then(|k| k.parse::<TaskKind>().ok())
        else {
            tracing::debug!(task = %raw, "dropping task with unsupported kind");
            continue;
        };
        if !explicit.is_empty() && !explicit.contains(&kind) {
            tracing::debug!(%kind, "dropping task the request did not ask for");
            continue;
        }

        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("task_{}", tasks.len() + 1));
        let params = raw
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        tasks.push(Task { id, kind, params });
    }

    Some(Plan {
        tasks,
        preamble: text_or(map.get("before_text"), DEFAULT_PREAMBLE),
        postamble: text_or(map.get("after_text"), DEFAULT_POSTAMBLE),
    })
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_owned()
}
