//! Task executor: one completion call per task, sanitized into the
//! canonical fragment for the task's kind.

pub mod sanitize;

use crate::completion::Completion;
use crate::markup::escape_html;
use crate::planner::{Task, TaskKind};
use crate::prompts::PromptLibrary;

pub use sanitize::{coerce_artifact, strip_placeholder_leaks};

/// Run one task and return its artifact markup.
///
/// A completion failure does not propagate: it becomes an inline error
/// fragment for this task's slot so sibling tasks still render.
pub async fn execute_task(
    completion: &dyn Completion,
    prompts: &PromptLibrary,
    task: &Task,
) -> String {
    let payload = serde_json::Value::Object(task.params.clone()).to_string();

    match completion.generate(&payload, prompts.get(task.kind.prompt())).await {
        Ok(raw) => {
            let artifact = coerce_artifact(task.kind, &raw);
            tracing::debug!(
                task_id = %task.id,
                kind = %task.kind,
                bytes = artifact.len(),
                "task generated"
            );
            artifact
        }
        Err(e) => {
            tracing::warn!(task_id = %task.id, kind = %task.kind, error = %e, "task generation failed");
            error_fragment(task.kind, &e.to_string())
        }
    }
}

/// Inline placeholder shown in place of an artifact that failed to generate.
pub fn error_fragment(kind: TaskKind, detail: &str) -> String {
    format!(
        "<div class=\"artifact-error\">Could not generate {kind}: {}</div>",
        escape_html(detail)
    )
}
