//! The compose entry point: runs one request through the whole pipeline and
//! always answers with an [`Envelope`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::assemble::{self, TemplateStrategy};
use crate::completion::Completion;
use crate::envelope::{EMPTY_INPUT_MESSAGE, Envelope, PLANNER_FAILED_MESSAGE, UNAVAILABLE_MESSAGE};
use crate::executor::execute_task;
use crate::guardrail;
use crate::markup;
use crate::planner::{self, PlanError};
use crate::prompts::PromptLibrary;
use crate::table_edit::{self, EditInstruction};

/// Placeholder bound to the table on the edit path.
const EDITED_TABLE_VAR: &str = "table_1";

/// Caller-supplied context for a request.
///
/// Nothing is kept between requests; a client that wants follow-up edits
/// sends back the table it received last time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComposeContext {
    /// Markup of the table produced by an earlier request.
    #[serde(default)]
    pub last_table: Option<String>,
}

impl ComposeContext {
    pub fn with_last_table(table: impl Into<String>) -> Self {
        Self {
            last_table: Some(table.into()),
        }
    }

    fn prior_table(&self) -> Option<&str> {
        self.last_table
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Orchestrates guardrail, table edit, planner, executor and assembler
/// around one injected completion service.
#[derive(Clone)]
pub struct Composer {
    completion: Arc<dyn Completion>,
    prompts: Arc<PromptLibrary>,
    strategy: TemplateStrategy,
}

impl Composer {
    pub fn new(completion: Arc<dyn Completion>, prompts: Arc<PromptLibrary>) -> Self {
        Self {
            completion,
            prompts,
            strategy: TemplateStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: TemplateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> TemplateStrategy {
        self.strategy
    }

    /// Run `user_input` through the pipeline.
    ///
    /// Never fails: refusals, planner failures and an unreachable completion
    /// service all come back as blocked envelopes, and a failed task shows
    /// up as an error fragment in its own slot.
    pub async fn compose(&self, user_input: &str, context: &ComposeContext) -> Envelope {
        let text = user_input.trim();
        if text.is_empty() {
            return Envelope::blocked(EMPTY_INPUT_MESSAGE);
        }

        let completion = self.completion.as_ref();
        match guardrail::check(completion, &self.prompts, text).await {
            Ok(decision) if decision.allowed => {}
            Ok(decision) => {
                let postamble = format!("Request denied: {}", decision.reason);
                return Envelope::blocked(postamble.trim());
            }
            Err(e) => {
                if e.is_unavailable() {
                    tracing::warn!(model = completion.model_name(), error = %e, "completion service unreachable");
                } else {
                    tracing::warn!(model = completion.model_name(), error = %e, "guardrail call failed");
                }
                return Envelope::blocked(UNAVAILABLE_MESSAGE);
            }
        }

        if let Some(prior) = context.prior_table() {
            if table_edit::looks_like_table_edit(text) {
                return self.edit_table(prior, text).await;
            }
        }

        let plan = match planner::plan(completion, &self.prompts, text).await {
            Ok(plan) => plan,
            Err(PlanError::NoTasks) => return Envelope::blocked(PLANNER_FAILED_MESSAGE),
            Err(e @ PlanError::Unavailable(_)) => {
                tracing::warn!(model = completion.model_name(), error = %e, "completion service unreachable");
                return Envelope::blocked(UNAVAILABLE_MESSAGE);
            }
        };

        let names = assemble::placeholder_names(&plan.tasks);
        let mut variables = BTreeMap::new();
        for (task, name) in plan.tasks.iter().zip(&names) {
            let artifact = execute_task(completion, &self.prompts, task).await;
            variables.insert(name.clone(), artifact);
        }

        let final_template = match self.strategy {
            TemplateStrategy::Deterministic => assemble::deterministic_template(&names),
            TemplateStrategy::Generative => {
                assemble::generative_template(completion, &self.prompts, text, &names).await
            }
        };

        tracing::info!(
            tasks = plan.tasks.len(),
            strategy = %self.strategy,
            "composed response"
        );
        Envelope::html(plan.preamble, final_template, variables, plan.postamble)
    }

    async fn edit_table(&self, prior: &str, text: &str) -> Envelope {
        if let Some(edit) = table_edit::extract_edit_instruction(text) {
            if let Ok(updated) = table_edit::apply_edit(prior, &edit) {
                return edited(edit_preamble(&edit), updated);
            }
        }

        tracing::info!("edit instruction not extractable, deferring to generative edit");
        match table_edit::generative_edit(self.completion.as_ref(), &self.prompts, prior, text)
            .await
        {
            Ok(updated) if markup::find_element(&updated, "table").is_some() => {
                edited("Updated the table.", updated)
            }
            Ok(_) => {
                tracing::warn!("generative table edit returned no table");
                unchanged(prior)
            }
            Err(e) => {
                tracing::warn!(error = %e, "generative table edit failed");
                unchanged(prior)
            }
        }
    }
}

fn edit_preamble(edit: &EditInstruction) -> String {
    format!("Updated cell R{}C{} \u{2192} {}.", edit.row, edit.col, edit.value)
}

fn unchanged(prior: &str) -> Envelope {
    edited(
        "Could not apply that edit; the table is unchanged.",
        prior.to_owned(),
    )
}

fn edited(preamble: impl Into<String>, table: String) -> Envelope {
    let variables = BTreeMap::from([(EDITED_TABLE_VAR.to_owned(), table)]);
    Envelope::html(preamble, format!("{{{EDITED_TABLE_VAR}}}"), variables, "")
}
