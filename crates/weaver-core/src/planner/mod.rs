//! Intent planner: decomposes a request into an ordered list of typed tasks.
//!
//! Two strategies, tried in order:
//!
//! 1. [`model::plan_with_model`] asks the completion service for a plan and
//!    keeps only tasks of supported kinds the user actually asked for.
//! 2. [`rules::plan_with_rules`] scans the request for keywords and builds
//!    tasks with default parameters.
//!
//! Zero tasks from both is a [`PlanError::NoTasks`]. An unreachable service
//! is a [`PlanError::Unavailable`]; the rules are not consulted then.

pub mod intent;
pub mod model;
pub mod rules;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::completion::Completion;
use crate::prompts::{PromptLibrary, PromptName};

pub use intent::detect_intents;
pub use model::plan_with_model;
pub use rules::plan_with_rules;

/// Preamble used when a plan does not supply one.
pub const DEFAULT_PREAMBLE: &str = "Here are your results:";
/// Postamble used when a plan does not supply one.
pub const DEFAULT_POSTAMBLE: &str = "Need edits? Say, \u{201c}Replace R2C1 with 32\u{201d}.";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The kind of artifact a task produces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Table,
    List,
    Formatting,
    FlowChart,
}

impl TaskKind {
    /// Every supported kind, in canonical order.
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Table,
        TaskKind::List,
        TaskKind::Formatting,
        TaskKind::FlowChart,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::List => "list",
            Self::Formatting => "formatting",
            Self::FlowChart => "flow_chart",
        }
    }

    /// The instruction template used to generate this kind.
    pub fn prompt(self) -> PromptName {
        match self {
            Self::Table => PromptName::Table,
            Self::List => PromptName::List,
            Self::Formatting => PromptName::Formatting,
            Self::FlowChart => PromptName::FlowChart,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unsupported task kind: {s:?}"))
    }
}

/// One unit of generation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    /// Kind-specific parameters, passed to the generator as JSON.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// An ordered set of tasks plus the text that frames their results.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub tasks: Vec<Task>,
    pub preamble: String,
    pub postamble: String,
}

/// Errors from planning.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("no usable tasks from either planning strategy")]
    NoTasks,
    #[error("planner could not reach the completion service: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Plan `user_input`, preferring the model-driven strategy.
///
/// # Errors
///
/// [`PlanError::Unavailable`] if the completion service is unreachable, and
/// [`PlanError::NoTasks`] if neither strategy yields a task.
pub async fn plan(
    completion: &dyn Completion,
    prompts: &PromptLibrary,
    user_input: &str,
) -> Result<Plan, PlanError> {
    if let Some(plan) = plan_with_model(completion, prompts, user_input).await? {
        if !plan.tasks.is_empty() {
            tracing::info!(tasks = plan.tasks.len(), strategy = "model", "planned request");
            return Ok(plan);
        }
    }

    let plan = plan_with_rules(user_input);
    if plan.tasks.is_empty() {
        tracing::warn!("planner produced no tasks");
        return Err(PlanError::NoTasks);
    }
    tracing::info!(tasks = plan.tasks.len(), strategy = "rules", "planned request");
    Ok(plan)
}
