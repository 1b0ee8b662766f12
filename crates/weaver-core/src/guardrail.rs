//! Guardrail gate: asks the completion service whether a request may
//! proceed, failing closed on anything but a strict verdict.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::completion::{Completion, CompletionError};
use crate::prompts::{PromptLibrary, PromptName};

/// Reason reported when the classifier reply is not a strict verdict.
pub const PARSE_FAILURE_REASON: &str = "Guardrail did not return strict JSON";

/// The gate's verdict on a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailDecision {
    pub allowed: bool,
    pub reason: String,
}

impl GuardrailDecision {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Classify `user_input`.
///
/// Returns `Err` only when the completion service itself fails; a reply that
/// cannot be read as a verdict is a denial, never an error. No retry.
pub async fn check(
    completion: &dyn Completion,
    prompts: &PromptLibrary,
    user_input: &str,
) -> Result<GuardrailDecision, CompletionError> {
    let reply = completion
        .generate(user_input, prompts.get(PromptName::Guardrail))
        .await?;

    let decision = parse_decision(&reply);
    if decision.allowed {
        tracing::debug!(reason = %decision.reason, "guardrail allowed request");
    } else {
        tracing::info!(reason = %decision.reason, "guardrail denied request");
    }
    Ok(decision)
}

/// Read a classifier reply as a [`GuardrailDecision`].
///
/// The reply must be exactly one JSON object (optionally inside a single
/// code fence) with a boolean `allowed` and a string `reason`.
pub fn parse_decision(reply: &str) -> GuardrailDecision {
    let body = strip_fence(reply.trim());
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return GuardrailDecision::denied(PARSE_FAILURE_REASON);
    };

    match (map.get("allowed"), map.get("reason")) {
        (Some(Value::Bool(allowed)), Some(Value::String(reason))) => GuardrailDecision {
            allowed: *allowed,
            reason: reason.clone(),
        },
        _ => GuardrailDecision::denied(PARSE_FAILURE_REASON),
    }
}

/// Remove one surrounding ``` / ```json fence, if present. The tag is
/// matched case-insensitively.
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    rest.trim()
}
