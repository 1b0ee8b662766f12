//! Shared test utilities for weaver integration tests.
//!
//! Provides [`ScriptedCompletion`], a [`Completion`] fake that answers by
//! instruction template. Replies are queued per template; the last reply in
//! a queue repeats for every later call. Every call is recorded so tests
//! can assert how many round trips a request made and what was sent.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use weaver_core::completion::{Completion, CompletionError};
use weaver_core::prompts::{PromptLibrary, PromptName};

/// Guardrail reply that lets every request through.
pub const ALLOW: &str = r#"{"allowed": true, "reason": "ok"}"#;

/// Which template a call was made with. `Other` covers system prompts that
/// are not one of the library templates, such as a chat prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Prompt(PromptName),
    Other,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub route: Route,
    pub text: String,
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Unavailable,
    Status(u16),
}

impl Scripted {
    fn to_result(&self) -> Result<String, CompletionError> {
        match self {
            Self::Reply(text) => Ok(text.clone()),
            Self::Unavailable => Err(CompletionError::Unavailable("scripted outage".into())),
            Self::Status(status) => Err(CompletionError::Status {
                status: *status,
                body: "scripted failure".into(),
            }),
        }
    }
}

/// Scripted completion service keyed by instruction template.
pub struct ScriptedCompletion {
    routes: HashMap<String, PromptName>,
    script: Mutex<HashMap<Route, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedCompletion {
    /// A fake that recognises the templates in `prompts`. Nothing is
    /// scripted yet: every call fails until a reply is added.
    pub fn new(prompts: &PromptLibrary) -> Self {
        let routes = PromptName::ALL
            .iter()
            .map(|name| (prompts.get(*name).to_owned(), *name))
            .collect();
        Self {
            routes,
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Same as [`new`](Self::new) with the guardrail already allowing
    /// every request.
    pub fn allowing(prompts: &PromptLibrary) -> Self {
        Self::new(prompts).reply(PromptName::Guardrail, ALLOW)
    }

    /// Queue a reply for calls made with template `name`.
    pub fn reply(self, name: PromptName, text: impl Into<String>) -> Self {
        self.push(Route::Prompt(name), Scripted::Reply(text.into()))
    }

    /// Queue a reply for calls whose system prompt is not a template.
    pub fn reply_other(self, text: impl Into<String>) -> Self {
        self.push(Route::Other, Scripted::Reply(text.into()))
    }

    /// Queue an "unavailable" failure for template `name`.
    pub fn unavailable(self, name: PromptName) -> Self {
        self.push(Route::Prompt(name), Scripted::Unavailable)
    }

    /// Queue an "unavailable" failure for non-template calls.
    pub fn unavailable_other(self) -> Self {
        self.push(Route::Other, Scripted::Unavailable)
    }

    /// Queue an HTTP status failure for template `name`.
    pub fn status(self, name: PromptName, status: u16) -> Self {
        self.push(Route::Prompt(name), Scripted::Status(status))
    }

    fn push(self, route: Route, entry: Scripted) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .entry(route)
            .or_default()
            .push_back(entry);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }

    /// Calls made with template `name`.
    pub fn calls_for(&self, name: PromptName) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.route == Route::Prompt(name))
            .collect()
    }

    fn route_of(&self, system_prompt: &str) -> Route {
        self.routes
            .get(system_prompt)
            .map_or(Route::Other, |name| Route::Prompt(*name))
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, text: &str, system_prompt: &str) -> Result<String, CompletionError> {
        let route = self.route_of(system_prompt);
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(Call {
                route,
                text: text.to_owned(),
            });

        let mut script = self.script.lock().expect("script lock poisoned");
        let Some(queue) = script.get_mut(&route) else {
            return Err(CompletionError::Malformed(format!(
                "no scripted reply for {route:?}"
            )));
        };
        let entry = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match entry {
            Some(entry) => entry.to_result(),
            None => Err(CompletionError::Malformed(format!(
                "no scripted reply for {route:?}"
            ))),
        }
    }
}
