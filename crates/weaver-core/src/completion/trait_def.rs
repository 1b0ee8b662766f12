//! The `Completion` trait -- the adapter interface for text-completion
//! services.
//!
//! The trait is object-safe so the engine can hold it as
//! `Arc<dyn Completion>` without knowing which vendor sits behind it.

use async_trait::async_trait;

/// Errors a completion service can report.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The service could not be reached (connect failure, timeout, missing
    /// credentials).
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status.
    #[error("completion service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered, but the reply carried no usable message.
    #[error("malformed completion reply: {0}")]
    Malformed(String),
}

impl CompletionError {
    /// Whether this failure means the assistant as a whole is unreachable,
    /// as opposed to a single bad reply.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A single-turn text-completion service.
///
/// Implementations must send `system_prompt` in the system role, separate
/// from the user-supplied `text`.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Human-readable model name, used in log fields.
    fn model_name(&self) -> &str;

    /// Run one completion round trip and return the reply text.
    async fn generate(&self, text: &str, system_prompt: &str) -> Result<String, CompletionError>;
}

// Compile-time assertion: Completion must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Completion) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoCompletion;

    #[async_trait]
    impl Completion for EchoCompletion {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            text: &str,
            system_prompt: &str,
        ) -> Result<String, CompletionError> {
            Ok(format!("{system_prompt}|{text}"))
        }
    }

    #[test]
    fn completion_is_object_safe() {
        let completion: Box<dyn Completion> = Box::new(EchoCompletion);
        assert_eq!(completion.model_name(), "echo");
    }

    #[tokio::test]
    async fn echo_keeps_system_and_user_apart() {
        let completion: Box<dyn Completion> = Box::new(EchoCompletion);
        let reply = completion.generate("hello", "be brief").await.unwrap();
        assert_eq!(reply, "be brief|hello");
    }

    #[test]
    fn only_unavailable_counts_as_unavailable() {
        assert!(CompletionError::Unavailable("timeout".into()).is_unavailable());
        assert!(
            !CompletionError::Status {
                status: 500,
                body: "boom".into()
            }
            .is_unavailable()
        );
        assert!(!CompletionError::Malformed("no choices".into()).is_unavailable());
    }
}
