//! Completion collaborator interface.
//!
//! The engine never talks to a model vendor directly. Hosts construct a
//! concrete [`Completion`] (e.g. [`OpenAiCompletion`]) and hand it to the
//! [`crate::Composer`] as `Arc<dyn Completion>`.
//!
//! ```text
//! Composer
//!     |
//!     v
//! &dyn Completion --generate(text, system_prompt)--> String
//! ```

pub mod openai;
pub mod trait_def;

pub use openai::{OpenAiCompletion, OpenAiConfig};
pub use trait_def::{Completion, CompletionError};
