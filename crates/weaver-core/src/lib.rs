//! Orchestration engine that turns a natural-language request into one or
//! more HTML fragments (tables, lists, formatted text, flow charts).
//!
//! ```text
//! request -> guardrail -> [table edit] -> planner -> executor (per task)
//!                                                       |
//!                                                       v
//!                                           assembler -> Envelope
//! ```
//!
//! The only external dependency of the engine is a [`completion::Completion`]
//! service, injected by the host at construction time.

pub mod assemble;
pub mod completion;
pub mod compose;
pub mod envelope;
pub mod executor;
pub mod extract;
pub mod guardrail;
pub mod markup;
pub mod planner;
pub mod prompts;
pub mod table_edit;

pub use compose::{ComposeContext, Composer};
pub use envelope::{Envelope, Mode};
