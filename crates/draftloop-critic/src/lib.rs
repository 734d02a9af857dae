//! # draftloop-critic
//!
//! Prompt templates for the writer and editor, and the pure routing decision
//! taken after every editor pass.

mod decision;
mod prompts;

pub use decision::{is_approval, Route, Termination, DEFAULT_REVISION_THRESHOLD};
pub use prompts::{DraftPrompts, APPROVAL_TOKEN, DEFAULT_CHAR_LIMIT};
