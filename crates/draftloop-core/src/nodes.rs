use std::sync::Arc;

use draftloop_critic::{DraftPrompts, Route, DEFAULT_CHAR_LIMIT, DEFAULT_REVISION_THRESHOLD};
use draftloop_llm::{GenerationConfig, GenerationError, TextGenerator};
use tracing::debug;

use crate::state::{StateDelta, WorkflowState};

/// Writes the first draft, or revises the current one against the critique
pub struct DraftProducer {
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
}

impl DraftProducer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: GenerationConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub async fn produce(&self, state: &WorkflowState) -> Result<StateDelta, GenerationError> {
        let messages = DraftPrompts::writer_messages(&state.draft, &state.critique);

        debug!(
            revising = state.has_critique(),
            model = %self.config.model,
            "Running writer"
        );

        let generation = self.generator.generate(&messages, &self.config).await?;
        debug!(draft_chars = generation.char_count(), "Writer produced draft");
        Ok(StateDelta::draft(generation.into_content()))
    }
}

/// Reviews the current draft and counts the pass
pub struct DraftReviewer {
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
    char_limit: usize,
}

impl DraftReviewer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: GenerationConfig) -> Self {
        Self {
            generator,
            config,
            char_limit: DEFAULT_CHAR_LIMIT,
        }
    }

    pub fn with_char_limit(mut self, char_limit: usize) -> Self {
        self.char_limit = char_limit;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn char_limit(&self) -> usize {
        self.char_limit
    }

    pub async fn review(&self, state: &WorkflowState) -> Result<StateDelta, GenerationError> {
        let messages = DraftPrompts::editor_messages(&state.draft, self.char_limit);

        debug!(
            draft_chars = state.draft.chars().count(),
            char_limit = self.char_limit,
            model = %self.config.model,
            "Running editor"
        );

        let generation = self.generator.generate(&messages, &self.config).await?;
        Ok(StateDelta::review(
            generation.into_content(),
            state.revision_count + 1,
        ))
    }
}

/// Chooses between another writer pass and stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopController {
    revision_threshold: usize,
}

impl Default for LoopController {
    fn default() -> Self {
        Self {
            revision_threshold: DEFAULT_REVISION_THRESHOLD,
        }
    }
}

impl LoopController {
    pub fn new(revision_threshold: usize) -> Self {
        Self { revision_threshold }
    }

    pub fn revision_threshold(&self) -> usize {
        self.revision_threshold
    }

    /// Route for the given state; a pure function of it
    pub fn route(&self, state: &WorkflowState) -> Route {
        Route::decide(&state.critique, state.revision_count, self.revision_threshold)
    }
}
