use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Generation error: {0}")]
    Generation(#[from] draftloop_llm::GenerationError),
}
