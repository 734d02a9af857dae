mod context;
mod error;
mod loop_runner;
mod nodes;
mod outcome;
mod state;

pub use context::{LoopContext, RevisionRecord};
pub use error::LoopError;
pub use loop_runner::LoopRunner;
pub use nodes::{DraftProducer, DraftReviewer, LoopController};
pub use outcome::LoopOutcome;
pub use state::{StateDelta, WorkflowState};
