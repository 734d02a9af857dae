use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use draftloop_critic::{Route, Termination};
use draftloop_llm::GenerationError;
use draftloop_logging::{LogEvent, Logger, NodeRole, RunHeader, TranscriptWriter};

use crate::context::RevisionRecord;
use crate::error::LoopError;
use crate::nodes::{DraftProducer, DraftReviewer, LoopController};
use crate::outcome::LoopOutcome;
use crate::state::StateDelta;
use crate::LoopContext;

/// Result of one guarded node call; `None` means the run was cancelled
type NodeResult = Option<(Result<StateDelta, GenerationError>, Duration)>;

/// Drives writer → editor → controller until the controller stops the loop
pub struct LoopRunner {
    producer: DraftProducer,
    reviewer: DraftReviewer,
    controller: LoopController,
    logger: Arc<Logger>,
    transcript: Option<TranscriptWriter>,
    cancel: CancellationToken,
}

impl LoopRunner {
    pub fn new(
        producer: DraftProducer,
        reviewer: DraftReviewer,
        controller: LoopController,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            producer,
            reviewer,
            controller,
            logger,
            transcript: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Record the run as JSONL alongside the console log
    pub fn with_transcript(mut self, transcript: TranscriptWriter) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Get a token that cancels the run, including an in-flight generation call
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the loop until approval, the revision threshold, or cancellation.
    ///
    /// Generation errors abort the run and are returned unchanged inside
    /// [`LoopError::Generation`].
    pub async fn run(&self, mut context: LoopContext) -> Result<LoopOutcome, LoopError> {
        self.logger.log(&LogEvent::LoopStarted {
            run_id: context.run_id.to_string(),
            topic: context.topic.clone(),
            writer_model: self.producer.config().model.clone(),
            editor_model: self.reviewer.config().model.clone(),
            revision_threshold: self.controller.revision_threshold(),
        });

        if let Some(ref transcript) = self.transcript {
            let run_id = context.run_id.to_string();
            transcript.write_start(RunHeader {
                run_id: &run_id,
                topic: &context.topic,
                writer_model: &self.producer.config().model,
                editor_model: &self.reviewer.config().model,
                revision_threshold: self.controller.revision_threshold(),
                char_limit: self.reviewer.char_limit(),
            });
        }

        loop {
            match self.run_iteration(&mut context).await {
                Ok(Some(outcome)) => {
                    self.finish_transcript(&outcome);
                    return Ok(outcome);
                }
                Ok(None) => context.increment_iteration(),
                Err(e) => {
                    if let Some(ref transcript) = self.transcript {
                        transcript.write_end(
                            "failed",
                            context.state.revision_count,
                            &context.state.draft,
                            context.total_duration().as_secs_f64(),
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Run one writer/editor pass.
    /// Returns Some(outcome) if the loop should terminate, None to continue
    async fn run_iteration(
        &self,
        context: &mut LoopContext,
    ) -> Result<Option<LoopOutcome>, LoopError> {
        let iteration = context.iteration;

        self.logger.log(&LogEvent::WriterStarted {
            iteration,
            revising: context.state.has_critique(),
        });

        let Some((delta, writer_duration)) = self
            .guarded(self.producer.produce(&context.state))
            .await
        else {
            return Ok(Some(self.interrupted(context, Some(NodeRole::Writer))));
        };
        let delta = self.check(delta, iteration, NodeRole::Writer)?;
        context.apply(delta);

        self.logger.log(&LogEvent::WriterCompleted {
            iteration,
            draft: context.state.draft.clone(),
            duration_secs: writer_duration.as_secs_f64(),
        });

        if self.cancel.is_cancelled() {
            return Ok(Some(self.interrupted(context, None)));
        }

        self.logger.log(&LogEvent::EditorStarted { iteration });

        let Some((delta, editor_duration)) = self
            .guarded(self.reviewer.review(&context.state))
            .await
        else {
            return Ok(Some(self.interrupted(context, Some(NodeRole::Editor))));
        };
        let delta = self.check(delta, iteration, NodeRole::Editor)?;
        context.apply(delta);

        let route = self.controller.route(&context.state);

        self.logger.log(&LogEvent::EditorCompleted {
            iteration,
            revision_count: context.state.revision_count,
            critique: context.state.critique.clone(),
            decision: route.short_description(),
            duration_secs: editor_duration.as_secs_f64(),
        });

        let record = RevisionRecord {
            revision: context.state.revision_count,
            draft: context.state.draft.clone(),
            critique: context.state.critique.clone(),
            route: route.short_description(),
            writer_duration_secs: writer_duration.as_secs_f64(),
            editor_duration_secs: editor_duration.as_secs_f64(),
            timestamp: Utc::now(),
        };
        if let Some(ref transcript) = self.transcript {
            transcript.write_revision(
                record.revision,
                &record.draft,
                &record.critique,
                &record.route,
                record.writer_duration_secs,
                record.editor_duration_secs,
                record.timestamp,
            );
        }
        context.push_record(record);

        match route {
            Route::Continue => {
                info!(
                    revision = context.state.revision_count,
                    "Draft sent back for revision"
                );
                Ok(None)
            }
            Route::Done(Termination::Approved) => {
                let duration = context.total_duration();
                self.logger.log(&LogEvent::LoopCompleted {
                    revisions: context.state.revision_count,
                    duration_secs: duration.as_secs_f64(),
                });
                Ok(Some(LoopOutcome::approved(
                    context.state.clone(),
                    context.history.clone(),
                    duration,
                )))
            }
            Route::Done(Termination::RevisionLimit) => {
                self.logger.log(&LogEvent::RevisionLimitReached {
                    revisions: context.state.revision_count,
                });
                Ok(Some(LoopOutcome::revision_limit_reached(
                    context.state.clone(),
                    context.history.clone(),
                    context.total_duration(),
                )))
            }
        }
    }

    /// Await a node call unless the run is cancelled first
    async fn guarded<F>(&self, call: F) -> NodeResult
    where
        F: Future<Output = Result<StateDelta, GenerationError>>,
    {
        let start = Instant::now();
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                debug!("Generation call cancelled");
                None
            }
            result = call => Some((result, start.elapsed())),
        }
    }

    fn check(
        &self,
        result: Result<StateDelta, GenerationError>,
        iteration: usize,
        role: NodeRole,
    ) -> Result<StateDelta, LoopError> {
        result.map_err(|e| {
            warn!(error = %e, %role, "Generation failed");
            self.logger.log(&LogEvent::ErrorEncountered {
                iteration,
                role,
                error: e.to_string(),
            });
            LoopError::Generation(e)
        })
    }

    fn interrupted(&self, context: &LoopContext, role: Option<NodeRole>) -> LoopOutcome {
        info!("Loop interrupted");
        self.logger.log(&LogEvent::Interrupted {
            iteration: context.iteration,
            role,
        });
        LoopOutcome::interrupted(
            context.state.clone(),
            context.history.clone(),
            context.total_duration(),
        )
    }

    fn finish_transcript(&self, outcome: &LoopOutcome) {
        if let Some(ref transcript) = self.transcript {
            transcript.write_end(
                outcome.status(),
                outcome.revisions(),
                outcome.draft(),
                outcome.total_duration_secs(),
            );
        }
    }
}
