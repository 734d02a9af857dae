use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use draftloop_core::{
    DraftProducer, DraftReviewer, LoopContext, LoopController, LoopError, LoopOutcome, LoopRunner,
};
use draftloop_critic::DraftPrompts;
use draftloop_llm::{ChatMessage, Generation, GenerationConfig, GenerationError, TextGenerator};
use draftloop_logging::{Logger, TranscriptWriter};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Writer,
    Editor,
}

type Responder = dyn Fn(Node, usize) -> Result<String, GenerationError> + Send + Sync;

/// Deterministic generator: answers from a closure keyed on which node called
/// and how many times that node has called before.
struct ScriptedGenerator {
    respond: Box<Responder>,
    calls: Mutex<Vec<(Node, Vec<ChatMessage>)>>,
}

impl ScriptedGenerator {
    fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(Node, usize) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Writer numbers its drafts; editor uses `editor` for every review
    fn with_editor(editor: &'static str) -> Arc<Self> {
        Self::new(move |node, n| match node {
            Node::Writer => Ok(format!("Draft number {}", n + 1)),
            Node::Editor => Ok(editor.to_string()),
        })
    }

    fn calls(&self, node: Node) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == node)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

fn node_of(messages: &[ChatMessage]) -> Node {
    if messages[0].content.starts_with("Review the following") {
        Node::Editor
    } else {
        Node::Writer
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _config: &GenerationConfig,
    ) -> Result<Generation, GenerationError> {
        let node = node_of(messages);
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|(n, _)| *n == node).count();
            calls.push((node, messages.to_vec()));
            previous
        };
        let content = (self.respond)(node, previous)?;
        Ok(Generation::new(content, None, Duration::from_millis(1)))
    }
}

/// Writer never returns; used to exercise cancellation mid-call
struct StalledGenerator;

#[async_trait]
impl TextGenerator for StalledGenerator {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _config: &GenerationConfig,
    ) -> Result<Generation, GenerationError> {
        std::future::pending::<Result<Generation, GenerationError>>().await
    }
}

fn runner(generator: Arc<dyn TextGenerator>, controller: LoopController) -> LoopRunner {
    let producer = DraftProducer::new(generator.clone(), GenerationConfig::default());
    let reviewer = DraftReviewer::new(generator, GenerationConfig::default());
    LoopRunner::new(producer, reviewer, controller, Arc::new(Logger::silent()))
}

#[tokio::test]
async fn never_approving_editor_stops_after_five_reviews() {
    let generator = ScriptedGenerator::with_editor("Too long, please shorten.");
    let runner = runner(generator.clone(), LoopController::default());

    let outcome = runner
        .run(LoopContext::new("AI is changing everything."))
        .await
        .unwrap();

    assert!(matches!(outcome, LoopOutcome::RevisionLimitReached { .. }));
    assert_eq!(outcome.revisions(), 5);
    assert_eq!(outcome.history().len(), 5);
    assert_eq!(outcome.draft(), "Draft number 5");
    assert!(!outcome.critique().to_lowercase().starts_with("yes"));
    assert_eq!(generator.calls(Node::Writer).len(), 5);
    assert_eq!(generator.calls(Node::Editor).len(), 5);
    assert_eq!(outcome.exit_code(), 1);

    let last = outcome.history().last().unwrap();
    assert_eq!(last.route, "STOPPED (revision limit)");
    assert!(outcome.history()[..4].iter().all(|r| r.route == "REVISE"));
}

#[tokio::test]
async fn approving_editor_stops_after_one_review_in_any_case() {
    for reply in ["yes", "YES", "Yes."] {
        let generator = ScriptedGenerator::with_editor(reply);
        let runner = runner(generator.clone(), LoopController::default());

        let outcome = runner.run(LoopContext::new("Rust 2024")).await.unwrap();

        assert!(outcome.is_approved(), "reply {:?} should approve", reply);
        assert_eq!(outcome.revisions(), 1);
        assert_eq!(outcome.draft(), "Draft number 1");
        assert_eq!(generator.calls(Node::Writer).len(), 1);
        assert_eq!(generator.calls(Node::Editor).len(), 1);
    }
}

#[tokio::test]
async fn yes_prefixed_feedback_is_treated_as_approval() {
    let generator = ScriptedGenerator::with_editor("Yes, but consider shortening it");
    let runner = runner(generator, LoopController::default());

    let outcome = runner.run(LoopContext::new("topic")).await.unwrap();

    assert!(outcome.is_approved());
    assert_eq!(outcome.critique(), "Yes, but consider shortening it");
}

#[tokio::test]
async fn first_pass_writes_new_tweet_then_revises_with_critique() {
    let generator = ScriptedGenerator::new(|node, n| match (node, n) {
        (Node::Writer, n) => Ok(format!("Draft number {}", n + 1)),
        (Node::Editor, 0) => Ok("Remove the hashtag.".to_string()),
        (Node::Editor, _) => Ok("YES".to_string()),
    });
    let runner = runner(generator.clone(), LoopController::default());

    let outcome = runner
        .run(LoopContext::new("AI is changing everything."))
        .await
        .unwrap();
    assert!(outcome.is_approved());
    assert_eq!(outcome.revisions(), 2);

    let writer_calls = generator.calls(Node::Writer);
    assert_eq!(writer_calls.len(), 2);

    let first = &writer_calls[0];
    assert_eq!(first[0], ChatMessage::system(DraftPrompts::write_instruction()));
    assert_eq!(first[1], ChatMessage::user("AI is changing everything."));

    let second = &writer_calls[1];
    assert_eq!(
        second[0],
        ChatMessage::system(DraftPrompts::update_instruction("Remove the hashtag."))
    );
    assert_eq!(second[1], ChatMessage::user("Draft number 1"));

    let editor_calls = generator.calls(Node::Editor);
    assert_eq!(editor_calls[0][1], ChatMessage::user("Draft number 1"));
    assert_eq!(editor_calls[1][1], ChatMessage::user("Draft number 2"));
}

#[tokio::test]
async fn editor_rules_use_configured_char_limit() {
    let generator = ScriptedGenerator::with_editor("YES");
    let producer = DraftProducer::new(generator.clone(), GenerationConfig::default());
    let reviewer =
        DraftReviewer::new(generator.clone(), GenerationConfig::default()).with_char_limit(140);
    let runner = LoopRunner::new(
        producer,
        reviewer,
        LoopController::default(),
        Arc::new(Logger::silent()),
    );

    runner.run(LoopContext::new("topic")).await.unwrap();

    let editor_calls = generator.calls(Node::Editor);
    assert!(editor_calls[0][0].content.contains("less than 140 characters"));
}

#[tokio::test]
async fn custom_threshold_changes_review_cap() {
    let generator = ScriptedGenerator::with_editor("No.");
    let runner = runner(generator.clone(), LoopController::new(1));

    let outcome = runner.run(LoopContext::new("topic")).await.unwrap();

    assert!(matches!(outcome, LoopOutcome::RevisionLimitReached { .. }));
    assert_eq!(outcome.revisions(), 2);
}

#[tokio::test]
async fn writer_failure_aborts_run_unchanged() {
    let generator = ScriptedGenerator::new(|node, _| match node {
        Node::Writer => Err(GenerationError::Http {
            status: 429,
            body: "rate limited".to_string(),
        }),
        Node::Editor => Ok("YES".to_string()),
    });
    let runner = runner(generator.clone(), LoopController::default());

    let result = runner.run(LoopContext::new("topic")).await;

    match result {
        Err(LoopError::Generation(GenerationError::Http { status, body })) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected generation error, got {:?}", other),
    }
    assert!(generator.calls(Node::Editor).is_empty());
}

#[tokio::test]
async fn editor_failure_on_later_pass_aborts_run() {
    let generator = ScriptedGenerator::new(|node, n| match (node, n) {
        (Node::Writer, _) => Ok("draft".to_string()),
        (Node::Editor, 0) => Ok("Make it punchier.".to_string()),
        (Node::Editor, _) => Err(GenerationError::EmptyResponse),
    });
    let runner = runner(generator.clone(), LoopController::default());

    let result = runner.run(LoopContext::new("topic")).await;

    assert!(matches!(
        result,
        Err(LoopError::Generation(GenerationError::EmptyResponse))
    ));
    assert_eq!(generator.calls(Node::Writer).len(), 2);
}

#[tokio::test]
async fn cancelling_during_generation_interrupts_run() {
    let runner = runner(Arc::new(StalledGenerator), LoopController::default());
    let token = runner.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run(LoopContext::new("stalled topic")),
    )
    .await
    .expect("run should stop once cancelled")
    .unwrap();

    assert!(matches!(outcome, LoopOutcome::UserInterrupted { .. }));
    assert_eq!(outcome.revisions(), 0);
    assert_eq!(outcome.draft(), "stalled topic");
    assert_eq!(outcome.exit_code(), 130);
}

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() {
    let generator = ScriptedGenerator::with_editor("YES");
    let runner = runner(generator.clone(), LoopController::default());
    runner.cancellation_token().cancel();

    let outcome = runner.run(LoopContext::new("topic")).await.unwrap();

    assert!(matches!(outcome, LoopOutcome::UserInterrupted { .. }));
    assert!(generator.calls(Node::Writer).is_empty());
}

#[tokio::test]
async fn empty_initial_draft_still_runs_to_review_cap() {
    let generator = ScriptedGenerator::with_editor("Say something.");
    let runner = runner(generator.clone(), LoopController::default());

    let outcome = runner.run(LoopContext::new("")).await.unwrap();

    assert!(matches!(outcome, LoopOutcome::RevisionLimitReached { .. }));
    assert_eq!(outcome.revisions(), 5);
    let writer_calls = generator.calls(Node::Writer);
    assert_eq!(writer_calls[0][1], ChatMessage::user(""));
}

#[tokio::test]
async fn initial_draft_is_sent_instead_of_topic() {
    let generator = ScriptedGenerator::with_editor("YES");
    let runner = runner(generator.clone(), LoopController::default());

    let context = LoopContext::new("coffee").with_initial_draft("Coffee is great #coffee");
    runner.run(context).await.unwrap();

    let writer_calls = generator.calls(Node::Writer);
    assert_eq!(writer_calls[0][1], ChatMessage::user("Coffee is great #coffee"));
}

#[tokio::test]
async fn transcript_records_each_revision() {
    let dir = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new(|node, n| match (node, n) {
        (Node::Writer, n) => Ok(format!("Draft number {}", n + 1)),
        (Node::Editor, 0) => Ok("Too vague.".to_string()),
        (Node::Editor, _) => Ok("YES".to_string()),
    });
    let transcript = TranscriptWriter::in_dir(dir.path(), "transcripts").unwrap();
    let path = transcript.path().to_path_buf();
    let runner = runner(generator, LoopController::default()).with_transcript(transcript);

    let outcome = runner.run(LoopContext::new("transcripts")).await.unwrap();
    assert!(outcome.is_approved());

    let lines: Vec<serde_json::Value> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["type"], "run_start");
    assert_eq!(lines[0]["topic"], "transcripts");
    assert_eq!(lines[1]["type"], "revision");
    assert_eq!(lines[1]["critique"], "Too vague.");
    assert_eq!(lines[1]["route"], "REVISE");
    assert_eq!(lines[2]["route"], "APPROVED");
    assert_eq!(lines[3]["type"], "run_end");
    assert_eq!(lines[3]["outcome"], "approved");
    assert_eq!(lines[3]["revisions"], 2);
    assert_eq!(lines[3]["final_draft"], "Draft number 2");
}

#[tokio::test]
async fn failed_run_closes_transcript() {
    let dir = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new(|_, _| Err(GenerationError::EmptyResponse));
    let transcript = TranscriptWriter::in_dir(dir.path(), "fail").unwrap();
    let path = transcript.path().to_path_buf();
    let runner = runner(generator, LoopController::default()).with_transcript(transcript);

    assert!(runner.run(LoopContext::new("fail")).await.is_err());

    let content = fs::read_to_string(&path).unwrap();
    let last: serde_json::Value = serde_json::from_str(content.lines().last().unwrap()).unwrap();
    assert_eq!(last["outcome"], "failed");
    assert_eq!(last["revisions"], 0);
}
