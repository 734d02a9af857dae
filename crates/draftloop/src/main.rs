mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use draftloop_core::{
    DraftProducer, DraftReviewer, LoopContext, LoopController, LoopOutcome, LoopRunner,
};
use draftloop_llm::{create_generator, ProviderType, TextGenerator};
use draftloop_logging::{init_tracing, LogFormat, Logger, TranscriptWriter};

use crate::config::{Overrides, ProjectConfig, RunSettings};

#[derive(Parser, Debug)]
#[command(
    name = "draftloop",
    about = "Writer/editor revision loop for short-form drafts",
    version,
    author
)]
struct Cli {
    /// Topic to write about (or reads from topic.md if not provided)
    #[arg(short, long)]
    topic: Option<String>,

    /// Path to topic file (default: ./topic.md)
    #[arg(long, default_value = "topic.md")]
    topic_file: PathBuf,

    /// Start from this draft instead of writing one from the topic
    #[arg(long)]
    draft: Option<String>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Generation provider
    #[arg(long, value_enum)]
    provider: Option<ProviderChoice>,

    /// Model for both writer and editor
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature for both writer and editor
    #[arg(long)]
    temperature: Option<f32>,

    /// Chat completions endpoint override
    #[arg(long)]
    base_url: Option<String>,

    /// Environment variable holding the API key
    #[arg(long)]
    api_key_env: Option<String>,

    /// Stop once more than this many reviews have passed without approval
    #[arg(long)]
    revision_threshold: Option<usize>,

    /// Maximum draft length the editor enforces
    #[arg(long)]
    char_limit: Option<usize>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", env = "DRAFTLOOP_LOG")]
    log_level: String,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Do not write a run transcript
    #[arg(long)]
    no_transcript: bool,

    /// Dry run: show what would happen without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderChoice {
    Openai,
    Ollama,
}

impl From<ProviderChoice> for ProviderType {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Openai => ProviderType::OpenAi,
            ProviderChoice::Ollama => ProviderType::Ollama,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider.map(Into::into),
            model: self.model.clone(),
            temperature: self.temperature,
            base_url: self.base_url.clone(),
            api_key_env: self.api_key_env.clone(),
            revision_threshold: self.revision_threshold,
            char_limit: self.char_limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let topic = get_topic(&cli, &working_dir)?;

    let project_config = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    let settings = RunSettings::resolve(&cli.overrides(), &project_config)?;

    if cli.dry_run {
        print_dry_run(&topic, &working_dir, &settings);
        return Ok(());
    }

    // One generator, shared by both nodes
    let generator: Arc<dyn TextGenerator> = Arc::from(
        create_generator(
            settings.provider,
            &settings.api_key_env,
            settings.base_url.as_deref(),
        )
        .context("Failed to create text generator")?,
    );

    let producer = DraftProducer::new(generator.clone(), settings.writer.clone());
    let reviewer =
        DraftReviewer::new(generator, settings.editor.clone()).with_char_limit(settings.char_limit);
    let controller = LoopController::new(settings.revision_threshold);

    let logger = Arc::new(Logger::new(log_format));
    let mut runner = LoopRunner::new(producer, reviewer, controller, logger);

    if !cli.no_transcript {
        match TranscriptWriter::new(&topic) {
            Ok(transcript) => {
                tracing::debug!(path = %transcript.path().display(), "Writing run transcript");
                runner = runner.with_transcript(transcript);
            }
            Err(e) => tracing::warn!(error = %e, "Run transcript disabled"),
        }
    }

    // Ctrl+C cancels the in-flight generation call
    let cancel = runner.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Cancelling current generation...");
        cancel.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut context = LoopContext::new(topic);
    if let Some(draft) = cli.draft.clone() {
        context = context.with_initial_draft(draft);
    }

    let outcome = match runner.run(context).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if cli.json_output {
                let json = serde_json::json!({ "status": "failed", "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                eprintln!();
                eprintln!("=== FAILED ===");
                eprintln!("{}", e);
            }
            std::process::exit(2);
        }
    };

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn get_topic(cli: &Cli, working_dir: &Path) -> Result<String> {
    let topic = if let Some(ref topic) = cli.topic {
        topic.clone()
    } else {
        let topic_path = if cli.topic_file.is_absolute() {
            cli.topic_file.clone()
        } else {
            working_dir.join(&cli.topic_file)
        };

        if !topic_path.exists() {
            anyhow::bail!(
                "No topic provided. Use --topic or create a {} file",
                cli.topic_file.display()
            );
        }
        let content = std::fs::read_to_string(&topic_path).context("Failed to read topic file")?;
        content.trim().to_string()
    };

    if topic.trim().is_empty() {
        anyhow::bail!("Topic is empty. Use --topic or write one into the topic file");
    }
    Ok(topic)
}

fn print_dry_run(topic: &str, working_dir: &Path, settings: &RunSettings) {
    println!("=== Dry Run ===");
    let preview: String = topic.chars().take(100).collect();
    if preview.len() < topic.len() {
        println!("Topic: {}...", preview);
    } else {
        println!("Topic: {}", topic);
    }
    println!("Working dir: {}", working_dir.display());
    println!("Provider: {}", settings.provider);
    println!(
        "Writer: {} (temperature {})",
        settings.writer.model, settings.writer.temperature
    );
    println!(
        "Editor: {} (temperature {})",
        settings.editor.model, settings.editor.temperature
    );
    println!(
        "Endpoint: {}",
        settings
            .base_url
            .as_deref()
            .unwrap_or(settings.provider.default_endpoint())
    );
    println!("API key env: {}", settings.api_key_env);
    println!(
        "Stops after: {} unapproved review(s)",
        settings.revision_threshold + 1
    );
    println!("Char limit: {}", settings.char_limit);
}

fn print_outcome(outcome: &LoopOutcome) {
    eprintln!();
    match outcome {
        LoopOutcome::Approved { revisions, .. } => {
            eprintln!("=== APPROVED ===");
            eprintln!("Reviews: {}", revisions);
        }
        LoopOutcome::RevisionLimitReached { revisions, .. } => {
            eprintln!("=== NOT APPROVED ===");
            eprintln!("Stopped after {} review(s)", revisions);
            eprintln!("Last critique: {}", outcome.critique());
        }
        LoopOutcome::UserInterrupted { revisions, .. } => {
            eprintln!("=== INTERRUPTED ===");
            eprintln!("User stopped after {} review(s)", revisions);
        }
    }
    eprintln!("Duration: {:.1}s", outcome.total_duration_secs());
    eprintln!();

    // Final draft goes to stdout so it can be piped
    println!("{}", outcome.draft());
}
