use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Role of the node producing a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Writer,
    Editor,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Writer => write!(f, "writer"),
            NodeRole::Editor => write!(f, "editor"),
        }
    }
}

/// Structured log events for the writer/editor loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        run_id: String,
        topic: String,
        writer_model: String,
        editor_model: String,
        revision_threshold: usize,
    },
    WriterStarted {
        iteration: usize,
        revising: bool,
    },
    WriterCompleted {
        iteration: usize,
        draft: String,
        duration_secs: f64,
    },
    EditorStarted {
        iteration: usize,
    },
    EditorCompleted {
        iteration: usize,
        revision_count: usize,
        critique: String,
        decision: String,
        duration_secs: f64,
    },
    LoopCompleted {
        revisions: usize,
        duration_secs: f64,
    },
    RevisionLimitReached {
        revisions: usize,
    },
    Interrupted {
        iteration: usize,
        role: Option<NodeRole>,
    },
    ErrorEncountered {
        iteration: usize,
        role: NodeRole,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for draftloop events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// A logger that writes nothing; used by tests and library callers
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Json,
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::LoopStarted {
                topic,
                writer_model,
                editor_model,
                revision_threshold,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "draftloop".bold().bright_white(),
                    " ".repeat(58) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Topic:".dimmed(),
                    Self::truncate_with_padding(topic, 60, 67).dimmed()
                );
                let models = format!(
                    "writer={} editor={} threshold={}",
                    writer_model, editor_model, revision_threshold
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Run:".dimmed(),
                    Self::truncate_with_padding(&models, 62, 69).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::WriterStarted {
                iteration,
                revising,
            } => {
                let iter_text = format!("─ Draft {} ", iteration + 1);
                let padding = "─".repeat(67 - iter_text.chars().count());
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);

                let label = if *revising { "WRITER (revise)" } else { "WRITER" };
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    label.bright_cyan().bold()
                );
            }
            LogEvent::WriterCompleted {
                draft,
                duration_secs,
                ..
            } => {
                for line in draft.lines() {
                    let _ = writeln!(stderr, "{} {}", "    │".dimmed(), line);
                }
                let _ = writeln!(
                    stderr,
                    "    {} Drafted {} chars ({:.1}s)",
                    "✓".bright_green(),
                    draft.chars().count(),
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::EditorStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "EDITOR".bright_magenta().bold()
                );
            }
            LogEvent::EditorCompleted {
                critique, decision, ..
            } => {
                for line in critique.lines() {
                    let _ = writeln!(stderr, "{} {}", "    │".dimmed(), line.dimmed());
                }
                let styled_decision = if decision.starts_with("APPROVED") {
                    format!("✓ Decision: {}", decision)
                        .bright_green()
                        .to_string()
                } else if decision.starts_with("STOPPED") {
                    format!("■ Decision: {}", decision)
                        .bright_yellow()
                        .to_string()
                } else {
                    format!("→ Decision: {}", decision)
                        .bright_yellow()
                        .to_string()
                };
                let _ = writeln!(stderr, "    {}", styled_decision);
                let _ = writeln!(stderr);

                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::LoopCompleted { .. } => {
                // Printed by the binary with the final outcome
            }
            LogEvent::RevisionLimitReached { revisions } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Revision limit reached after {} review(s)",
                    "⚠".bright_yellow(),
                    revisions
                );
            }
            LogEvent::Interrupted { iteration, role } => {
                let _ = writeln!(stderr);
                let during = role.map(|r| format!(" during {}", r)).unwrap_or_default();
                let _ = writeln!(
                    stderr,
                    "{} Interrupted in draft {}{}",
                    "■".bright_yellow(),
                    iteration + 1,
                    during
                );
            }
            LogEvent::ErrorEncountered {
                iteration,
                role,
                error,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} failed in draft {}: {}",
                    "✗".bright_red(),
                    role,
                    iteration + 1,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted { run_id, .. } => {
                format!("[{}] loop:start {}", timestamp, run_id)
            }
            LogEvent::WriterStarted { iteration, .. } => {
                format!("[{}] writer:start:{}", timestamp, iteration + 1)
            }
            LogEvent::WriterCompleted {
                iteration,
                draft,
                duration_secs,
            } => format!(
                "[{}] writer:done:{} {}c {:.1}s",
                timestamp,
                iteration + 1,
                draft.chars().count(),
                duration_secs
            ),
            LogEvent::EditorStarted { iteration } => {
                format!("[{}] editor:start:{}", timestamp, iteration + 1)
            }
            LogEvent::EditorCompleted {
                iteration,
                decision,
                ..
            } => format!("[{}] editor:done:{} {}", timestamp, iteration + 1, decision),
            LogEvent::LoopCompleted {
                revisions,
                duration_secs,
            } => format!(
                "[{}] loop:done:{} {:.1}s",
                timestamp, revisions, duration_secs
            ),
            LogEvent::RevisionLimitReached { revisions } => {
                format!("[{}] loop:limit:{}", timestamp, revisions)
            }
            LogEvent::Interrupted { iteration, .. } => {
                format!("[{}] loop:interrupted:{}", timestamp, iteration + 1)
            }
            LogEvent::ErrorEncountered {
                iteration,
                role,
                error,
            } => format!("[{}] error:{}:{}:{}", timestamp, role, iteration + 1, error),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
