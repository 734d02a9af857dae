use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Each line type in a run transcript JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptLine {
    RunStart {
        run_id: String,
        timestamp: DateTime<Utc>,
        topic: String,
        writer_model: String,
        editor_model: String,
        revision_threshold: usize,
        char_limit: usize,
    },
    Revision {
        revision: usize,
        draft: String,
        critique: String,
        route: String,
        writer_duration_secs: f64,
        editor_duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
    RunEnd {
        outcome: String,
        revisions: usize,
        final_draft: String,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Settings recorded in the `run_start` line.
#[derive(Debug, Clone, Copy)]
pub struct RunHeader<'a> {
    pub run_id: &'a str,
    pub topic: &'a str,
    pub writer_model: &'a str,
    pub editor_model: &'a str,
    pub revision_threshold: usize,
    pub char_limit: usize,
}

/// Appends a run's revisions as JSONL to a file in ~/.local/share/draftloop/runs/.
///
/// The file is created on the first write, so a run that never starts
/// leaves nothing behind.
pub struct TranscriptWriter {
    file: Mutex<Option<BufWriter<File>>>,
    path: PathBuf,
}

impl TranscriptWriter {
    /// Create a transcript in the default data directory.
    pub fn new(topic: &str) -> io::Result<Self> {
        Self::in_dir(&Self::runs_dir()?, topic)
    }

    /// Create a transcript in `dir`. The file name is the current UTC
    /// timestamp plus a short hash of the topic. Only the directory is
    /// created here.
    pub fn in_dir(dir: &Path, topic: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let now = Utc::now();
        let timestamp_str = now.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(topic.as_bytes());
        let hash = hex::encode(hasher.finalize());
        let short_hash = &hash[..6];

        let filename = format!("{}_{}.jsonl", timestamp_str, short_hash);

        Ok(Self {
            file: Mutex::new(None),
            path: dir.join(filename),
        })
    }

    /// Returns the path to the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_start(&self, header: RunHeader<'_>) {
        let line = TranscriptLine::RunStart {
            run_id: header.run_id.to_string(),
            timestamp: Utc::now(),
            topic: header.topic.to_string(),
            writer_model: header.writer_model.to_string(),
            editor_model: header.editor_model.to_string(),
            revision_threshold: header.revision_threshold,
            char_limit: header.char_limit,
        };
        self.write_line(&line);
    }

    /// Write a revision line. Takes plain fields so this crate stays
    /// independent of draftloop-core's record type.
    pub fn write_revision(
        &self,
        revision: usize,
        draft: &str,
        critique: &str,
        route: &str,
        writer_duration_secs: f64,
        editor_duration_secs: f64,
        timestamp: DateTime<Utc>,
    ) {
        let line = TranscriptLine::Revision {
            revision,
            draft: draft.to_string(),
            critique: critique.to_string(),
            route: route.to_string(),
            writer_duration_secs,
            editor_duration_secs,
            timestamp,
        };
        self.write_line(&line);
    }

    pub fn write_end(&self, outcome: &str, revisions: usize, final_draft: &str, duration_secs: f64) {
        let line = TranscriptLine::RunEnd {
            outcome: outcome.to_string(),
            revisions,
            final_draft: final_draft.to_string(),
            duration_secs,
            timestamp: Utc::now(),
        };
        self.write_line(&line);
    }

    fn write_line(&self, line: &TranscriptLine) {
        let Ok(json) = serde_json::to_string(line) else {
            return;
        };
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if guard.is_none() {
            match File::create(&self.path) {
                Ok(file) => *guard = Some(BufWriter::new(file)),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to create run transcript"
                    );
                    return;
                }
            }
        }
        if let Some(writer) = guard.as_mut() {
            let _ = writeln!(writer, "{}", json);
            let _ = writer.flush();
        }
    }

    fn runs_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("draftloop").join("runs"))
    }
}
