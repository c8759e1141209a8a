//! Transcript sinks: console output, an append-only JSONL file and fan-out.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dialogue::{ModeratorDecision, SinkError, TranscriptEntry, TranscriptSink};
use serde::Serialize;

/// Prints each utterance to stdout as `[phase] Name: content`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    pub show_decisions: bool,
}

impl ConsoleSink {
    pub fn new(show_decisions: bool) -> Self {
        Self { show_decisions }
    }
}

pub fn format_entry(entry: &TranscriptEntry<'_>) -> String {
    format!("[{}] {}: {}", entry.phase, entry.speaker_name, entry.content)
}

pub fn format_decision(decision: &ModeratorDecision) -> String {
    let mut line = format!("  (moderator: {}", decision.action);
    if let Some(speaker) = &decision.speaker {
        line.push_str(&format!(" -> {speaker}"));
    }
    if let Some(target) = &decision.target {
        line.push_str(&format!(" @ {target}"));
    }
    if !decision.reason.is_empty() {
        line.push_str(&format!("; {}", decision.reason));
    }
    line.push(')');
    line
}

impl TranscriptSink for ConsoleSink {
    fn deliver(&self, entry: &TranscriptEntry<'_>) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", format_entry(entry))?;
        Ok(())
    }

    fn decision(&self, decision: &ModeratorDecision) -> Result<(), SinkError> {
        if self.show_decisions {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", format_decision(decision))?;
        }
        Ok(())
    }
}

/// One JSONL line.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    Utterance {
        at: DateTime<Utc>,
        #[serde(flatten)]
        entry: &'a TranscriptEntry<'a>,
    },
    Decision {
        at: DateTime<Utc>,
        #[serde(flatten)]
        decision: &'a ModeratorDecision,
    },
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &Line<'_>) -> Result<(), SinkError> {
        let json = serde_json::to_string(line)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| SinkError::Other("transcript file lock poisoned".into()))?;
        writeln!(file, "{json}")?;
        Ok(())
    }
}

impl TranscriptSink for JsonlSink {
    fn deliver(&self, entry: &TranscriptEntry<'_>) -> Result<(), SinkError> {
        self.write_line(&Line::Utterance {
            at: Utc::now(),
            entry,
        })
    }

    fn decision(&self, decision: &ModeratorDecision) -> Result<(), SinkError> {
        self.write_line(&Line::Decision {
            at: Utc::now(),
            decision,
        })
    }
}

/// Forwards to every inner sink. All sinks see every call; the first
/// error is returned.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn TranscriptSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, sink: impl TranscriptSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn each(
        &self,
        mut f: impl FnMut(&dyn TranscriptSink) -> Result<(), SinkError>,
    ) -> Result<(), SinkError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = f(sink.as_ref()) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl TranscriptSink for FanoutSink {
    fn deliver(&self, entry: &TranscriptEntry<'_>) -> Result<(), SinkError> {
        self.each(|sink| sink.deliver(entry))
    }

    fn decision(&self, decision: &ModeratorDecision) -> Result<(), SinkError> {
        self.each(|sink| sink.decision(decision))
    }
}
