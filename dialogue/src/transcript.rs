//! Transcript sink collaborator.
//!
//! Orchestrators hand every appended record to a [`TranscriptSink`] right
//! after the append, in history order. A sink failure is logged and the
//! session carries on.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::debate::decision::ModeratorDecision;
use crate::debate::state::{Phase, TaskType, UtteranceRecord};

/// One delivered utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry<'a> {
    /// Zero-based position in the session history.
    pub turn: usize,
    pub speaker_name: &'a str,
    pub content: &'a str,
    pub phase: Phase,
    pub task_type: TaskType,
}

impl<'a> TranscriptEntry<'a> {
    pub fn from_record(turn: usize, record: &'a UtteranceRecord) -> Self {
        Self {
            turn,
            speaker_name: &record.speaker_name,
            content: &record.content,
            phase: record.phase,
            task_type: record.task_type,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transcript I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transcript encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub trait TranscriptSink: Send + Sync {
    fn deliver(&self, entry: &TranscriptEntry<'_>) -> Result<(), SinkError>;

    /// Called with each moderator decision before it is acted on.
    fn decision(&self, _decision: &ModeratorDecision) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TranscriptSink for NullSink {
    fn deliver(&self, _entry: &TranscriptEntry<'_>) -> Result<(), SinkError> {
        Ok(())
    }
}

pub(crate) fn deliver_logged(sink: &dyn TranscriptSink, turn: usize, record: &UtteranceRecord) {
    let entry = TranscriptEntry::from_record(turn, record);
    if let Err(e) = sink.deliver(&entry) {
        warn!(turn, speaker = %record.speaker, error = %e, "Transcript sink rejected entry");
    }
}

pub(crate) fn decision_logged(sink: &dyn TranscriptSink, decision: &ModeratorDecision) {
    if let Err(e) = sink.decision(decision) {
        warn!(action = %decision.action, error = %e, "Transcript sink rejected decision");
    }
}
