//! Dialogue data model: phases, tasks, participants, utterance records and
//! the session lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persona::{ActorId, Persona};

/// Phase of a debate or discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Questioning,
    FreeDebate,
    Closing,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Questioning => "questioning",
            Self::FreeDebate => "free_debate",
            Self::Closing => "closing",
        }
    }

    /// Parse a wire name, ignoring case and surrounding whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "opening" => Some(Self::Opening),
            "questioning" => Some(Self::Questioning),
            "free_debate" => Some(Self::FreeDebate),
            "closing" => Some(Self::Closing),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of turn an actor is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Opening,
    Question,
    Answer,
    Rebuttal,
    FreeDebate,
    Closing,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Question => write!(f, "question"),
            Self::Answer => write!(f, "answer"),
            Self::Rebuttal => write!(f, "rebuttal"),
            Self::FreeDebate => write!(f, "free_debate"),
            Self::Closing => write!(f, "closing"),
        }
    }
}

/// The instruction given to an actor for one turn. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub task_type: TaskType,
    pub instruction: String,
    /// Display name of the participant the turn is aimed at, if any.
    pub target_name: Option<String>,
}

impl Task {
    pub fn new(task_type: TaskType, instruction: impl Into<String>) -> Self {
        Self {
            task_type,
            instruction: instruction.into(),
            target_name: None,
        }
    }

    pub fn aimed_at(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = Some(target_name.into());
        self
    }
}

/// Side of a scripted debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pro,
    Con,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pro => write!(f, "pro"),
            Self::Con => write!(f, "con"),
        }
    }
}

/// Runtime binding of an identity to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ActorId,
    pub persona: Persona,
    /// Free-text position. Empty means "speak from your own perspective".
    pub stance: String,
    /// The stance was imposed rather than naturally held.
    pub forced: bool,
}

impl Participant {
    pub fn new(id: ActorId, persona: Persona, stance: impl Into<String>) -> Self {
        Self {
            id,
            persona,
            stance: stance.into(),
            forced: false,
        }
    }

    pub fn forced(mut self, stance: impl Into<String>) -> Self {
        self.stance = stance.into();
        self.forced = true;
        self
    }

    pub fn display_name(&self) -> &str {
        &self.persona.display_name
    }
}

/// One utterance in the global history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceRecord {
    pub speaker: ActorId,
    pub speaker_name: String,
    pub content: String,
    pub phase: Phase,
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ActorId>,
    pub recorded_at: DateTime<Utc>,
}

impl UtteranceRecord {
    pub fn new(
        speaker: &Participant,
        content: impl Into<String>,
        phase: Phase,
        task_type: TaskType,
    ) -> Self {
        Self {
            speaker: speaker.id.clone(),
            speaker_name: speaker.display_name().to_string(),
            content: content.into(),
            phase,
            task_type,
            target: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: Option<ActorId>) -> Self {
        self.target = target;
        self
    }
}

/// Lifecycle status of one orchestration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Constructed, not started.
    Pending,
    /// Turns are being produced.
    Running,
    /// Finished normally.
    Completed,
    /// Aborted by an error. Records produced so far are kept.
    Failed,
    /// Cancelled by the caller.
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned)
    }

    pub fn valid_transitions(self) -> &'static [SessionStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Abandoned],
            Self::Running => &[Self::Completed, Self::Failed, Self::Abandoned],
            Self::Completed | Self::Failed | Self::Abandoned => &[],
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// A status transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid status transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} → {to}: {reason}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub reason: String,
}

/// Tracks the status of one session and how it got there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLifecycle {
    pub id: String,
    pub status: SessionStatus,
    pub transitions: Vec<StatusTransition>,
    pub created_at: DateTime<Utc>,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: SessionStatus::Pending,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, to: SessionStatus, reason: &str) -> Result<(), TransitionError> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.status,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.status.valid_transitions()
                ),
            });
        }

        self.transitions.push(StatusTransition {
            from: self.status,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.status = to;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
