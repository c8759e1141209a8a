//! Dialogue orchestration core.
//!
//! Sequences turns among several language-model-backed actors, keeps an
//! append-only record of what was said and decides what each actor may see
//! before it speaks. The model, persona source and transcript sink are
//! collaborator traits; this crate does no network or file I/O.
//!
//! # Modes
//!
//! - Scripted debate: opening, cross-questioning and closing between a pro
//!   and a con side, in a fixed order.
//! - Moderated discussion: a moderator model chooses the next speaker and
//!   the kind of turn until it ends the discussion or the round cap is hit.

#![allow(clippy::uninlined_format_args)]

pub mod debate;
pub mod llm;
pub mod persona;
pub mod transcript;

pub use debate::{
    DebateConfig, DebateEngine, DebateOutcome, DialogueError, DialogueResult, DiscussionConfig,
    DiscussionOutcome, MemberSpec, Moderator, ModeratorDecision, Phase, SessionStatus, StopReason,
    TurnLedger, UtteranceRecord,
};
pub use llm::{ChatMessage, Completion, LanguageModel, LlmError, Role, ToolCall, ToolSpec};
pub use persona::{ActorId, Persona, PersonaProvider};
pub use transcript::{NullSink, SinkError, TranscriptEntry, TranscriptSink};
