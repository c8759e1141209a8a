//! Autonomous moderator: a model-driven discussion loop.
//!
//! Each round the moderator describes the current state to the model, decodes
//! the reply into a [`ModeratorDecision`] and executes it by having one member
//! speak. The loop is strictly sequential since every decision depends on the
//! ledger produced by the previous round.
//!
//! ```text
//! Thinking ──decision──▶ [ends?] ──yes──▶ Ended
//!    ▲                      │ no
//!    │                      ▼
//!    └──── round += 1 ◀── Executing
//!
//! round == max_rounds ──▶ Ended
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::actor::Actor;
use super::decision::{DecisionDecoder, ModeratorDecision};
use super::error::{DialogueError, DialogueResult};
use super::guardrails::{LoopGuard, StopReason};
use super::ledger::TurnLedger;
use super::prompts;
use super::state::{
    Participant, Phase, SessionLifecycle, SessionStatus, Task, TaskType, UtteranceRecord,
};
use crate::llm::{ChatMessage, LanguageModel};
use crate::persona::{ActorId, PersonaProvider};
use crate::transcript::{decision_logged, deliver_logged, NullSink, TranscriptSink};

pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Trailing history entries shown to the moderator.
const STATE_HISTORY_WINDOW: usize = 5;
/// Characters of each shown entry before it is cut.
const STATE_CONTENT_LIMIT: usize = 100;

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

/// One discussion member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub id: ActorId,
    #[serde(default)]
    pub stance: String,
}

impl MemberSpec {
    pub fn new(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            stance: String::new(),
        }
    }

    pub fn with_stance(mut self, stance: impl Into<String>) -> Self {
        self.stance = stance.into();
        self
    }
}

/// Configuration for one moderated discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionConfig {
    pub topic: String,
    pub members: Vec<MemberSpec>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl DiscussionConfig {
    pub fn new(topic: impl Into<String>, members: Vec<MemberSpec>) -> Self {
        Self {
            topic: topic.into(),
            members,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn validate(&self, personas: &dyn PersonaProvider) -> DialogueResult<()> {
        if self.topic.trim().is_empty() {
            return Err(DialogueError::InvalidConfig("topic is empty".into()));
        }
        if self.members.is_empty() {
            return Err(DialogueError::InvalidConfig(
                "discussion has no members".into(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(DialogueError::InvalidConfig(
                "max_rounds must be at least 1".into(),
            ));
        }

        // Decisions name members case-insensitively, so ids must be unique
        // under that comparison.
        let mut seen = HashSet::new();
        for member in &self.members {
            if !seen.insert(member.id.as_str().to_ascii_lowercase()) {
                return Err(DialogueError::InvalidConfig(format!(
                    "'{}' appears more than once",
                    member.id
                )));
            }
            if personas.resolve(&member.id).is_none() {
                return Err(DialogueError::UnknownPersona(member.id.clone()));
            }
        }
        Ok(())
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeratorState {
    Thinking,
    Executing,
    Ended,
}

/// Result of a finished discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionOutcome {
    pub session_id: String,
    pub topic: String,
    pub records: Vec<UtteranceRecord>,
    pub rounds: u32,
    pub stop_reason: StopReason,
}

impl DiscussionOutcome {
    pub fn summary_line(&self) -> String {
        format!(
            "[DISCUSSION] {} rounds | stop={} | session={}",
            self.rounds, self.stop_reason, self.session_id
        )
    }
}

pub struct Moderator {
    members: Vec<Participant>,
    model: Arc<dyn LanguageModel>,
    actor: Actor,
    ledger: TurnLedger,
    lifecycle: SessionLifecycle,
    guard: LoopGuard,
    round: u32,
    state: ModeratorState,
    sink: Arc<dyn TranscriptSink>,
    cancel: CancellationToken,
}

impl Moderator {
    pub fn new(
        config: DiscussionConfig,
        model: Arc<dyn LanguageModel>,
        personas: &dyn PersonaProvider,
    ) -> DialogueResult<Self> {
        config.validate(personas)?;

        let members = config
            .members
            .iter()
            .map(|spec| {
                personas
                    .resolve(&spec.id)
                    .map(|persona| Participant::new(spec.id.clone(), persona, spec.stance.clone()))
                    .ok_or_else(|| DialogueError::UnknownPersona(spec.id.clone()))
            })
            .collect::<DialogueResult<Vec<_>>>()?;

        Ok(Self {
            members,
            actor: Actor::new(model.clone()),
            model,
            ledger: TurnLedger::new(config.topic),
            lifecycle: SessionLifecycle::new(),
            guard: LoopGuard::new(config.max_rounds),
            round: 0,
            state: ModeratorState::Thinking,
            sink: Arc::new(NullSink),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.lifecycle.id
    }

    pub fn status(&self) -> SessionStatus {
        self.lifecycle.status
    }

    /// Number of executed rounds.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn state(&self) -> ModeratorState {
        self.state
    }

    pub fn ledger(&self) -> &TurnLedger {
        &self.ledger
    }

    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    /// Ask the model what should happen next.
    pub async fn think(&mut self) -> DialogueResult<ModeratorDecision> {
        self.ensure_not_cancelled()?;
        self.state = ModeratorState::Thinking;

        let roster: Vec<(&ActorId, &str)> = self
            .members
            .iter()
            .map(|p| (&p.id, p.display_name()))
            .collect();
        let messages = vec![
            ChatMessage::system(prompts::moderator_preamble(&roster)),
            ChatMessage::user(self.state_description()),
        ];

        let round = self.round;
        let reply = self
            .model
            .invoke(&messages, None)
            .await
            .map_err(|source| DialogueError::Moderator { round, source })?;

        let decision = DecisionDecoder::new(self.ledger.phase()).decode(&reply.content);
        debug!(
            round,
            action = %decision.action,
            speaker = ?decision.speaker,
            target = ?decision.target,
            phase = %decision.phase,
            should_end = decision.should_end,
            "Moderator decided"
        );
        Ok(decision)
    }

    /// Carry out a decision. Returns the produced record, or `None` when the
    /// decision ends the discussion.
    pub async fn execute(
        &mut self,
        decision: &ModeratorDecision,
    ) -> DialogueResult<Option<UtteranceRecord>> {
        let Some(task_type) = decision.action.task_type() else {
            return Ok(None);
        };
        if decision.should_end {
            return Ok(None);
        }
        self.ensure_not_cancelled()?;
        self.state = ModeratorState::Executing;

        self.ledger.set_phase(decision.phase);

        let speaker = self
            .member(decision.speaker.as_deref().unwrap_or_default())
            .cloned()
            .ok_or_else(|| {
                DialogueError::MemberNotFound(decision.speaker.clone().unwrap_or_default())
            })?;
        let target = match decision.target.as_deref() {
            Some(code) => Some(
                self.member(code)
                    .cloned()
                    .ok_or_else(|| DialogueError::MemberNotFound(code.to_string()))?,
            ),
            None => None,
        };

        let mut task = Task::new(task_type, decision.instruction.clone());
        if let (TaskType::Question | TaskType::Answer, Some(target)) = (task_type, &target) {
            task = task.aimed_at(target.display_name());
        }

        let phase = self.ledger.phase();
        let turn = self.ledger.len();
        let content = self
            .actor
            .speak(&speaker, &self.ledger, &task)
            .await
            .map_err(|source| DialogueError::Turn {
                phase,
                turn,
                speaker: speaker.id.clone(),
                task: task_type,
                source,
            })?;

        let record = UtteranceRecord::new(&speaker, content, phase, task_type)
            .with_target(target.map(|t| t.id));
        let idx = self.ledger.append(record);
        deliver_logged(self.sink.as_ref(), idx, &self.ledger.history()[idx]);
        self.round += 1;
        self.state = ModeratorState::Thinking;

        Ok(Some(self.ledger.history()[idx].clone()))
    }

    /// Think and execute until a terminal condition holds.
    pub async fn run(&mut self) -> DialogueResult<DiscussionOutcome> {
        self.lifecycle
            .transition(SessionStatus::Running, "discussion started")?;
        info!(
            session_id = %self.lifecycle.id,
            topic = self.ledger.topic(),
            members = self.members.len(),
            max_rounds = self.guard.max_rounds(),
            "Discussion started"
        );

        let result = self.drive().await;
        self.state = ModeratorState::Ended;

        match result {
            Ok(stop_reason) => {
                self.lifecycle
                    .transition(SessionStatus::Completed, &stop_reason.to_string())?;
                info!(
                    session_id = %self.lifecycle.id,
                    rounds = self.round,
                    stop = %stop_reason,
                    "Discussion completed"
                );
                Ok(DiscussionOutcome {
                    session_id: self.lifecycle.id.clone(),
                    topic: self.ledger.topic().to_string(),
                    records: self.ledger.history().to_vec(),
                    rounds: self.round,
                    stop_reason,
                })
            }
            Err(err) => {
                let to = match err {
                    DialogueError::Cancelled { .. } => SessionStatus::Abandoned,
                    _ => SessionStatus::Failed,
                };
                self.lifecycle.transition(to, &err.to_string())?;
                warn!(
                    session_id = %self.lifecycle.id,
                    status = %to,
                    rounds = self.round,
                    error = %err,
                    "Discussion stopped early"
                );
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> DialogueResult<StopReason> {
        loop {
            if let Some(stop) = self.guard.before_round(self.round) {
                return Ok(stop);
            }
            let decision = self.think().await?;
            decision_logged(self.sink.as_ref(), &decision);
            if let Some(stop) = self.guard.on_decision(&decision) {
                return Ok(stop);
            }
            self.execute(&decision).await?;
        }
    }

    /// State summary handed to the model on each think step.
    pub fn state_description(&self) -> String {
        let mut out = format!(
            "## Topic\n{}\n\nCurrent phase: {}\nRounds: {} / {}\n\n## Recent turns\n",
            self.ledger.topic(),
            self.ledger.phase(),
            self.round,
            self.guard.max_rounds(),
        );

        let history = self.ledger.history();
        if history.is_empty() {
            out.push_str("Nobody has spoken yet.\n");
        } else {
            let start = history.len().saturating_sub(STATE_HISTORY_WINDOW);
            if start > 0 {
                out.push_str(&format!("... {start} earlier turns omitted ...\n"));
            }
            for record in &history[start..] {
                out.push_str(&format!(
                    "- [{}][{}] {}\n",
                    record.phase,
                    record.speaker_name,
                    truncate(&record.content, STATE_CONTENT_LIMIT)
                ));
            }
        }

        out.push_str("\n## Opening statements\n");
        for member in &self.members {
            if self.ledger.has_opened(&member.id) {
                out.push_str(&format!("✓ {} has given an opening\n", member.display_name()));
            } else {
                out.push_str(&format!("○ {} has not opened yet\n", member.display_name()));
            }
        }

        if self.ledger.phase() == Phase::Closing {
            out.push_str("\n## Closing statements\n");
            for member in &self.members {
                if self.ledger.has_closed(&member.id) {
                    out.push_str(&format!("✓ {} has given a summary\n", member.display_name()));
                } else {
                    out.push_str(&format!("○ {} has not summarised yet\n", member.display_name()));
                }
            }
        }

        out.push_str("\nBased on the above, decide what should happen next.");
        out
    }

    fn member(&self, code: &str) -> Option<&Participant> {
        self.members.iter().find(|p| p.id.matches(code))
    }

    fn ensure_not_cancelled(&self) -> DialogueResult<()> {
        if self.cancel.is_cancelled() {
            return Err(DialogueError::Cancelled {
                completed_turns: self.ledger.len(),
            });
        }
        Ok(())
    }
}

/// Cut `text` to `limit` characters, marking the cut.
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}
