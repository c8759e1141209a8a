//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use dialogue::debate::ModeratorDecision;
use dialogue::{
    ActorId, ChatMessage, Completion, LanguageModel, LlmError, Persona, SinkError, ToolSpec,
    TranscriptEntry, TranscriptSink,
};

/// Marker that opens every moderator system prompt.
pub const MODERATOR_MARKER: &str = "You are the moderator";

/// Personas keyed by lowercase id, display name is the id upper-cased.
pub fn personas(ids: &[&str]) -> HashMap<ActorId, Persona> {
    ids.iter()
        .map(|id| {
            (
                ActorId::new(*id),
                Persona::new(id.to_uppercase(), format!("You are {}.", id.to_uppercase())),
            )
        })
        .collect()
}

pub fn ids(raw: &[&str]) -> Vec<ActorId> {
    raw.iter().map(|s| ActorId::new(*s)).collect()
}

/// Mock model that records every call.
///
/// Actor calls get `"utterance {n}"` where `n` counts actor calls from 0.
/// Moderator calls pop the next scripted decision, falling back to
/// `repeat_decision` once the queue is empty.
#[derive(Default)]
pub struct MockModel {
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    tools_seen: Mutex<Vec<bool>>,
    decisions: Mutex<VecDeque<String>>,
    repeat_decision: Option<String>,
    /// Zero-based call index (all calls) that fails.
    fail_at: Option<usize>,
    /// Fail every moderator call.
    fail_moderator: bool,
    actor_calls: Mutex<usize>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..Self::default()
        }
    }

    pub fn with_decisions(decisions: &[&str]) -> Self {
        Self {
            decisions: Mutex::new(decisions.iter().map(|d| d.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn repeating(mut self, decision: &str) -> Self {
        self.repeat_decision = Some(decision.to_string());
        self
    }

    pub fn moderator_failing(mut self) -> Self {
        self.fail_moderator = true;
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn any_tools_passed(&self) -> bool {
        self.tools_seen.lock().unwrap().iter().any(|t| *t)
    }

    /// Actor calls only, in order.
    pub fn actor_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls()
            .into_iter()
            .filter(|m| !is_moderator_call(m))
            .collect()
    }
}

fn is_moderator_call(messages: &[ChatMessage]) -> bool {
    messages
        .first()
        .is_some_and(|m| m.content.starts_with(MODERATOR_MARKER))
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<Completion, LlmError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(messages.to_vec());
            calls.len() - 1
        };
        self.tools_seen.lock().unwrap().push(tools.is_some());

        if self.fail_at == Some(index) {
            return Err(LlmError::Status {
                status: 503,
                body: "mock outage".to_string(),
            });
        }

        if is_moderator_call(messages) {
            if self.fail_moderator {
                return Err(LlmError::Timeout);
            }
            let next = self.decisions.lock().unwrap().pop_front();
            let reply = next
                .or_else(|| self.repeat_decision.clone())
                .unwrap_or_default();
            return Ok(Completion::text(reply));
        }

        let mut n = self.actor_calls.lock().unwrap();
        let reply = format!("utterance {}", *n);
        *n += 1;
        Ok(Completion::text(reply))
    }
}

/// Sink that keeps what it was given.
#[derive(Default)]
pub struct RecordingSink {
    pub entries: Mutex<Vec<(usize, String, String)>>,
    pub decisions: Mutex<Vec<ModeratorDecision>>,
}

impl TranscriptSink for RecordingSink {
    fn deliver(&self, entry: &TranscriptEntry<'_>) -> Result<(), SinkError> {
        self.entries.lock().unwrap().push((
            entry.turn,
            entry.speaker_name.to_string(),
            entry.content.to_string(),
        ));
        Ok(())
    }

    fn decision(&self, decision: &ModeratorDecision) -> Result<(), SinkError> {
        self.decisions.lock().unwrap().push(decision.clone());
        Ok(())
    }
}

/// Sink that rejects everything.
pub struct BrokenSink;

impl TranscriptSink for BrokenSink {
    fn deliver(&self, _entry: &TranscriptEntry<'_>) -> Result<(), SinkError> {
        Err(SinkError::Other("sink offline".to_string()))
    }

    fn decision(&self, _decision: &ModeratorDecision) -> Result<(), SinkError> {
        Err(SinkError::Other("sink offline".to_string()))
    }
}
