//! Moderator decisions and the decoder that turns model text into one.
//!
//! The model's reply is free text. [`DecisionDecoder::decode`] is the only
//! place that text is interpreted; everything downstream works with the
//! typed [`ModeratorDecision`]. Decoding never fails: any field it cannot
//! extract falls back to a default.
//!
//! Two reply shapes are accepted:
//!
//! ```text
//! ACTION: ask_question          {"action": "ask_question",
//! SPEAKER: anon                  "speaker": "anon",
//! TARGET: taki                   "target": "taki",
//! INSTRUCTION: ...               "instruction": "...",
//! SHOULD_END: false              "should_end": false}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::{Phase, TaskType};

/// Instruction used when the model gives none.
pub const DEFAULT_INSTRUCTION: &str = "Please share your thoughts.";

/// What the moderator asks for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeratorAction {
    OpeningSpeech,
    AskQuestion,
    RequestAnswer,
    InviteComment,
    FreeDiscussion,
    RequestSummary,
    EndDiscussion,
}

impl ModeratorAction {
    pub const ALL: [ModeratorAction; 7] = [
        Self::OpeningSpeech,
        Self::AskQuestion,
        Self::RequestAnswer,
        Self::InviteComment,
        Self::FreeDiscussion,
        Self::RequestSummary,
        Self::EndDiscussion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpeningSpeech => "opening_speech",
            Self::AskQuestion => "ask_question",
            Self::RequestAnswer => "request_answer",
            Self::InviteComment => "invite_comment",
            Self::FreeDiscussion => "free_discussion",
            Self::RequestSummary => "request_summary",
            Self::EndDiscussion => "end_discussion",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(text))
    }

    /// Task an executed decision produces. `None` for the end action.
    pub fn task_type(self) -> Option<TaskType> {
        match self {
            Self::OpeningSpeech => Some(TaskType::Opening),
            Self::AskQuestion => Some(TaskType::Question),
            Self::RequestAnswer => Some(TaskType::Answer),
            Self::InviteComment | Self::FreeDiscussion => Some(TaskType::FreeDebate),
            Self::RequestSummary => Some(TaskType::Closing),
            Self::EndDiscussion => None,
        }
    }
}

impl std::fmt::Display for ModeratorAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded moderator decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratorDecision {
    pub action: ModeratorAction,
    /// Raw speaker code as written by the model. Resolved at execution.
    pub speaker: Option<String>,
    pub target: Option<String>,
    pub instruction: String,
    pub reason: String,
    pub should_end: bool,
    pub phase: Phase,
}

impl ModeratorDecision {
    /// The all-defaults decision for a given current phase.
    pub fn fallback(phase: Phase) -> Self {
        Self {
            action: ModeratorAction::FreeDiscussion,
            speaker: None,
            target: None,
            instruction: DEFAULT_INSTRUCTION.to_string(),
            reason: String::new(),
            should_end: false,
            phase,
        }
    }

    /// Whether the loop stops instead of executing this decision.
    pub fn ends_discussion(&self) -> bool {
        self.should_end || self.action == ModeratorAction::EndDiscussion
    }
}

/// Recognised decision keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Action,
    Speaker,
    Target,
    Instruction,
    Reason,
    ShouldEnd,
    Phase,
}

impl Key {
    fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "ACTION" => Some(Self::Action),
            "SPEAKER" | "NEXT_SPEAKER" => Some(Self::Speaker),
            "TARGET" | "TARGET_MEMBER" => Some(Self::Target),
            "INSTRUCTION" => Some(Self::Instruction),
            "REASON" => Some(Self::Reason),
            "SHOULD_END" => Some(Self::ShouldEnd),
            "PHASE" => Some(Self::Phase),
            _ => None,
        }
    }
}

/// Decodes model replies into [`ModeratorDecision`]s.
#[derive(Debug, Clone, Copy)]
pub struct DecisionDecoder {
    current_phase: Phase,
}

impl DecisionDecoder {
    pub fn new(current_phase: Phase) -> Self {
        Self { current_phase }
    }

    pub fn decode(&self, reply: &str) -> ModeratorDecision {
        let mut decision = ModeratorDecision::fallback(self.current_phase);

        if let Some(object) = json_object(reply) {
            for (key, value) in object.iter() {
                let Some(key) = Key::parse(key) else {
                    continue;
                };
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                self.apply(&mut decision, key, &text);
            }
            return decision;
        }

        for line in reply.lines() {
            if let Some((key, value)) = split_line(line) {
                self.apply(&mut decision, key, value);
            }
        }
        decision
    }

    fn apply(&self, decision: &mut ModeratorDecision, key: Key, raw: &str) {
        let value = clean_value(raw);
        match key {
            Key::Action => {
                decision.action =
                    ModeratorAction::parse(value).unwrap_or(ModeratorAction::FreeDiscussion);
            }
            Key::Speaker => {
                decision.speaker = absent_if_blank(value);
            }
            Key::Target => {
                decision.target = absent_if_blank(value);
            }
            Key::Instruction => {
                decision.instruction = if value.is_empty() {
                    DEFAULT_INSTRUCTION.to_string()
                } else {
                    value.to_string()
                };
            }
            Key::Reason => decision.reason = value.to_string(),
            Key::ShouldEnd => {
                decision.should_end = matches!(
                    value.to_ascii_lowercase().as_str(),
                    "true" | "yes" | "1"
                );
            }
            Key::Phase => {
                decision.phase = Phase::parse(value).unwrap_or(self.current_phase);
            }
        }
    }
}

/// The reply as a JSON object, if it is one (optionally inside a code fence).
fn json_object(reply: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    if !body.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Split `KEY: value` (ASCII or full-width colon), ignoring list markers
/// and bold markup around the key.
fn split_line(line: &str) -> Option<(Key, &str)> {
    let line = line
        .trim()
        .trim_start_matches(['-', '*', '•', '>'])
        .trim_start();
    let (raw_key, value) = match (line.find(':'), line.find('：')) {
        (Some(a), Some(b)) if b < a => (&line[..b], &line[b + '：'.len_utf8()..]),
        (Some(a), _) => (&line[..a], &line[a + 1..]),
        (None, Some(b)) => (&line[..b], &line[b + '：'.len_utf8()..]),
        (None, None) => return None,
    };
    let key = Key::parse(raw_key.trim_matches(|c: char| c == '*' || c == '`' || c.is_whitespace()))?;
    Some((key, value))
}

fn clean_value(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '*' | '`' | '"' | '\'' | '[' | ']' | '<' | '>'))
        .trim()
}

fn absent_if_blank(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") || value == "无" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(reply: &str) -> ModeratorDecision {
        DecisionDecoder::new(Phase::Questioning).decode(reply)
    }

    #[test]
    fn test_full_line_form() {
        let d = decode(
            "ACTION: ask_question\n\
             SPEAKER: anon\n\
             TARGET: taki\n\
             INSTRUCTION: Ask Taki why she practises so much.\n\
             REASON: Taki has been quiet.\n\
             SHOULD_END: false\n\
             PHASE: questioning",
        );
        assert_eq!(d.action, ModeratorAction::AskQuestion);
        assert_eq!(d.speaker.as_deref(), Some("anon"));
        assert_eq!(d.target.as_deref(), Some("taki"));
        assert_eq!(d.instruction, "Ask Taki why she practises so much.");
        assert_eq!(d.reason, "Taki has been quiet.");
        assert!(!d.should_end);
        assert_eq!(d.phase, Phase::Questioning);
    }

    #[test]
    fn test_keyless_input_yields_defaults() {
        let d = decode("I think we should let everyone talk a bit more.");
        assert_eq!(d, ModeratorDecision::fallback(Phase::Questioning));
        assert_eq!(d.action, ModeratorAction::FreeDiscussion);
        assert_eq!(d.instruction, DEFAULT_INSTRUCTION);
        assert!(!d.should_end);
    }

    #[test]
    fn test_empty_input_yields_defaults() {
        assert_eq!(decode(""), ModeratorDecision::fallback(Phase::Questioning));
    }

    #[test]
    fn test_target_none_markers_are_absent() {
        for marker in ["", "none", "None", "无"] {
            let d = decode(&format!("ACTION: free_discussion\nTARGET: {marker}"));
            assert_eq!(d.target, None, "marker {marker:?}");
        }
    }

    #[test]
    fn test_unknown_action_and_phase_fall_back() {
        let d = decode("ACTION: dance\nPHASE: intermission");
        assert_eq!(d.action, ModeratorAction::FreeDiscussion);
        assert_eq!(d.phase, Phase::Questioning);
    }

    #[test]
    fn test_tolerates_markdown_and_case() {
        let d = decode(
            "- **Action**: `request_summary`\n\
             * speaker：Soyo\n\
             **SHOULD_END:** TRUE\n\
             phase: Closing",
        );
        assert_eq!(d.action, ModeratorAction::RequestSummary);
        assert_eq!(d.speaker.as_deref(), Some("Soyo"));
        assert!(d.should_end);
        assert_eq!(d.phase, Phase::Closing);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let d = decode("SPEAKER: anon\nSPEAKER: rana");
        assert_eq!(d.speaker.as_deref(), Some("rana"));
    }

    #[test]
    fn test_json_form() {
        let d = decode(
            r#"{"action":"request_answer","speaker":"taki","target":"anon","should_end":false,"phase":"questioning"}"#,
        );
        assert_eq!(d.action, ModeratorAction::RequestAnswer);
        assert_eq!(d.speaker.as_deref(), Some("taki"));
        assert_eq!(d.target.as_deref(), Some("anon"));
        assert_eq!(d.instruction, DEFAULT_INSTRUCTION);
    }

    #[test]
    fn test_fenced_json_form() {
        let d = decode("```json\n{\"ACTION\": \"end_discussion\", \"SHOULD_END\": true}\n```");
        assert_eq!(d.action, ModeratorAction::EndDiscussion);
        assert!(d.should_end);
        assert!(d.ends_discussion());
    }

    #[test]
    fn test_end_action_ends_without_flag() {
        let d = decode("ACTION: end_discussion");
        assert!(!d.should_end);
        assert!(d.ends_discussion());
    }

    #[test]
    fn test_action_task_mapping() {
        assert_eq!(
            ModeratorAction::OpeningSpeech.task_type(),
            Some(TaskType::Opening)
        );
        assert_eq!(
            ModeratorAction::InviteComment.task_type(),
            Some(TaskType::FreeDebate)
        );
        assert_eq!(
            ModeratorAction::RequestSummary.task_type(),
            Some(TaskType::Closing)
        );
        assert_eq!(ModeratorAction::EndDiscussion.task_type(), None);
        for action in ModeratorAction::ALL {
            assert_eq!(ModeratorAction::parse(action.as_str()), Some(action));
        }
    }
}
