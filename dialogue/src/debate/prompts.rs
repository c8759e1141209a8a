//! Prompt text for actors and the moderator.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever any template changes so
//! transcripts can be traced back to the wording that produced them.

use super::state::{Participant, Phase, Task, TaskType};
use crate::persona::ActorId;

/// Prompt version. Bump on any template change.
pub const PROMPT_VERSION: &str = "1.2.0";

const DISCUSSION_RULES: &str = "\
## Discussion rules
1. Hold your position and argue it in your own way.
2. Listen carefully to what the others have said.
3. Stay in character: keep your personality and way of speaking.
4. You may quote your signature lines to strengthen a point.";

const FORCED_STANCE_RULES: &str = "\
## Important
You must argue for the position above, even if it differs from what you \
would usually think. Find the parts of your character that can support it \
and make the case in your own voice. Stay in character and try to persuade \
the others.";

/// Stance framing appended to the persona fragment.
pub fn stance_framing(participant: &Participant, topic: &str, phase: Phase) -> String {
    if participant.forced {
        format!(
            "## Special assignment\nTopic: {topic}\nAssigned position: {stance}\n\n{FORCED_STANCE_RULES}",
            stance = participant.stance,
        )
    } else {
        let stance = if participant.stance.trim().is_empty() {
            "speak from your own perspective".to_string()
        } else {
            participant.stance.clone()
        };
        format!(
            "## Current discussion\nTopic: {topic}\nYour position: {stance}\nCurrent phase: {phase}\n\n{DISCUSSION_RULES}"
        )
    }
}

/// Fixed per-type task prompt, including the length cap.
pub fn task_prompt(task: &Task) -> String {
    let target = task.target_name.as_deref().unwrap_or("the other speaker");
    match task.task_type {
        TaskType::Opening => "\
## Current task: opening statement
Share what you think about this topic.
Requirements:
1. State your position in your own way.
2. Say what you genuinely feel.
3. Keep your personality.
4. Stay under 300 characters."
            .to_string(),
        TaskType::Question => format!(
            "## Current task: ask a question\n\
You want to ask {target} a question.\n\
Requirements:\n\
1. Ask it in your own way.\n\
2. It can be curious or it can be a challenge.\n\
3. Keep your personality.\n\
4. Stay under 150 characters."
        ),
        TaskType::Answer => format!(
            "## Current task: answer\n\
{target} has asked you a question. Respond to it.\n\
Requirements:\n\
1. Actually answer the question.\n\
2. Express yourself in your own way.\n\
3. You may share how you feel.\n\
4. Stay under 200 characters."
        ),
        TaskType::Rebuttal => format!(
            "## Current task: respond\n\
Respond to {target}'s point.\n\
Requirements:\n\
1. Give your view.\n\
2. You may agree or disagree.\n\
3. Keep your personality.\n\
4. Stay under 200 characters."
        ),
        TaskType::FreeDebate => "\
## Current task: free discussion
This is the open discussion round. You can:
1. Respond to what was just said.
2. Add a new idea.
3. Share how you feel.
Requirements: keep your style and stay under 200 characters."
            .to_string(),
        TaskType::Closing => "\
## Current task: closing statement
Give your final summary.
Requirements:
1. Summarise your thoughts.
2. Say how you feel now.
3. Close in your own way.
4. Stay under 300 characters."
            .to_string(),
    }
}

pub const OPENING_INSTRUCTION: &str = "Please give your opening statement.";
pub const CLOSING_INSTRUCTION: &str = "Please give your closing statement.";

pub fn question_instruction(target_name: &str) -> String {
    format!("Put your question to {target_name}.")
}

pub fn answer_instruction(questioner_name: &str, question: &str) -> String {
    format!("{questioner_name} asks you: {question}")
}

/// System prompt for the moderator's decision call.
pub fn moderator_preamble(members: &[(&ActorId, &str)]) -> String {
    let roster = members
        .iter()
        .map(|(id, name)| format!("- {id}: {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\
You are the moderator of a group discussion. You decide how the \
conversation moves forward.

## Members (code: name)
{roster}

## Your responsibilities
1. Decide who speaks next.
2. Decide what kind of turn it is (opening, question, answer, comment, summary).
3. Decide whether the discussion should continue or end.
4. Make sure every member gets a chance to speak.
5. Move the discussion to the next phase at the right moment.

## Phases
1. opening: each member shares their first thoughts.
2. questioning: members ask each other questions and answer them.
3. free_debate: open back-and-forth.
4. closing: each member gives a final summary.

## Decision format
Reply with exactly these lines:
ACTION: <action>
SPEAKER: <member code>
TARGET: <member code, or none>
INSTRUCTION: <what the speaker should do>
REASON: <why you chose this>
SHOULD_END: <true/false>
PHASE: <opening|questioning|free_debate|closing>

## Actions
- opening_speech: opening statement
- ask_question: SPEAKER asks TARGET a question
- request_answer: SPEAKER answers TARGET's question
- invite_comment: invite SPEAKER to comment
- free_discussion: open discussion turn
- request_summary: SPEAKER gives a closing summary
- end_discussion: end the discussion"
    )
}
