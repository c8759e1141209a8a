//! Command-line arguments and their merge with the config file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use dialogue::debate::{DebateConfig, DiscussionConfig, MemberSpec};
use dialogue::ActorId;

/// Multi-character debates and moderated discussions over any
/// OpenAI-compatible chat endpoint.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Debug-level logging for agora and dialogue (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "AGORA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scripted pro/con debate
    Debate(DebateArgs),
    /// Run a moderator-driven discussion
    Discuss(DiscussArgs),
    /// List available personas
    Personas,
}

/// Output flags shared by both session commands.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Append the transcript as JSON lines to this file
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Print the final outcome as JSON instead of streaming lines
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DebateArgs {
    /// Debate topic (overrides the config file)
    #[arg(long)]
    pub topic: Option<String>,

    /// Pro side persona ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pub pro: Vec<ActorId>,

    /// Con side persona ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pub con: Vec<ActorId>,

    #[arg(long)]
    pub pro_stance: Option<String>,

    #[arg(long)]
    pub con_stance: Option<String>,

    /// Force a participant's stance, as `id=stance`. Repeatable.
    #[arg(long = "force", value_parser = parse_forced_stance)]
    pub forced: Vec<(ActorId, String)>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DiscussArgs {
    /// Discussion topic (overrides the config file)
    #[arg(long)]
    pub topic: Option<String>,

    /// Member persona ids, comma separated. An optional stance follows
    /// `=`, e.g. `anon=Practice matters,taki`.
    #[arg(long, value_delimiter = ',', value_parser = parse_member)]
    pub members: Vec<MemberSpec>,

    /// Moderator round cap
    #[arg(long)]
    pub max_rounds: Option<u32>,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn parse_forced_stance(text: &str) -> Result<(ActorId, String), String> {
    match text.split_once('=') {
        Some((id, stance)) if !id.trim().is_empty() && !stance.trim().is_empty() => {
            Ok((ActorId::new(id.trim()), stance.trim().to_string()))
        }
        _ => Err(format!("expected id=stance, got '{text}'")),
    }
}

pub fn parse_member(text: &str) -> Result<MemberSpec, String> {
    let (id, stance) = match text.split_once('=') {
        Some((id, stance)) => (id.trim(), stance.trim()),
        None => (text.trim(), ""),
    };
    if id.is_empty() {
        return Err(format!("empty member id in '{text}'"));
    }
    Ok(MemberSpec::new(id).with_stance(stance))
}

impl DebateArgs {
    /// Layer command-line values over the config file's `[debate]` table.
    pub fn merge(&self, base: Option<DebateConfig>) -> Result<DebateConfig> {
        let mut config = match (base, &self.topic) {
            (Some(base), _) => base,
            (None, Some(topic)) => DebateConfig::new(topic.clone(), Vec::new(), Vec::new()),
            (None, None) => bail!("no debate topic: pass --topic or add a [debate] table"),
        };
        if let Some(topic) = &self.topic {
            config.topic = topic.clone();
        }
        if !self.pro.is_empty() {
            config.pro = self.pro.clone();
        }
        if !self.con.is_empty() {
            config.con = self.con.clone();
        }
        if let Some(stance) = &self.pro_stance {
            config.pro_stance = stance.clone();
        }
        if let Some(stance) = &self.con_stance {
            config.con_stance = stance.clone();
        }
        for (id, stance) in &self.forced {
            config.forced_stances.insert(id.clone(), stance.clone());
        }
        Ok(config)
    }
}

impl DiscussArgs {
    /// Layer command-line values over the config file's `[discussion]` table.
    pub fn merge(&self, base: Option<DiscussionConfig>) -> Result<DiscussionConfig> {
        let mut config = match (base, &self.topic) {
            (Some(base), _) => base,
            (None, Some(topic)) => DiscussionConfig::new(topic.clone(), Vec::new()),
            (None, None) => bail!("no discussion topic: pass --topic or add a [discussion] table"),
        };
        if let Some(topic) = &self.topic {
            config.topic = topic.clone();
        }
        if !self.members.is_empty() {
            config.members = self.members.clone();
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        Ok(config)
    }
}
