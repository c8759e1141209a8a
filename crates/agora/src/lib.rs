//! Runtime for the `dialogue` orchestrators.
//!
//! Supplies the pieces the core crate leaves to collaborators: an
//! OpenAI-compatible HTTP model with multi-source fallback, the built-in
//! persona catalog, transcript sinks, TOML configuration and the CLI.

pub mod cli;
pub mod config;
pub mod llm;
pub mod personas;
pub mod session;
pub mod sink;
pub mod telemetry;

pub use config::{AgoraConfig, ApiSource, ConfigError, ModelConfig};
pub use llm::{FallbackModel, OpenAiCompatibleClient, SourceStats};
pub use personas::{PersonaCatalog, PersonaSpec};
pub use sink::{ConsoleSink, FanoutSink, JsonlSink};
