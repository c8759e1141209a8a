use agora::cli::{Cli, Command, OutputArgs};
use agora::config::AgoraConfig;
use agora::session::{self, PartialOutcome, SessionError};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    agora::telemetry::init_tracing(cli.verbose);

    let config = AgoraConfig::load_or_default(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current turn");
                cancel.cancel();
            }
        });
    }

    match &cli.command {
        Command::Personas => {
            println!("{}", session::persona_listing(&session::catalog(&config)));
        }
        Command::Debate(args) => {
            let model = session::build_model(&config.model)?;
            let sink = session::build_sink(&args.output, false)?;
            let outcome = session::run_debate(args, &config, model, sink, cancel)
                .await
                .or_else(|err| report_stopped(&args.output, err))?;
            info!(session_id = %outcome.session_id, turns = outcome.turns, "Debate finished");
            if args.output.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?
                );
            } else {
                println!("{}", outcome.summary_line());
            }
        }
        Command::Discuss(args) => {
            let model = session::build_model(&config.model)?;
            let sink = session::build_sink(&args.output, cli.verbose)?;
            let outcome = session::run_discussion(args, &config, model, sink, cancel)
                .await
                .or_else(|err| report_stopped(&args.output, err))?;
            info!(
                session_id = %outcome.session_id,
                rounds = outcome.rounds,
                stop = %outcome.stop_reason,
                "Discussion finished"
            );
            if args.output.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?
                );
            } else {
                println!("{}", outcome.summary_line());
            }
        }
    }

    Ok(())
}

/// Prints what a stopped session produced, then hands the error back so the
/// process exits non-zero. The console sink has already streamed each record,
/// so plain output only needs the status line.
fn report_stopped<T>(output: &OutputArgs, err: SessionError) -> Result<T> {
    if let Some(partial) = PartialOutcome::from_error(&err) {
        warn!(status = %partial.status, turns = partial.turns, "Session stopped early");
        if output.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&partial).context("Failed to encode partial outcome")?
            );
        } else {
            println!("Session {} after {} turns", partial.status, partial.turns);
        }
    }
    Err(err.into())
}
