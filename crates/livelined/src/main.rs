use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod events;
mod store;

use config::Config;
use engine::{EngineError, EngineHandle};
use events::{InputEvent, OutputEvent};
use store::PatternStore;

#[derive(Parser)]
#[command(name = "livelined", version, about = "Liveline facial geometry pipeline host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process JSON-lines events from stdin, publishing state to stdout
    Run,
    /// List stored enrollment patterns for a user
    List {
        #[arg(long)]
        user: String,
    },
    /// Print a user's stored patterns, decrypted, as JSON
    Export {
        #[arg(long)]
        user: String,
    },
    /// Remove a stored enrollment pattern
    Remove {
        #[arg(long)]
        user: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Run => run(&config).await,
        Command::List { user } => {
            let store = PatternStore::open(&config.db_path).await?;
            let patterns = store.list_by_user(&user).await?;
            println!("{}", serde_json::to_string_pretty(&patterns)?);
            Ok(())
        }
        Command::Export { user } => {
            let store = PatternStore::open(&config.db_path).await?;
            let patterns = store.get_patterns_for_user(&user).await?;
            println!("{}", serde_json::to_string_pretty(&patterns)?);
            Ok(())
        }
        Command::Remove { user, id } => {
            let store = PatternStore::open(&config.db_path).await?;
            if store.remove(&user, &id).await? {
                tracing::info!(user = %user, id = %id, "pattern removed");
                Ok(())
            } else {
                anyhow::bail!("no pattern {id} for user {user}")
            }
        }
    }
}

fn emit(event: &OutputEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "failed to encode output event"),
    }
}

async fn run(config: &Config) -> Result<()> {
    let store = PatternStore::open(&config.db_path)
        .await
        .with_context(|| format!("opening pattern store {}", config.db_path.display()))?;

    // stdout is written only from this loop, in input order; the watch side of
    // the engine is left to in-process observers.
    let (engine, _published) = engine::spawn_engine(
        config.pipeline(),
        config.queue_depth,
        config.min_calibration_samples,
    )?;
    tracing::info!(db = %config.db_path.display(), "livelined ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match events::parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed event");
                continue;
            }
        };
        for output in dispatch(&engine, &store, config, event).await? {
            emit(&output);
        }
    }

    tracing::info!("livelined shutting down");
    Ok(())
}

/// Apply one input event and return the output lines it produces, in order.
async fn dispatch(
    engine: &EngineHandle,
    store: &PatternStore,
    config: &Config,
    event: InputEvent,
) -> Result<Vec<OutputEvent>, EngineError> {
    let mut out = Vec::new();
    match event {
        InputEvent::Frame(frame) => {
            out.push(OutputEvent::State(engine.process_frame(frame).await?));
            return Ok(out);
        }
        InputEvent::SetMode { mode } => engine.set_mode(mode).await?,
        InputEvent::SetCalibrating { enabled } => engine.set_calibrating(enabled).await?,
        InputEvent::SetTracking { enabled } => engine.set_tracking(enabled).await?,
        InputEvent::BeginCalibration => engine.begin_calibration().await?,
        InputEvent::EndCalibration => {
            out.push(OutputEvent::Calibration(engine.end_calibration().await?));
        }
        InputEvent::Reset => engine.reset_for_new_user().await?,
        InputEvent::Enroll { user, label } => {
            out.push(enroll(engine, store, config.min_enroll_frames, user, label).await?);
        }
    }
    out.push(OutputEvent::State(engine.snapshot().await?));
    Ok(out)
}

/// Store the session's pattern for `user`. Store failures are reported as an
/// output event; only a dead engine is an error.
async fn enroll(
    engine: &EngineHandle,
    store: &PatternStore,
    min_frames: usize,
    user: String,
    label: String,
) -> Result<OutputEvent, EngineError> {
    let collected = engine.snapshot().await?.total_frames_collected;
    if collected < min_frames {
        tracing::warn!(
            user = %user,
            frames = collected,
            required = min_frames,
            "not enough pattern frames to enroll"
        );
        return Ok(OutputEvent::EnrollRejected {
            user,
            frames: collected,
            required: min_frames,
        });
    }

    let frames = engine.take_pattern().await?;
    let event = match store.insert(&user, &label, &frames).await {
        Ok(id) => OutputEvent::Enrolled {
            id,
            user,
            frames: frames.len(),
        },
        Err(e) => {
            tracing::error!(user = %user, frames = frames.len(), error = %e, "failed to store pattern");
            OutputEvent::EnrollFailed {
                user,
                frames: frames.len(),
                error: e.to_string(),
            }
        }
    };
    engine.reset_for_new_user().await?;
    Ok(event)
}
