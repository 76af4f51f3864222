//! Chapter Player - demo entry point
//!
//! Runs a playback session against the simulated engine. Commands come from
//! stdin (one per line) or from the built-in demo script; snapshots and
//! session events are printed as they are published.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chapter_common::config::{load_config, CONFIG_ENV_VAR};
use chapter_common::events::SessionSnapshot;
use chapter_common::human_time::format_secs_mss;
use chapter_player::catalog::StaticCatalog;
use chapter_player::{SessionBuilder, SessionHandle, SessionObservers};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "chapter_player=debug,chapter_common=info";

/// Command-line arguments for chapter-player
#[derive(Parser, Debug)]
#[command(name = "chapter-player")]
#[command(about = "Chapter playback session controller (simulated engine)")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "CHAPTER_PLAYER_CONFIG")]
    config: Option<PathBuf>,

    /// Chapter catalog (JSON array); overrides the config file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Log level for both crates; RUST_LOG takes precedence
    #[arg(short, long)]
    log_level: Option<String>,

    /// Run the built-in demo instead of reading commands from stdin
    #[arg(long)]
    script: bool,
}

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
enum ReplCommand {
    Play,
    FastForward,
    Rewind,
    Seek(u32),
    Rate(f32),
    Append(String),
    Stop,
    Dismiss,
    Status,
    Help,
    Quit,
}

impl FromStr for ReplCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let arg = parts.next();

        let command = match (verb, arg) {
            ("play" | "p", None) => ReplCommand::Play,
            ("ff", None) => ReplCommand::FastForward,
            ("rw", None) => ReplCommand::Rewind,
            ("seek", Some(secs)) => ReplCommand::Seek(
                secs.parse()
                    .with_context(|| format!("invalid seconds: {}", secs))?,
            ),
            ("rate", Some(rate)) => ReplCommand::Rate(
                rate.parse()
                    .with_context(|| format!("invalid rate: {}", rate))?,
            ),
            ("append", Some(id)) => ReplCommand::Append(id.to_string()),
            ("stop", None) => ReplCommand::Stop,
            ("dismiss", None) => ReplCommand::Dismiss,
            ("status", None) => ReplCommand::Status,
            ("help" | "?", None) => ReplCommand::Help,
            ("quit" | "q" | "exit", None) => ReplCommand::Quit,
            _ => bail!("unknown command: {}", line.trim()),
        };
        if parts.next().is_some() {
            bail!("too many arguments: {}", line.trim());
        }
        Ok(command)
    }
}

const HELP: &str = "commands: play | ff | rw | seek <secs> | rate <0.5|1|1.5|2> | \
append <id> | stop | dismiss | status | quit";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; the config file may lower or raise the level below
    let initial = args
        .log_level
        .as_deref()
        .map(level_filter)
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(initial)),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(args.config.as_deref(), CONFIG_ENV_VAR)
        .context("Failed to load configuration")?;
    if std::env::var_os("RUST_LOG").is_none() && args.log_level.is_none() {
        filter_handle
            .modify(|filter| *filter = EnvFilter::new(level_filter(&config.log_level)))
            .context("Failed to apply configured log level")?;
    }

    let catalog = match args.catalog.as_ref().or(config.catalog_path.as_ref()) {
        Some(path) => StaticCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => StaticCatalog::sample_book(),
    };
    info!(chapters = catalog.chapters().len(), "Catalog ready");

    let (handle, observers, _probe) = SessionBuilder::new(config)
        .catalog(catalog.clone())
        .spawn_simulated();
    info!(session_id = %handle.session_id(), "Chapter player started");

    let printer = tokio::spawn(print_updates(observers));

    let run = async {
        if args.script {
            run_script(&handle, &catalog).await
        } else {
            run_stdin(&handle, &catalog).await
        }
    };

    tokio::select! {
        result = run => result?,
        _ = shutdown_signal() => {}
    }

    handle.shutdown().await.context("Session shutdown failed")?;
    printer.await.context("Update printer failed")?;
    info!("Chapter player stopped");
    Ok(())
}

fn level_filter(level: &str) -> String {
    format!("chapter_player={0},chapter_common={0}", level)
}

async fn run_stdin(handle: &SessionHandle, catalog: &StaticCatalog) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ReplCommand>() {
            Ok(ReplCommand::Quit) => break,
            Ok(command) => {
                if let Err(err) = execute(handle, catalog, command).await {
                    println!("error: {:#}", err);
                }
            }
            Err(err) => println!("error: {:#}", err),
        }
    }
    Ok(())
}

/// Two chapters, a seek past the first boundary (which pre-fetches the
/// third), a rate change and the skip buttons
async fn run_script(handle: &SessionHandle, catalog: &StaticCatalog) -> Result<()> {
    let script = [
        ("append 18888", 0),
        ("append 18889", 0),
        ("play", 1500),
        ("rate 2", 1000),
        ("seek 88", 2500),
        ("ff", 500),
        ("rw", 500),
        ("play", 1000),
        ("play", 1000),
        ("status", 0),
        ("stop", 500),
    ];

    for (line, pause_ms) in script {
        println!("> {}", line);
        let command = line.parse::<ReplCommand>()?;
        execute(handle, catalog, command).await?;
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }
    Ok(())
}

async fn execute(
    handle: &SessionHandle,
    catalog: &StaticCatalog,
    command: ReplCommand,
) -> Result<()> {
    match command {
        ReplCommand::Play => handle.play_or_toggle().await?,
        ReplCommand::FastForward => handle.fast_forward().await?,
        ReplCommand::Rewind => handle.fast_rewind().await?,
        ReplCommand::Seek(secs) => handle.seek_to_seconds(secs).await?,
        ReplCommand::Rate(rate) => handle.set_rate(rate).await?,
        ReplCommand::Append(id) => {
            let item = catalog
                .get(&id)
                .cloned()
                .ok_or_else(|| anyhow!("no chapter with id {}", id))?;
            handle.append_items(vec![item]).await?;
        }
        ReplCommand::Stop => handle.stop().await?,
        ReplCommand::Dismiss => handle.notification_dismissed().await?,
        ReplCommand::Status => {
            let snapshot = handle.current_snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
    Ok(())
}

/// Print snapshots and events until the session closes
async fn print_updates(observers: SessionObservers) {
    let mut snapshot = observers.snapshot();
    let mut events = observers.events();

    loop {
        tokio::select! {
            changed = snapshot.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = snapshot.borrow_and_update().clone();
                println!("{}", format_snapshot(&current));
            }
            event = events.recv() => match event {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("event {}", json),
                    Err(err) => warn!("Failed to serialize event: {}", err),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn format_snapshot(snapshot: &SessionSnapshot) -> String {
    let (title, total) = match &snapshot.metadata {
        Some(metadata) => (metadata.title.as_str(), metadata.duration_str.as_str()),
        None => ("-", "--:--"),
    };
    format!(
        "[{} / {}] {:<9} {:<14} {}x  queue={}",
        format_secs_mss(snapshot.position_secs),
        total,
        snapshot.state.to_string(),
        title,
        snapshot.rate,
        snapshot.queue_len
    )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
