//! Runstream - live workflow run event viewer
//!
//! CLI entry point for streaming and decoding run events.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use runstream::cli::{Cli, Command, OutputFormat};
use runstream::config::Config;
use runstream::events::{ConnectionStatus, WILDCARD};
use runstream::feed::LiveFeed;
use runstream::render::{format_event, format_status};
use runstream::stream::FrameDecoder;

fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("runstream")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("runstream.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Watch {
            path,
            types,
            format,
            reconnect,
            max_events,
        } => cmd_watch(&config, &path, types, format, reconnect, max_events).await,
        Command::Decode { file, format } => cmd_decode(file, format),
        Command::Config => cmd_config(&config),
    }
}

/// How one pass over a connection ended
enum WatchEnd {
    Finished,
    LimitReached,
    Interrupted,
}

/// Stream a path, printing events until it ends, the limit is hit, or Ctrl-C
async fn cmd_watch(
    config: &Config,
    path: &str,
    types: Vec<String>,
    format: OutputFormat,
    reconnect: bool,
    max_events: Option<usize>,
) -> Result<()> {
    debug!(%path, ?types, reconnect, ?max_events, "cmd_watch: called");
    let mut feed = LiveFeed::new(config.stream_client()?, config.history_cap);

    let printed = Arc::new(AtomicUsize::new(0));
    let keys = if types.is_empty() { vec![WILDCARD.to_string()] } else { types };
    let subscriptions: Vec<_> = keys
        .into_iter()
        .map(|key| {
            let printed = Arc::clone(&printed);
            feed.subscribe(key, move |event| {
                println!("{}", format_event(event, format));
                printed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    let limit_reached = || max_events.is_some_and(|max| printed.load(Ordering::SeqCst) >= max);

    // One listener for the whole command so a Ctrl-C between passes is kept
    let interrupt = CancellationToken::new();
    let signal_listener = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        })
    };

    let mut last_status = feed.status();
    loop {
        feed.watch(path).context(format!("Failed to open stream '{}'", path))?;

        let end = loop {
            report_status(&feed, &mut last_status);
            if limit_reached() {
                break WatchEnd::LimitReached;
            }
            match feed.pump_until_cancelled(&interrupt).await {
                Some(true) => continue,
                Some(false) => break WatchEnd::Finished,
                None => break WatchEnd::Interrupted,
            }
        };

        match end {
            WatchEnd::Finished if reconnect => {
                report_status(&feed, &mut last_status);
                let delay = config.reconnect_delay();
                eprintln!("Reconnecting in {:.1}s...", delay.as_secs_f64());
                info!(?delay, "cmd_watch: reconnecting");
                let interrupted = tokio::select! {
                    biased;
                    _ = interrupt.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if interrupted {
                    feed.close();
                    break;
                }
            }
            WatchEnd::Finished => break,
            WatchEnd::LimitReached | WatchEnd::Interrupted => {
                feed.close();
                break;
            }
        }
    }
    report_status(&feed, &mut last_status);
    signal_listener.abort();

    for subscription in subscriptions {
        debug!(event_type = subscription.event_type(), "cmd_watch: unsubscribing");
        subscription.unsubscribe();
    }
    info!(printed = printed.load(Ordering::SeqCst), "cmd_watch: done");
    Ok(())
}

fn report_status(feed: &LiveFeed, last_status: &mut ConnectionStatus) {
    let status = feed.status();
    if status != *last_status {
        eprintln!("{}", format_status(status, feed.disconnect_reason()));
        *last_status = status;
    }
}

/// Decode a captured event stream and print its events
fn cmd_decode(file: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    debug!(?file, "cmd_decode: called");
    let mut bytes = Vec::new();
    match &file {
        Some(path) => {
            bytes = fs::read(path).context(format!("Failed to read {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
        }
    }

    let mut decoder = FrameDecoder::new();
    let mut events = decoder.push(&bytes);
    // A capture may end without a final newline
    events.extend(decoder.push(b"\n"));

    for event in &events {
        println!("{}", format_event(event, format));
    }
    eprintln!("{} events decoded", events.len());
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
