//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Runstream - live event viewer for workflow runs
#[derive(Parser, Debug)]
#[command(
    name = "runstream",
    author,
    version,
    about = "Stream and inspect live workflow run events"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream events from a path and print them as they arrive
    Watch {
        /// Stream path, relative to the configured API prefix (or a full URL)
        #[arg(value_name = "PATH")]
        path: String,

        /// Only print events of this type (repeatable)
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        types: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Reconnect after the stream ends or fails
        #[arg(short, long)]
        reconnect: bool,

        /// Stop after this many events
        #[arg(short = 'n', long)]
        max_events: Option<usize>,
    },

    /// Decode a captured event stream from a file or stdin
    Decode {
        /// File to decode (stdin when omitted)
        file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the resolved configuration
    Config,
}

/// Output format for printed events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
