//! Terminal rendering of events and connection status

use colored::*;

use crate::cli::OutputFormat;
use crate::events::{ConnectionStatus, DisconnectReason, StreamEvent};

/// Render one event as a single output line
pub fn format_event(event: &StreamEvent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e)),
        OutputFormat::Text => {
            let time = event.received_at.format("%H:%M:%S").to_string();
            format!(
                "{} {} {}",
                time.dimmed(),
                color_type(&event.event_type),
                event.payload
            )
        }
    }
}

/// Render a status indicator line
pub fn format_status(status: ConnectionStatus, reason: Option<&DisconnectReason>) -> String {
    let label = match status {
        ConnectionStatus::Connected => status.label().green().bold(),
        ConnectionStatus::Connecting => status.label().yellow().bold(),
        ConnectionStatus::Disconnected => status.label().red().bold(),
    };
    match reason {
        Some(reason) => format!("● {} ({})", label, reason),
        None => format!("● {}", label),
    }
}

fn color_type(event_type: &str) -> ColoredString {
    let padded = format!("{:<8}", event_type);
    match event_type {
        "error" => padded.red(),
        "status" => padded.cyan(),
        "step" => padded.blue(),
        "result" => padded.green(),
        _ => padded.normal(),
    }
}
