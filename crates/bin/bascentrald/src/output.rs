//! Prints output events to stdout, one line each.

use std::io::Write;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use bascentral_domain::battery::ReadingSource;
use bascentral_domain::event::OutputEvent;

use crate::config::OutputFormat;

/// Render `event` as a single line without the trailing newline.
///
/// # Errors
///
/// Returns the serializer error for [`OutputFormat::Json`].
pub fn render(event: &OutputEvent, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(event),
        OutputFormat::Text => Ok(text(event)),
    }
}

fn text(event: &OutputEvent) -> String {
    match event {
        OutputEvent::ScanStarted { service } => format!("scanning for service {service}"),
        OutputEvent::FilterMatched { peer, connectable } => {
            if *connectable {
                format!("found {peer}")
            } else {
                format!("found {peer} (not connectable)")
            }
        }
        OutputEvent::StateChanged { from, to } => format!("state {from} -> {to}"),
        OutputEvent::Connected { peer, .. } => format!("connected to {peer}"),
        OutputEvent::ConnectFailed { peer, error } => {
            format!("connection to {peer} failed: {error} ({})", error.code())
        }
        OutputEvent::Disconnected { peer, reason, .. } => {
            format!("disconnected from {peer} (reason 0x{:02x})", reason.0)
        }
        OutputEvent::DiscoveryCompleted {
            peer, attributes, ..
        } => format!("discovery on {peer} complete, {attributes} attributes"),
        OutputEvent::ServiceNotFound { peer, .. } => {
            format!("battery service not found on {peer}")
        }
        OutputEvent::DiscoveryFailed { peer, error, .. } => {
            format!("discovery on {peer} failed: {error} ({})", error.code())
        }
        OutputEvent::BindingFailed { peer, error, .. } => {
            format!("battery level on {peer} unusable: {error}")
        }
        OutputEvent::Subscribed { peer, .. } => format!("subscribed to {peer}"),
        OutputEvent::Reading(reading) => {
            let source = match reading.source {
                ReadingSource::Notification => "notify",
                ReadingSource::Read => "read",
            };
            format!(
                "[{source} #{}] {}: battery {}",
                reading.sequence, reading.peer, reading.level
            )
        }
        OutputEvent::ReadFailed { peer, error, .. } => {
            format!("read from {peer} failed: {error} ({})", error.code())
        }
        OutputEvent::RequestFailed { operation, error } => {
            format!("{operation} failed: {error} ({})", error.code())
        }
    }
}

/// Print every event from `events` until the bus is dropped.
pub async fn print_events(mut events: broadcast::Receiver<OutputEvent>, format: OutputFormat) {
    loop {
        match events.recv().await {
            Ok(event) => match render(&event, format) {
                Ok(line) => {
                    let mut stdout = std::io::stdout().lock();
                    if let Err(err) = writeln!(stdout, "{line}") {
                        tracing::warn!(%err, "failed to write output");
                    }
                }
                Err(err) => tracing::warn!(%err, "failed to render output event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "output printer lagged, events dropped");
            }
            Err(RecvError::Closed) => {
                tracing::debug!("output bus closed");
                break;
            }
        }
    }
}
