//! Output sink writing every event to the `tracing` log.

use bascentral_domain::event::OutputEvent;

use crate::ports::OutputSink;

/// Logs each [`OutputEvent`] under the `bascentral::output` target.
///
/// Failures are logged at `warn`, readings and link changes at `info`,
/// everything else at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn emit(&self, event: OutputEvent) {
        match &event {
            OutputEvent::Reading(reading) => tracing::info!(
                target: "bascentral::output",
                peer = %reading.peer,
                level = %reading.level,
                source = ?reading.source,
                sequence = reading.sequence,
                "reading"
            ),
            OutputEvent::StateChanged { from, to } => {
                tracing::info!(target: "bascentral::output", %from, %to, "state changed");
            }
            event if event.is_error() => {
                tracing::warn!(target: "bascentral::output", ?event, "failure");
            }
            event => tracing::debug!(target: "bascentral::output", ?event, "event"),
        }
    }
}
