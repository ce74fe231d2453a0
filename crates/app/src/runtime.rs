//! Event loop feeding a [`Central`] one event at a time.

use std::future::Future;

use tokio::sync::mpsc;

use crate::central::Central;
use crate::input::ButtonEdge;
use crate::ports::{Discovery, OutputSink, Transport, TransportEvent};

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future completed.
    Shutdown,
    /// The transport dropped its event sender.
    TransportClosed,
}

/// Drive `central` until `shutdown` resolves or the transport goes away.
///
/// Transport events and button edges are handled strictly one after the
/// other; a closed input channel only stops input handling.
pub async fn run<T, D, S, F>(
    central: &mut Central<T, D, S>,
    mut events: mpsc::Receiver<TransportEvent>,
    mut inputs: mpsc::Receiver<ButtonEdge>,
    shutdown: F,
) -> StopReason
where
    T: Transport,
    D: Discovery,
    S: OutputSink,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut inputs_open = true;

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                return StopReason::Shutdown;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::warn!("transport event channel closed");
                    return StopReason::TransportClosed;
                };
                tracing::trace!(?event, "transport event");
                central.handle(event);
            }
            edge = inputs.recv(), if inputs_open => {
                match edge {
                    Some(edge) => {
                        central.on_input(edge);
                    }
                    None => {
                        tracing::debug!("input channel closed");
                        inputs_open = false;
                    }
                }
            }
        }
    }
}
