//! In-process output bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use bascentral_domain::event::OutputEvent;

use crate::ports::OutputSink;

/// Bounded fan-out of [`OutputEvent`]s to any number of consumers.
///
/// Emitting never blocks and succeeds even when nobody listens. A consumer
/// that falls more than `capacity` events behind loses the oldest ones and
/// is told how many through [`broadcast::error::RecvError::Lagged`].
#[derive(Clone)]
pub struct OutputBus {
    sender: broadcast::Sender<OutputEvent>,
}

impl OutputBus {
    /// Create a new bus holding at most `capacity` undelivered events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutputEvent> {
        self.sender.subscribe()
    }
}

impl OutputSink for OutputBus {
    fn emit(&self, event: OutputEvent) {
        // send only fails without receivers; the event is dropped then.
        let _ = self.sender.send(event);
    }
}
