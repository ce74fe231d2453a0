//! Output sink port.

use std::sync::Arc;

use bascentral_domain::event::OutputEvent;

/// Receives every [`OutputEvent`] the central produces.
///
/// `emit` is called from the event loop and must never block: a slow
/// consumer drops or overwrites, it does not stall the central.
pub trait OutputSink {
    fn emit(&self, event: OutputEvent);
}

impl<T: OutputSink + ?Sized> OutputSink for Arc<T> {
    fn emit(&self, event: OutputEvent) {
        (**self).emit(event);
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &T {
    fn emit(&self, event: OutputEvent) {
        (**self).emit(event);
    }
}

/// Fan out to two sinks, first `A` then `B`.
impl<A: OutputSink, B: OutputSink> OutputSink for (A, B) {
    fn emit(&self, event: OutputEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}
