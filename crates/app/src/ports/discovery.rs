//! Discovery port: walks a peer's attribute table for one service.

use bascentral_domain::attribute::HandleSet;
use bascentral_domain::error::TransportError;
use bascentral_domain::gatt::ServiceId;
use bascentral_domain::id::ConnectionId;

/// Attribute discovery engine.
///
/// A successful discovery lends the caller a [`HandleSet`], which must be
/// handed back through [`Discovery::release`] exactly once. `release` takes
/// the set by value, so nothing can use it afterwards.
pub trait Discovery {
    /// Start discovering `service` on `connection`. The outcome arrives as
    /// [`TransportEvent::DiscoveryCompleted`](super::TransportEvent::DiscoveryCompleted).
    ///
    /// # Errors
    ///
    /// Returns an error when a discovery is already running or the link is
    /// unknown.
    fn discover(
        &mut self,
        connection: ConnectionId,
        service: ServiceId,
    ) -> Result<(), TransportError>;

    /// Give back the resources held by a completed discovery.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine does not recognise the set.
    fn release(&mut self, set: HandleSet) -> Result<(), TransportError>;
}

/// How a discovery ended.
#[derive(Debug, PartialEq)]
pub enum DiscoveryOutcome {
    /// The service was found; its attributes are lent until released.
    Completed(HandleSet),
    /// The peer does not expose the service.
    ServiceNotFound,
    /// The walk aborted with a transport error.
    Failed(TransportError),
}
