//! Transport port: scanning, links, security and attribute requests.

use bascentral_domain::attribute::AttributeHandle;
use bascentral_domain::connection::{DisconnectReason, SecurityLevel};
use bascentral_domain::error::TransportError;
use bascentral_domain::id::ConnectionId;
use bascentral_domain::peer::{PeerAddress, PeerInfo};
use bascentral_domain::scan::ScanFilterSet;

use crate::ports::discovery::DiscoveryOutcome;

/// The radio stack, seen from the central.
///
/// Implementations queue the work and return immediately. Outcomes of
/// accepted requests are delivered later as [`TransportEvent`]s through the
/// event loop, never from inside these calls.
pub trait Transport {
    /// Start scanning with the given advertisement filter.
    ///
    /// # Errors
    ///
    /// Returns an error when the stack refuses to start scanning.
    fn start_scan(&mut self, filter: &ScanFilterSet) -> Result<(), TransportError>;

    /// Stop scanning.
    ///
    /// # Errors
    ///
    /// Returns an error when the stack refuses to stop scanning.
    fn stop_scan(&mut self) -> Result<(), TransportError>;

    /// Initiate a connection to `peer`.
    ///
    /// Returns the id every later event about this link will carry. The
    /// outcome arrives as [`TransportEvent::Connected`].
    ///
    /// # Errors
    ///
    /// Returns an error when the connect request is rejected.
    fn connect(&mut self, peer: &PeerAddress) -> Result<ConnectionId, TransportError>;

    /// Tear down a link. Completion arrives as [`TransportEvent::Disconnected`].
    ///
    /// # Errors
    ///
    /// Returns an error when the link is unknown to the stack.
    fn disconnect(&mut self, connection: ConnectionId) -> Result<(), TransportError>;

    /// Ask for the link to be raised to `level`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request is rejected or unsupported.
    fn request_security(
        &mut self,
        connection: ConnectionId,
        level: SecurityLevel,
    ) -> Result<(), TransportError>;

    /// Read an attribute value. The value arrives as
    /// [`TransportEvent::ReadCompleted`].
    ///
    /// # Errors
    ///
    /// Returns an error when the read request is rejected.
    fn read(
        &mut self,
        connection: ConnectionId,
        handle: AttributeHandle,
    ) -> Result<(), TransportError>;

    /// Enable notifications by writing the CCC descriptor. Values arrive as
    /// [`TransportEvent::Notification`].
    ///
    /// # Errors
    ///
    /// Returns an error when the subscribe request is rejected.
    fn subscribe(
        &mut self,
        connection: ConnectionId,
        value_handle: AttributeHandle,
        ccc_handle: AttributeHandle,
    ) -> Result<(), TransportError>;
}

/// Asynchronous outcome or unsolicited event reported by the stack.
#[derive(Debug, PartialEq)]
pub enum TransportEvent {
    /// An advertiser matched the configured filter.
    ScanMatch(PeerInfo),

    /// An accepted scan request could not be carried out; no scan is
    /// running.
    ScanFailed(TransportError),

    /// A connect attempt completed.
    Connected {
        connection: ConnectionId,
        status: Result<(), TransportError>,
    },

    /// A link went down.
    Disconnected {
        connection: ConnectionId,
        reason: DisconnectReason,
    },

    /// A discovery started through the [`Discovery`](super::Discovery) port finished.
    DiscoveryCompleted {
        connection: ConnectionId,
        outcome: DiscoveryOutcome,
    },

    /// The peer pushed a value. `None` means the stack aborted the
    /// subscription.
    Notification {
        connection: ConnectionId,
        handle: AttributeHandle,
        value: Option<Vec<u8>>,
    },

    /// An attribute read finished.
    ReadCompleted {
        connection: ConnectionId,
        handle: AttributeHandle,
        result: Result<Vec<u8>, TransportError>,
    },
}

impl TransportEvent {
    /// The link this event concerns, if any.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Self::ScanMatch(_) | Self::ScanFailed(_) => None,
            Self::Connected { connection, .. }
            | Self::Disconnected { connection, .. }
            | Self::DiscoveryCompleted { connection, .. }
            | Self::Notification { connection, .. }
            | Self::ReadCompleted { connection, .. } => Some(*connection),
        }
    }
}
