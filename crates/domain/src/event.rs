//! Output events: everything the central reports to the outside world.
//!
//! The core owns no persisted state and no wire format; these events are
//! its only product. They are emitted for connection state changes, scan
//! matches, discovery and subscription outcomes, each battery reading, and
//! every error code encountered along the way.

use std::fmt;

use serde::Serialize;

use crate::battery::BatteryReading;
use crate::binding::BindingError;
use crate::connection::DisconnectReason;
use crate::error::TransportError;
use crate::gatt::ServiceId;
use crate::id::ConnectionId;
use crate::peer::PeerAddress;

/// Coarse state of the connection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPhase {
    Idle,
    Connecting,
    Connected,
    Discovering,
    Ready,
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Discovering => "discovering",
            Self::Ready => "ready",
        })
    }
}

/// Request the core issued to one of its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    StartScan,
    StopScan,
    Connect,
    Disconnect,
    Security,
    Discover,
    ReleaseDiscovery,
    Subscribe,
    Read,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StartScan => "start scan",
            Self::StopScan => "stop scan",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Security => "security",
            Self::Discover => "discover",
            Self::ReleaseDiscovery => "release discovery",
            Self::Subscribe => "subscribe",
            Self::Read => "read",
        })
    }
}

/// Event emitted by the central to its output sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputEvent {
    /// Scanning started for advertisers of `service`.
    ScanStarted { service: ServiceId },

    /// An advertiser matched the scan filter.
    FilterMatched {
        peer: PeerAddress,
        connectable: bool,
    },

    /// The connection slot moved between phases.
    StateChanged { from: LinkPhase, to: LinkPhase },

    Connected {
        connection: ConnectionId,
        peer: PeerAddress,
    },

    /// The connect attempt completed with an error.
    ConnectFailed {
        peer: PeerAddress,
        error: TransportError,
    },

    Disconnected {
        connection: ConnectionId,
        peer: PeerAddress,
        reason: DisconnectReason,
    },

    /// Discovery found the target service; `attributes` entries were resolved.
    DiscoveryCompleted {
        connection: ConnectionId,
        peer: PeerAddress,
        attributes: usize,
    },

    ServiceNotFound {
        connection: ConnectionId,
        peer: PeerAddress,
    },

    DiscoveryFailed {
        connection: ConnectionId,
        peer: PeerAddress,
        error: TransportError,
    },

    /// The discovered handles could not be bound; the link stays connected
    /// without a battery level.
    BindingFailed {
        connection: ConnectionId,
        peer: PeerAddress,
        error: BindingError,
    },

    /// Notifications are armed for the battery level.
    Subscribed {
        connection: ConnectionId,
        peer: PeerAddress,
    },

    /// A battery level, valid or unavailable.
    Reading(BatteryReading),

    /// An on-demand read completed with an error.
    ReadFailed {
        connection: ConnectionId,
        peer: PeerAddress,
        error: TransportError,
    },

    /// A request was rejected or failed; the core carried on without it.
    RequestFailed {
        operation: Operation,
        error: TransportError,
    },
}

impl OutputEvent {
    /// The reading carried by this event, if any.
    #[must_use]
    pub fn reading(&self) -> Option<&BatteryReading> {
        match self {
            Self::Reading(reading) => Some(reading),
            _ => None,
        }
    }

    /// Whether this event reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. }
                | Self::DiscoveryFailed { .. }
                | Self::BindingFailed { .. }
                | Self::ReadFailed { .. }
                | Self::RequestFailed { .. }
        )
    }
}
