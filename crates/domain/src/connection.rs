//! The single tracked link and its attributes.

use serde::{Deserialize, Serialize};

use crate::id::ConnectionId;
use crate::peer::PeerAddress;

/// Link security level, as defined by the LE security modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// No encryption.
    Low,
    /// Encryption without MITM protection.
    #[default]
    Medium,
    /// Encryption with MITM protection.
    High,
    /// LE Secure Connections with a 128-bit key.
    Fips,
}

/// HCI disconnect reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisconnectReason(pub u8);

impl DisconnectReason {
    pub const CONNECTION_TIMEOUT: Self = Self(0x08);
    pub const REMOTE_USER_TERMINATED: Self = Self(0x13);
    pub const LOCAL_HOST_TERMINATED: Self = Self(0x16);
}

/// The established link to the remote peer.
///
/// At most one exists at a time; it is owned by the connection lifecycle
/// manager and only lent out as a shared borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConnection {
    pub id: ConnectionId,
    pub peer: PeerAddress,
    pub security: SecurityLevel,
}
