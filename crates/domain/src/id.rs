//! Link identity.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Opaque reference to one link, allocated by the transport when a
/// connection is requested.
///
/// Every transport event that concerns a link carries this id, so events
/// for a link that has since been torn down can be told apart from events
/// for the tracked one, even across rapid reconnects to the same peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(self) -> uuid::Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        let mut buf = uuid::Uuid::encode_buffer();
        let text = self.0.simple().encode_lower(&mut buf);
        f.write_str(&text[..8])
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}
