//! Battery level values and readings.
//!
//! The peer reports the battery level as a single byte holding a
//! percentage. Anything else (an aborted notification, a payload of the
//! wrong size, the reserved `0xFF` value or a percentage above 100) is
//! reported as [`BatteryLevel::Unavailable`]: it is data coming from the
//! peer, not a transport failure, and it is never clamped into range.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::id::ConnectionId;
use crate::peer::PeerAddress;

/// Value reserved to mean "no valid battery level".
pub const INVALID_LEVEL: u8 = 0xFF;

/// Highest valid percentage.
pub const MAX_LEVEL: u8 = 100;

/// UTC timestamp at which a reading was observed.
pub type Timestamp = DateTime<Utc>;

/// Normalized battery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryLevel {
    /// Level in percent, always within `0..=100`.
    Percent(u8),
    /// The peer reported that no valid level is available.
    Unavailable,
}

impl BatteryLevel {
    /// Normalize a raw level byte.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        if raw <= MAX_LEVEL {
            Self::Percent(raw)
        } else {
            Self::Unavailable
        }
    }

    /// Normalize a notification payload.
    ///
    /// `None` means the stack aborted the notification (the subscription
    /// was removed under us), which is reported as unavailable.
    #[must_use]
    pub fn from_notification(payload: Option<&[u8]>) -> Self {
        match payload {
            Some([raw]) => Self::from_raw(*raw),
            _ => Self::Unavailable,
        }
    }

    /// Percentage, when available.
    #[must_use]
    pub const fn percent(self) -> Option<u8> {
        match self {
            Self::Percent(value) => Some(value),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl fmt::Display for BatteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{value}%"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Which path produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    /// Pushed by the peer after subscription.
    Notification,
    /// Answer to an on-demand read.
    Read,
}

/// One observed battery level, tied to the connection it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryReading {
    pub connection: ConnectionId,
    pub peer: PeerAddress,
    pub level: BatteryLevel,
    pub source: ReadingSource,
    /// Arrival order across the whole process lifetime.
    pub sequence: u64,
    pub observed_at: Timestamp,
}
