//! Remote peer addressing and advertisement match information.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Whether a device address is the public (IEEE-assigned) one or a random one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Public,
    Random,
}

/// LE device address: six address bytes plus the address-type tag.
///
/// Bytes are stored most significant first, i.e. in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    bytes: [u8; 6],
    kind: AddressType,
}

impl PeerAddress {
    #[must_use]
    pub const fn new(bytes: [u8; 6], kind: AddressType) -> Self {
        Self { bytes, kind }
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 6] {
        self.bytes
    }

    #[must_use]
    pub const fn kind(&self) -> AddressType {
        self.kind
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.bytes;
        let kind = match self.kind {
            AddressType::Public => "public",
            AddressType::Random => "random",
        };
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X} ({kind})")
    }
}

impl Serialize for PeerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reasons a textual address could not be parsed.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    /// Not six colon-separated octets.
    #[error("expected six colon-separated octets, got {0}")]
    OctetCount(usize),
    /// One octet is not a two-digit hex number.
    #[error("invalid octet {0:?}")]
    Octet(String),
}

impl FromStr for PeerAddress {
    type Err = AddressParseError;

    /// Parses `AA:BB:CC:DD:EE:FF`, optionally followed by ` (random)` or
    /// ` (public)`. Without a suffix the address is taken as public.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, kind) = match s.trim().split_once(' ') {
            Some((addr, "(random)")) => (addr, AddressType::Random),
            Some((addr, _)) => (addr, AddressType::Public),
            None => (s.trim(), AddressType::Public),
        };

        let octets: Vec<&str> = addr.split(':').collect();
        if octets.len() != 6 {
            return Err(AddressParseError::OctetCount(octets.len()));
        }

        let mut bytes = [0u8; 6];
        for (slot, octet) in bytes.iter_mut().zip(&octets) {
            if octet.len() != 2 {
                return Err(AddressParseError::Octet((*octet).to_string()));
            }
            *slot = u8::from_str_radix(octet, 16)
                .map_err(|_| AddressParseError::Octet((*octet).to_string()))?;
        }

        Ok(Self::new(bytes, kind))
    }
}

/// What the transport knows about an advertiser that matched the scan filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub address: PeerAddress,
    /// Whether the advertisement was connectable.
    pub connectable: bool,
    /// Received signal strength, in dBm, when known.
    pub rssi: Option<i16>,
    /// Advertised local name, when present.
    pub name: Option<String>,
}

impl PeerInfo {
    /// Connectable advertiser with no extra metadata.
    #[must_use]
    pub fn connectable(address: PeerAddress) -> Self {
        Self {
            address,
            connectable: true,
            rssi: None,
            name: None,
        }
    }
}
