//! Bluetooth SIG UUIDs and the [`ServiceId`] newtype.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bluetooth base UUID (`00000000-0000-1000-8000-00805F9B34FB`).
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Expand a 16-bit SIG-assigned UUID into its 128-bit form.
#[must_use]
pub const fn uuid_from_u16(short: u16) -> uuid::Uuid {
    uuid::Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Expand a 32-bit SIG-assigned UUID into its 128-bit form.
#[must_use]
pub const fn uuid_from_u32(short: u32) -> uuid::Uuid {
    uuid::Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Battery Service (`0x180F`).
pub const BATTERY_SERVICE: ServiceId = ServiceId(uuid_from_u16(0x180F));

/// Battery Level characteristic (`0x2A19`).
pub const BATTERY_LEVEL: uuid::Uuid = uuid_from_u16(0x2A19);

/// Client Characteristic Configuration descriptor (`0x2902`).
pub const CLIENT_CHARACTERISTIC_CONFIGURATION: uuid::Uuid = uuid_from_u16(0x2902);

/// Identifier of a GATT primary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(uuid::Uuid);

impl ServiceId {
    /// Service identified by a 16-bit SIG-assigned UUID.
    #[must_use]
    pub const fn from_u16(short: u16) -> Self {
        Self(uuid_from_u16(short))
    }

    /// Wrap a full 128-bit UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Access the inner UUID.
    #[must_use]
    pub const fn as_uuid(self) -> uuid::Uuid {
        self.0
    }

    /// Return the 16-bit short form if this is a SIG-assigned UUID.
    #[must_use]
    pub fn as_u16(self) -> Option<u16> {
        let value = self.0.as_u128();
        let short = u16::try_from(value >> 96).ok()?;
        (value & !(0xFFFF_u128 << 96) == BASE_UUID).then_some(short)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_u16() {
            Some(short) => write!(f, "0x{short:04X}"),
            None => self.0.fmt(f),
        }
    }
}

impl FromStr for ServiceId {
    type Err = uuid::Error;

    /// Accepts `180f`, `0x180F`, `0000180f` or a full hyphenated UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        match hex.len() {
            4 => {
                if let Ok(short) = u16::from_str_radix(hex, 16) {
                    return Ok(Self::from_u16(short));
                }
            }
            8 => {
                if let Ok(short) = u32::from_str_radix(hex, 16) {
                    return Ok(Self(uuid_from_u32(short)));
                }
            }
            _ => {}
        }
        uuid::Uuid::parse_str(trimmed).map(Self)
    }
}
