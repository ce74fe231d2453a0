//! Discovered attribute table of one service.

use std::fmt;

use serde::Serialize;

use crate::gatt::ServiceId;
use crate::id::ConnectionId;

/// ATT handle of an attribute on the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AttributeHandle(pub u16);

impl fmt::Display for AttributeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Characteristic property bits, as found in the characteristic declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Properties(pub u8);

impl Properties {
    pub const BROADCAST: Self = Self(0x01);
    pub const READ: Self = Self(0x02);
    pub const WRITE_WITHOUT_RESPONSE: Self = Self(0x04);
    pub const WRITE: Self = Self(0x08);
    pub const NOTIFY: Self = Self(0x10);
    pub const INDICATE: Self = Self(0x20);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// One entry of the attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Primary service declaration.
    Service,
    /// Characteristic declaration, with the handle of its value attribute.
    Characteristic {
        value_handle: AttributeHandle,
        properties: Properties,
    },
    /// Characteristic descriptor, belonging to the preceding characteristic.
    Descriptor,
}

/// Attribute reported by the Discovery capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAttribute {
    pub handle: AttributeHandle,
    pub uuid: uuid::Uuid,
    pub kind: AttributeKind,
}

/// Result of a successful discovery of one service on one connection.
///
/// Attributes are ordered by handle. The set is deliberately not `Clone`:
/// it must be handed back to the Discovery capability exactly once, and
/// giving it up by value is what makes any later use impossible.
#[derive(Debug, PartialEq, Eq)]
pub struct HandleSet {
    connection: ConnectionId,
    service: ServiceId,
    attributes: Vec<DiscoveredAttribute>,
}

impl HandleSet {
    /// Build a set, sorting the attributes by handle.
    #[must_use]
    pub fn new(
        connection: ConnectionId,
        service: ServiceId,
        mut attributes: Vec<DiscoveredAttribute>,
    ) -> Self {
        attributes.sort_by_key(|attr| attr.handle);
        Self {
            connection,
            service,
            attributes,
        }
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    #[must_use]
    pub const fn service(&self) -> ServiceId {
        self.service
    }

    #[must_use]
    pub fn attributes(&self) -> &[DiscoveredAttribute] {
        &self.attributes
    }

    /// Find the characteristic with `uuid` and the descriptors that follow it.
    #[must_use]
    pub fn characteristic(
        &self,
        uuid: uuid::Uuid,
    ) -> Option<(&DiscoveredAttribute, &[DiscoveredAttribute])> {
        let index = self.attributes.iter().position(|attr| {
            attr.uuid == uuid && matches!(attr.kind, AttributeKind::Characteristic { .. })
        })?;
        let rest = &self.attributes[index + 1..];
        let descriptors = rest
            .iter()
            .position(|attr| attr.kind != AttributeKind::Descriptor)
            .map_or(rest, |end| &rest[..end]);
        Some((&self.attributes[index], descriptors))
    }
}
