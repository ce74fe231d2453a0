//! Battery Service handles resolved on one connection.

use crate::attribute::{AttributeHandle, AttributeKind, HandleSet, Properties};
use serde::Serialize;

use crate::gatt::{BATTERY_LEVEL, CLIENT_CHARACTERISTIC_CONFIGURATION, ServiceId};
use crate::id::ConnectionId;

/// Reasons a discovered handle set cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum BindingError {
    /// Discovery returned handles for another service than the one asked for.
    #[error("discovered service {0} is not the target service")]
    UnexpectedService(ServiceId),

    /// The Battery Level characteristic is absent from the service.
    #[error("battery level characteristic not found")]
    CharacteristicNotFound,

    /// The characteristic can notify but exposes no configuration descriptor.
    #[error("battery level characteristic has no CCC descriptor")]
    MissingCccDescriptor,
}

/// Resolved Battery Level handles.
///
/// The binding keeps only the id of its owning connection: it never keeps
/// the connection alive, and is dropped as soon as that connection ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBinding {
    connection: ConnectionId,
    value_handle: AttributeHandle,
    ccc_handle: Option<AttributeHandle>,
    properties: Properties,
}

impl ServiceBinding {
    /// Resolve the Battery Level value and CCC handles from the discovery
    /// result for `service`. The Battery Service is the usual target, but
    /// any service carrying a Battery Level characteristic binds the same way.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError`] when the set describes another service,
    /// lacks the Battery Level characteristic, or advertises notifications
    /// without a CCC descriptor.
    pub fn assign(set: &HandleSet, service: ServiceId) -> Result<Self, BindingError> {
        if set.service() != service {
            return Err(BindingError::UnexpectedService(set.service()));
        }

        let (decl, descriptors) = set
            .characteristic(BATTERY_LEVEL)
            .ok_or(BindingError::CharacteristicNotFound)?;

        let AttributeKind::Characteristic {
            value_handle,
            properties,
        } = &decl.kind
        else {
            return Err(BindingError::CharacteristicNotFound);
        };

        let ccc_handle = descriptors
            .iter()
            .find(|attr| attr.uuid == CLIENT_CHARACTERISTIC_CONFIGURATION)
            .map(|attr| attr.handle);

        if properties.contains(Properties::NOTIFY) && ccc_handle.is_none() {
            return Err(BindingError::MissingCccDescriptor);
        }

        Ok(Self {
            connection: set.connection(),
            value_handle: *value_handle,
            ccc_handle,
            properties: *properties,
        })
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    #[must_use]
    pub const fn value_handle(&self) -> AttributeHandle {
        self.value_handle
    }

    #[must_use]
    pub const fn ccc_handle(&self) -> Option<AttributeHandle> {
        self.ccc_handle
    }

    /// Whether the peer can push the battery level.
    #[must_use]
    pub const fn supports_notify(&self) -> bool {
        self.properties.contains(Properties::NOTIFY)
    }
}
