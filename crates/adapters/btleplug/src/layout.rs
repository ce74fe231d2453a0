//! Synthetic attribute table for a discovered service.
//!
//! btleplug hides ATT handles, so the adapter numbers attributes itself,
//! in the order a GATT server lays them out: the service declaration,
//! then for each characteristic its declaration, its value and its
//! descriptors. Platforms that manage the CCC descriptor internally do not
//! list it; one is added for every characteristic that can notify or
//! indicate, since btleplug writes it on subscribe.

use std::collections::HashMap;

use bascentral_domain::attribute::{AttributeHandle, AttributeKind, DiscoveredAttribute, Properties};
use bascentral_domain::gatt::{CLIENT_CHARACTERISTIC_CONFIGURATION, ServiceId};

/// Handle given to the service declaration.
pub const FIRST_HANDLE: u16 = 0x0001;

/// A characteristic as reported by the host stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicLayout {
    pub uuid: uuid::Uuid,
    pub properties: Properties,
    pub descriptors: Vec<uuid::Uuid>,
}

impl From<&btleplug::api::Characteristic> for CharacteristicLayout {
    fn from(characteristic: &btleplug::api::Characteristic) -> Self {
        Self {
            uuid: characteristic.uuid,
            properties: Properties(characteristic.properties.bits()),
            descriptors: characteristic
                .descriptors
                .iter()
                .map(|descriptor| descriptor.uuid)
                .collect(),
        }
    }
}

/// Attributes of one service plus the lookup from value handle back to the
/// characteristic UUID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    attributes: Vec<DiscoveredAttribute>,
    values: HashMap<AttributeHandle, uuid::Uuid>,
}

impl AttributeTable {
    #[must_use]
    pub fn build(service: ServiceId, characteristics: &[CharacteristicLayout]) -> Self {
        let mut next = FIRST_HANDLE;
        let mut take = || {
            let handle = AttributeHandle(next);
            next = next.saturating_add(1);
            handle
        };

        let mut table = Self::default();
        table.attributes.push(DiscoveredAttribute {
            handle: take(),
            uuid: service.as_uuid(),
            kind: AttributeKind::Service,
        });

        for characteristic in characteristics {
            let declaration = take();
            let value_handle = take();
            table.attributes.push(DiscoveredAttribute {
                handle: declaration,
                uuid: characteristic.uuid,
                kind: AttributeKind::Characteristic {
                    value_handle,
                    properties: characteristic.properties,
                },
            });
            table.values.insert(value_handle, characteristic.uuid);

            let mut descriptors = characteristic.descriptors.clone();
            let pushes = characteristic.properties.contains(Properties::NOTIFY)
                || characteristic.properties.contains(Properties::INDICATE);
            if pushes && !descriptors.contains(&CLIENT_CHARACTERISTIC_CONFIGURATION) {
                descriptors.insert(0, CLIENT_CHARACTERISTIC_CONFIGURATION);
            }
            for uuid in descriptors {
                table.attributes.push(DiscoveredAttribute {
                    handle: take(),
                    uuid,
                    kind: AttributeKind::Descriptor,
                });
            }
        }

        table
    }

    #[must_use]
    pub fn attributes(&self) -> &[DiscoveredAttribute] {
        &self.attributes
    }

    /// UUID of the characteristic whose value lives at `handle`.
    #[must_use]
    pub fn characteristic(&self, handle: AttributeHandle) -> Option<uuid::Uuid> {
        self.values.get(&handle).copied()
    }

    /// Value handle of the characteristic with `uuid`.
    #[must_use]
    pub fn value_handle(&self, uuid: uuid::Uuid) -> Option<AttributeHandle> {
        self.values
            .iter()
            .find_map(|(handle, value)| (*value == uuid).then_some(*handle))
    }
}
