//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use bascentral_domain::attribute::{
    AttributeHandle, AttributeKind, DiscoveredAttribute, HandleSet, Properties,
};
use bascentral_domain::connection::SecurityLevel;
use bascentral_domain::error::TransportError;
use bascentral_domain::event::{OutputEvent, Operation};
use bascentral_domain::gatt::{
    BATTERY_LEVEL, BATTERY_SERVICE, CLIENT_CHARACTERISTIC_CONFIGURATION, ServiceId,
};
use bascentral_domain::id::ConnectionId;
use bascentral_domain::peer::{AddressType, PeerAddress, PeerInfo};
use bascentral_domain::scan::ScanFilterSet;

use crate::ports::{Discovery, OutputSink, Transport};

pub const LEVEL_VALUE: AttributeHandle = AttributeHandle(0x12);
pub const LEVEL_CCC: AttributeHandle = AttributeHandle(0x13);

/// Request recorded by the fakes, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    StartScan(ServiceId),
    StopScan,
    Connect(PeerAddress),
    Disconnect(ConnectionId),
    Security(ConnectionId, SecurityLevel),
    Read(ConnectionId, AttributeHandle),
    Subscribe(ConnectionId, AttributeHandle, AttributeHandle),
    Discover(ConnectionId, ServiceId),
    Release(ConnectionId),
}

#[derive(Default)]
pub struct FakeTransport {
    pub requests: Vec<Request>,
    pub failures: HashMap<Operation, TransportError>,
    pub last_connection: Option<ConnectionId>,
}

impl FakeTransport {
    pub fn failing(operation: Operation, error: TransportError) -> Self {
        let mut transport = Self::default();
        transport.failures.insert(operation, error);
        transport
    }

    pub fn count(&self, pred: impl Fn(&Request) -> bool) -> usize {
        self.requests.iter().filter(|r| pred(r)).count()
    }

    fn check(&self, operation: Operation) -> Result<(), TransportError> {
        self.failures.get(&operation).copied().map_or(Ok(()), Err)
    }
}

impl Transport for FakeTransport {
    fn start_scan(&mut self, filter: &ScanFilterSet) -> Result<(), TransportError> {
        self.requests.push(Request::StartScan(filter.service()));
        self.check(Operation::StartScan)
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.requests.push(Request::StopScan);
        self.check(Operation::StopScan)
    }

    fn connect(&mut self, peer: &PeerAddress) -> Result<ConnectionId, TransportError> {
        self.requests.push(Request::Connect(*peer));
        self.check(Operation::Connect)?;
        let id = ConnectionId::new();
        self.last_connection = Some(id);
        Ok(id)
    }

    fn disconnect(&mut self, connection: ConnectionId) -> Result<(), TransportError> {
        self.requests.push(Request::Disconnect(connection));
        self.check(Operation::Disconnect)
    }

    fn request_security(
        &mut self,
        connection: ConnectionId,
        level: SecurityLevel,
    ) -> Result<(), TransportError> {
        self.requests.push(Request::Security(connection, level));
        self.check(Operation::Security)
    }

    fn read(
        &mut self,
        connection: ConnectionId,
        handle: AttributeHandle,
    ) -> Result<(), TransportError> {
        self.requests.push(Request::Read(connection, handle));
        self.check(Operation::Read)
    }

    fn subscribe(
        &mut self,
        connection: ConnectionId,
        value_handle: AttributeHandle,
        ccc_handle: AttributeHandle,
    ) -> Result<(), TransportError> {
        self.requests
            .push(Request::Subscribe(connection, value_handle, ccc_handle));
        self.check(Operation::Subscribe)
    }
}

#[derive(Default)]
pub struct FakeDiscovery {
    pub requests: Vec<Request>,
    pub failures: HashMap<Operation, TransportError>,
}

impl FakeDiscovery {
    pub fn released(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, Request::Release(_)))
            .count()
    }

    fn check(&self, operation: Operation) -> Result<(), TransportError> {
        self.failures.get(&operation).copied().map_or(Ok(()), Err)
    }
}

impl Discovery for FakeDiscovery {
    fn discover(
        &mut self,
        connection: ConnectionId,
        service: ServiceId,
    ) -> Result<(), TransportError> {
        self.requests.push(Request::Discover(connection, service));
        self.check(Operation::Discover)
    }

    fn release(&mut self, set: HandleSet) -> Result<(), TransportError> {
        self.requests.push(Request::Release(set.connection()));
        self.check(Operation::ReleaseDiscovery)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<OutputEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&OutputEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl OutputSink for RecordingSink {
    fn emit(&self, event: OutputEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn peer(last: u8) -> PeerAddress {
    PeerAddress::new([0xC0, 0, 0, 0, 0, last], AddressType::Random)
}

pub fn advert(last: u8) -> PeerInfo {
    PeerInfo::connectable(peer(last))
}

pub fn battery_attributes(properties: Properties, with_ccc: bool) -> Vec<DiscoveredAttribute> {
    let mut attributes = vec![
        DiscoveredAttribute {
            handle: AttributeHandle(0x10),
            uuid: BATTERY_SERVICE.as_uuid(),
            kind: AttributeKind::Service,
        },
        DiscoveredAttribute {
            handle: AttributeHandle(0x11),
            uuid: BATTERY_LEVEL,
            kind: AttributeKind::Characteristic {
                value_handle: LEVEL_VALUE,
                properties,
            },
        },
    ];
    if with_ccc {
        attributes.push(DiscoveredAttribute {
            handle: LEVEL_CCC,
            uuid: CLIENT_CHARACTERISTIC_CONFIGURATION,
            kind: AttributeKind::Descriptor,
        });
    }
    attributes
}

/// Battery Service with a readable, notifying level and its CCC.
pub fn battery_set(connection: ConnectionId) -> HandleSet {
    HandleSet::new(
        connection,
        BATTERY_SERVICE,
        battery_attributes(Properties::READ.union(Properties::NOTIFY), true),
    )
}
