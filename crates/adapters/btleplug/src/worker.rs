//! Worker task owning the btleplug adapter.
//!
//! Executes queued [`Command`]s strictly in order and turns btleplug
//! central events and notification streams into [`TransportEvent`]s.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use btleplug::api::{
    AddressType as BtAddressType, BDAddr, Central as _, CentralEvent, Characteristic,
    Peripheral as _, PeripheralProperties, ScanFilter, ValueNotification,
};
use btleplug::platform::{Adapter, Peripheral, PeripheralId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt as _};

use bascentral_app::ports::{DiscoveryOutcome, TransportEvent};
use bascentral_domain::attribute::{AttributeHandle, HandleSet};
use bascentral_domain::connection::DisconnectReason;
use bascentral_domain::error::TransportError;
use bascentral_domain::gatt::ServiceId;
use bascentral_domain::id::ConnectionId;
use bascentral_domain::peer::{AddressType, PeerAddress, PeerInfo};
use bascentral_domain::scan::ScanFilterSet;

use crate::error::{timed_out, transport_error, unknown_handle};
use crate::layout::{AttributeTable, CharacteristicLayout};
use crate::transport::Command;

pub(crate) type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;
type Notifications = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

struct Link {
    peripheral: Peripheral,
    service: Option<uuid::Uuid>,
    table: AttributeTable,
    closing: bool,
    notifications: Option<JoinHandle<()>>,
}

impl Link {
    fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            service: None,
            table: AttributeTable::default(),
            closing: false,
            notifications: None,
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(task) = self.notifications.take() {
            task.abort();
        }
    }
}

pub(crate) struct Worker {
    adapter: Adapter,
    connect_timeout: Duration,
    events: mpsc::Sender<TransportEvent>,
    filter: Option<ScanFilterSet>,
    links: HashMap<ConnectionId, Link>,
}

impl Worker {
    pub(crate) fn new(
        adapter: Adapter,
        connect_timeout: Duration,
        events: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            adapter,
            connect_timeout,
            events,
            filter: None,
            links: HashMap::new(),
        }
    }

    /// Run until the command queue closes or the adapter stops reporting.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut central_events: CentralEvents,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.execute(command).await,
                    None => break,
                },
                event = central_events.next() => match event {
                    Some(event) => self.on_central_event(event).await,
                    None => {
                        tracing::warn!("bluetooth adapter event stream ended");
                        break;
                    }
                },
            }
        }

        if self.filter.take().is_some()
            && let Err(err) = self.adapter.stop_scan().await
        {
            tracing::debug!(%err, "failed to stop scanning on exit");
        }
        self.links.clear();
        tracing::debug!("btleplug worker stopped");
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn execute(&mut self, command: Command) {
        match command {
            Command::StartScan(filter) => self.start_scan(filter).await,
            Command::StopScan => {
                self.filter = None;
                if let Err(err) = self.adapter.stop_scan().await {
                    tracing::warn!(%err, "stop scan failed");
                }
            }
            Command::Connect { connection, peer } => {
                let status = self.connect(connection, peer).await;
                self.emit(TransportEvent::Connected { connection, status })
                    .await;
            }
            Command::Disconnect(connection) => self.disconnect(connection).await,
            Command::Discover {
                connection,
                service,
            } => {
                let outcome = self.discover(connection, service).await;
                self.emit(TransportEvent::DiscoveryCompleted {
                    connection,
                    outcome,
                })
                .await;
            }
            Command::Read { connection, handle } => {
                let result = match self.characteristic(connection, handle) {
                    Ok((peripheral, characteristic)) => peripheral
                        .read(&characteristic)
                        .await
                        .map_err(|err| transport_error(&err)),
                    Err(error) => Err(error),
                };
                self.emit(TransportEvent::ReadCompleted {
                    connection,
                    handle,
                    result,
                })
                .await;
            }
            Command::Subscribe {
                connection,
                value_handle,
            } => {
                if let Err(error) = self.subscribe(connection, value_handle).await {
                    tracing::warn!(%error, "subscription aborted");
                    self.emit(TransportEvent::Notification {
                        connection,
                        handle: value_handle,
                        value: None,
                    })
                    .await;
                }
            }
        }
    }

    async fn start_scan(&mut self, filter: ScanFilterSet) {
        if !filter.is_active() {
            tracing::debug!("passive scanning not selectable, host default used");
        }
        let scan = ScanFilter {
            services: vec![filter.service().as_uuid()],
        };
        match self.adapter.start_scan(scan).await {
            Ok(()) => self.filter = Some(filter),
            Err(err) => {
                let error = transport_error(&err);
                tracing::warn!(%err, code = error.code(), "start scan failed");
                self.emit(TransportEvent::ScanFailed(error)).await;
            }
        }
    }

    async fn connect(
        &mut self,
        connection: ConnectionId,
        peer: PeerAddress,
    ) -> Result<(), TransportError> {
        let address = BDAddr::from(peer.bytes());
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|err| transport_error(&err))?;
        let peripheral = peripherals
            .into_iter()
            .find(|p| p.address() == address)
            .ok_or(TransportError::Unavailable)?;

        match tokio::time::timeout(self.connect_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {
                self.links.insert(connection, Link::new(peripheral));
                Ok(())
            }
            Ok(Err(err)) => Err(transport_error(&err)),
            Err(_) => Err(timed_out()),
        }
    }

    async fn disconnect(&mut self, connection: ConnectionId) {
        let Some(link) = self.links.get_mut(&connection) else {
            tracing::trace!(%connection, "disconnect of unknown link");
            return;
        };
        link.closing = true;
        if let Err(err) = link.peripheral.disconnect().await {
            tracing::warn!(%err, "disconnect failed");
            return;
        }
        self.links.remove(&connection);
        self.emit(TransportEvent::Disconnected {
            connection,
            reason: DisconnectReason::LOCAL_HOST_TERMINATED,
        })
        .await;
    }

    async fn discover(&mut self, connection: ConnectionId, service: ServiceId) -> DiscoveryOutcome {
        let Some(link) = self.links.get_mut(&connection) else {
            return DiscoveryOutcome::Failed(TransportError::NotConnected);
        };
        if let Err(err) = link.peripheral.discover_services().await {
            return DiscoveryOutcome::Failed(transport_error(&err));
        }

        let services = link.peripheral.services();
        let Some(found) = services.iter().find(|s| s.uuid == service.as_uuid()) else {
            return DiscoveryOutcome::ServiceNotFound;
        };
        let layout: Vec<CharacteristicLayout> = found
            .characteristics
            .iter()
            .map(CharacteristicLayout::from)
            .collect();

        link.table = AttributeTable::build(service, &layout);
        link.service = Some(found.uuid);
        DiscoveryOutcome::Completed(HandleSet::new(
            connection,
            service,
            link.table.attributes().to_vec(),
        ))
    }

    async fn subscribe(
        &mut self,
        connection: ConnectionId,
        value_handle: AttributeHandle,
    ) -> Result<(), TransportError> {
        let (peripheral, characteristic) = self.characteristic(connection, value_handle)?;
        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|err| transport_error(&err))?;

        let Some(link) = self.links.get_mut(&connection) else {
            return Err(TransportError::NotConnected);
        };
        if link.notifications.is_none() {
            let stream = peripheral
                .notifications()
                .await
                .map_err(|err| transport_error(&err))?;
            link.notifications = Some(tokio::spawn(forward_notifications(
                stream,
                connection,
                link.table.clone(),
                self.events.clone(),
            )));
        }
        Ok(())
    }

    fn characteristic(
        &self,
        connection: ConnectionId,
        handle: AttributeHandle,
    ) -> Result<(Peripheral, Characteristic), TransportError> {
        let link = self
            .links
            .get(&connection)
            .ok_or(TransportError::NotConnected)?;
        let uuid = link.table.characteristic(handle).ok_or_else(unknown_handle)?;
        let characteristic = link
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid && Some(c.service_uuid) == link.service)
            .ok_or_else(unknown_handle)?;
        Ok((link.peripheral.clone(), characteristic))
    }

    async fn on_central_event(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id)
            | CentralEvent::DeviceUpdated(id)
            | CentralEvent::ServicesAdvertisement { id, .. } => self.on_advertisement(&id).await,
            CentralEvent::DeviceDisconnected(id) => self.on_disconnected(&id).await,
            _ => {}
        }
    }

    async fn on_advertisement(&self, id: &PeripheralId) {
        let Some(filter) = &self.filter else {
            return;
        };
        let Ok(peripheral) = self.adapter.peripheral(id).await else {
            return;
        };
        let Ok(Some(props)) = peripheral.properties().await else {
            return;
        };
        if !filter.matches(&props.services) {
            return;
        }
        self.emit(TransportEvent::ScanMatch(peer_info(&props))).await;
    }

    async fn on_disconnected(&mut self, id: &PeripheralId) {
        let Some(connection) = self
            .links
            .iter()
            .find_map(|(connection, link)| (link.peripheral.id() == *id).then_some(*connection))
        else {
            return;
        };
        let Some(link) = self.links.remove(&connection) else {
            return;
        };
        let reason = if link.closing {
            DisconnectReason::LOCAL_HOST_TERMINATED
        } else {
            DisconnectReason::REMOTE_USER_TERMINATED
        };
        self.emit(TransportEvent::Disconnected { connection, reason })
            .await;
    }

    async fn emit(&self, event: TransportEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

async fn forward_notifications(
    mut stream: Notifications,
    connection: ConnectionId,
    table: AttributeTable,
    events: mpsc::Sender<TransportEvent>,
) {
    while let Some(notification) = stream.next().await {
        let Some(handle) = table.value_handle(notification.uuid) else {
            tracing::trace!(uuid = %notification.uuid, "notification for unknown characteristic");
            continue;
        };
        let event = TransportEvent::Notification {
            connection,
            handle,
            value: Some(notification.value),
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
}

pub(crate) fn peer_info(props: &PeripheralProperties) -> PeerInfo {
    let kind = match props.address_type {
        Some(BtAddressType::Random) => AddressType::Random,
        Some(BtAddressType::Public) | None => AddressType::Public,
    };
    PeerInfo {
        address: PeerAddress::new(props.address.into_inner(), kind),
        connectable: true,
        rssi: props.rssi,
        name: props.local_name.clone(),
    }
}
