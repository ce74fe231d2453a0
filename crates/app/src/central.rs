//! Central dispatcher.
//!
//! [`Central`] owns the ports and the three core components and routes
//! each incoming event to them, one at a time:
//!
//! - advertisement matches go to the [`ScanController`], whose pick is
//!   handed to the [`ConnectionManager`] to connect;
//! - link and discovery outcomes go to the [`ConnectionManager`], which
//!   hands a fresh binding to the [`ServiceClient`];
//! - notifications, read completions and button edges go to the
//!   [`ServiceClient`];
//! - a disconnect of the tracked link drops the binding and restarts
//!   scanning.

use bascentral_domain::binding::ServiceBinding;
use bascentral_domain::connection::{PeerConnection, SecurityLevel};
use bascentral_domain::event::LinkPhase;
use bascentral_domain::scan::ScanFilterSet;

use crate::client::{ReadError, ServiceClient};
use crate::input::{ButtonEdge, ReadTrigger};
use crate::lifecycle::ConnectionManager;
use crate::ports::{Discovery, OutputSink, Transport, TransportEvent};
use crate::scan::{ScanController, ScanError};

/// Static configuration of a [`Central`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralConfig {
    pub filter: ScanFilterSet,
    pub security: SecurityLevel,
    pub trigger: ReadTrigger,
}

/// The connection lifecycle controller.
pub struct Central<T, D, S> {
    transport: T,
    discovery: D,
    sink: S,
    scanner: ScanController,
    link: ConnectionManager,
    client: ServiceClient,
    trigger: ReadTrigger,
}

impl<T: Transport, D: Discovery, S: OutputSink> Central<T, D, S> {
    /// Build a central over the given ports.
    #[must_use]
    pub fn new(transport: T, discovery: D, sink: S, config: CentralConfig) -> Self {
        Self {
            transport,
            discovery,
            sink,
            link: ConnectionManager::new(config.filter.service(), config.security),
            scanner: ScanController::with_filter(config.filter),
            client: ServiceClient::new(),
            trigger: config.trigger,
        }
    }

    /// Start scanning for a peer.
    ///
    /// # Errors
    ///
    /// See [`ScanController::start`].
    pub fn start(&mut self) -> Result<(), ScanError> {
        self.scanner
            .start(&mut self.transport, &self.link, &self.sink)
    }

    /// Process one event reported by the transport.
    pub fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ScanMatch(info) => {
                if let Some(peer) = self.scanner.on_match(&info, &mut self.transport, &self.sink)
                {
                    // A rejected connect leaves the slot idle; scanning
                    // stays off until the next disconnect or start().
                    let _ = self.link.connect(&peer, &mut self.transport, &self.sink);
                }
            }
            TransportEvent::ScanFailed(error) => {
                self.scanner.on_scan_failed(error, &self.sink);
            }
            TransportEvent::Connected { connection, status } => {
                self.link.on_connected(
                    connection,
                    status,
                    &mut self.transport,
                    &mut self.discovery,
                    &self.sink,
                );
            }
            TransportEvent::DiscoveryCompleted {
                connection,
                outcome,
            } => {
                self.link.on_discovery(
                    connection,
                    outcome,
                    &mut self.discovery,
                    &self.sink,
                    |binding, peer| {
                        self.client.bind(binding, peer);
                        if let Err(error) = self.client.subscribe(&mut self.transport, &self.sink)
                        {
                            tracing::debug!(%error, "continuing without notifications");
                        }
                    },
                );
            }
            TransportEvent::Notification {
                connection,
                handle,
                value,
            } => {
                self.client
                    .on_notification(connection, handle, value.as_deref(), &self.sink);
            }
            TransportEvent::ReadCompleted {
                connection,
                handle,
                result,
            } => {
                let result = result.as_deref().map_err(|&error| error);
                self.client
                    .on_read_completed(connection, handle, result, &self.sink);
            }
            TransportEvent::Disconnected { connection, reason } => {
                if self.link.on_disconnected(connection, reason, &self.sink) {
                    self.client.unbind();
                    if let Err(error) = self.start() {
                        tracing::warn!(%error, "failed to resume scanning");
                    }
                }
            }
        }
    }

    /// Process one button edge. Returns whether it requested a read.
    pub fn on_input(&mut self, edge: ButtonEdge) -> bool {
        if !self.trigger.is_read_request(edge) {
            return false;
        }
        if let Err(error) = self.read_now() {
            tracing::debug!(%error, "button press did not start a read");
        }
        true
    }

    /// Read the battery level of the bound peer once.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::read_once`].
    pub fn read_now(&mut self) -> Result<(), ReadError> {
        self.client.read_once(&mut self.transport, &self.sink)
    }

    /// Stop scanning and ask for the tracked link to be torn down.
    pub fn shutdown(&mut self) {
        self.scanner.stop(&mut self.transport, &self.sink);
        self.link.disconnect(&mut self.transport, &self.sink);
    }

    #[must_use]
    pub const fn phase(&self) -> LinkPhase {
        self.link.phase()
    }

    #[must_use]
    pub const fn is_scanning(&self) -> bool {
        self.scanner.is_scanning()
    }

    #[must_use]
    pub const fn connection(&self) -> Option<&PeerConnection> {
        self.link.connection()
    }

    #[must_use]
    pub fn binding(&self) -> Option<&ServiceBinding> {
        self.client.binding()
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub const fn discovery(&self) -> &D {
        &self.discovery
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }
}
