//! Connection lifecycle manager.
//!
//! Owns the single connection slot and walks it through
//! `Idle → Connecting → Connected → Discovering → Ready`. A disconnect of
//! the tracked link returns to `Idle` from any phase. Every event carries
//! the [`ConnectionId`] the transport handed out at connect time; events
//! for any other id are stale and dropped.

use bascentral_domain::attribute::HandleSet;
use bascentral_domain::binding::ServiceBinding;
use bascentral_domain::connection::{DisconnectReason, PeerConnection, SecurityLevel};
use bascentral_domain::error::TransportError;
use bascentral_domain::event::{LinkPhase, Operation, OutputEvent};
use bascentral_domain::gatt::ServiceId;
use bascentral_domain::id::ConnectionId;
use bascentral_domain::peer::PeerAddress;

use crate::ports::{Discovery, DiscoveryOutcome, OutputSink, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkState {
    Idle,
    Connecting {
        connection: ConnectionId,
        peer: PeerAddress,
    },
    Connected(PeerConnection),
    Discovering(PeerConnection),
    Ready(PeerConnection),
}

impl LinkState {
    const fn phase(&self) -> LinkPhase {
        match self {
            Self::Idle => LinkPhase::Idle,
            Self::Connecting { .. } => LinkPhase::Connecting,
            Self::Connected(_) => LinkPhase::Connected,
            Self::Discovering(_) => LinkPhase::Discovering,
            Self::Ready(_) => LinkPhase::Ready,
        }
    }

    fn tracked(&self) -> Option<(ConnectionId, PeerAddress)> {
        match self {
            Self::Idle => None,
            Self::Connecting { connection, peer } => Some((*connection, *peer)),
            Self::Connected(link) | Self::Discovering(link) | Self::Ready(link) => {
                Some((link.id, link.peer))
            }
        }
    }
}

/// Sole owner and writer of the connection slot.
#[derive(Debug)]
pub struct ConnectionManager {
    state: LinkState,
    service: ServiceId,
    security: SecurityLevel,
}

impl ConnectionManager {
    /// Manager that discovers `service` and asks for `security` on every link.
    #[must_use]
    pub const fn new(service: ServiceId, security: SecurityLevel) -> Self {
        Self {
            state: LinkState::Idle,
            service,
            security,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> LinkPhase {
        self.state.phase()
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, LinkState::Idle)
    }

    /// The established link, once the connect callback reported success.
    #[must_use]
    pub const fn connection(&self) -> Option<&PeerConnection> {
        match &self.state {
            LinkState::Connected(link) | LinkState::Discovering(link) | LinkState::Ready(link) => {
                Some(link)
            }
            LinkState::Idle | LinkState::Connecting { .. } => None,
        }
    }

    /// Id of the link being tracked, including one still connecting.
    #[must_use]
    pub fn tracked(&self) -> Option<ConnectionId> {
        self.state.tracked().map(|(id, _)| id)
    }

    /// Ask the transport to connect to `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Busy`] when a link is already tracked, or
    /// the transport's rejection. Either way the slot stays as it was and
    /// scanning is not resumed.
    #[tracing::instrument(skip_all, fields(%peer))]
    pub fn connect<T: Transport, S: OutputSink>(
        &mut self,
        peer: &PeerAddress,
        transport: &mut T,
        sink: &S,
    ) -> Result<ConnectionId, TransportError> {
        if !self.is_idle() {
            tracing::warn!(phase = %self.phase(), "connection slot already in use");
            return Err(TransportError::Busy);
        }

        match transport.connect(peer) {
            Ok(connection) => {
                self.transition(
                    LinkState::Connecting {
                        connection,
                        peer: *peer,
                    },
                    sink,
                );
                Ok(connection)
            }
            Err(error) => {
                tracing::warn!(%error, code = error.code(), "connect request rejected");
                sink.emit(OutputEvent::RequestFailed {
                    operation: Operation::Connect,
                    error,
                });
                Err(error)
            }
        }
    }

    /// Outcome of a connect attempt.
    ///
    /// On success the link is recorded, a security upgrade is requested
    /// (best effort) and discovery of the target service is started.
    pub fn on_connected<T: Transport, D: Discovery, S: OutputSink>(
        &mut self,
        connection: ConnectionId,
        status: Result<(), TransportError>,
        transport: &mut T,
        discovery: &mut D,
        sink: &S,
    ) {
        let LinkState::Connecting {
            connection: pending,
            peer,
        } = self.state
        else {
            tracing::trace!(%connection, "connect event while not connecting, ignored");
            return;
        };
        if pending != connection {
            tracing::trace!(%connection, "connect event for untracked link, ignored");
            return;
        }

        if let Err(error) = status {
            tracing::warn!(%peer, %error, code = error.code(), "failed to connect");
            sink.emit(OutputEvent::ConnectFailed { peer, error });
            self.transition(LinkState::Idle, sink);
            return;
        }

        tracing::info!(%peer, %connection, "connected");
        let link = PeerConnection {
            id: connection,
            peer,
            security: self.security,
        };
        sink.emit(OutputEvent::Connected { connection, peer });
        self.transition(LinkState::Connected(link.clone()), sink);

        if let Err(error) = transport.request_security(connection, self.security) {
            tracing::warn!(%error, code = error.code(), level = ?self.security, "failed to set security");
            sink.emit(OutputEvent::RequestFailed {
                operation: Operation::Security,
                error,
            });
        }

        match discovery.discover(connection, self.service) {
            Ok(()) => self.transition(LinkState::Discovering(link), sink),
            Err(error) => {
                tracing::warn!(%error, code = error.code(), "discover failed");
                sink.emit(OutputEvent::RequestFailed {
                    operation: Operation::Discover,
                    error,
                });
            }
        }
    }

    /// Outcome of the discovery started from [`Self::on_connected`].
    ///
    /// When the link reaches `Ready`, `bind` receives the binding while the
    /// handle set is still held. The set is always handed back to
    /// `discovery` afterwards, stale or not.
    pub fn on_discovery<D, S, F>(
        &mut self,
        connection: ConnectionId,
        outcome: DiscoveryOutcome,
        discovery: &mut D,
        sink: &S,
        bind: F,
    ) where
        D: Discovery,
        S: OutputSink,
        F: FnOnce(ServiceBinding, PeerAddress),
    {
        let link = match &self.state {
            LinkState::Discovering(link) if link.id == connection => link.clone(),
            _ => {
                tracing::trace!(%connection, "discovery outcome for untracked link, ignored");
                if let DiscoveryOutcome::Completed(set) = outcome {
                    release(discovery, set, sink);
                }
                return;
            }
        };

        let set = match outcome {
            DiscoveryOutcome::Completed(set) => set,
            DiscoveryOutcome::ServiceNotFound => {
                tracing::warn!(peer = %link.peer, service = %self.service, "service not found");
                sink.emit(OutputEvent::ServiceNotFound {
                    connection,
                    peer: link.peer,
                });
                self.transition(LinkState::Connected(link), sink);
                return;
            }
            DiscoveryOutcome::Failed(error) => {
                tracing::warn!(peer = %link.peer, %error, code = error.code(), "discovery failed");
                sink.emit(OutputEvent::DiscoveryFailed {
                    connection,
                    peer: link.peer,
                    error,
                });
                self.transition(LinkState::Connected(link), sink);
                return;
            }
        };

        for attr in set.attributes() {
            tracing::debug!(handle = %attr.handle, uuid = %attr.uuid, kind = ?attr.kind, "discovered attribute");
        }
        sink.emit(OutputEvent::DiscoveryCompleted {
            connection,
            peer: link.peer,
            attributes: set.attributes().len(),
        });

        match ServiceBinding::assign(&set, self.service) {
            Ok(binding) => {
                let peer = link.peer;
                self.transition(LinkState::Ready(link), sink);
                bind(binding, peer);
            }
            Err(error) => {
                tracing::warn!(peer = %link.peer, %error, "failed to assign handles");
                sink.emit(OutputEvent::BindingFailed {
                    connection,
                    peer: link.peer,
                    error,
                });
                self.transition(LinkState::Connected(link), sink);
            }
        }
        release(discovery, set, sink);
    }

    /// A link went down. Returns `true` when it was the tracked one, in
    /// which case the slot is now empty.
    pub fn on_disconnected<S: OutputSink>(
        &mut self,
        connection: ConnectionId,
        reason: DisconnectReason,
        sink: &S,
    ) -> bool {
        let Some((tracked, peer)) = self.state.tracked() else {
            tracing::trace!(%connection, "disconnect while idle, ignored");
            return false;
        };
        if tracked != connection {
            tracing::trace!(%connection, "disconnect of untracked link, ignored");
            return false;
        }

        tracing::info!(%peer, reason = reason.0, "disconnected");
        sink.emit(OutputEvent::Disconnected {
            connection,
            peer,
            reason,
        });
        self.transition(LinkState::Idle, sink);
        true
    }

    /// Request teardown of the tracked link, if any. The slot is cleared
    /// when the transport reports the disconnect.
    pub fn disconnect<T: Transport, S: OutputSink>(&self, transport: &mut T, sink: &S) {
        let Some(connection) = self.tracked() else {
            return;
        };
        if let Err(error) = transport.disconnect(connection) {
            tracing::warn!(%error, code = error.code(), "disconnect request rejected");
            sink.emit(OutputEvent::RequestFailed {
                operation: Operation::Disconnect,
                error,
            });
        }
    }

    fn transition<S: OutputSink>(&mut self, next: LinkState, sink: &S) {
        let from = self.state.phase();
        let to = next.phase();
        self.state = next;
        if from != to {
            tracing::info!(%from, %to, "link state changed");
            sink.emit(OutputEvent::StateChanged { from, to });
        }
    }
}

fn release<D: Discovery, S: OutputSink>(
    discovery: &mut D,
    set: HandleSet,
    sink: &S,
) {
    if let Err(error) = discovery.release(set) {
        tracing::warn!(%error, code = error.code(), "failed to release discovery result");
        sink.emit(OutputEvent::RequestFailed {
            operation: Operation::ReleaseDiscovery,
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeDiscovery, FakeTransport, LEVEL_CCC, LEVEL_VALUE, RecordingSink, Request,
        battery_attributes, battery_set, peer,
    };
    use bascentral_domain::attribute::Properties;
    use bascentral_domain::binding::BindingError;
    use bascentral_domain::gatt::BATTERY_SERVICE;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(BATTERY_SERVICE, SecurityLevel::Medium)
    }

    fn connected(
        mgr: &mut ConnectionManager,
        transport: &mut FakeTransport,
        discovery: &mut FakeDiscovery,
        sink: &RecordingSink,
    ) -> ConnectionId {
        let id = mgr.connect(&peer(1), transport, sink).unwrap();
        mgr.on_connected(id, Ok(()), transport, discovery, sink);
        id
    }

    #[test]
    fn should_enter_connecting_on_accepted_connect() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();

        let id = mgr.connect(&peer(1), &mut transport, &sink).unwrap();

        assert_eq!(mgr.phase(), LinkPhase::Connecting);
        assert_eq!(mgr.tracked(), Some(id));
        assert!(mgr.connection().is_none());
        assert_eq!(transport.requests, vec![Request::Connect(peer(1))]);
    }

    #[test]
    fn should_refuse_second_connect_while_slot_in_use() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();
        mgr.connect(&peer(1), &mut transport, &sink).unwrap();

        let result = mgr.connect(&peer(2), &mut transport, &sink);

        assert_eq!(result, Err(TransportError::Busy));
        assert_eq!(transport.count(|r| matches!(r, Request::Connect(_))), 1);
    }

    #[test]
    fn should_stay_idle_when_connect_is_rejected() {
        let mut mgr = manager();
        let mut transport = FakeTransport::failing(Operation::Connect, TransportError::Code(-12));
        let sink = RecordingSink::default();

        let result = mgr.connect(&peer(1), &mut transport, &sink);

        assert_eq!(result, Err(TransportError::Code(-12)));
        assert!(mgr.is_idle());
        assert_eq!(
            sink.events(),
            vec![OutputEvent::RequestFailed {
                operation: Operation::Connect,
                error: TransportError::Code(-12),
            }]
        );
    }

    #[test]
    fn should_request_security_and_discovery_after_connect() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();

        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);

        assert_eq!(mgr.phase(), LinkPhase::Discovering);
        assert_eq!(mgr.connection().unwrap().security, SecurityLevel::Medium);
        assert!(transport.requests.contains(&Request::Security(id, SecurityLevel::Medium)));
        assert_eq!(discovery.requests, vec![Request::Discover(id, BATTERY_SERVICE)]);
    }

    #[test]
    fn should_continue_discovery_when_security_fails() {
        let mut mgr = manager();
        let mut transport = FakeTransport::failing(Operation::Security, TransportError::NotSupported);
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();

        connected(&mut mgr, &mut transport, &mut discovery, &sink);

        assert_eq!(mgr.phase(), LinkPhase::Discovering);
        assert_eq!(
            sink.count(|e| matches!(
                e,
                OutputEvent::RequestFailed {
                    operation: Operation::Security,
                    ..
                }
            )),
            1
        );
    }

    #[test]
    fn should_stay_connected_when_discover_is_rejected() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        discovery
            .failures
            .insert(Operation::Discover, TransportError::Busy);
        let sink = RecordingSink::default();

        connected(&mut mgr, &mut transport, &mut discovery, &sink);

        assert_eq!(mgr.phase(), LinkPhase::Connected);
    }

    #[test]
    fn should_return_to_idle_on_connect_failure() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = mgr.connect(&peer(1), &mut transport, &sink).unwrap();

        mgr.on_connected(
            id,
            Err(TransportError::Code(0x3E)),
            &mut transport,
            &mut discovery,
            &sink,
        );

        assert!(mgr.is_idle());
        assert!(discovery.requests.is_empty());
        assert!(sink.events().contains(&OutputEvent::ConnectFailed {
            peer: peer(1),
            error: TransportError::Code(0x3E),
        }));
    }

    #[test]
    fn should_ignore_connect_event_for_other_link() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        mgr.connect(&peer(1), &mut transport, &sink).unwrap();

        mgr.on_connected(
            ConnectionId::new(),
            Ok(()),
            &mut transport,
            &mut discovery,
            &sink,
        );

        assert_eq!(mgr.phase(), LinkPhase::Connecting);
        assert!(discovery.requests.is_empty());
    }

    #[test]
    fn should_become_ready_and_release_once_on_discovery() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let mut bound = None;

        mgr.on_discovery(
            id,
            DiscoveryOutcome::Completed(battery_set(id)),
            &mut discovery,
            &sink,
            |binding, peer| bound = Some((binding, peer)),
        );

        assert_eq!(mgr.phase(), LinkPhase::Ready);
        let (binding, bound_peer) = bound.unwrap();
        assert_eq!(binding.value_handle(), LEVEL_VALUE);
        assert_eq!(bound_peer, peer(1));
        assert_eq!(discovery.released(), 1);
        assert!(sink.events().contains(&OutputEvent::DiscoveryCompleted {
            connection: id,
            peer: peer(1),
            attributes: 3,
        }));
    }

    #[test]
    fn should_bind_while_handle_set_is_still_held() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        discovery
            .failures
            .insert(Operation::ReleaseDiscovery, TransportError::Busy);
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let mut failures_at_bind = None;

        mgr.on_discovery(
            id,
            DiscoveryOutcome::Completed(battery_set(id)),
            &mut discovery,
            &sink,
            |_, _| failures_at_bind = Some(sink.count(OutputEvent::is_error)),
        );

        // The failed release is reported after the binding was handed over.
        assert_eq!(failures_at_bind, Some(0));
        assert_eq!(sink.count(OutputEvent::is_error), 1);
        assert_eq!(mgr.phase(), LinkPhase::Ready);
    }

    #[test]
    fn should_become_ready_for_configured_service() {
        let vendor = ServiceId::from_u16(0x1812);
        let mut mgr = ConnectionManager::new(vendor, SecurityLevel::Medium);
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let set = HandleSet::new(
            id,
            vendor,
            battery_attributes(Properties::READ.union(Properties::NOTIFY), true),
        );
        let mut bound = None;

        mgr.on_discovery(
            id,
            DiscoveryOutcome::Completed(set),
            &mut discovery,
            &sink,
            |binding, _| bound = Some(binding),
        );

        assert_eq!(discovery.requests[0], Request::Discover(id, vendor));
        assert_eq!(mgr.phase(), LinkPhase::Ready);
        assert_eq!(bound.unwrap().ccc_handle(), Some(LEVEL_CCC));
        assert_eq!(sink.count(OutputEvent::is_error), 0);
    }

    #[test]
    fn should_fall_back_to_connected_when_binding_fails() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let set = HandleSet::new(id, BATTERY_SERVICE, Vec::new());
        let mut bound = false;

        mgr.on_discovery(
            id,
            DiscoveryOutcome::Completed(set),
            &mut discovery,
            &sink,
            |_, _| bound = true,
        );

        assert!(!bound);
        assert_eq!(mgr.phase(), LinkPhase::Connected);
        assert_eq!(discovery.released(), 1);
        assert!(sink.events().contains(&OutputEvent::BindingFailed {
            connection: id,
            peer: peer(1),
            error: BindingError::CharacteristicNotFound,
        }));
    }

    #[test]
    fn should_report_notifying_level_without_ccc_as_error() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let set = HandleSet::new(
            id,
            BATTERY_SERVICE,
            battery_attributes(Properties::READ.union(Properties::NOTIFY), false),
        );

        mgr.on_discovery(id, DiscoveryOutcome::Completed(set), &mut discovery, &sink, |_, _| {});

        assert_eq!(mgr.phase(), LinkPhase::Connected);
        assert_eq!(sink.count(OutputEvent::is_error), 1);
        assert!(sink.events().contains(&OutputEvent::BindingFailed {
            connection: id,
            peer: peer(1),
            error: BindingError::MissingCccDescriptor,
        }));
    }

    #[test]
    fn should_degrade_to_connected_when_service_missing() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let mut bound = false;

        mgr.on_discovery(
            id,
            DiscoveryOutcome::ServiceNotFound,
            &mut discovery,
            &sink,
            |_, _| bound = true,
        );

        assert!(!bound);
        assert_eq!(mgr.phase(), LinkPhase::Connected);
        assert!(sink.events().contains(&OutputEvent::ServiceNotFound {
            connection: id,
            peer: peer(1),
        }));
    }

    #[test]
    fn should_degrade_to_connected_on_discovery_error() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);

        mgr.on_discovery(
            id,
            DiscoveryOutcome::Failed(TransportError::Code(0x0E)),
            &mut discovery,
            &sink,
            |_, _| {},
        );

        assert_eq!(mgr.phase(), LinkPhase::Connected);
        assert_eq!(sink.count(OutputEvent::is_error), 1);
    }

    #[test]
    fn should_release_stale_discovery_without_state_change() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        connected(&mut mgr, &mut transport, &mut discovery, &sink);
        let stale = ConnectionId::new();
        let mut bound = false;

        mgr.on_discovery(
            stale,
            DiscoveryOutcome::Completed(battery_set(stale)),
            &mut discovery,
            &sink,
            |_, _| bound = true,
        );

        assert!(!bound);
        assert_eq!(mgr.phase(), LinkPhase::Discovering);
        assert_eq!(discovery.requests.last(), Some(&Request::Release(stale)));
    }

    #[test]
    fn should_clear_slot_on_tracked_disconnect() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);

        let cleared = mgr.on_disconnected(id, DisconnectReason::REMOTE_USER_TERMINATED, &sink);

        assert!(cleared);
        assert!(mgr.is_idle());
        assert!(mgr.connection().is_none());
        assert_eq!(
            sink.events().last(),
            Some(&OutputEvent::StateChanged {
                from: LinkPhase::Discovering,
                to: LinkPhase::Idle,
            })
        );
    }

    #[test]
    fn should_clear_slot_on_disconnect_while_connecting() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();
        let id = mgr.connect(&peer(1), &mut transport, &sink).unwrap();

        assert!(mgr.on_disconnected(id, DisconnectReason::CONNECTION_TIMEOUT, &sink));
        assert!(mgr.is_idle());
    }

    #[test]
    fn should_ignore_disconnect_of_untracked_link() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        connected(&mut mgr, &mut transport, &mut discovery, &sink);
        sink.clear();

        let cleared = mgr.on_disconnected(
            ConnectionId::new(),
            DisconnectReason::REMOTE_USER_TERMINATED,
            &sink,
        );

        assert!(!cleared);
        assert_eq!(mgr.phase(), LinkPhase::Discovering);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn should_request_teardown_of_tracked_link() {
        let mut mgr = manager();
        let mut transport = FakeTransport::default();
        let mut discovery = FakeDiscovery::default();
        let sink = RecordingSink::default();
        let id = connected(&mut mgr, &mut transport, &mut discovery, &sink);

        mgr.disconnect(&mut transport, &sink);

        assert_eq!(transport.requests.last(), Some(&Request::Disconnect(id)));
        assert_eq!(mgr.phase(), LinkPhase::Discovering);
    }
}
