//! Port implementations: a cheap handle queueing requests for the worker.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use bascentral_app::ports::{Discovery, Transport};
use bascentral_domain::attribute::{AttributeHandle, HandleSet};
use bascentral_domain::connection::SecurityLevel;
use bascentral_domain::error::TransportError;
use bascentral_domain::gatt::ServiceId;
use bascentral_domain::id::ConnectionId;
use bascentral_domain::peer::PeerAddress;
use bascentral_domain::scan::ScanFilterSet;

/// Request executed by the worker, in queue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    StartScan(ScanFilterSet),
    StopScan,
    Connect {
        connection: ConnectionId,
        peer: PeerAddress,
    },
    Disconnect(ConnectionId),
    Discover {
        connection: ConnectionId,
        service: ServiceId,
    },
    Read {
        connection: ConnectionId,
        handle: AttributeHandle,
    },
    Subscribe {
        connection: ConnectionId,
        value_handle: AttributeHandle,
    },
}

/// Transport and Discovery ports backed by the btleplug worker.
///
/// Every request is queued without waiting. A full queue is reported as
/// [`TransportError::Busy`], a stopped worker as
/// [`TransportError::Unavailable`].
#[derive(Debug, Clone)]
pub struct BtleplugTransport {
    commands: mpsc::Sender<Command>,
}

impl BtleplugTransport {
    pub(crate) const fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    fn send(&self, command: Command) -> Result<(), TransportError> {
        self.commands.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::Busy,
            TrySendError::Closed(_) => TransportError::Unavailable,
        })
    }
}

impl Transport for BtleplugTransport {
    fn start_scan(&mut self, filter: &ScanFilterSet) -> Result<(), TransportError> {
        self.send(Command::StartScan(filter.clone()))
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.send(Command::StopScan)
    }

    fn connect(&mut self, peer: &PeerAddress) -> Result<ConnectionId, TransportError> {
        let connection = ConnectionId::new();
        self.send(Command::Connect {
            connection,
            peer: *peer,
        })?;
        Ok(connection)
    }

    fn disconnect(&mut self, connection: ConnectionId) -> Result<(), TransportError> {
        self.send(Command::Disconnect(connection))
    }

    /// Host stacks pair on their own terms; btleplug exposes no way to ask.
    fn request_security(
        &mut self,
        _connection: ConnectionId,
        _level: SecurityLevel,
    ) -> Result<(), TransportError> {
        Err(TransportError::NotSupported)
    }

    fn read(
        &mut self,
        connection: ConnectionId,
        handle: AttributeHandle,
    ) -> Result<(), TransportError> {
        self.send(Command::Read { connection, handle })
    }

    /// The CCC handle is implied: btleplug writes the descriptor itself.
    fn subscribe(
        &mut self,
        connection: ConnectionId,
        value_handle: AttributeHandle,
        _ccc_handle: AttributeHandle,
    ) -> Result<(), TransportError> {
        self.send(Command::Subscribe {
            connection,
            value_handle,
        })
    }
}

impl Discovery for BtleplugTransport {
    fn discover(
        &mut self,
        connection: ConnectionId,
        service: ServiceId,
    ) -> Result<(), TransportError> {
        self.send(Command::Discover {
            connection,
            service,
        })
    }

    /// The worker keeps its own table; the lent set is simply dropped.
    fn release(&mut self, set: HandleSet) -> Result<(), TransportError> {
        tracing::trace!(connection = %set.connection(), "discovery result released");
        drop(set);
        Ok(())
    }
}
