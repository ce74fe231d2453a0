//! Battery Service client state machine.
//!
//! Holds the [`ServiceBinding`] of the current link, arms notifications
//! once per binding, runs on-demand reads and turns every value the peer
//! reports into a [`BatteryReading`].

use bascentral_domain::attribute::AttributeHandle;
use bascentral_domain::battery::{BatteryLevel, BatteryReading, ReadingSource};
use bascentral_domain::binding::ServiceBinding;
use bascentral_domain::error::TransportError;
use bascentral_domain::event::{Operation, OutputEvent};
use bascentral_domain::id::ConnectionId;
use bascentral_domain::peer::PeerAddress;

use crate::ports::{OutputSink, Transport};

/// Reasons notifications could not be armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error("no battery service bound")]
    NotBound,

    /// The characteristic does not support notifications.
    #[error("battery level does not support notifications")]
    NotSupported,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Reasons an on-demand read could not be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("no battery service bound")]
    NotBound,

    /// A previous read has not completed yet.
    #[error("a read is already in progress")]
    ReadInProgress,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug)]
struct Bound {
    binding: ServiceBinding,
    peer: PeerAddress,
    subscribed: bool,
    read_pending: bool,
}

/// Client side of the Battery Service on the current link.
#[derive(Debug, Default)]
pub struct ServiceClient {
    bound: Option<Bound>,
    next_sequence: u64,
}

impl ServiceClient {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bound: None,
            next_sequence: 0,
        }
    }

    /// Attach to the handles resolved on a new link, replacing any previous
    /// binding.
    pub fn bind(&mut self, binding: ServiceBinding, peer: PeerAddress) {
        tracing::debug!(
            %peer,
            value = %binding.value_handle(),
            ccc = ?binding.ccc_handle(),
            "battery service bound"
        );
        self.bound = Some(Bound {
            binding,
            peer,
            subscribed: false,
            read_pending: false,
        });
    }

    /// Drop the binding. Later callbacks for its link are stale.
    pub fn unbind(&mut self) {
        self.bound = None;
    }

    #[must_use]
    pub fn binding(&self) -> Option<&ServiceBinding> {
        self.bound.as_ref().map(|bound| &bound.binding)
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.bound.as_ref().is_some_and(|bound| bound.subscribed)
    }

    #[must_use]
    pub fn is_read_pending(&self) -> bool {
        self.bound.as_ref().is_some_and(|bound| bound.read_pending)
    }

    /// Arm battery level notifications. Does nothing when already armed.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::NotBound`] without a binding,
    /// [`SubscribeError::NotSupported`] when the characteristic cannot
    /// notify, and the transport's rejection otherwise. The binding stays
    /// usable for reads in every case.
    #[tracing::instrument(skip_all)]
    pub fn subscribe<T: Transport, S: OutputSink>(
        &mut self,
        transport: &mut T,
        sink: &S,
    ) -> Result<(), SubscribeError> {
        let bound = self.bound.as_mut().ok_or(SubscribeError::NotBound)?;
        if bound.subscribed {
            return Ok(());
        }

        let ccc = match bound.binding.ccc_handle() {
            Some(ccc) if bound.binding.supports_notify() => ccc,
            _ => {
                tracing::warn!(peer = %bound.peer, "battery level cannot notify");
                sink.emit(OutputEvent::RequestFailed {
                    operation: Operation::Subscribe,
                    error: TransportError::NotSupported,
                });
                return Err(SubscribeError::NotSupported);
            }
        };

        let connection = bound.binding.connection();
        if let Err(error) = transport.subscribe(connection, bound.binding.value_handle(), ccc) {
            tracing::warn!(%error, code = error.code(), "subscribe failed");
            sink.emit(OutputEvent::RequestFailed {
                operation: Operation::Subscribe,
                error,
            });
            return Err(error.into());
        }

        bound.subscribed = true;
        tracing::info!(peer = %bound.peer, "subscribed to battery level");
        sink.emit(OutputEvent::Subscribed {
            connection,
            peer: bound.peer,
        });
        Ok(())
    }

    /// A value pushed by the peer. `None` means the subscription was
    /// aborted by the stack. Returns the level reported to the sink.
    pub fn on_notification<S: OutputSink>(
        &mut self,
        connection: ConnectionId,
        handle: AttributeHandle,
        value: Option<&[u8]>,
        sink: &S,
    ) -> Option<BatteryLevel> {
        let Some(bound) = self.current(connection, handle) else {
            tracing::trace!(%connection, %handle, "notification for unbound handle, ignored");
            return None;
        };
        if value.is_none() {
            tracing::debug!(peer = %bound.peer, "notification aborted");
            bound.subscribed = false;
        }
        let peer = bound.peer;

        let level = BatteryLevel::from_notification(value);
        self.report(connection, peer, level, ReadingSource::Notification, sink);
        Some(level)
    }

    /// Issue one read of the battery level.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::NotBound`] without a binding,
    /// [`ReadError::ReadInProgress`] while a previous read is outstanding,
    /// and the transport's rejection otherwise. Every refusal is also
    /// reported to `sink`.
    #[tracing::instrument(skip_all)]
    pub fn read_once<T: Transport, S: OutputSink>(
        &mut self,
        transport: &mut T,
        sink: &S,
    ) -> Result<(), ReadError> {
        let bound = match self.bound.as_mut() {
            Some(bound) if bound.read_pending => {
                return Err(refuse_read(ReadError::ReadInProgress, TransportError::Busy, sink));
            }
            Some(bound) => bound,
            None => {
                return Err(refuse_read(ReadError::NotBound, TransportError::NotConnected, sink));
            }
        };

        let connection = bound.binding.connection();
        if let Err(error) = transport.read(connection, bound.binding.value_handle()) {
            tracing::warn!(%error, code = error.code(), "read failed");
            sink.emit(OutputEvent::RequestFailed {
                operation: Operation::Read,
                error,
            });
            return Err(error.into());
        }

        bound.read_pending = true;
        Ok(())
    }

    /// Completion of a read issued by [`Self::read_once`].
    pub fn on_read_completed<S: OutputSink>(
        &mut self,
        connection: ConnectionId,
        handle: AttributeHandle,
        result: Result<&[u8], TransportError>,
        sink: &S,
    ) {
        let Some(bound) = self.current(connection, handle).filter(|b| b.read_pending) else {
            tracing::trace!(%connection, %handle, "read completion without pending read, ignored");
            return;
        };
        bound.read_pending = false;
        let peer = bound.peer;

        match result {
            Ok(&[raw]) => {
                let level = BatteryLevel::from_raw(raw);
                self.report(connection, peer, level, ReadingSource::Read, sink);
            }
            Ok(value) => {
                tracing::warn!(%peer, len = value.len(), "unexpected battery level length");
                sink.emit(OutputEvent::ReadFailed {
                    connection,
                    peer,
                    error: TransportError::MessageSize,
                });
            }
            Err(error) => {
                tracing::warn!(%peer, %error, code = error.code(), "read failed");
                sink.emit(OutputEvent::ReadFailed {
                    connection,
                    peer,
                    error,
                });
            }
        }
    }

    fn current(&mut self, connection: ConnectionId, handle: AttributeHandle) -> Option<&mut Bound> {
        self.bound.as_mut().filter(|bound| {
            bound.binding.connection() == connection && bound.binding.value_handle() == handle
        })
    }

    fn report<S: OutputSink>(
        &mut self,
        connection: ConnectionId,
        peer: PeerAddress,
        level: BatteryLevel,
        source: ReadingSource,
        sink: &S,
    ) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        tracing::info!(%peer, %level, ?source, sequence, "battery level");
        sink.emit(OutputEvent::Reading(BatteryReading {
            connection,
            peer,
            level,
            source,
            sequence,
            observed_at: chrono::Utc::now(),
        }));
    }
}

fn refuse_read<S: OutputSink>(reason: ReadError, error: TransportError, sink: &S) -> ReadError {
    tracing::warn!(%reason, "battery level read not issued");
    sink.emit(OutputEvent::RequestFailed {
        operation: Operation::Read,
        error,
    });
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeTransport, LEVEL_CCC, LEVEL_VALUE, RecordingSink, Request, battery_attributes,
        battery_set, peer,
    };
    use bascentral_domain::attribute::{HandleSet, Properties};
    use bascentral_domain::gatt::BATTERY_SERVICE;

    fn bound_client(connection: ConnectionId) -> ServiceClient {
        let mut client = ServiceClient::new();
        let binding = ServiceBinding::assign(&battery_set(connection), BATTERY_SERVICE).unwrap();
        client.bind(binding, peer(1));
        client
    }

    fn readings(sink: &RecordingSink) -> Vec<BatteryReading> {
        sink.events()
            .iter()
            .filter_map(OutputEvent::reading)
            .cloned()
            .collect()
    }

    #[test]
    fn should_subscribe_with_value_and_ccc_handles() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();

        client.subscribe(&mut transport, &sink).unwrap();
        client.subscribe(&mut transport, &sink).unwrap();

        assert!(client.is_subscribed());
        assert_eq!(
            transport.requests,
            vec![Request::Subscribe(id, LEVEL_VALUE, LEVEL_CCC)]
        );
        assert_eq!(
            sink.events(),
            vec![OutputEvent::Subscribed {
                connection: id,
                peer: peer(1)
            }]
        );
    }

    #[test]
    fn should_report_not_supported_for_read_only_level() {
        let id = ConnectionId::new();
        let set = HandleSet::new(id, BATTERY_SERVICE, battery_attributes(Properties::READ, false));
        let mut client = ServiceClient::new();
        client.bind(ServiceBinding::assign(&set, BATTERY_SERVICE).unwrap(), peer(1));
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();

        let result = client.subscribe(&mut transport, &sink);

        assert_eq!(result, Err(SubscribeError::NotSupported));
        assert!(transport.requests.is_empty());
        assert!(client.read_once(&mut transport, &sink).is_ok());
    }

    #[test]
    fn should_stay_usable_for_reads_after_subscribe_failure() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::failing(Operation::Subscribe, TransportError::Code(-12));
        let sink = RecordingSink::default();

        let result = client.subscribe(&mut transport, &sink);

        assert_eq!(result, Err(SubscribeError::Transport(TransportError::Code(-12))));
        assert!(!client.is_subscribed());
        client.read_once(&mut transport, &sink).unwrap();
        assert_eq!(transport.requests.last(), Some(&Request::Read(id, LEVEL_VALUE)));
    }

    #[test]
    fn should_fail_to_subscribe_or_read_without_binding() {
        let mut client = ServiceClient::new();
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();

        assert_eq!(
            client.subscribe(&mut transport, &sink),
            Err(SubscribeError::NotBound)
        );
        assert_eq!(client.read_once(&mut transport, &sink), Err(ReadError::NotBound));
        assert!(transport.requests.is_empty());
    }

    #[test]
    fn should_report_read_without_binding() {
        let mut client = ServiceClient::new();
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();

        let result = client.read_once(&mut transport, &sink);

        assert_eq!(result, Err(ReadError::NotBound));
        assert_eq!(sink.count(OutputEvent::is_error), 1);
        assert_eq!(
            sink.events(),
            vec![OutputEvent::RequestFailed {
                operation: Operation::Read,
                error: TransportError::NotConnected,
            }]
        );
    }

    #[test]
    fn should_forward_notified_level() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let sink = RecordingSink::default();

        let level = client.on_notification(id, LEVEL_VALUE, Some(&[88]), &sink);

        assert_eq!(level, Some(BatteryLevel::Percent(88)));
        let readings = readings(&sink);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].peer, peer(1));
        assert_eq!(readings[0].connection, id);
        assert_eq!(readings[0].source, ReadingSource::Notification);
    }

    #[test]
    fn should_emit_exactly_one_unavailable_event_for_sentinel() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let sink = RecordingSink::default();

        client.on_notification(id, LEVEL_VALUE, Some(&[0xFF]), &sink);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_error());
        assert_eq!(
            events[0].reading().map(|r| r.level),
            Some(BatteryLevel::Unavailable)
        );
    }

    #[test]
    fn should_report_aborted_notification_as_unavailable() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();
        client.subscribe(&mut transport, &sink).unwrap();

        let level = client.on_notification(id, LEVEL_VALUE, None, &sink);

        assert_eq!(level, Some(BatteryLevel::Unavailable));
        assert!(!client.is_subscribed());
    }

    #[test]
    fn should_ignore_notification_from_stale_link() {
        let mut client = bound_client(ConnectionId::new());
        let sink = RecordingSink::default();

        let level = client.on_notification(ConnectionId::new(), LEVEL_VALUE, Some(&[50]), &sink);

        assert_eq!(level, None);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn should_ignore_notification_for_other_handle() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let sink = RecordingSink::default();

        client.on_notification(id, AttributeHandle(0x40), Some(&[50]), &sink);

        assert!(sink.events().is_empty());
    }

    #[test]
    fn should_reject_overlapping_read() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();

        client.read_once(&mut transport, &sink).unwrap();
        let second = client.read_once(&mut transport, &sink);

        assert_eq!(second, Err(ReadError::ReadInProgress));
        assert_eq!(transport.count(|r| matches!(r, Request::Read(..))), 1);
        assert_eq!(sink.count(OutputEvent::is_error), 1);
        assert!(sink.events().contains(&OutputEvent::RequestFailed {
            operation: Operation::Read,
            error: TransportError::Busy,
        }));
        assert!(client.is_read_pending());
    }

    #[test]
    fn should_report_read_value_and_allow_next_read() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();
        client.read_once(&mut transport, &sink).unwrap();

        client.on_read_completed(id, LEVEL_VALUE, Ok(&[57]), &sink);

        let readings = readings(&sink);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].level, BatteryLevel::Percent(57));
        assert_eq!(readings[0].source, ReadingSource::Read);
        assert!(!client.is_read_pending());
        assert!(client.read_once(&mut transport, &sink).is_ok());
    }

    #[test]
    fn should_report_wrong_length_read_as_error() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();
        client.read_once(&mut transport, &sink).unwrap();

        client.on_read_completed(id, LEVEL_VALUE, Ok(&[57, 0]), &sink);

        assert_eq!(
            sink.events(),
            vec![OutputEvent::ReadFailed {
                connection: id,
                peer: peer(1),
                error: TransportError::MessageSize,
            }]
        );
    }

    #[test]
    fn should_forward_read_error_code() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::default();
        let sink = RecordingSink::default();
        client.read_once(&mut transport, &sink).unwrap();

        client.on_read_completed(id, LEVEL_VALUE, Err(TransportError::Code(0x05)), &sink);

        assert_eq!(sink.count(OutputEvent::is_error), 1);
        assert!(readings(&sink).is_empty());
    }

    #[test]
    fn should_clear_pending_read_when_request_is_rejected() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let mut transport = FakeTransport::failing(Operation::Read, TransportError::Busy);
        let sink = RecordingSink::default();

        let result = client.read_once(&mut transport, &sink);

        assert_eq!(result, Err(ReadError::Transport(TransportError::Busy)));
        assert!(!client.is_read_pending());
    }

    #[test]
    fn should_ignore_unsolicited_read_completion() {
        let id = ConnectionId::new();
        let mut client = bound_client(id);
        let sink = RecordingSink::default();

        client.on_read_completed(id, LEVEL_VALUE, Ok(&[10]), &sink);

        assert!(sink.events().is_empty());
    }

    #[test]
    fn should_keep_sequence_increasing_across_bindings() {
        let first = ConnectionId::new();
        let mut client = bound_client(first);
        let sink = RecordingSink::default();
        client.on_notification(first, LEVEL_VALUE, Some(&[1]), &sink);

        let second = ConnectionId::new();
        client.unbind();
        client.bind(
            ServiceBinding::assign(&battery_set(second), BATTERY_SERVICE).unwrap(),
            peer(2),
        );
        client.on_notification(second, LEVEL_VALUE, Some(&[2]), &sink);

        let sequences: Vec<u64> = readings(&sink).iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }
}
