//! Scan filter and match controller.

use bascentral_domain::error::TransportError;
use bascentral_domain::event::{Operation, OutputEvent};
use bascentral_domain::peer::{PeerAddress, PeerInfo};
use bascentral_domain::scan::ScanFilterSet;

use crate::lifecycle::ConnectionManager;
use crate::ports::{OutputSink, Transport};

/// Reasons scanning could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// No filter set was configured.
    #[error("scan filter not configured")]
    NotConfigured,

    /// Already scanning, or a link is being set up or in use.
    #[error("transport busy")]
    TransportBusy,

    /// The transport refused the request.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Starts scanning with one service filter and picks the first match.
#[derive(Debug, Default)]
pub struct ScanController {
    filter: Option<ScanFilterSet>,
    scanning: bool,
}

impl ScanController {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: None,
            scanning: false,
        }
    }

    /// A controller that scans with `filter`.
    #[must_use]
    pub const fn with_filter(filter: ScanFilterSet) -> Self {
        Self {
            filter: Some(filter),
            scanning: false,
        }
    }

    /// Register the advertisement filter used by every later scan.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::TransportBusy`] while scanning.
    pub fn configure(&mut self, filter: ScanFilterSet) -> Result<(), ScanError> {
        if self.scanning {
            return Err(ScanError::TransportBusy);
        }
        tracing::debug!(service = %filter.service(), active = filter.is_active(), "scan filter configured");
        self.filter = Some(filter);
        Ok(())
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&ScanFilterSet> {
        self.filter.as_ref()
    }

    #[must_use]
    pub const fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Start scanning for advertisers matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::TransportBusy`] when already scanning or when
    /// `link` is not idle, [`ScanError::NotConfigured`] without a filter,
    /// and the transport's rejection otherwise.
    pub fn start<T: Transport, S: OutputSink>(
        &mut self,
        transport: &mut T,
        link: &ConnectionManager,
        sink: &S,
    ) -> Result<(), ScanError> {
        if self.scanning || !link.is_idle() {
            return Err(ScanError::TransportBusy);
        }
        let filter = self.filter.as_ref().ok_or(ScanError::NotConfigured)?;

        if let Err(error) = transport.start_scan(filter) {
            tracing::warn!(%error, code = error.code(), "scanning failed to start");
            sink.emit(OutputEvent::RequestFailed {
                operation: Operation::StartScan,
                error,
            });
            return Err(error.into());
        }

        self.scanning = true;
        tracing::info!(service = %filter.service(), "scanning started");
        sink.emit(OutputEvent::ScanStarted {
            service: filter.service(),
        });
        Ok(())
    }

    /// Handle an advertiser that matched the filter.
    ///
    /// The first connectable match stops the scan and is returned as the
    /// peer to connect to. A failure to stop scanning is reported and
    /// otherwise ignored.
    pub fn on_match<T: Transport, S: OutputSink>(
        &mut self,
        info: &PeerInfo,
        transport: &mut T,
        sink: &S,
    ) -> Option<PeerAddress> {
        if !self.scanning {
            tracing::trace!(peer = %info.address, "match while not scanning, ignored");
            return None;
        }

        tracing::info!(peer = %info.address, rssi = ?info.rssi, name = ?info.name, "filter matched");
        sink.emit(OutputEvent::FilterMatched {
            peer: info.address,
            connectable: info.connectable,
        });
        if !info.connectable {
            return None;
        }

        self.stop(transport, sink);
        Some(info.address)
    }

    /// The transport accepted a scan request but could not start it.
    /// Returns `true` when the failure ended the scan this controller was
    /// tracking, so a later [`Self::start`] is accepted again.
    pub fn on_scan_failed<S: OutputSink>(&mut self, error: TransportError, sink: &S) -> bool {
        if !self.scanning {
            tracing::trace!(%error, "scan failure while not scanning, ignored");
            return false;
        }
        self.scanning = false;
        tracing::warn!(%error, code = error.code(), "scanning stopped by transport");
        sink.emit(OutputEvent::RequestFailed {
            operation: Operation::StartScan,
            error,
        });
        true
    }

    /// Stop an ongoing scan, if any.
    pub fn stop<T: Transport, S: OutputSink>(&mut self, transport: &mut T, sink: &S) {
        if !self.scanning {
            return;
        }
        self.scanning = false;
        if let Err(error) = transport.stop_scan() {
            tracing::warn!(%error, code = error.code(), "stop scanning failed");
            sink.emit(OutputEvent::RequestFailed {
                operation: Operation::StopScan,
                error,
            });
        }
    }
}
