//! # bascentral-adapter-btleplug
//!
//! Host Bluetooth LE adapter: implements the `Transport` and `Discovery`
//! ports of `bascentral-app` on top of [`btleplug`].
//!
//! ## How it works
//!
//! [`spawn`] opens the configured host adapter and starts a worker task
//! that owns it. The returned [`BtleplugTransport`] is a cloneable handle:
//! each port call queues one request and returns immediately, and the
//! worker executes requests one at a time in queue order. Outcomes,
//! advertisement matches, disconnects and notifications come back on the
//! event receiver, ready to feed the central's event loop.
//!
//! ## Differences from an embedded stack
//!
//! - btleplug hides ATT handles. The worker numbers the attributes of each
//!   discovered service itself and maps handles back to characteristics.
//! - Security cannot be requested; `request_security` reports
//!   `NotSupported` and pairing is left to the host.
//! - A subscription that fails after being queued is reported as an
//!   aborted notification.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `bascentral-app` and `bascentral-domain`.

mod config;
mod error;
mod layout;
mod transport;
mod worker;

pub use config::BtleplugConfig;
pub use error::{BtleplugError, transport_error};
pub use transport::BtleplugTransport;

use btleplug::api::{Central as _, Manager as _};
use btleplug::platform::Manager;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bascentral_app::ports::TransportEvent;

/// A running btleplug worker.
pub struct Spawned {
    /// Port handle; clone it to use as both transport and discovery.
    pub transport: BtleplugTransport,
    /// Events to feed to the central.
    pub events: mpsc::Receiver<TransportEvent>,
    /// Finishes once every handle is dropped and queued requests are done.
    pub worker: JoinHandle<()>,
}

/// Open the configured adapter and start its worker task.
///
/// # Errors
///
/// Returns [`BtleplugError::NotAvailable`] when there is no adapter at
/// `config.adapter_index`, or the stack error raised while opening it.
pub async fn spawn(config: &BtleplugConfig) -> Result<Spawned, BtleplugError> {
    let manager = Manager::new().await?;
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .nth(config.adapter_index)
        .ok_or(BtleplugError::NotAvailable(config.adapter_index))?;

    match adapter.adapter_info().await {
        Ok(info) => tracing::info!(adapter = %info, "bluetooth adapter opened"),
        Err(err) => tracing::debug!(%err, "bluetooth adapter info unavailable"),
    }

    let central_events = adapter.events().await?;
    let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
    let (event_tx, event_rx) = mpsc::channel(config.event_capacity);

    let worker = worker::Worker::new(adapter, config.connect_timeout(), event_tx);
    let worker = tokio::spawn(worker.run(command_rx, central_events));

    Ok(Spawned {
        transport: BtleplugTransport::new(command_tx),
        events: event_rx,
        worker,
    })
}
