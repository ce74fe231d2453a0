//! # bascentrald - Battery Service central daemon
//!
//! Composition root that wires the btleplug adapter to the central core and
//! prints every battery reading.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging
//! - Open the host Bluetooth adapter and start its worker
//! - Construct the central, injecting the adapter through the port traits
//! - Print output events and turn console lines into button presses
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no lifecycle logic belongs here.

mod config;
mod input;
mod output;

use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use bascentral_app::central::Central;
use bascentral_app::log_sink::LogSink;
use bascentral_app::output_bus::OutputBus;
use bascentral_app::runtime::{self, StopReason};

use crate::config::Config;

const INPUT_CAPACITY: usize = 8;
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_new(&config.logging.filter).context("parsing log filter")?)
        .init();

    let central_config = config.central()?;
    tracing::info!(
        service = %central_config.filter.service(),
        security = ?central_config.security,
        "starting bascentrald"
    );

    // Bluetooth
    let spawned = bascentral_adapter_btleplug::spawn(&config.btleplug())
        .await
        .context("opening bluetooth adapter")?;

    // Output
    let bus = OutputBus::new(config.output.queue_capacity);
    let printer = tokio::spawn(output::print_events(bus.subscribe(), config.output.format));

    // Console buttons
    let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
    let read_button = config.input.read_button;
    tokio::spawn(input::forward_lines(
        tokio::io::BufReader::new(tokio::io::stdin()),
        read_button,
        input_tx,
    ));

    // Central
    let mut central = Central::new(
        spawned.transport.clone(),
        spawned.transport,
        (LogSink, bus),
        central_config,
    );
    central.start().context("starting scan")?;
    eprintln!("bascentrald scanning, press enter to read the battery level");

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let reason = runtime::run(&mut central, spawned.events, input_rx, shutdown).await;
    if reason == StopReason::TransportClosed {
        tracing::error!("bluetooth worker stopped");
    }

    central.shutdown();
    drop(central);

    if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, spawned.worker)
        .await
        .is_err()
    {
        tracing::warn!("bluetooth worker did not stop in time");
    }
    if let Err(err) = printer.await {
        tracing::warn!(%err, "output printer failed");
    }

    Ok(())
}
