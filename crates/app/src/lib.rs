//! # bascentral-app
//!
//! Application layer: the central core and the **port definitions** it
//! drives.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport`: scanning, links, security, attribute read/subscribe
//!   - `Discovery`: attribute table walk and release of its result
//!   - `OutputSink`: where every outcome is reported
//! - Implement the core state machines:
//!   - `ScanController`: filter configuration, first-match selection
//!   - `ConnectionManager`: the single connection slot
//!   - `ServiceClient`: Battery Level subscription, reads, normalization
//! - Dispatch events to them one at a time (`Central`, `runtime::run`)
//! - Provide **in-process sinks** (`OutputBus`, `LogSink`) that need no IO
//!
//! ## Dependency rule
//! Depends on `bascentral-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod central;
pub mod client;
pub mod input;
pub mod lifecycle;
pub mod log_sink;
pub mod output_bus;
pub mod ports;
pub mod runtime;
pub mod scan;

#[cfg(test)]
mod testing;
