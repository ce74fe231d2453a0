//! Port traits the central depends on.
//!
//! The transport and discovery ports are driven (outbound) ports
//! implemented by radio adapters. The output sink is where the central
//! reports what happened.

pub mod discovery;
pub mod sink;
pub mod transport;

pub use discovery::{Discovery, DiscoveryOutcome};
pub use sink::OutputSink;
pub use transport::{Transport, TransportEvent};
