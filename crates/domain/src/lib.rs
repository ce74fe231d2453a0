//! # bascentral-domain
//!
//! Pure domain model for a Battery Service central.
//!
//! ## Responsibilities
//! - Foundational types: connection identifiers, peer addresses, error codes
//! - Describe **what to look for** (scan filter, target service)
//! - Describe **what was found** (discovered handle sets, service bindings)
//! - Describe **what was observed** (battery readings and the unavailable sentinel)
//! - Describe **what is reported** (output events emitted by the core)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or radio stacks.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod attribute;
pub mod battery;
pub mod binding;
pub mod connection;
pub mod event;
pub mod gatt;
pub mod peer;
pub mod scan;
