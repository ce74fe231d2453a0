//! btleplug adapter error types.

use bascentral_domain::error::TransportError;

const EACCES: i32 = -13;
const ENOENT: i32 = -2;
const EIO: i32 = -5;
const ETIMEDOUT: i32 = -116;

/// Errors raised while bringing the adapter up.
#[derive(Debug, thiserror::Error)]
pub enum BtleplugError {
    /// No Bluetooth adapter at the configured index.
    #[error("no bluetooth adapter at index {0}")]
    NotAvailable(usize),

    /// The host stack reported an error.
    #[error("bluetooth stack error")]
    Stack(#[from] btleplug::Error),
}

/// Map a btleplug error onto the errno-style code the core reports.
#[must_use]
pub fn transport_error(err: &btleplug::Error) -> TransportError {
    match err {
        btleplug::Error::NotConnected => TransportError::NotConnected,
        btleplug::Error::NotSupported(_) => TransportError::NotSupported,
        btleplug::Error::DeviceNotFound => TransportError::Unavailable,
        btleplug::Error::NoSuchCharacteristic => TransportError::Code(ENOENT),
        btleplug::Error::TimedOut(_) => timed_out(),
        btleplug::Error::PermissionDenied => TransportError::Code(EACCES),
        _ => TransportError::Code(EIO),
    }
}

/// Code reported when an operation exceeds its deadline.
#[must_use]
pub const fn timed_out() -> TransportError {
    TransportError::Code(ETIMEDOUT)
}

/// Code reported for a handle the adapter never assigned.
#[must_use]
pub const fn unknown_handle() -> TransportError {
    TransportError::Code(ENOENT)
}

impl From<BtleplugError> for TransportError {
    fn from(err: BtleplugError) -> Self {
        match err {
            BtleplugError::NotAvailable(_) => Self::Unavailable,
            BtleplugError::Stack(err) => transport_error(&err),
        }
    }
}
