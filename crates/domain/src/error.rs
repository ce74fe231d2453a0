//! Transport-level error codes.
//!
//! The radio stack reports failures as small integer codes (negative errno
//! values for rejected requests, HCI or ATT codes for asynchronous
//! outcomes). [`TransportError`] keeps the common ones typed and carries
//! anything else verbatim, so every code can be surfaced unchanged to the
//! output sink.

use serde::Serialize;

/// Failure reported by the Transport or Discovery capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum TransportError {
    /// Another scan, connection attempt or attribute request is in progress.
    #[error("transport busy")]
    Busy,

    /// The transport does not implement the requested operation.
    #[error("operation not supported")]
    NotSupported,

    /// The transport is gone (adapter removed, worker stopped).
    #[error("transport unavailable")]
    Unavailable,

    /// The link referenced by the request is not connected.
    #[error("not connected")]
    NotConnected,

    /// An attribute value did not have the expected length.
    #[error("unexpected attribute value length")]
    MessageSize,

    /// Any other code reported by the stack.
    #[error("transport error code {0}")]
    Code(i32),
}

impl TransportError {
    /// Integer code as the stack would report it.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Busy => -16,
            Self::NotSupported => -134,
            Self::Unavailable => -19,
            Self::NotConnected => -128,
            Self::MessageSize => -122,
            Self::Code(code) => code,
        }
    }

    /// Map a raw integer code back to the typed variant when one exists.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -16 => Self::Busy,
            -134 => Self::NotSupported,
            -19 => Self::Unavailable,
            -128 => Self::NotConnected,
            -122 => Self::MessageSize,
            other => Self::Code(other),
        }
    }
}
