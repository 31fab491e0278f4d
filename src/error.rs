//! The error type shared by every fallible operation in this crate.

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors produced by the OPUP framing layer, the command surface, and the
/// flash engine built on top of it.
///
/// The seven variants are disjoint: a given failure is reported as exactly
/// one of them, never wrapped in another.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial port could not be opened, or closed unexpectedly.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[from] std::io::Error),

    /// A read returned fewer octets than required within the timeout.
    #[error("timed out waiting for {expected} byte(s), got {actual}")]
    Timeout {
        /// Octets the framing layer needed to proceed.
        expected: usize,
        /// Octets actually read before the timeout elapsed.
        actual: usize,
    },

    /// The first octet of a response was not the start-of-frame marker.
    #[error("bad framing: expected SOF 0xA5, got {0:#04x}")]
    BadFraming(u8),

    /// The CRC-32 trailer did not match the recomputed value.
    #[error("CRC mismatch: received {received:#010x}, computed {computed:#010x}")]
    BadCrc {
        /// CRC as received on the wire.
        received: u32,
        /// CRC recomputed over the received header and payload.
        computed: u32,
    },

    /// The device returned a frame with the error flag set.
    #[error("device reported an error: {payload:02x?}")]
    DeviceError {
        /// The device's caller-opaque diagnostic payload.
        payload: Vec<u8>,
    },

    /// A response payload was shorter than its opcode's schema demands.
    #[error("protocol violation on {opcode:?}: expected at least {expected} byte(s), got {actual}")]
    ProtocolViolation {
        /// The opcode whose response failed to match its schema.
        opcode: Opcode,
        /// Minimum payload length the schema demands.
        expected: usize,
        /// Payload length actually received.
        actual: usize,
    },

    /// A flash-level operation failed to reach the state it required.
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
