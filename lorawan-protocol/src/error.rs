//! Error types for the LoRaWAN protocol core.

use thiserror::Error;

/// Wire-level faults. Any of these on a gateway connection is grounds for
/// closing that connection; they are never propagated across connections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Destination buffer cannot hold the value being written.
    #[error("Buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// A Basics Station frame carried binary data; the protocol is text-only.
    #[error("Binary frames are not supported by the Basics Station protocol")]
    BinaryFrameNotSupported,

    /// The assembled message is not valid UTF-8.
    #[error("Message is not valid UTF-8")]
    InvalidEncoding,

    /// The accumulated message exceeds the configured size cap.
    #[error("Message too large: {0} bytes (max: {1})")]
    MessageTooLarge(usize, usize),

    /// The message JSON could not be parsed or carried no known `msgtype`.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

/// Regional-table lookup failures. These are typed outcomes for caller
/// contract violations; "no applicable mapping" cases are `Option` returns
/// on the resolver instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// Datarate index not present in the region's datarate table.
    #[error("Unknown datarate index: {0}")]
    UnknownDatarate(u16),

    /// TX power index not present in the region's EIRP table.
    #[error("Unknown TX power index: {0}")]
    UnknownTxPower(u8),

    /// RX1 datarate-offset lookup outside the matrix bounds.
    #[error("RX1 offset table index out of range: row {row}, column {column}")]
    IndexOutOfRange { row: u16, column: u8 },
}
