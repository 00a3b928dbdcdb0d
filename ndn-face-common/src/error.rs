//! Error types for the ndn-face crates.

use thiserror::Error;

/// All possible errors surfaced by the Face and its codec.
#[derive(Error, Debug)]
pub enum Error {
    /// Error related to TLV encoding/decoding.
    #[error("TLV error: {0}")]
    Tlv(String),

    /// Error related to NDN packet processing.
    #[error("NDN packet error: {0}")]
    Packet(String),

    /// Error related to the byte transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The face is not in the opened state.
    #[error("face is not open")]
    NotOpen,

    /// A required primitive is unavailable at construction.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The face has been closed.
    #[error("face is closed")]
    FaceClosed,

    /// The host strategy ran out of candidate forwarders.
    #[error("no more forwarder hosts to try")]
    HostsExhausted,

    /// An Interest expired without a matching Data.
    #[error("interest timed out")]
    Timeout,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
