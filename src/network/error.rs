//! Common error types for network operations

/// A common error type for the hub client.
///
/// Transport, protocol and capacity failures all land here. It is `Copy` so
/// the state machines can stash and compare it freely in `no_std` builds.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted on a connection that is not open.
    NotOpen,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// A connection attempt was refused.
    ConnectionRefused,
    /// A timeout occurred.
    Timeout,
    /// The connection was closed.
    ConnectionClosed,
    /// The peer answered with something that does not follow the protocol.
    ProtocolError,
    /// The operation is not valid in the current state.
    InvalidState,
    /// Another exchange is already in progress.
    Busy,
    /// A fixed-capacity buffer, queue or table is full.
    CapacityExceeded,
    /// A JSON document could not be encoded or decoded.
    JsonError,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::InvalidState => defmt::write!(f, "InvalidState"),
            Error::Busy => defmt::write!(f, "Busy"),
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            Error::JsonError => defmt::write!(f, "JsonError"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::NotOpen => "connection not open",
            Error::WriteError => "write failed",
            Error::ReadError => "read failed",
            Error::ConnectionRefused => "connection refused",
            Error::Timeout => "timed out",
            Error::ConnectionClosed => "connection closed",
            Error::ProtocolError => "protocol error",
            Error::InvalidState => "invalid state",
            Error::Busy => "busy",
            Error::CapacityExceeded => "capacity exceeded",
            Error::JsonError => "invalid json",
        };
        f.write_str(text)
    }
}
