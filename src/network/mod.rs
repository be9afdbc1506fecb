//! A network abstraction layer for embedded systems
//!
//! The hub client never owns a network stack. It talks to a byte-stream
//! [`Socket`] supplied by the application (a TCP socket, a TLS session on top
//! of one, or a scripted mock in tests) and asks a [`SocketFactory`] for a
//! fresh socket whenever a new consumer needs one: the WebSocket push channel,
//! each device's HTTP session and every blocking registration call own their
//! own transport.
//!
//! All socket operations are expected to be non-blocking: `read` returns
//! `Ok(0)` when nothing is buffered and `available` reports how many bytes can
//! be read right now. A socket whose peer closed the connection reports
//! `connected() == false` but still hands out the bytes it buffered before.

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application layer protocols built on [`Socket`].
pub mod application;

/// Plain TCP transport backed by `std::net`.
#[cfg(feature = "std")]
pub mod tcp;

use error::Error;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Read, Socket, SocketFactory, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A reusable, non-blocking byte-stream client socket.
pub trait Socket: Read<Error = Error> + Write<Error = Error> {
    /// Open a connection to `host:port`, closing any previous one first.
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Error>;
    /// Number of bytes that can be read without waiting.
    fn available(&mut self) -> usize;
    /// Whether the peer is still connected.
    fn connected(&mut self) -> bool;
    /// Close the connection and discard buffered data.
    fn stop(&mut self);
}

/// Hands out sockets to the components that need one.
pub trait SocketFactory {
    /// The socket type produced by this factory.
    type Socket: Socket;
    /// Create an unconnected socket, secured with TLS when `secure` is set.
    fn socket(&mut self, secure: bool) -> Self::Socket;
}

/// Read exactly one byte if one is buffered.
pub(crate) fn read_byte<S: Socket + ?Sized>(socket: &mut S) -> Result<Option<u8>, Error> {
    let mut byte = [0u8; 1];
    match socket.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

/// Write the whole buffer or fail.
pub(crate) fn write_all<S: Socket + ?Sized>(socket: &mut S, mut buf: &[u8]) -> Result<(), Error> {
    while !buf.is_empty() {
        match socket.write(buf) {
            Ok(0) => return Err(Error::WriteError),
            Ok(n) => buf = &buf[n..],
            Err(_) => return Err(Error::WriteError),
        }
    }
    socket.flush().map_err(|_| Error::WriteError)
}
