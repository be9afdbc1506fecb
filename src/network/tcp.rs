//! A [`Socket`] over `std::net::TcpStream`.
//!
//! The stream is switched to non-blocking mode after connecting. One byte of
//! peeked data is enough to decide whether the peer is still there, so
//! `available` and `connected` share a small read-ahead buffer.
//!
//! There is no TLS here. A socket handed out for a secure connection refuses
//! to connect instead of sending credentials in the clear.

use super::error::Error;
use super::{Read, Socket, SocketFactory, Write};
use std::io::{ErrorKind, Read as StdRead, Write as StdWrite};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Non-TLS TCP socket.
#[derive(Debug, Default)]
pub struct TcpSocket {
    stream: Option<TcpStream>,
    pending: std::vec::Vec<u8>,
    closed: bool,
    tls_requested: bool,
}

impl TcpSocket {
    /// An unconnected socket.
    pub fn new() -> Self {
        Self::default()
    }

    /// A socket for a connection that must be encrypted. Every `connect`
    /// fails with [`Error::ConnectionRefused`].
    pub fn tls_requested() -> Self {
        Self {
            tls_requested: true,
            ..Self::default()
        }
    }

    fn fill(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let mut chunk = [0u8; 512];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    break;
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

impl Read for TcpSocket {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.stream.is_none() {
            return Err(Error::NotOpen);
        }
        if self.pending.is_empty() {
            self.fill();
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for TcpSocket {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;
        loop {
            match stream.write(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(_) => return Err(Error::WriteError),
            }
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let stream = self.stream.as_mut().ok_or(Error::NotOpen)?;
        stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Socket for TcpSocket {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.stop();
        if self.tls_requested {
            warn!("tcp: {}:{} needs TLS, refusing a plain connection", host, port);
            return Err(Error::ConnectionRefused);
        }
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::ConnectionRefused)?
            .next()
            .ok_or(Error::ConnectionRefused)?;
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|_| Error::ConnectionRefused)?;
        stream
            .set_nonblocking(true)
            .map_err(|_| Error::ConnectionRefused)?;
        let _ = stream.set_nodelay(true);
        self.stream = Some(stream);
        Ok(())
    }

    fn available(&mut self) -> usize {
        self.fill();
        self.pending.len()
    }

    fn connected(&mut self) -> bool {
        self.fill();
        self.stream.is_some() && !self.closed
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.pending.clear();
        self.closed = false;
    }
}

/// Produces [`TcpSocket`]s. Secure requests get a socket that never
/// connects; bring a TLS-capable [`SocketFactory`] for those.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpFactory;

impl SocketFactory for TcpFactory {
    type Socket = TcpSocket;

    fn socket(&mut self, secure: bool) -> TcpSocket {
        if secure {
            TcpSocket::tls_requested()
        } else {
            TcpSocket::new()
        }
    }
}
