//! HTTP/1.1 for talking to the hub's REST API.
//!
//! The [`client::Client`] is an explicit state machine: connecting, sending
//! the request, reading the status line, the headers and the body are separate
//! calls, each of which returns immediately. The [`session::Session`] layers
//! "one exchange in flight" semantics, the hub's standard headers and a start
//! timestamp on top, and is what every device drives once per tick.
//!
//! ```text
//! Initial ─connect─▶ Connected ─request─▶ Requested ─read_result─▶ Headers
//!                                                                     │
//!    Closed ◀──────────────read_payload (EOF / Content-Length)── Data ◀┘
//!
//!    any active state ──transport or protocol error──▶ Failed
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use core::task::Poll;
//! use libfah::network::application::http::client::{Client, Method};
//! # use libfah::network::{Read, Write, Socket, error::Error};
//! # struct MockSocket;
//! # impl Read for MockSocket {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Error> { Ok(0) }
//! # }
//! # impl Write for MockSocket {
//! #     type Error = Error;
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl Socket for MockSocket {
//! #     fn connect(&mut self, _host: &str, _port: u16) -> Result<(), Error> { Ok(()) }
//! #     fn available(&mut self) -> usize { 0 }
//! #     fn connected(&mut self) -> bool { true }
//! #     fn stop(&mut self) {}
//! # }
//!
//! let mut client = Client::new(MockSocket);
//! client.connect("sysap.local", 80)?;
//! client.request(Method::Get, "/fhapi/v1/api/rest/devicelist", b"")?;
//!
//! // Poll from the main loop until the status line is in.
//! while let Poll::Pending = client.read_result()? {}
//! # Ok::<(), Error>(())
//! ```

/// The steppable client and its supporting types.
pub mod client;

/// Asynchronous exchange wrapper used by device schedulers.
pub mod session;

pub use client::{Client, Header, Method, State};
pub use session::{AsyncStatus, Session};
