//! WebSocket client for the hub's push channel.
//!
//! [`WebSocketClient::connect`] performs the HTTP upgrade over a fresh
//! [`Socket`](crate::network::Socket); afterwards the owner calls
//! [`WebSocketClient::get_message`] from its main loop. That call returns
//! immediately when nothing is buffered (sending a keepalive ping when one is
//! due) and otherwise reads one whole message, reassembling continuation
//! frames. Reading inside a frame whose header already arrived is the one
//! place the client waits for the network.
//!
//! ```rust,no_run
//! use heapless::Vec;
//! use libfah::network::application::websocket::WebSocketClient;
//! # use libfah::network::{Read, Write, Socket, error::Error};
//! # use libfah::system::{Clock, Delay, Entropy};
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
//! # #[derive(Clone)]
//! # struct Board;
//! # impl Clock for Board { fn now_ms(&self) -> u64 { 0 } }
//! # impl Delay for Board { fn delay_ms(&self, _ms: u32) {} }
//! # impl Entropy for Board { fn random_u32(&self) -> u32 { 7 } }
//!
//! let mut ws = WebSocketClient::new(MockSocket, Board);
//! ws.set_authorization_header("Basic aW5zdGFsbGVyOnNlY3JldA==")?;
//! ws.connect("sysap.local", "/fhapi/v1/api/ws", 80)?;
//!
//! let mut message: Vec<u8, 2048> = Vec::new();
//! loop {
//!     if ws.get_message(&mut message) {
//!         // one complete text message
//!     }
//! }
//! # Ok::<(), Error>(())
//! ```

/// The connection and message pump.
pub mod client;

/// Frame header codec and masking.
pub mod frame;

pub use client::WebSocketClient;
pub use frame::Opcode;
