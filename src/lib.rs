//! # libfah - free@home hub client for embedded devices
//!
//! A `no_std` client for the local API of a free@home System Access Point
//! (the "hub"). It registers virtual devices with the hub, keeps their leases
//! alive, reads and writes their datapoints over REST and reacts to the
//! hub's WebSocket push messages, all from one cooperative main loop without
//! threads, timers or heap allocation.
//!
//! ## Layers
//!
//! ### Network
//! - **WebSocket client**: upgrade handshake, framing, masking, fragment
//!   reassembly and keepalive pings for the push channel
//! - **HTTP client**: a small HTTP/1.1 state machine that advances one phase
//!   per call, plus a blocking convenience driver
//! - **Session**: the one-exchange-at-a-time wrapper the device schedulers use
//!
//! ### Hub
//! - **Registry**: owns the push channel, the device table and the event
//!   subscribers; decodes push messages and routes them
//! - **Device**: one registered virtual device with its own operation queue,
//!   HTTP session and tick-counted backoff
//! - **Appliance**: per-kind behavior such as the built-in switching actuator
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libfah = "0.1.0"
//! ```
//!
//! ### Switching actuator
//!
//! ```rust,no_run
//! use libfah::hub::{ConnectOptions, Credentials, Event, Personality, Registry};
//! # use libfah::network::{Read, Write, Socket, SocketFactory, error::Error};
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
//! # struct Sockets;
//! # impl SocketFactory for Sockets {
//! #     type Socket = MockSocket;
//! #     fn socket(&mut self, _secure: bool) -> MockSocket { MockSocket }
//! # }
//! # #[derive(Clone)]
//! # struct Board;
//! # impl Clock for Board { fn now_ms(&self) -> u64 { 0 } }
//! # impl Delay for Board { fn delay_ms(&self, _ms: u32) {} }
//! # impl Entropy for Board { fn random_u32(&self) -> u32 { 7 } }
//!
//! let mut log_event = |event: &Event<'_>| {
//!     if let Event::State { name, value, .. } = event {
//!         // e.g. drive a relay from "ON"
//!         let _ = (name, value);
//!     }
//! };
//!
//! let mut registry: Registry<'_, _, _> = Registry::new(Sockets, Board);
//! registry.add_subscriber(&mut log_event)?;
//!
//! let credentials = Credentials::Basic { username: "installer", password: "secret" };
//! registry.connect(&ConnectOptions::new("sysap.local", credentials))?;
//!
//! let lamp = registry.create_device("ABC123", Personality::switch(), "Lamp", 300)?;
//! registry.with_device(lamp, |appliance, ctx| {
//!     if let Some(switch) = appliance.as_switch_mut() {
//!         switch.set_state(ctx, true);
//!     }
//! });
//!
//! loop {
//!     registry.process();
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! ## Platform Support
//!
//! The crate needs `core` only. The application supplies the transport
//! through [`network::SocketFactory`] and time and randomness through
//! [`system::Platform`]; with the `std` feature, [`network::tcp`] and
//! [`system::StdPlatform`] provide both for hosted targets.
//!
//! ## Optional Features
//!
//! - `std`: plain TCP sockets and a host platform (default: disabled)
//! - `defmt`: log through `defmt` on embedded targets
//! - `log`: log through the `log` facade

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://docs.rs/libfah/")]

#[macro_use]
mod fmt;

/// Transport traits and the protocol clients built on them.
///
/// Contains the HTTP state machine and session wrapper and the WebSocket
/// client used for the hub's push channel.
pub mod network;

/// Platform services: clock, delay and entropy.
pub mod system;

/// The free@home device registry, schedulers and push dispatch.
pub mod hub;
