//! free@home hub client.
//!
//! The [`Registry`] owns the WebSocket push channel and a fixed table of
//! [`Device`] schedulers. The application calls [`Registry::process`] from its
//! main loop; every call ticks each device once and dispatches whatever the
//! hub pushed since the last call.
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!  process() ───────▶│           Registry           │
//!                    │  WebSocketClient  HubInfo    │
//!                    └──┬──────────────┬────────────┘
//!            tick each  │              │ decode push, fan out
//!                       ▼              ▼
//!              ┌────────────────┐   ┌─────────────┐
//!              │ Device 0..N    │   │ Subscribers │
//!              │ queue, session │   └─────────────┘
//!              └────────────────┘
//! ```

use crate::network::error::Error;
use base64ct::{Base64, Encoding};
use core::fmt::Write;
use heapless::String;

/// Compile-time tunables.
pub mod config;

/// Device records and their scheduler.
pub mod device;

/// 64-bit device ids and datapoint names.
pub mod device_id;

/// Events published to subscribers.
pub mod event;

/// Decoder for hub JSON documents.
pub mod json;

/// The device table and push dispatcher.
pub mod registry;

/// Queue-entry and push-key splitting.
pub mod token;

/// REST paths and bodies.
pub mod uri;

pub use device::{Appliance, Context, Device, Personality, Switch};
pub use device_id::{DeviceId, HUB_ID};
pub use event::{Event, Subscriber};
pub use registry::{DeviceHandle, Registry};

/// How to authenticate against the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials<'a> {
    /// No `Authorization` header.
    None,
    /// A ready `Authorization` header value.
    Header(&'a str),
    /// Rendered as HTTP Basic.
    Basic {
        /// Hub user name.
        username: &'a str,
        /// Its password.
        password: &'a str,
    },
}

/// Where and how to reach the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions<'a> {
    /// Host name or address of the hub.
    pub host: &'a str,
    /// Ask the socket factory for a TLS socket.
    pub secure: bool,
    /// Overrides the default of 443 with TLS and 80 without.
    pub port: Option<u16>,
    /// Sent with every request and with the upgrade.
    pub credentials: Credentials<'a>,
}

impl<'a> ConnectOptions<'a> {
    /// Plain connection on the default port.
    pub fn new(host: &'a str, credentials: Credentials<'a>) -> Self {
        Self {
            host,
            secure: false,
            port: None,
            credentials,
        }
    }

    /// Use TLS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Use a non-default port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Connection details shared by the push channel and every device session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HubInfo {
    /// Host name sent in every request.
    pub host: String<64>,
    /// Resolved port.
    pub port: u16,
    /// Whether sockets are requested with TLS.
    pub secure: bool,
    /// Full `Authorization` header value; empty for none.
    pub authorization: String<192>,
}

impl HubInfo {
    /// Resolve the port and render the credentials.
    pub fn new(options: &ConnectOptions<'_>) -> Result<Self, Error> {
        let host = String::try_from(options.host).map_err(|_| Error::CapacityExceeded)?;
        let port = options
            .port
            .unwrap_or(if options.secure { 443 } else { 80 });
        let authorization = match options.credentials {
            Credentials::None => String::new(),
            Credentials::Header(value) => String::try_from(value).map_err(|_| Error::CapacityExceeded)?,
            Credentials::Basic { username, password } => basic_auth(username, password)?,
        };
        Ok(Self {
            host,
            port,
            secure: options.secure,
            authorization,
        })
    }
}

/// `Basic <base64(username:password)>`
pub fn basic_auth(username: &str, password: &str) -> Result<String<192>, Error> {
    let mut plain: String<128> = String::new();
    write!(plain, "{}:{}", username, password).map_err(|_| Error::CapacityExceeded)?;

    let mut encoded = [0u8; 176];
    let encoded = Base64::encode(plain.as_bytes(), &mut encoded).map_err(|_| Error::CapacityExceeded)?;

    let mut header = String::new();
    write!(header, "Basic {}", encoded).map_err(|_| Error::CapacityExceeded)?;
    Ok(header)
}
