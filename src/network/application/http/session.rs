use super::client::{Client, Method, State};
use crate::hub::HubInfo;
use crate::hub::config::{HTTP_POLL_MS, HTTP_SESSION_TIMEOUT_MS};
use crate::hub::uri::Uri;
use crate::network::Socket;
use crate::network::error::Error;
use crate::system::Platform;
use core::task::Poll;
use heapless::Vec;

const MAX_ASYNC_BODY: usize = 256;

/// Outcome of the exchange a [`Session`] is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStatus {
    /// Idle, ready for a new exchange.
    None,
    Pending,
    Success,
    Failed,
}

/// One-exchange-at-a-time wrapper around [`Client`] that talks to the hub.
///
/// [`Session::request_async`] connects and arms a request, every
/// [`Session::process`] call then advances the exchange by one phase. The
/// session remembers when the exchange started so the owner can enforce a
/// timeout.
pub struct Session<S: Socket, P: Platform> {
    client: Client<S>,
    platform: P,
    status: AsyncStatus,
    method: Option<Method>,
    uri: Uri,
    body: Vec<u8, MAX_ASYNC_BODY>,
    started_ms: u64,
}

impl<S: Socket, P: Platform> Session<S, P> {
    pub fn new(socket: S, platform: P) -> Self {
        Self {
            client: Client::new(socket),
            platform,
            status: AsyncStatus::None,
            method: None,
            uri: Uri::new(),
            body: Vec::new(),
            started_ms: 0,
        }
    }

    pub fn status(&self) -> AsyncStatus {
        self.status
    }

    pub fn state(&self) -> State {
        self.client.state()
    }

    /// Method of the last armed request.
    pub fn last_method(&self) -> Option<Method> {
        self.method
    }

    /// Path of the last armed request.
    pub fn last_uri(&self) -> &str {
        &self.uri
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.client.response_header(name)
    }

    pub fn status_code(&self) -> u16 {
        self.client.status_code()
    }

    pub fn body(&self) -> &[u8] {
        self.client.body()
    }

    /// Clock reading taken when the current exchange was armed.
    pub fn started_ms(&self) -> u64 {
        self.started_ms
    }

    /// Connect and arm a request for the next [`process`](Self::process) call.
    ///
    /// Rejected with [`Error::Busy`] while another exchange is pending; the
    /// pending request is left as it was.
    pub fn request_async(&mut self, hub: &HubInfo, method: Method, uri: &str, body: &str) -> Result<(), Error> {
        if self.status == AsyncStatus::Pending {
            return Err(Error::Busy);
        }
        let uri = Uri::try_from(uri).map_err(|_| Error::CapacityExceeded)?;
        let body = Vec::from_slice(body.as_bytes()).map_err(|_| Error::CapacityExceeded)?;
        self.connect(hub)?;

        self.method = Some(method);
        self.uri = uri;
        self.body = body;
        self.status = AsyncStatus::Pending;
        self.started_ms = self.platform.now_ms();
        Ok(())
    }

    /// Advance the pending exchange by one phase.
    pub fn process(&mut self, hub: &HubInfo) {
        match self.client.state() {
            State::Initial | State::Closed => {
                if self.status == AsyncStatus::Pending {
                    self.status = AsyncStatus::Success;
                }
            }
            State::Failed => {
                self.status = AsyncStatus::Failed;
            }
            State::Connected => {
                let Some(method) = self.method else {
                    return;
                };
                let uri = self.uri.clone();
                let body = self.body.clone();
                if self.send(hub, method, &uri, &body).is_err() {
                    warn!("session: request failed");
                    self.status = AsyncStatus::Failed;
                }
            }
            State::Requested => match self.client.read_result() {
                Ok(Poll::Pending) => {}
                Ok(Poll::Ready(200)) => {}
                Ok(Poll::Ready(code)) => {
                    warn!("session: {} answered {}", self.uri.as_str(), code);
                    self.client.abort();
                    self.status = AsyncStatus::Failed;
                }
                Err(e) => {
                    warn!("session: response failed: {}", e);
                    self.status = AsyncStatus::Failed;
                }
            },
            State::Headers => {
                if let Err(e) = self.client.read_headers() {
                    warn!("session: headers failed: {}", e);
                    self.status = AsyncStatus::Failed;
                }
            }
            State::Data => match self.client.read_payload() {
                Ok(Poll::Pending) => {}
                Ok(Poll::Ready(())) => {
                    trace!("session: {} done", self.uri.as_str());
                    self.status = AsyncStatus::Success;
                }
                Err(e) => {
                    warn!("session: body failed: {}", e);
                    self.status = AsyncStatus::Failed;
                }
            },
        }
    }

    /// Abort the exchange and return to [`AsyncStatus::None`].
    pub fn release(&mut self) {
        self.client.abort();
        self.method = None;
        self.uri.clear();
        self.body.clear();
        self.status = AsyncStatus::None;
    }

    /// Run a complete exchange, blocking until the body is read.
    ///
    /// Anything but `200 OK` is an error. The response stays readable through
    /// [`body`](Self::body) until the next exchange.
    pub fn request_blocking(&mut self, hub: &HubInfo, method: Method, uri: &str, body: &str) -> Result<(), Error> {
        if self.status == AsyncStatus::Pending {
            return Err(Error::Busy);
        }
        self.connect(hub)?;
        self.send(hub, method, uri, body.as_bytes())?;

        let code = match self
            .client
            .complete(&self.platform, HTTP_POLL_MS, HTTP_SESSION_TIMEOUT_MS)
        {
            Ok(code) => code,
            Err(e) => {
                warn!("session: {} failed: {}", uri, e);
                self.client.abort();
                return Err(e);
            }
        };
        if code != 200 {
            warn!("session: {} answered {}", uri, code);
            self.client.abort();
            return Err(Error::ProtocolError);
        }
        Ok(())
    }

    fn connect(&mut self, hub: &HubInfo) -> Result<(), Error> {
        if self.client.state() > State::Closed {
            return Err(Error::Busy);
        }
        if let Err(e) = self.client.connect(&hub.host, hub.port) {
            self.client.abort();
            return Err(e);
        }
        Ok(())
    }

    fn send(&mut self, hub: &HubInfo, method: Method, uri: &str, body: &[u8]) -> Result<(), Error> {
        if self.client.state() != State::Connected {
            return Err(Error::InvalidState);
        }
        let result = self.add_hub_headers(hub).and_then(|_| self.client.request(method, uri, body));
        if result.is_err() {
            self.client.abort();
        }
        result
    }

    fn add_hub_headers(&mut self, hub: &HubInfo) -> Result<(), Error> {
        self.client.add_request_header("Content-Type", "application/json")?;
        self.client.add_request_header("Accept", "application/json")?;
        self.client.add_request_header("Host", "sysap")?;
        if !hub.authorization.is_empty() {
            self.client.add_request_header("Authorization", &hub.authorization)?;
        }
        Ok(())
    }
}

impl<S: Socket, P: Platform> core::fmt::Debug for Session<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("client", &self.client)
            .finish()
    }
}
