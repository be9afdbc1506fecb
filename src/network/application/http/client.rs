use crate::hub::config::{MAX_BODY_SIZE, MAX_REQUEST_SIZE};
use crate::network::error::Error;
use crate::network::{Socket, read_byte, write_all};
use crate::system::{Clock, Delay};
use core::fmt::Write;
use core::task::Poll;
use heapless::{String, Vec};

const MAX_HEADERS: usize = 8;
const MAX_HEADER_NAME_LEN: usize = 32;
const MAX_HEADER_VALUE_LEN: usize = 96;
const MAX_LINE_LEN: usize = 160;
const MAX_EXTRA_HEADERS_LEN: usize = 384;

/// Where an exchange currently stands.
///
/// States are ordered: everything after [`State::Closed`] has a live
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Initial = 0,
    Failed = 1,
    Closed = 10,
    Connected = 20,
    Requested = 30,
    Headers = 40,
    Data = 50,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "GET" => Some(Method::Get),
            "PUT" => Some(Method::Put),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// A response header. Names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String<MAX_HEADER_NAME_LEN>,
    pub value: String<MAX_HEADER_VALUE_LEN>,
}

/// A steppable HTTP/1.1 client.
///
/// Each phase method performs at most one transition and never waits for the
/// network. Calling a phase method in the wrong state returns
/// [`Error::InvalidState`] and leaves the stored response untouched.
pub struct Client<S: Socket> {
    socket: S,
    state: State,
    extra_headers: String<MAX_EXTRA_HEADERS_LEN>,
    line: Vec<u8, MAX_LINE_LEN>,
    line_complete: bool,
    status: u16,
    headers: Vec<Header, MAX_HEADERS>,
    content_length: Option<usize>,
    consumed: usize,
    body: Vec<u8, MAX_BODY_SIZE>,
}

impl<S: Socket> Client<S> {
    pub fn new(socket: S) -> Self {
        Self {
            socket,
            state: State::Initial,
            extra_headers: String::new(),
            line: Vec::new(),
            line_complete: false,
            status: 0,
            headers: Vec::new(),
            content_length: None,
            consumed: 0,
            body: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Status code of the last response, `0` before one was read.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Received headers, in arrival order.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Case-insensitive response header lookup.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn socket(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Open the transport. Fails with [`Error::Busy`] while an exchange is active.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        if self.state > State::Closed {
            warn!("http: connection in progress");
            return Err(Error::Busy);
        }
        self.clear();
        self.socket.connect(host, port).map_err(|e| {
            warn!("http: connect to {}:{} failed", host, port);
            e
        })?;
        self.state = State::Connected;
        Ok(())
    }

    /// Queue a header for the next request. Headers are dropped on connect.
    pub fn add_request_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        write!(self.extra_headers, "{}: {}\r\n", name, value).map_err(|_| Error::CapacityExceeded)
    }

    pub fn clear_request_headers(&mut self) {
        self.extra_headers.clear();
    }

    /// Send the request line, headers and body. Only valid in [`State::Connected`].
    pub fn request(&mut self, method: Method, uri: &str, body: &[u8]) -> Result<(), Error> {
        if self.state != State::Connected {
            return Err(Error::InvalidState);
        }

        // --- Build Request ---
        let mut request_buf: Vec<u8, MAX_REQUEST_SIZE> = Vec::new();
        let mut head: String<64> = String::new();

        request_buf
            .extend_from_slice(method.as_str().as_bytes())
            .map_err(|_| Error::CapacityExceeded)?;
        request_buf.push(b' ').map_err(|_| Error::CapacityExceeded)?;
        request_buf
            .extend_from_slice(uri.as_bytes())
            .map_err(|_| Error::CapacityExceeded)?;
        request_buf
            .extend_from_slice(b" HTTP/1.1\r\nConnection: close\r\n")
            .map_err(|_| Error::CapacityExceeded)?;

        if !body.is_empty() {
            write!(head, "Content-Length: {}\r\n", body.len()).map_err(|_| Error::CapacityExceeded)?;
            request_buf
                .extend_from_slice(head.as_bytes())
                .map_err(|_| Error::CapacityExceeded)?;
        }
        request_buf
            .extend_from_slice(self.extra_headers.as_bytes())
            .map_err(|_| Error::CapacityExceeded)?;
        request_buf
            .extend_from_slice(b"\r\n")
            .map_err(|_| Error::CapacityExceeded)?;
        request_buf
            .extend_from_slice(body)
            .map_err(|_| Error::CapacityExceeded)?;

        // --- Send Request ---
        if let Err(e) = write_all(&mut self.socket, &request_buf) {
            warn!("http: request write failed");
            self.socket.stop();
            self.state = State::Failed;
            return Err(e);
        }
        trace!("http: {} {}", method.as_str(), uri);
        self.state = State::Requested;
        Ok(())
    }

    /// Parse the status line. Only valid in [`State::Requested`].
    pub fn read_result(&mut self) -> Result<Poll<u16>, Error> {
        if self.state != State::Requested {
            return Err(Error::InvalidState);
        }
        if self.poll_line()?.is_pending() {
            return Ok(Poll::Pending);
        }

        let code = parse_status(&self.line);
        self.take_line();
        match code {
            Some(code) => {
                self.status = code;
                self.state = State::Headers;
                Ok(Poll::Ready(code))
            }
            None => {
                warn!("http: malformed status line");
                Err(self.fail(Error::ProtocolError))
            }
        }
    }

    /// Read one header line. `Ready(None)` marks the end of the headers and
    /// moves to [`State::Data`]. Only valid in [`State::Headers`].
    pub fn read_headers(&mut self) -> Result<Poll<Option<Header>>, Error> {
        if self.state != State::Headers {
            return Err(Error::InvalidState);
        }
        if self.poll_line()?.is_pending() {
            return Ok(Poll::Pending);
        }

        if self.line.is_empty() {
            self.take_line();
            self.state = State::Data;
            return Ok(Poll::Ready(None));
        }

        let header = parse_header(&self.line);
        self.take_line();
        let Some(header) = header else {
            debug!("http: skipping malformed header");
            return Ok(Poll::Pending);
        };

        if header.name == "content-length" {
            self.content_length = header.value.parse().ok();
        }
        if self.headers.push(header.clone()).is_err() {
            debug!("http: header table full, dropping {}", header.name.as_str());
        }
        Ok(Poll::Ready(Some(header)))
    }

    /// Consume one body byte. `Ready` once the body is complete, at which point
    /// the transport is closed and the state is [`State::Closed`].
    pub fn read_payload(&mut self) -> Result<Poll<()>, Error> {
        if self.state != State::Data {
            return Err(Error::InvalidState);
        }
        if self.body_complete() {
            self.finish();
            return Ok(Poll::Ready(()));
        }

        if self.socket.available() > 0 {
            if let Some(byte) = read_byte(&mut self.socket).map_err(|_| self.fail(Error::ReadError))? {
                self.consumed += 1;
                if self.body.push(byte).is_err() && self.consumed == MAX_BODY_SIZE + 1 {
                    warn!("http: body exceeds {} bytes, truncating", MAX_BODY_SIZE);
                }
            }
            if self.body_complete() {
                self.finish();
                return Ok(Poll::Ready(()));
            }
            return Ok(Poll::Pending);
        }

        if !self.socket.connected() {
            self.finish();
            return Ok(Poll::Ready(()));
        }
        Ok(Poll::Pending)
    }

    /// Stop the transport and reset to [`State::Closed`]. Does nothing before
    /// the first connect.
    pub fn abort(&mut self) {
        if self.state != State::Initial {
            self.socket.stop();
            self.state = State::Closed;
            self.clear();
        }
    }

    /// Drive the current exchange to completion, sleeping between polls.
    ///
    /// Returns the status code once the body is read. Gives up with
    /// [`Error::Timeout`] after `timeout_ms`.
    pub fn complete<P: Clock + Delay>(&mut self, platform: &P, poll_ms: u32, timeout_ms: u64) -> Result<u16, Error> {
        let deadline = platform.now_ms() + timeout_ms;
        let expired = |p: &P| p.now_ms() > deadline;

        let code = loop {
            if let Poll::Ready(code) = self.read_result()? {
                break code;
            }
            if expired(platform) {
                return Err(self.fail(Error::Timeout));
            }
            platform.delay_ms(poll_ms);
        };

        while self.state == State::Headers {
            if self.read_headers()?.is_pending() {
                if expired(platform) {
                    return Err(self.fail(Error::Timeout));
                }
                platform.delay_ms(poll_ms);
            }
        }

        loop {
            if self.read_payload()?.is_ready() {
                return Ok(code);
            }
            if self.socket.available() == 0 {
                if expired(platform) {
                    return Err(self.fail(Error::Timeout));
                }
                platform.delay_ms(poll_ms);
            }
        }
    }

    fn session_ok(&mut self) -> bool {
        self.state > State::Closed && (self.socket.connected() || self.socket.available() > 0)
    }

    /// Accumulate bytes into `line` until a newline arrives.
    fn poll_line(&mut self) -> Result<Poll<()>, Error> {
        if self.line_complete {
            return Ok(Poll::Ready(()));
        }
        if !self.session_ok() {
            debug!("http: session lost");
            return Err(self.fail(Error::ConnectionClosed));
        }
        while self.socket.available() > 0 {
            let Some(byte) = read_byte(&mut self.socket).map_err(|_| self.fail(Error::ReadError))? else {
                break;
            };
            match byte {
                b'\n' => {
                    if self.line.last() == Some(&b'\r') {
                        self.line.pop();
                    }
                    self.line_complete = true;
                    return Ok(Poll::Ready(()));
                }
                // Overlong lines are cut, the rest is skipped until the newline.
                _ => {
                    let _ = self.line.push(byte);
                }
            }
        }
        Ok(Poll::Pending)
    }

    fn take_line(&mut self) {
        self.line.clear();
        self.line_complete = false;
    }

    fn body_complete(&self) -> bool {
        matches!(self.content_length, Some(len) if self.consumed >= len)
    }

    fn finish(&mut self) {
        self.socket.stop();
        self.state = State::Closed;
    }

    fn fail(&mut self, error: Error) -> Error {
        self.socket.stop();
        self.state = State::Failed;
        error
    }

    fn clear(&mut self) {
        self.extra_headers.clear();
        self.take_line();
        self.status = 0;
        self.headers.clear();
        self.content_length = None;
        self.consumed = 0;
        self.body.clear();
    }
}

/// `HTTP/1.1 200 OK` -> `200`
fn parse_status(line: &[u8]) -> Option<u16> {
    let start = find_slice(line, b"HTTP/")?;
    let code = line.get(start + 9..start + 12)?;
    let code = core::str::from_utf8(code).ok()?;
    code.parse().ok()
}

fn parse_header(line: &[u8]) -> Option<Header> {
    let line = core::str::from_utf8(line).ok()?;
    let colon = line.find(':').filter(|&c| c > 0)?;
    let name = line[..colon].trim();
    let value = line[colon + 1..].trim();

    let mut header = Header {
        name: String::new(),
        value: String::new(),
    };
    for c in name.chars() {
        header.name.push(c.to_ascii_lowercase()).ok()?;
    }
    // Long values are cut at a char boundary.
    for c in value.chars() {
        if header.value.push(c).is_err() {
            break;
        }
    }
    Some(header)
}

/// Finds the first occurrence of a slice in another slice and returns its starting position.
fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl<S: Socket> core::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("status", &self.status)
            .field("body", &self.body.len())
            .finish()
    }
}
