use super::frame::{self, FrameHeader, Opcode};
use crate::hub::config::{WS_HANDSHAKE_TIMEOUT_MS, WS_PING_INTERVAL_MS, WS_READ_POLL_MS};
use crate::network::error::Error;
use crate::network::{Socket, read_byte, write_all};
use crate::system::Platform;
use core::fmt::Write;
use heapless::{String, Vec};

const KEY_LEN: usize = 22;
const KEY_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const MAX_HANDSHAKE_LEN: usize = 512;
const MAX_LINE_LEN: usize = 256;
const MAX_CONTROL_PAYLOAD: usize = 125;
/// Below this many buffered bytes a closed socket cannot hold another frame
/// worth finishing.
const MIN_DRAIN_BYTES: usize = 8;

/// Client side of a WebSocket connection.
pub struct WebSocketClient<S: Socket, P: Platform> {
    socket: S,
    platform: P,
    authorization: String<192>,
    established: bool,
    last_ping_ms: u64,
}

impl<S: Socket, P: Platform> WebSocketClient<S, P> {
    pub fn new(socket: S, platform: P) -> Self {
        Self {
            socket,
            platform,
            authorization: String::new(),
            established: false,
            last_ping_ms: 0,
        }
    }

    /// Value of the `Authorization` header sent with the upgrade request.
    pub fn set_authorization_header(&mut self, value: &str) -> Result<(), Error> {
        self.authorization = String::try_from(value).map_err(|_| Error::CapacityExceeded)?;
        Ok(())
    }

    /// Open the transport and perform the upgrade handshake.
    ///
    /// The response must carry status `101`, `Connection: upgrade`,
    /// `Upgrade: websocket` and a `Sec-WebSocket-Accept` header. The accept
    /// value itself is not verified. On any failure the transport is closed.
    pub fn connect(&mut self, host: &str, path: &str, port: u16) -> Result<(), Error> {
        self.disconnect();
        if let Err(e) = self.socket.connect(host, port) {
            warn!("ws: connect to {}:{} failed", host, port);
            self.disconnect();
            return Err(e);
        }

        match self.handshake(host, path) {
            Ok(()) => {
                info!("ws: connected to {}:{}", host, port);
                self.established = true;
                self.last_ping_ms = self.platform.now_ms();
                Ok(())
            }
            Err(e) => {
                warn!("ws: handshake with {} failed: {}", host, e);
                self.disconnect();
                Err(e)
            }
        }
    }

    pub fn is_connected(&mut self) -> bool {
        self.established && self.socket.connected()
    }

    /// Bytes buffered by the transport.
    pub fn available(&mut self) -> usize {
        self.socket.available()
    }

    pub fn disconnect(&mut self) {
        self.socket.stop();
        self.established = false;
    }

    /// Send `text` as one final, masked text frame.
    pub fn send(&mut self, text: &str) -> Result<(), Error> {
        self.send_frame(Opcode::Text, text.as_bytes())
    }

    /// Ping the server if the channel has been idle for the ping interval.
    pub fn send_keep_alive(&mut self) {
        let now = self.platform.now_ms();
        if now.saturating_sub(self.last_ping_ms) > WS_PING_INTERVAL_MS {
            trace!("ws: ping");
            if let Err(e) = self.send_frame(Opcode::Ping, b"{}") {
                debug!("ws: ping failed: {}", e);
            }
            self.last_ping_ms = now;
        }
    }

    /// Read one message into `out`, reassembling fragments.
    ///
    /// Returns `true` only when a complete text message was read. Control
    /// frames are handled here: pings are answered, pongs dropped, and a close
    /// frame tears the channel down. When nothing is buffered this sends a
    /// keepalive ping if one is due.
    pub fn get_message<const N: usize>(&mut self, out: &mut Vec<u8, N>) -> bool {
        if !self.socket.connected() && self.socket.available() < MIN_DRAIN_BYTES {
            if self.established {
                info!("ws: connection closed by peer");
                self.disconnect();
            }
            return false;
        }
        if self.socket.available() == 0 {
            self.send_keep_alive();
            return false;
        }

        out.clear();
        match self.read_message(out) {
            Ok(is_text) => is_text,
            Err(e) => {
                warn!("ws: read failed: {}", e);
                self.disconnect();
                false
            }
        }
    }

    fn handshake(&mut self, host: &str, path: &str) -> Result<(), Error> {
        let mut request: String<MAX_HANDSHAKE_LEN> = String::new();
        let key = self.generate_key();
        write!(
            request,
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\
             Sec-WebSocket-Version: 13\r\nSec-WebSocket-Key: {}==\r\n",
            path, host, key
        )
        .map_err(|_| Error::CapacityExceeded)?;
        if !self.authorization.is_empty() {
            write!(request, "Authorization: {}\r\n", self.authorization).map_err(|_| Error::CapacityExceeded)?;
        }
        request.push_str("\r\n").map_err(|_| Error::CapacityExceeded)?;
        write_all(&mut self.socket, request.as_bytes())?;

        let deadline = self.platform.now_ms() + WS_HANDSHAKE_TIMEOUT_MS;
        let mut has_status = false;
        let mut is_upgrade = false;
        let mut is_websocket = false;
        let mut has_accept = false;

        loop {
            let line = self.read_line(deadline)?;
            if line.is_empty() {
                break;
            }
            if let Some(at) = line.find("HTTP/") {
                match line.get(at + 9..at + 12) {
                    Some("101") => has_status = true,
                    _ => {
                        debug!("ws: unexpected status line {}", line.as_str());
                        return Err(Error::ProtocolError);
                    }
                }
            } else if let Some(colon) = line.find(':') {
                let name = line[..colon].trim();
                let value = line[colon + 1..].trim();
                if name.eq_ignore_ascii_case("connection") {
                    is_upgrade = contains_ignore_case(value, "upgrade");
                } else if name.eq_ignore_ascii_case("upgrade") {
                    is_websocket = value.eq_ignore_ascii_case("websocket");
                } else if name.eq_ignore_ascii_case("sec-websocket-accept") {
                    has_accept = true;
                }
            }
        }

        if has_status && is_upgrade && is_websocket && has_accept {
            Ok(())
        } else {
            Err(Error::ProtocolError)
        }
    }

    /// 22 random alphanumerics. With the trailing `==` appended on the wire
    /// they form a valid 16-byte base64 key.
    fn generate_key(&self) -> String<KEY_LEN> {
        let mut key = String::new();
        for _ in 0..KEY_LEN {
            let pick = self.platform.random_u32() as usize % KEY_ALPHABET.len();
            let _ = key.push(KEY_ALPHABET[pick] as char);
        }
        key
    }

    /// Read one CRLF-terminated line, waiting until `deadline`.
    fn read_line(&mut self, deadline: u64) -> Result<String<MAX_LINE_LEN>, Error> {
        let mut line: Vec<u8, MAX_LINE_LEN> = Vec::new();
        loop {
            if self.socket.available() == 0 {
                if !self.socket.connected() {
                    return Err(Error::ConnectionClosed);
                }
                if self.platform.now_ms() > deadline {
                    return Err(Error::Timeout);
                }
                self.platform.delay_ms(WS_READ_POLL_MS);
                continue;
            }
            let Some(byte) = read_byte(&mut self.socket)? else {
                continue;
            };
            match byte {
                b'\n' => break,
                b'\r' => {}
                _ => {
                    let _ = line.push(byte);
                }
            }
        }
        let text = core::str::from_utf8(&line).map_err(|_| Error::ProtocolError)?;
        String::try_from(text).map_err(|_| Error::ProtocolError)
    }

    /// Block until one byte arrives or the peer goes away.
    fn timed_read(&mut self) -> Result<u8, Error> {
        loop {
            if self.socket.available() > 0 {
                if let Some(byte) = read_byte(&mut self.socket)? {
                    return Ok(byte);
                }
            } else if !self.socket.connected() {
                return Err(Error::ConnectionClosed);
            }
            self.platform.delay_ms(WS_READ_POLL_MS);
        }
    }

    fn read_frame_header(&mut self) -> Result<FrameHeader, Error> {
        frame::read_header(|| self.timed_read())
    }

    /// Read frames until a data message is complete or a lone control frame
    /// was handled. Payload that does not fit `out` is consumed and dropped.
    fn read_message<const N: usize>(&mut self, out: &mut Vec<u8, N>) -> Result<bool, Error> {
        let mut message: Option<Opcode> = None;
        let mut truncated = false;

        loop {
            let header = self.read_frame_header()?;

            if header.opcode.is_control() {
                let mut payload: Vec<u8, MAX_CONTROL_PAYLOAD> = Vec::new();
                self.read_payload(&header, &mut payload)?;
                match header.opcode {
                    Opcode::Ping => {
                        trace!("ws: answering ping");
                        self.send_frame(Opcode::Pong, &payload)?;
                    }
                    Opcode::Close => {
                        info!("ws: close frame received");
                        self.disconnect();
                        return Ok(false);
                    }
                    _ => {}
                }
                if message.is_none() {
                    return Ok(false);
                }
                continue;
            }

            if message.is_none() {
                message = Some(header.opcode);
            }
            truncated |= self.read_payload(&header, out)?;

            if header.fin {
                if truncated {
                    warn!("ws: message exceeds {} bytes, truncated", N);
                }
                return Ok(message == Some(Opcode::Text));
            }
        }
    }

    /// Append the frame payload to `out`, unmasking as it goes. Returns
    /// whether bytes had to be dropped.
    fn read_payload<const N: usize>(&mut self, header: &FrameHeader, out: &mut Vec<u8, N>) -> Result<bool, Error> {
        let mut dropped = false;
        for i in 0..header.length {
            let mut byte = self.timed_read()?;
            if let Some(mask) = header.mask {
                byte ^= mask[(i % 4) as usize];
            }
            if out.push(byte).is_err() {
                dropped = true;
            }
        }
        Ok(dropped)
    }

    fn send_frame(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), Error> {
        if !self.socket.connected() {
            debug!("ws: not connected");
            return Err(Error::NotOpen);
        }
        let mask = self.platform.random_u32().to_be_bytes();
        let header = frame::encode_header(opcode, payload.len(), mask)?;
        write_all(&mut self.socket, &header)?;

        let mut chunk = [0u8; 64];
        for (n, part) in payload.chunks(chunk.len()).enumerate() {
            let masked = &mut chunk[..part.len()];
            masked.copy_from_slice(part);
            frame::apply_mask(masked, mask, n * 64);
            write_all(&mut self.socket, masked)?;
        }
        Ok(())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

impl<S: Socket, P: Platform> core::fmt::Debug for WebSocketClient<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("established", &self.established)
            .field("last_ping_ms", &self.last_ping_ms)
            .finish()
    }
}
