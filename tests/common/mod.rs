#![allow(dead_code)]

use libfah::hub::Event;
use libfah::network::error::Error;
use libfah::network::{Read, Socket, SocketFactory, Write};
use libfah::system::{Clock, Delay, Entropy};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub const ROOT: &str = "00000000-0000-0000-0000-000000000000";

/// Replies handed out, in order, to whichever mock socket connects next.
#[derive(Debug, Default)]
pub struct Script {
    replies: VecDeque<Vec<u8>>,
    refuse: usize,
    connects: Vec<(String, u16)>,
}

/// One side of a mock connection.
#[derive(Debug, Default)]
struct Wire {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    open: bool,
    remote_closed: bool,
    fail_writes: bool,
}

#[derive(Debug, Clone)]
pub struct MockSocket {
    wire: Rc<RefCell<Wire>>,
    script: Rc<RefCell<Script>>,
}

impl MockSocket {
    pub fn new() -> Self {
        Self::with_script(Rc::new(RefCell::new(Script::default())))
    }

    fn with_script(script: Rc<RefCell<Script>>) -> Self {
        Self {
            wire: Rc::new(RefCell::new(Wire::default())),
            script,
        }
    }

    /// Queue the reply the next connect will find waiting.
    pub fn reply(&self, bytes: &[u8]) {
        self.script.borrow_mut().replies.push_back(bytes.to_vec());
    }

    /// Make the next `count` connects fail.
    pub fn refuse(&self, count: usize) {
        self.script.borrow_mut().refuse = count;
    }

    /// Bytes arriving from the peer right now.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.wire.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Everything written since the last call.
    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.wire.borrow_mut().tx)
    }

    pub fn take_tx_string(&self) -> String {
        String::from_utf8_lossy(&self.take_tx()).into_owned()
    }

    pub fn hang_up(&self) {
        self.wire.borrow_mut().remote_closed = true;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.wire.borrow_mut().fail_writes = fail;
    }

    pub fn is_open(&self) -> bool {
        self.wire.borrow().open
    }

    pub fn pending_rx(&self) -> usize {
        self.wire.borrow().rx.len()
    }

    pub fn connects(&self) -> Vec<(String, u16)> {
        self.script.borrow().connects.clone()
    }
}

impl Read for MockSocket {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut wire = self.wire.borrow_mut();
        if !wire.open {
            return Err(Error::NotOpen);
        }
        let mut n = 0;
        while n < buf.len() {
            match wire.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockSocket {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let mut wire = self.wire.borrow_mut();
        if !wire.open || wire.fail_writes {
            return Err(Error::WriteError);
        }
        wire.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl Socket for MockSocket {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        let mut script = self.script.borrow_mut();
        let mut wire = self.wire.borrow_mut();
        wire.rx.clear();
        wire.open = false;
        wire.remote_closed = false;
        script.connects.push((host.to_string(), port));
        if script.refuse > 0 {
            script.refuse -= 1;
            return Err(Error::ConnectionRefused);
        }
        wire.open = true;
        if let Some(reply) = script.replies.pop_front() {
            wire.rx.extend(reply);
        }
        Ok(())
    }

    fn available(&mut self) -> usize {
        let wire = self.wire.borrow();
        if wire.open { wire.rx.len() } else { 0 }
    }

    fn connected(&mut self) -> bool {
        let wire = self.wire.borrow();
        wire.open && !wire.remote_closed
    }

    fn stop(&mut self) {
        let mut wire = self.wire.borrow_mut();
        wire.open = false;
        wire.remote_closed = false;
        wire.rx.clear();
    }
}

/// Hands out mock sockets that share one reply script and remembers them.
#[derive(Debug, Clone)]
pub struct MockFactory {
    script: Rc<RefCell<Script>>,
    sockets: Rc<RefCell<Vec<MockSocket>>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            script: Rc::new(RefCell::new(Script::default())),
            sockets: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn reply(&self, bytes: &[u8]) {
        self.script.borrow_mut().replies.push_back(bytes.to_vec());
    }

    pub fn refuse(&self, count: usize) {
        self.script.borrow_mut().refuse = count;
    }

    pub fn unused_replies(&self) -> usize {
        self.script.borrow().replies.len()
    }

    /// The `n`-th socket handed out.
    pub fn socket_at(&self, n: usize) -> MockSocket {
        self.sockets.borrow()[n].clone()
    }

    pub fn sockets_made(&self) -> usize {
        self.sockets.borrow().len()
    }
}

impl SocketFactory for MockFactory {
    type Socket = MockSocket;

    fn socket(&mut self, _secure: bool) -> MockSocket {
        let socket = MockSocket::with_script(self.script.clone());
        self.sockets.borrow_mut().push(socket.clone());
        socket
    }
}

/// Manual clock that moves forward only on `delay_ms` and `advance`.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    now: Rc<Cell<u64>>,
    seed: Rc<Cell<u32>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(1_000)),
            seed: Rc::new(Cell::new(0x2545_F491)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for MockPlatform {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

impl Delay for MockPlatform {
    fn delay_ms(&self, ms: u32) {
        self.advance(ms as u64);
    }
}

impl Entropy for MockPlatform {
    fn random_u32(&self) -> u32 {
        let mut x = self.seed.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed.set(x);
        x
    }
}

pub const HANDSHAKE_OK: &str = "HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
    \r\n";

/// A `200 OK` reply with a JSON body.
pub fn json_reply(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

/// A reply with `status` and an empty body.
pub fn status_reply(status: u16, reason: &str) -> Vec<u8> {
    format!("HTTP/1.1 {} {}\r\nContent-Length: 0\r\n\r\n", status, reason).into_bytes()
}

/// An unmasked server text frame.
pub fn text_frame(text: &str) -> Vec<u8> {
    let mut frame = vec![0x81];
    push_length(&mut frame, text.len());
    frame.extend_from_slice(text.as_bytes());
    frame
}

/// An unmasked server frame with explicit FIN and opcode bits.
pub fn frame(first: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![first];
    push_length(&mut frame, payload.len());
    frame.extend_from_slice(payload);
    frame
}

fn push_length(frame: &mut Vec<u8>, len: usize) {
    if len > 125 {
        frame.push(126);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(len as u8);
    }
}

/// Decode one masked client frame from `wire`: `(first byte, payload, rest)`.
pub fn client_frame(wire: &[u8]) -> (u8, Vec<u8>, &[u8]) {
    let first = wire[0];
    assert!(wire[1] & 0x80 != 0, "client frames must be masked");
    let (len, mut pos) = match wire[1] & 0x7F {
        126 => (u16::from_be_bytes([wire[2], wire[3]]) as usize, 4),
        n => (n as usize, 2),
    };
    let mask = [wire[pos], wire[pos + 1], wire[pos + 2], wire[pos + 3]];
    pos += 4;
    let payload = wire[pos..pos + len]
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ mask[i % 4])
        .collect();
    (first, payload, &wire[pos + len..])
}

/// One line per event, for comparing what subscribers saw.
pub fn describe(event: &Event<'_>) -> String {
    match *event {
        Event::Datapoint { device, channel, datapoint, value, is_scene } => {
            format!("datapoint {} {} {} {} {}", device, channel, datapoint, value, is_scene)
        }
        Event::DisplayName { device, name } => format!("name {} {}", device, name),
        Event::Parameter { device, channel, parameter, value } => {
            format!("parameter {} {} {:04X} {}", device, channel, parameter, value)
        }
        Event::State { device, channel, name, value } => {
            format!("state {} {} {} {}", device, channel, name, value)
        }
    }
}
