//! Per-device FIFO of datapoint reads and writes.
//!
//! Entries keep the hub client's colon-joined wire form,
//! `GET:<dev>.<ch>.<dp>` or `PUT:<dev>.<ch>.<dp>:<value>`, and are taken
//! apart again with [`token`](crate::hub::token::token) when dispatched.

use crate::hub::config::MAX_PENDING_OPERATIONS;
use crate::hub::device_id::DeviceId;
use crate::hub::token::token;
use crate::network::application::http::Method;
use crate::network::error::Error;
use core::fmt::Write;
use heapless::{Deque, String};

/// Longest encoded entry.
pub const MAX_OPERATION_LEN: usize = 96;

/// A `<dev>.<ch>.<dp>` datapoint address.
pub type Target = String<64>;

/// Join a datapoint address.
pub fn target(device: DeviceId, channel: &str, datapoint: &str) -> Result<Target, Error> {
    let mut target = Target::new();
    write!(target, "{}.{}.{}", device, channel, datapoint).map_err(|_| Error::CapacityExceeded)?;
    Ok(target)
}

/// One queued datapoint operation in its encoded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation(String<MAX_OPERATION_LEN>);

impl PendingOperation {
    /// A read of `target` (`<dev>.<ch>.<dp>`).
    pub fn get(target: &str) -> Result<Self, Error> {
        let mut encoded = String::new();
        write!(encoded, "GET:{}", target).map_err(|_| Error::CapacityExceeded)?;
        Ok(Self(encoded))
    }

    /// A write of `value` to `target`.
    pub fn put(target: &str, value: &str) -> Result<Self, Error> {
        let mut encoded = String::new();
        write!(encoded, "PUT:{}:{}", target, value).map_err(|_| Error::CapacityExceeded)?;
        Ok(Self(encoded))
    }

    /// The encoded entry.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `None` for an unknown verb.
    pub fn method(&self) -> Option<Method> {
        token(&self.0, 0, ':').and_then(Method::parse)
    }

    /// The `<dev>.<ch>.<dp>` part, if present and non-empty.
    pub fn target(&self) -> Option<&str> {
        token(&self.0, 1, ':').filter(|t| !t.is_empty())
    }

    /// The written value; empty for reads.
    pub fn value(&self) -> &str {
        token(&self.0, 2, ':').unwrap_or("")
    }

    /// Whether this is a `PUT`.
    pub fn is_write(&self) -> bool {
        self.method() == Some(Method::Put)
    }
}

/// Bounded FIFO of [`PendingOperation`]s. A full queue rejects new entries.
#[derive(Debug, Default)]
pub struct OperationQueue {
    entries: Deque<PendingOperation, MAX_PENDING_OPERATIONS>,
}

impl OperationQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self { entries: Deque::new() }
    }

    /// Fails with [`Error::CapacityExceeded`] when full.
    pub fn enqueue(&mut self, operation: PendingOperation) -> Result<(), Error> {
        self.entries
            .push_back(operation)
            .map_err(|_| Error::CapacityExceeded)
    }

    /// Take the oldest entry.
    pub fn dequeue(&mut self) -> Option<PendingOperation> {
        self.entries.pop_front()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the next enqueue would fail.
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
