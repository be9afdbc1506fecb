//! Events published to registered subscribers.

use super::config::MAX_SUBSCRIBERS;
use super::device_id::DeviceId;
use crate::network::error::Error;
use heapless::Vec;

/// Something the hub reported, or a device changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// A datapoint value from a push, a triggered scene or a read.
    Datapoint {
        device: DeviceId,
        channel: &'a str,
        datapoint: &'a str,
        value: &'a str,
        /// Set for scene values and explicit reads.
        is_scene: bool,
    },
    /// The display name from a device-details read.
    DisplayName { device: DeviceId, name: &'a str },
    /// A `par<hex>` parameter from a device-details read. Device-level
    /// parameters have an empty channel.
    Parameter {
        device: DeviceId,
        channel: &'a str,
        parameter: u16,
        value: &'a str,
    },
    /// A local device changed one of its own values.
    State {
        device: DeviceId,
        channel: &'a str,
        name: &'a str,
        value: &'a str,
    },
}

impl Event<'_> {
    pub fn device(&self) -> DeviceId {
        match *self {
            Event::Datapoint { device, .. }
            | Event::DisplayName { device, .. }
            | Event::Parameter { device, .. }
            | Event::State { device, .. } => device,
        }
    }
}

/// Receiver of hub events.
///
/// Any `FnMut(&Event)` closure is a subscriber that never asks for extra
/// devices.
pub trait Subscriber {
    fn on_event(&mut self, event: &Event<'_>);

    /// Whether pushes for `device` should be decoded even though no local
    /// device owns it.
    fn needs_info(&mut self, _device: DeviceId) -> bool {
        false
    }
}

impl<F: FnMut(&Event<'_>)> Subscriber for F {
    fn on_event(&mut self, event: &Event<'_>) {
        self(event)
    }
}

/// Bounded list of borrowed subscribers.
#[derive(Default)]
pub struct Subscribers<'s> {
    list: Vec<&'s mut dyn Subscriber, MAX_SUBSCRIBERS>,
}

impl<'s> Subscribers<'s> {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn add(&mut self, subscriber: &'s mut dyn Subscriber) -> Result<(), Error> {
        self.list.push(subscriber).map_err(|_| Error::CapacityExceeded)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn publish(&mut self, event: &Event<'_>) {
        for subscriber in self.list.iter_mut() {
            subscriber.on_event(event);
        }
    }

    /// True as soon as one subscriber claims `device`.
    pub fn needs_info(&mut self, device: DeviceId) -> bool {
        self.list.iter_mut().any(|s| s.needs_info(device))
    }
}

impl core::fmt::Debug for Subscribers<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscribers").field("len", &self.list.len()).finish()
    }
}
