//! Per-kind device behavior.

use super::queue::{self, OperationQueue, PendingOperation};
use crate::hub::device_id::{self, DeviceId};
use crate::hub::event::{Event, Subscribers};
use crate::network::error::Error;
use heapless::String;

/// What an appliance hook may touch: its own device's queue and the
/// registry's subscribers.
pub struct Context<'c, 's> {
    device: DeviceId,
    queue: &'c mut OperationQueue,
    subscribers: &'c mut Subscribers<'s>,
}

impl<'c, 's> Context<'c, 's> {
    pub(crate) fn new(device: DeviceId, queue: &'c mut OperationQueue, subscribers: &'c mut Subscribers<'s>) -> Self {
        Self {
            device,
            queue,
            subscribers,
        }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Queue a write of `value` to one of this device's datapoints.
    pub fn set_datapoint(&mut self, channel: &str, datapoint: &str, value: &str) -> Result<(), Error> {
        let target = queue::target(self.device, channel, datapoint)?;
        self.queue.enqueue(PendingOperation::put(&target, value)?)
    }

    /// Queue a read of one of this device's datapoints. The value arrives
    /// through [`Appliance::on_datapoint`].
    pub fn get_datapoint(&mut self, channel: &str, datapoint: &str) -> Result<(), Error> {
        let target = queue::target(self.device, channel, datapoint)?;
        self.queue.enqueue(PendingOperation::get(&target)?)
    }

    /// Tell subscribers this device changed one of its own values.
    pub fn publish(&mut self, channel: &str, name: &str, value: &str) {
        self.subscribers.publish(&Event::State {
            device: self.device,
            channel,
            name,
            value,
        });
    }
}

impl core::fmt::Debug for Context<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("device", &self.device)
            .field("queued", &self.queue.len())
            .finish()
    }
}

/// Behavior of one kind of virtual device.
///
/// Every hook has an empty default, so a kind only overrides what it reacts
/// to.
pub trait Appliance {
    /// Type name sent with the registration, e.g. `SwitchingActuator`.
    fn device_type(&self) -> &str;

    /// Called once the hub accepted the registration.
    fn on_created(&mut self, _ctx: &mut Context<'_, '_>) {}

    /// A datapoint of this device changed. `is_scene` is set for scene
    /// values and for explicit reads.
    fn on_datapoint(&mut self, _ctx: &mut Context<'_, '_>, _channel: &str, _datapoint: &str, _value: &str, _is_scene: bool) {}

    /// A `par<hex>` parameter from the device details. Device-level
    /// parameters have an empty channel.
    fn on_parameter(&mut self, _ctx: &mut Context<'_, '_>, _channel: &str, _parameter: u16, _value: &str) {}

    fn on_display_name(&mut self, _ctx: &mut Context<'_, '_>, _name: &str) {}

    /// The push channel came back after a drop.
    fn on_reconnect(&mut self, _ctx: &mut Context<'_, '_>) {}
}

/// A switching actuator mirroring its `ch0000/odp0000` output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Switch {
    is_on: bool,
}

impl Switch {
    pub const DEVICE_TYPE: &'static str = "SwitchingActuator";

    pub fn new() -> Self {
        Self { is_on: false }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Switch, report the new output to the hub and publish it as `ON`.
    pub fn set_state(&mut self, ctx: &mut Context<'_, '_>, on: bool) {
        self.is_on = on;
        let value = if on { "1" } else { "0" };
        let channel = device_id::channel(0);
        if let Err(e) = ctx.set_datapoint(&channel, &device_id::output(0), value) {
            warn!("switch {}: output not queued: {}", ctx.device(), e);
        }
        ctx.publish(&channel, "ON", value);
    }
}

impl Appliance for Switch {
    fn device_type(&self) -> &str {
        Self::DEVICE_TYPE
    }

    fn on_created(&mut self, ctx: &mut Context<'_, '_>) {
        self.set_state(ctx, false);
    }

    fn on_datapoint(&mut self, ctx: &mut Context<'_, '_>, channel: &str, datapoint: &str, value: &str, is_scene: bool) {
        if channel != device_id::channel(0).as_str() {
            return;
        }
        if datapoint == device_id::input(0).as_str() || (is_scene && datapoint == device_id::output(0).as_str()) {
            self.set_state(ctx, value != "0");
        }
    }
}

/// The built-in device kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Personality {
    /// Registers under `device_type` and only forwards events.
    Generic { device_type: String<32> },
    Switch(Switch),
}

impl Personality {
    pub fn generic(device_type: &str) -> Result<Self, Error> {
        let device_type = String::try_from(device_type).map_err(|_| Error::CapacityExceeded)?;
        Ok(Personality::Generic { device_type })
    }

    pub fn switch() -> Self {
        Personality::Switch(Switch::new())
    }

    pub fn as_switch(&self) -> Option<&Switch> {
        match self {
            Personality::Switch(switch) => Some(switch),
            Personality::Generic { .. } => None,
        }
    }

    pub fn as_switch_mut(&mut self) -> Option<&mut Switch> {
        match self {
            Personality::Switch(switch) => Some(switch),
            Personality::Generic { .. } => None,
        }
    }
}

impl Appliance for Personality {
    fn device_type(&self) -> &str {
        match self {
            Personality::Generic { device_type } => device_type,
            Personality::Switch(switch) => switch.device_type(),
        }
    }

    fn on_created(&mut self, ctx: &mut Context<'_, '_>) {
        if let Personality::Switch(switch) = self {
            switch.on_created(ctx);
        }
    }

    fn on_datapoint(&mut self, ctx: &mut Context<'_, '_>, channel: &str, datapoint: &str, value: &str, is_scene: bool) {
        if let Personality::Switch(switch) = self {
            switch.on_datapoint(ctx, channel, datapoint, value, is_scene);
        }
    }
}
