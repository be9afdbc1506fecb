//! The device table and push dispatcher.

use super::config::{MAX_DEVICES, PUSH_BUFFER_SIZE, WS_MESSAGE_SIZE};
use super::device::{Appliance, Context, Device, Personality};
use super::device_id::{self, DeviceId, HUB_ID};
use super::event::{Event, Subscriber, Subscribers};
use super::json::{Document, Sections, unescape};
use super::token::token;
use super::uri::{self, WS_PATH};
use super::{ConnectOptions, HubInfo};
use crate::network::application::http::{Method, Session};
use crate::network::application::websocket::WebSocketClient;
use crate::network::error::Error;
use crate::network::{Socket, SocketFactory};
use crate::system::Platform;
use heapless::Vec;

/// A closed channel with this many buffered bytes or fewer has nothing left
/// worth draining.
const DRAIN_THRESHOLD: usize = 8;

/// Stable reference to a registered device.
///
/// A handle stays tied to the device it was issued for; once that device is
/// removed, lookups through the handle fail even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHandle {
    slot: usize,
    id: DeviceId,
}

impl DeviceHandle {
    pub fn id(&self) -> DeviceId {
        self.id
    }
}

/// Owner of the push channel, the device table and the subscriber list.
///
/// Everything runs from [`Registry::process`]: one call ticks every device
/// scheduler once, then reads whatever the hub pushed and fans it out.
pub struct Registry<'s, F: SocketFactory, P: Platform, A: Appliance = Personality> {
    factory: F,
    platform: P,
    ws: Option<WebSocketClient<F::Socket, P>>,
    hub: HubInfo,
    has_connected: bool,
    devices: [Option<Device<F::Socket, P, A>>; MAX_DEVICES],
    subscribers: Subscribers<'s>,
    night: bool,
    push: Vec<u8, PUSH_BUFFER_SIZE>,
    message: Vec<u8, WS_MESSAGE_SIZE>,
}

impl<'s, F: SocketFactory, P: Platform, A: Appliance> Registry<'s, F, P, A> {
    pub fn new(factory: F, platform: P) -> Self {
        Self {
            factory,
            platform,
            ws: None,
            hub: HubInfo::default(),
            has_connected: false,
            devices: core::array::from_fn(|_| None),
            subscribers: Subscribers::new(),
            night: false,
            push: Vec::new(),
            message: Vec::new(),
        }
    }

    /// Open the push channel.
    ///
    /// A live channel is kept as it is. Otherwise a new one is opened and,
    /// if this is a reconnect, every device's
    /// [`on_reconnect`](Appliance::on_reconnect) hook runs.
    pub fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Error> {
        if let Some(ws) = self.ws.as_mut() {
            if ws.is_connected() {
                return Ok(());
            }
            info!("registry: push channel lost, reconnecting");
        }
        self.ws = None;

        let hub = HubInfo::new(options)?;
        let socket = self.factory.socket(hub.secure);
        let mut ws = WebSocketClient::new(socket, self.platform.clone());
        ws.set_authorization_header(&hub.authorization)?;
        ws.connect(&hub.host, WS_PATH, hub.port)?;

        self.ws = Some(ws);
        self.hub = hub;
        if self.has_connected {
            for device in self.devices.iter_mut().flatten() {
                device.on_reconnect(&mut self.subscribers);
            }
        }
        self.has_connected = true;
        Ok(())
    }

    pub fn is_connected(&mut self) -> bool {
        self.ws.as_mut().is_some_and(|ws| ws.is_connected())
    }

    /// Connection details of the last successful connect.
    pub fn hub(&self) -> &HubInfo {
        &self.hub
    }

    /// The hub's night flag, as last pushed.
    pub fn is_night(&self) -> bool {
        self.night
    }

    pub fn add_subscriber(&mut self, subscriber: &'s mut dyn Subscriber) -> Result<(), Error> {
        self.subscribers.add(subscriber)
    }

    /// Register a virtual device with the hub and add it to the table.
    ///
    /// Blocks for the registration exchange. Fails with
    /// [`Error::CapacityExceeded`] when the table is full and with
    /// [`Error::NotOpen`] when the push channel is down.
    pub fn create_device(&mut self, serial: &str, appliance: A, display_name: &str, timeout: u16) -> Result<DeviceHandle, Error> {
        let slot = self
            .devices
            .iter()
            .position(Option::is_none)
            .ok_or(Error::CapacityExceeded)?;
        if !self.is_connected() {
            return Err(Error::NotOpen);
        }

        let path = uri::registration(serial)?;
        let body = uri::registration_body(appliance.device_type(), display_name, timeout)?;
        let mut session = Session::new(self.factory.socket(self.hub.secure), self.platform.clone());
        if let Err(e) = session.request_blocking(&self.hub, Method::Put, &path, &body) {
            warn!("registry: registration of {} failed: {}", serial, e);
            return Err(e);
        }

        let doc = Document::parse(session.body())?;
        let id = doc
            .sole_device()
            .and_then(DeviceId::parse)
            .ok_or(Error::ProtocolError)?;
        info!("registry: {} registered as {}", serial, id);

        let socket = self.factory.socket(self.hub.secure);
        let mut device = Device::new(id, serial, timeout, socket, self.platform.clone(), appliance)?;
        device.on_created(&mut self.subscribers);
        self.devices[slot] = Some(device);
        Ok(DeviceHandle { slot, id })
    }

    /// Drop a device from the table. The hub lets its lease run out.
    pub fn remove_device(&mut self, handle: DeviceHandle) -> Result<(), Error> {
        let slot = self.devices.get_mut(handle.slot).ok_or(Error::InvalidState)?;
        match slot {
            Some(device) if device.id() == handle.id => {
                *slot = None;
                Ok(())
            }
            _ => Err(Error::InvalidState),
        }
    }

    pub fn device(&self, handle: DeviceHandle) -> Option<&Device<F::Socket, P, A>> {
        self.devices
            .get(handle.slot)?
            .as_ref()
            .filter(|d| d.id() == handle.id)
    }

    pub fn device_mut(&mut self, handle: DeviceHandle) -> Option<&mut Device<F::Socket, P, A>> {
        self.devices
            .get_mut(handle.slot)?
            .as_mut()
            .filter(|d| d.id() == handle.id)
    }

    /// Run `f` against a device's appliance, e.g. to flip a switch.
    pub fn with_device<R>(&mut self, handle: DeviceHandle, f: impl FnOnce(&mut A, &mut Context<'_, '_>) -> R) -> Option<R> {
        let device = self
            .devices
            .get_mut(handle.slot)?
            .as_mut()
            .filter(|d| d.id() == handle.id)?;
        Some(device.with_appliance(&mut self.subscribers, f))
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device<F::Socket, P, A>> {
        self.devices.iter().flatten()
    }

    /// One main-loop step. Returns `false` while there is no usable push
    /// channel.
    pub fn process(&mut self) -> bool {
        let Some(ws) = self.ws.as_mut() else {
            return false;
        };
        if !ws.is_connected() && ws.available() <= DRAIN_THRESHOLD {
            return false;
        }

        for device in self.devices.iter_mut().flatten() {
            device.process(&self.hub, &mut self.subscribers);
        }

        self.push.clear();
        let mut parts = 0;
        let mut overflow = false;
        while ws.get_message(&mut self.message) {
            parts += 1;
            if self.push.extend_from_slice(&self.message).is_err() {
                overflow = true;
            }
        }
        if overflow {
            warn!("registry: push of more than {} bytes dropped", PUSH_BUFFER_SIZE);
            return true;
        }
        if parts == 0 {
            return true;
        }

        match Document::parse(&self.push) {
            Ok(doc) => dispatch(
                &doc,
                Sections::ACTIONS,
                &mut self.devices,
                &mut self.subscribers,
                &mut self.night,
            ),
            Err(e) => warn!("registry: push of {} frames not decoded: {}", parts, e),
        }
        true
    }
}

/// Whether anyone wants pushes about `device`.
fn needs_info<S: Socket, P: Platform, A: Appliance>(
    device: DeviceId,
    devices: &[Option<Device<S, P, A>>],
    subscribers: &mut Subscribers<'_>,
) -> bool {
    device == HUB_ID || devices.iter().flatten().any(|d| d.id() == device) || subscribers.needs_info(device)
}

/// Route one datapoint value: the hub's night flag is kept here, anything
/// else goes to the owning device and then to every subscriber.
fn notify<S: Socket, P: Platform, A: Appliance>(
    event: Event<'_>,
    devices: &mut [Option<Device<S, P, A>>],
    subscribers: &mut Subscribers<'_>,
    night: &mut bool,
) {
    let Event::Datapoint {
        device,
        channel,
        datapoint,
        value,
        is_scene,
    } = event
    else {
        subscribers.publish(&event);
        return;
    };

    if device == HUB_ID && channel == device_id::channel(0).as_str() && datapoint == device_id::output(0).as_str() {
        *night = value == "1";
        debug!("registry: night mode {}", value);
        return;
    }

    for owner in devices.iter_mut().flatten().filter(|d| d.id() == device) {
        owner.notify_datapoint(subscribers, channel, datapoint, value, is_scene);
    }
    subscribers.publish(&event);
}

fn dispatch<S: Socket, P: Platform, A: Appliance>(
    doc: &Document<'_>,
    sections: Sections,
    devices: &mut [Option<Device<S, P, A>>],
    subscribers: &mut Subscribers<'_>,
    night: &mut bool,
) {
    if !doc.has_root {
        return;
    }
    if doc.truncated {
        debug!("registry: push truncated");
    }

    if sections.contains(Sections::DATAPOINTS) {
        for entry in doc.datapoints.iter() {
            let Some(device) = token(entry.key, 0, '/').and_then(DeviceId::parse) else {
                continue;
            };
            if !needs_info(device, devices, subscribers) {
                continue;
            }
            let (Some(channel), Some(datapoint)) = (token(entry.key, 1, '/'), token(entry.key, 2, '/')) else {
                continue;
            };
            let value = match unescape(entry.value) {
                Ok(value) => value,
                Err(e) => {
                    warn!("registry: value of {} not decoded: {}", entry.key, e);
                    continue;
                }
            };
            let event = Event::Datapoint {
                device,
                channel,
                datapoint,
                value: &value,
                is_scene: false,
            };
            notify(event, devices, subscribers, night);
        }
    }

    if sections.contains(Sections::SCENES) {
        for entry in doc.scenes.iter() {
            let Some(device) = DeviceId::parse(entry.device) else {
                continue;
            };
            if !needs_info(device, devices, subscribers) {
                continue;
            }
            let value = match unescape(entry.value) {
                Ok(value) => value,
                Err(e) => {
                    warn!("registry: scene value for {} not decoded: {}", entry.device, e);
                    continue;
                }
            };
            let event = Event::Datapoint {
                device,
                channel: entry.channel,
                datapoint: entry.datapoint,
                value: &value,
                is_scene: true,
            };
            notify(event, devices, subscribers, night);
        }
    }

    if sections.contains(Sections::DEVICES) {
        for entry in doc.devices.iter() {
            debug!("registry: device {} announced", entry.id);
        }
    }
}

impl<F: SocketFactory, P: Platform, A: Appliance> core::fmt::Debug for Registry<'_, F, P, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("host", &self.hub.host)
            .field("devices", &self.devices.iter().flatten().count())
            .field("subscribers", &self.subscribers)
            .field("night", &self.night)
            .finish()
    }
}
