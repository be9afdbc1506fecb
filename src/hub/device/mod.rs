//! A registered virtual device and its cooperative scheduler.
//!
//! Every [`Device::process`] call runs the first branch that applies:
//!
//! ```text
//!  1. exchange pending   -> abandon after the session timeout, else step it
//!  2. exchange failed    -> release, long cooldown
//!  3. exchange succeeded -> decode GET replies, release, short cooldown
//!  4. lease renewal due  -> PUT registration          (cooldown elapsed)
//!  5. queue not empty    -> GET/PUT oldest datapoint  (cooldown elapsed)
//!  6. refresh due        -> GET device details        (cooldown elapsed)
//!  7. otherwise          -> count the cooldown down
//! ```
//!
//! Cooldowns count calls, not time, so a busy main loop paces retries and
//! polling without timers.

use crate::hub::HubInfo;
use crate::hub::config::{HTTP_SESSION_TIMEOUT_MS, LONG_COOLDOWN, PARAMETER_REFRESH_INTERVAL, SHORT_COOLDOWN};
use crate::hub::device_id::DeviceId;
use crate::hub::event::{Event, Subscribers};
use crate::hub::json::{Document, unescape};
use crate::hub::uri::{self, DATAPOINT_SEGMENT, DEVICE_SEGMENT};
use crate::network::Socket;
use crate::network::application::http::{AsyncStatus, Method, Session};
use crate::network::error::Error;
use crate::system::Platform;
use heapless::String;

/// Hooks for the behavior of each kind of device.
pub mod appliance;

/// The pending operation FIFO.
pub mod queue;

pub use appliance::{Appliance, Context, Personality, Switch};
pub use queue::{OperationQueue, PendingOperation};

const JSON_CONTENT_TYPE: &str = "application/json";

/// One virtual device registered with the hub.
pub struct Device<S: Socket, P: Platform, A: Appliance = Personality> {
    id: DeviceId,
    serial: String<32>,
    display_name: String<64>,
    timeout: u16,
    renewal_ms: u64,
    last_renewal_ms: u64,
    cooldown: u16,
    refresh_skip: u8,
    session: Session<S, P>,
    platform: P,
    queue: OperationQueue,
    in_flight: Option<PendingOperation>,
    appliance: A,
}

impl<S: Socket, P: Platform, A: Appliance> Device<S, P, A> {
    /// Wrap a device the hub already accepted under `id`.
    ///
    /// `timeout` is the registration lease in seconds; the lease is renewed
    /// after three quarters of it.
    pub fn new(id: DeviceId, serial: &str, timeout: u16, socket: S, platform: P, appliance: A) -> Result<Self, Error> {
        let serial = String::try_from(serial).map_err(|_| Error::CapacityExceeded)?;
        Ok(Self {
            id,
            serial,
            display_name: String::new(),
            timeout,
            renewal_ms: u64::from(timeout) * 750,
            last_renewal_ms: platform.now_ms(),
            cooldown: 0,
            refresh_skip: 0,
            session: Session::new(socket, platform.clone()),
            platform,
            queue: OperationQueue::new(),
            in_flight: None,
            appliance,
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// The name the hub reported for this device, empty until the first
    /// details read.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn device_type(&self) -> &str {
        self.appliance.device_type()
    }

    pub fn timeout(&self) -> u16 {
        self.timeout
    }

    /// Scheduler calls left before the next network action may start.
    pub fn cooldown(&self) -> u16 {
        self.cooldown
    }

    pub fn status(&self) -> AsyncStatus {
        self.session.status()
    }

    /// Operations waiting to be sent.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// The operation whose exchange is currently running.
    pub fn in_flight(&self) -> Option<&PendingOperation> {
        self.in_flight.as_ref()
    }

    pub fn appliance(&self) -> &A {
        &self.appliance
    }

    /// Queue a write of `value` to one of this device's datapoints.
    pub fn set_datapoint(&mut self, channel: &str, datapoint: &str, value: &str) -> Result<(), Error> {
        let target = queue::target(self.id, channel, datapoint)?;
        self.queue.enqueue(PendingOperation::put(&target, value)?)
    }

    /// Queue a read of one of this device's datapoints.
    pub fn get_datapoint(&mut self, channel: &str, datapoint: &str) -> Result<(), Error> {
        let target = queue::target(self.id, channel, datapoint)?;
        self.queue.enqueue(PendingOperation::get(&target)?)
    }

    /// Hand a pushed datapoint value to the appliance.
    pub fn notify_datapoint(&mut self, subscribers: &mut Subscribers<'_>, channel: &str, datapoint: &str, value: &str, is_scene: bool) {
        let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
        self.appliance
            .on_datapoint(&mut ctx, channel, datapoint, value, is_scene);
    }

    pub fn on_reconnect(&mut self, subscribers: &mut Subscribers<'_>) {
        let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
        self.appliance.on_reconnect(&mut ctx);
    }

    pub(crate) fn on_created(&mut self, subscribers: &mut Subscribers<'_>) {
        let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
        self.appliance.on_created(&mut ctx);
    }

    /// Run `f` against the appliance with a context for queueing and
    /// publishing.
    pub fn with_appliance<R>(&mut self, subscribers: &mut Subscribers<'_>, f: impl FnOnce(&mut A, &mut Context<'_, '_>) -> R) -> R {
        let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
        f(&mut self.appliance, &mut ctx)
    }

    /// One scheduler step.
    pub fn process(&mut self, hub: &HubInfo, subscribers: &mut Subscribers<'_>) {
        match self.session.status() {
            AsyncStatus::Pending => {
                let elapsed = self.platform.now_ms().saturating_sub(self.session.started_ms());
                if elapsed > HTTP_SESSION_TIMEOUT_MS {
                    warn!("device {}: exchange timed out", self.id);
                    self.session.release();
                    self.cooldown = LONG_COOLDOWN;
                    if let Some(operation) = self.in_flight.take().filter(PendingOperation::is_write) {
                        self.requeue(operation);
                    }
                } else {
                    self.session.process(hub);
                }
                return;
            }
            AsyncStatus::Failed => {
                debug!("device {}: exchange failed", self.id);
                self.session.release();
                self.cooldown = LONG_COOLDOWN;
                self.in_flight = None;
                return;
            }
            AsyncStatus::Success => {
                self.handle_response(subscribers);
                self.session.release();
                self.cooldown = SHORT_COOLDOWN;
                self.in_flight = None;
                return;
            }
            AsyncStatus::None => {}
        }

        let idle = self.cooldown == 0;
        let renewal_due = self.platform.now_ms().saturating_sub(self.last_renewal_ms) > self.renewal_ms;

        if renewal_due && idle {
            self.renew(hub);
        } else if !self.queue.is_empty() && idle {
            self.send_next(hub);
        } else if self.refresh_skip == 0 && idle {
            self.refresh(hub);
        } else if self.cooldown > 0 {
            self.cooldown -= 1;
        }
    }

    fn renew(&mut self, hub: &HubInfo) {
        let result = uri::registration(&self.serial).and_then(|path| {
            let body = uri::registration_body(self.appliance.device_type(), "", self.timeout)?;
            self.session.request_async(hub, Method::Put, &path, &body)
        });
        match result {
            Ok(()) => {
                trace!("device {}: renewing lease", self.id);
                self.last_renewal_ms = self.platform.now_ms();
                self.refresh_skip = self.refresh_skip.saturating_sub(1);
            }
            Err(e) => {
                warn!("device {}: renewal not sent: {}", self.id, e);
                self.cooldown = LONG_COOLDOWN;
            }
        }
    }

    fn send_next(&mut self, hub: &HubInfo) {
        let Some(operation) = self.queue.dequeue() else {
            return;
        };
        let (Some(method), Some(target)) = (operation.method(), operation.target()) else {
            warn!("device {}: dropping malformed entry {}", self.id, operation.as_str());
            return;
        };
        if method == Method::Put && operation.value().is_empty() {
            warn!("device {}: dropping write without value", self.id);
            return;
        }

        let value = if method == Method::Put { operation.value() } else { "" };
        let result = uri::datapoint(target).and_then(|path| self.session.request_async(hub, method, &path, value));
        match result {
            Ok(()) => {
                trace!("device {}: {}", self.id, operation.as_str());
                self.in_flight = Some(operation);
            }
            Err(e) => {
                warn!("device {}: {} not sent: {}", self.id, operation.as_str(), e);
                self.requeue(operation);
                self.cooldown = LONG_COOLDOWN;
            }
        }
    }

    /// Put an operation back for another attempt, unless new work has filled
    /// the queue meanwhile.
    fn requeue(&mut self, operation: PendingOperation) {
        if self.queue.is_full() {
            warn!("device {}: queue full, dropping {}", self.id, operation.as_str());
            return;
        }
        if let Err(e) = self.queue.enqueue(operation) {
            warn!("device {}: retry not queued: {}", self.id, e);
        }
    }

    fn refresh(&mut self, hub: &HubInfo) {
        let result = uri::device_details(self.id).and_then(|path| self.session.request_async(hub, Method::Get, &path, ""));
        self.refresh_skip = match result {
            Ok(()) => PARAMETER_REFRESH_INTERVAL,
            Err(e) => {
                debug!("device {}: details not requested: {}", self.id, e);
                1
            }
        };
    }

    /// Decode the reply of a finished GET.
    fn handle_response(&mut self, subscribers: &mut Subscribers<'_>) {
        if self.session.last_method() != Some(Method::Get) {
            return;
        }
        if self.session.response_header("content-type") != Some(JSON_CONTENT_TYPE) {
            return;
        }

        let uri = self.session.last_uri();
        let doc = match Document::parse(self.session.body()) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("device {}: reply to {} not decoded: {}", self.id, uri, e);
                return;
            }
        };
        if doc.truncated {
            debug!("device {}: reply to {} truncated", self.id, uri);
        }

        if uri.contains(DATAPOINT_SEGMENT) {
            let Some((channel, datapoint)) = uri::split_datapoint(uri, self.id) else {
                return;
            };
            let Some(raw) = doc.single_value().filter(|v| !v.is_empty()) else {
                return;
            };
            match unescape(raw) {
                Ok(value) => {
                    let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
                    self.appliance
                        .on_datapoint(&mut ctx, channel, datapoint, &value, true);
                }
                Err(e) => warn!("device {}: value of {} not decoded: {}", self.id, uri, e),
            }
        } else if uri.contains(DEVICE_SEGMENT) {
            let id = self.id.to_hex();
            let Some(entry) = doc.device(&id) else {
                return;
            };

            match entry.display_name.map(unescape) {
                Some(Ok(name)) => {
                    if let Ok(stored) = String::try_from(name.as_str()) {
                        self.display_name = stored;
                    }
                    subscribers.publish(&Event::DisplayName { device: self.id, name: &name });
                    let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
                    self.appliance.on_display_name(&mut ctx, &name);
                }
                Some(Err(e)) => warn!("device {}: display name not decoded: {}", self.id, e),
                None => {}
            }

            for parameter in doc.parameters.iter().filter(|p| p.device == id.as_str()) {
                let Some(number) = parameter.id() else {
                    continue;
                };
                let value = match unescape(parameter.value) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("device {}: parameter {} not decoded: {}", self.id, parameter.key, e);
                        continue;
                    }
                };
                subscribers.publish(&Event::Parameter {
                    device: self.id,
                    channel: parameter.channel,
                    parameter: number,
                    value: &value,
                });
                let mut ctx = Context::new(self.id, &mut self.queue, subscribers);
                self.appliance
                    .on_parameter(&mut ctx, parameter.channel, number, &value);
            }
        }
    }
}

impl<S: Socket, P: Platform, A: Appliance + core::fmt::Debug> core::fmt::Debug for Device<S, P, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("serial", &self.serial)
            .field("cooldown", &self.cooldown)
            .field("queued", &self.queue.len())
            .field("appliance", &self.appliance)
            .finish()
    }
}
