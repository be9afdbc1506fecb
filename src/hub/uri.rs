//! REST paths and request bodies understood by the hub.

use super::device_id::DeviceId;
use crate::network::error::Error;
use core::fmt::Write;
use heapless::String;
use serde::Serialize;

/// Container id every REST path and JSON document is keyed by.
pub const ROOT: &str = "00000000-0000-0000-0000-000000000000";

/// Path of the WebSocket push channel.
pub const WS_PATH: &str = "/fhapi/v1/api/ws";

/// Marker that identifies a per-datapoint path.
pub const DATAPOINT_SEGMENT: &str = "/rest/datapoint/";

/// Marker that identifies a device-details path.
pub const DEVICE_SEGMENT: &str = "/rest/device/";

/// A request path.
pub type Uri = String<128>;

/// A registration body.
pub type Body = String<256>;

/// `PUT` target that registers or renews a virtual device.
pub fn registration(serial: &str) -> Result<Uri, Error> {
    let mut uri = Uri::new();
    write!(uri, "/fhapi/v1/api/rest/virtualdevice/{}/{}", ROOT, serial)
        .map_err(|_| Error::CapacityExceeded)?;
    Ok(uri)
}

/// Datapoint path for a `<device>.<channel>.<datapoint>` target.
pub fn datapoint(target: &str) -> Result<Uri, Error> {
    let mut uri = Uri::new();
    write!(uri, "/fhapi/v1/api/rest/datapoint/{}/{}", ROOT, target)
        .map_err(|_| Error::CapacityExceeded)?;
    Ok(uri)
}

/// Device-details path.
pub fn device_details(device: DeviceId) -> Result<Uri, Error> {
    let mut uri = Uri::new();
    write!(uri, "/fhapi/v1/api/rest/device/{}/{}", ROOT, device)
        .map_err(|_| Error::CapacityExceeded)?;
    Ok(uri)
}

#[derive(Serialize)]
struct Registration<'a> {
    #[serde(rename = "type")]
    device_type: &'a str,
    properties: Properties<'a>,
}

#[derive(Serialize)]
struct Properties<'a> {
    ttl: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    displayname: Option<&'a str>,
}

/// Registration body: `{"type":..,"properties":{"ttl":"<timeout>"[,"displayname":..]}}`.
///
/// An empty display name is left out.
pub fn registration_body(device_type: &str, display_name: &str, timeout: u16) -> Result<Body, Error> {
    let mut ttl: String<6> = String::new();
    write!(ttl, "{}", timeout).map_err(|_| Error::CapacityExceeded)?;

    let body = Registration {
        device_type,
        properties: Properties {
            ttl: &ttl,
            displayname: (!display_name.is_empty()).then_some(display_name),
        },
    };
    serde_json_core::to_string(&body).map_err(|_| Error::JsonError)
}

/// Split the `<channel>` and `<datapoint>` parts out of a datapoint path
/// that targets `device`.
pub fn split_datapoint(uri: &str, device: DeviceId) -> Option<(&str, &str)> {
    let id = device.to_hex();
    let target = uri.rsplit('/').next()?;
    let rest = target.strip_prefix(id.as_str())?.strip_prefix('.')?;
    let dot = rest.find('.')?;
    let (channel, datapoint) = (&rest[..dot], &rest[dot + 1..]);
    if channel.is_empty() || datapoint.is_empty() {
        return None;
    }
    Some((channel, datapoint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_path() {
        let uri = registration("ABC123").unwrap();
        assert_eq!(
            uri.as_str(),
            "/fhapi/v1/api/rest/virtualdevice/00000000-0000-0000-0000-000000000000/ABC123"
        );
    }

    #[test]
    fn registration_body_with_and_without_name() {
        let body = registration_body("SwitchingActuator", "", 300).unwrap();
        assert_eq!(
            body.as_str(),
            r#"{"type":"SwitchingActuator","properties":{"ttl":"300"}}"#
        );

        let body = registration_body("SwitchingActuator", "Kitchen", 300).unwrap();
        assert_eq!(
            body.as_str(),
            r#"{"type":"SwitchingActuator","properties":{"ttl":"300","displayname":"Kitchen"}}"#
        );
    }

    #[test]
    fn datapoint_and_details_paths() {
        let uri = datapoint("000000000001.ch0000.idp0000").unwrap();
        assert_eq!(
            uri.as_str(),
            "/fhapi/v1/api/rest/datapoint/00000000-0000-0000-0000-000000000000/000000000001.ch0000.idp0000"
        );
        let uri = device_details(DeviceId(0xABB7_0000_0001)).unwrap();
        assert!(uri.ends_with("/rest/device/00000000-0000-0000-0000-000000000000/ABB700000001"));
    }

    #[test]
    fn splits_channel_and_datapoint() {
        let uri = datapoint("ABB700000001.ch0000.odp0000").unwrap();
        assert_eq!(
            split_datapoint(&uri, DeviceId(0xABB7_0000_0001)),
            Some(("ch0000", "odp0000"))
        );
        assert_eq!(split_datapoint(&uri, DeviceId(2)), None);
    }
}
