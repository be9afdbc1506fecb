//! Decoder for the JSON documents the hub sends.
//!
//! Every document is keyed by the root container id ([`ROOT`]) and carries
//! some of these sections:
//!
//! ```text
//! { "<root>": {
//!     "values":          ["<v>"],                                    datapoint read
//!     "datapoints":      { "<dev>/<ch>/<dp>": "<v>", .. },           push
//!     "scenesTriggered": { "<dev>": { "channels": { "<ch>": {
//!                            "outputs"|"inputs": { "<dp>": { "value": "<v>" }}}}}},
//!     "devices":         { "<dev>": { "displayName": "<n>",
//!                            "channels": { "<ch>": { "parameters": { "par<hex>": "<v>" }}},
//!                            "parameters": { .. } } }
//! } }
//! ```
//!
//! [`Document::parse`] walks the input once with `serde-json-core` and keeps
//! borrowed slices of the strings it needs. Unknown keys are skipped, entries
//! beyond a section's capacity are dropped and flagged in
//! [`Document::truncated`].
//!
//! The slices are raw: escapes such as `\"` or `\u00e4` are still in them.
//! Values handed on to appliances and subscribers go through [`unescape`]
//! first.

use super::uri::ROOT;
use crate::network::error::Error;
use core::fmt;
use core::ops::BitOr;
use heapless::{String, Vec};
use serde::Deserialize;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json_core::str::{EscapedStr, EscapedStringFragment};

/// Values kept from a `values` array.
pub const MAX_VALUES: usize = 4;
/// Longest string value after unescaping.
pub const MAX_TEXT_LEN: usize = 128;
/// Datapoint or scene entries kept from one push.
pub const MAX_PUSH_ENTRIES: usize = 32;
/// Entries kept from a `devices` section.
pub const MAX_DEVICE_ENTRIES: usize = 4;
/// Parameters kept from one device-details reply.
pub const MAX_PARAMETERS: usize = 32;

const KEY_VALUES: &str = "values";
const KEY_VALUE: &str = "value";
const KEY_DATAPOINTS: &str = "datapoints";
const KEY_SCENES: &str = "scenesTriggered";
const KEY_DEVICES: &str = "devices";
const KEY_CHANNELS: &str = "channels";
const KEY_OUTPUTS: &str = "outputs";
const KEY_INPUTS: &str = "inputs";
const KEY_DISPLAY_NAME: &str = "displayName";
const KEY_PARAMETERS: &str = "parameters";

/// A string value with its escapes resolved.
pub type Unescaped = String<MAX_TEXT_LEN>;

/// Resolve the JSON escapes in a raw string value from a [`Document`].
///
/// ```rust
/// use libfah::hub::json::unescape;
///
/// assert_eq!(unescape(r#"K\u00fcche \"Nord\""#).unwrap().as_str(), "Küche \"Nord\"");
/// ```
pub fn unescape(raw: &str) -> Result<Unescaped, Error> {
    let mut out = Unescaped::new();
    for fragment in EscapedStr(raw).fragments() {
        let pushed = match fragment.map_err(|_| Error::JsonError)? {
            EscapedStringFragment::NotEscaped(text) => out.push_str(text),
            EscapedStringFragment::Escaped(c) => out.push(c),
        };
        pushed.map_err(|_| Error::CapacityExceeded)?;
    }
    Ok(out)
}

/// Selects which push sections a consumer handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections(u8);

impl Sections {
    /// Nothing.
    pub const NONE: Sections = Sections(0);
    /// `datapoints`
    pub const DATAPOINTS: Sections = Sections(1);
    /// `scenesTriggered`
    pub const SCENES: Sections = Sections(2);
    /// `devices`
    pub const DEVICES: Sections = Sections(4);
    /// Datapoint changes and triggered scenes.
    pub const ACTIONS: Sections = Sections(1 | 2);
    /// Every section.
    pub const ALL: Sections = Sections(1 | 2 | 4);

    /// Whether every section of `other` is selected.
    pub fn contains(self, other: Sections) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Sections {
    type Output = Sections;

    fn bitor(self, rhs: Sections) -> Sections {
        Sections(self.0 | rhs.0)
    }
}

/// `"<dev>/<ch>/<dp>": "<value>"` from the `datapoints` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatapointValue<'a> {
    /// `<dev>/<ch>/<dp>`
    pub key: &'a str,
    /// Raw value.
    pub value: &'a str,
}

/// One datapoint value from the `scenesTriggered` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneValue<'a> {
    /// Device id as sent.
    pub device: &'a str,
    /// Channel name.
    pub channel: &'a str,
    /// Input or output datapoint name.
    pub datapoint: &'a str,
    /// Raw value.
    pub value: &'a str,
}

/// One entry of the `devices` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEntry<'a> {
    /// Device id as sent.
    pub id: &'a str,
    /// Raw `displayName`, if present.
    pub display_name: Option<&'a str>,
}

/// One parameter of a device or one of its channels. Device-level
/// parameters have an empty channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterValue<'a> {
    /// Owning device id.
    pub device: &'a str,
    /// Channel name, or empty.
    pub channel: &'a str,
    /// `par<hex>` key.
    pub key: &'a str,
    /// Raw value.
    pub value: &'a str,
}

impl ParameterValue<'_> {
    /// Numeric id of a `par<hex>` key.
    pub fn id(&self) -> Option<u16> {
        let hex = self.key.strip_prefix("par")?;
        u16::from_str_radix(hex, 16).ok()
    }
}

/// Everything of interest in one hub document.
#[derive(Debug, Default)]
pub struct Document<'a> {
    /// Whether the root container was present at all.
    pub has_root: bool,
    /// String entries of `values`.
    pub values: Vec<&'a str, MAX_VALUES>,
    /// `datapoints` entries in document order.
    pub datapoints: Vec<DatapointValue<'a>, MAX_PUSH_ENTRIES>,
    /// Scene values in document order.
    pub scenes: Vec<SceneValue<'a>, MAX_PUSH_ENTRIES>,
    /// `devices` entries.
    pub devices: Vec<DeviceEntry<'a>, MAX_DEVICE_ENTRIES>,
    /// Entries seen in the `devices` section, stored or not.
    pub device_count: usize,
    /// Device and channel parameters.
    pub parameters: Vec<ParameterValue<'a>, MAX_PARAMETERS>,
    /// Set when a section held more entries than could be stored.
    pub truncated: bool,
}

impl<'a> Document<'a> {
    /// Decode one document; anything else, trailing data included, is
    /// [`Error::JsonError`].
    pub fn parse(input: &'a [u8]) -> Result<Self, Error> {
        serde_json_core::from_slice::<Document<'a>>(input)
            .map(|(doc, _)| doc)
            .map_err(|_| Error::JsonError)
    }

    /// The value of a single-datapoint read.
    pub fn single_value(&self) -> Option<&'a str> {
        match self.values.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    /// Id of the only device in the `devices` section.
    pub fn sole_device(&self) -> Option<&'a str> {
        match (self.device_count, self.devices.first()) {
            (1, Some(entry)) => Some(entry.id),
            _ => None,
        }
    }

    /// The `devices` entry for `id`.
    pub fn device(&self, id: &str) -> Option<&DeviceEntry<'a>> {
        self.devices.iter().find(|d| d.id == id)
    }

    fn store<T, const N: usize>(truncated: &mut bool, list: &mut Vec<T, N>, item: T) {
        if list.push(item).is_err() {
            *truncated = true;
        }
    }
}

impl<'de> Deserialize<'de> for Document<'de> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut doc = Document::default();
        Walk(&mut TopLevel { doc: &mut doc }).deserialize(deserializer)?;
        Ok(doc)
    }
}

/// Handles one key of a JSON object; the value is still unread in `map`.
trait Entries<'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error>;
}

/// Seed that walks an object and hands every key to an [`Entries`].
struct Walk<'w, E>(&'w mut E);

impl<'de, E: Entries<'de>> DeserializeSeed<'de> for Walk<'_, E> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, E: Entries<'de>> Visitor<'de> for Walk<'_, E> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<&'de str>()? {
            self.0.entry(key, &mut map)?;
        }
        Ok(())
    }
}

/// A string value, or `None` for any other JSON value (which is skipped).
///
/// `serde-json-core` has no `deserialize_any`; its `deserialize_ignored_any`
/// still hands strings to `visit_borrowed_str` and everything else to the
/// unit, sequence or map callbacks.
struct Text<'de>(Option<&'de str>);

impl<'de> Deserialize<'de> for Text<'de> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_ignored_any(TextVisitor)
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Text<'de>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_borrowed_str<E>(self, v: &'de str) -> Result<Self::Value, E> {
        Ok(Text(Some(v)))
    }

    fn visit_str<E>(self, _v: &str) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_i64<E>(self, _v: i64) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_u64<E>(self, _v: u64) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_f64<E>(self, _v: f64) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(Text(None))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Text(None))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Text(None))
    }
}

struct TopLevel<'d, 'de> {
    doc: &'d mut Document<'de>,
}

impl<'de> Entries<'de> for TopLevel<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if key == ROOT {
            self.doc.has_root = true;
            map.next_value_seed(Walk(&mut RootEntries { doc: &mut *self.doc }))
        } else {
            map.next_value::<IgnoredAny>().map(|_| ())
        }
    }
}

struct RootEntries<'d, 'de> {
    doc: &'d mut Document<'de>,
}

impl<'de> Entries<'de> for RootEntries<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        let doc = &mut *self.doc;
        match key {
            KEY_VALUES => map.next_value_seed(Values { doc }),
            KEY_DATAPOINTS => map.next_value_seed(Walk(&mut Datapoints { doc })),
            KEY_SCENES => map.next_value_seed(Walk(&mut SceneDevices { doc })),
            KEY_DEVICES => map.next_value_seed(Walk(&mut Devices { doc })),
            _ => map.next_value::<IgnoredAny>().map(|_| ()),
        }
    }
}

struct Values<'d, 'de> {
    doc: &'d mut Document<'de>,
}

impl<'de> DeserializeSeed<'de> for Values<'_, 'de> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Values<'_, 'de> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(Text(value)) = seq.next_element::<Text<'de>>()? {
            if let Some(value) = value {
                Document::store(&mut self.doc.truncated, &mut self.doc.values, value);
            }
        }
        Ok(())
    }
}

struct Datapoints<'d, 'de> {
    doc: &'d mut Document<'de>,
}

impl<'de> Entries<'de> for Datapoints<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if let Text(Some(value)) = map.next_value::<Text<'de>>()? {
            let doc = &mut *self.doc;
            Document::store(&mut doc.truncated, &mut doc.datapoints, DatapointValue { key, value });
        }
        Ok(())
    }
}

struct SceneDevices<'d, 'de> {
    doc: &'d mut Document<'de>,
}

impl<'de> Entries<'de> for SceneDevices<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, device: &'de str, map: &mut A) -> Result<(), A::Error> {
        map.next_value_seed(Walk(&mut SceneDevice { doc: &mut *self.doc, device }))
    }
}

struct SceneDevice<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
}

impl<'de> Entries<'de> for SceneDevice<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if key != KEY_CHANNELS {
            return map.next_value::<IgnoredAny>().map(|_| ());
        }
        map.next_value_seed(Walk(&mut SceneChannels {
            doc: &mut *self.doc,
            device: self.device,
        }))
    }
}

struct SceneChannels<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
}

impl<'de> Entries<'de> for SceneChannels<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, channel: &'de str, map: &mut A) -> Result<(), A::Error> {
        map.next_value_seed(Walk(&mut SceneChannel {
            doc: &mut *self.doc,
            device: self.device,
            channel,
        }))
    }
}

struct SceneChannel<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
    channel: &'de str,
}

impl<'de> Entries<'de> for SceneChannel<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if key != KEY_OUTPUTS && key != KEY_INPUTS {
            return map.next_value::<IgnoredAny>().map(|_| ());
        }
        map.next_value_seed(Walk(&mut SceneDatapoints {
            doc: &mut *self.doc,
            device: self.device,
            channel: self.channel,
        }))
    }
}

struct SceneDatapoints<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
    channel: &'de str,
}

impl<'de> Entries<'de> for SceneDatapoints<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, datapoint: &'de str, map: &mut A) -> Result<(), A::Error> {
        map.next_value_seed(Walk(&mut SceneDatapoint {
            doc: &mut *self.doc,
            device: self.device,
            channel: self.channel,
            datapoint,
        }))
    }
}

struct SceneDatapoint<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
    channel: &'de str,
    datapoint: &'de str,
}

impl<'de> Entries<'de> for SceneDatapoint<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if key != KEY_VALUE {
            return map.next_value::<IgnoredAny>().map(|_| ());
        }
        if let Text(Some(value)) = map.next_value::<Text<'de>>()? {
            let entry = SceneValue {
                device: self.device,
                channel: self.channel,
                datapoint: self.datapoint,
                value,
            };
            let doc = &mut *self.doc;
            Document::store(&mut doc.truncated, &mut doc.scenes, entry);
        }
        Ok(())
    }
}

struct Devices<'d, 'de> {
    doc: &'d mut Document<'de>,
}

impl<'de> Entries<'de> for Devices<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, id: &'de str, map: &mut A) -> Result<(), A::Error> {
        let doc = &mut *self.doc;
        doc.device_count += 1;
        let mut body = DeviceBody {
            doc,
            device: id,
            display_name: None,
        };
        map.next_value_seed(Walk(&mut body))?;
        let entry = DeviceEntry {
            id,
            display_name: body.display_name,
        };
        let doc = &mut *self.doc;
        Document::store(&mut doc.truncated, &mut doc.devices, entry);
        Ok(())
    }
}

struct DeviceBody<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
    display_name: Option<&'de str>,
}

impl<'de> Entries<'de> for DeviceBody<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        match key {
            KEY_DISPLAY_NAME => {
                self.display_name = map.next_value::<Text<'de>>()?.0;
                Ok(())
            }
            KEY_CHANNELS => map.next_value_seed(Walk(&mut ParameterChannels {
                doc: &mut *self.doc,
                device: self.device,
            })),
            KEY_PARAMETERS => map.next_value_seed(Walk(&mut Parameters {
                doc: &mut *self.doc,
                device: self.device,
                channel: "",
            })),
            _ => map.next_value::<IgnoredAny>().map(|_| ()),
        }
    }
}

struct ParameterChannels<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
}

impl<'de> Entries<'de> for ParameterChannels<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, channel: &'de str, map: &mut A) -> Result<(), A::Error> {
        map.next_value_seed(Walk(&mut ParameterChannel {
            doc: &mut *self.doc,
            device: self.device,
            channel,
        }))
    }
}

struct ParameterChannel<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
    channel: &'de str,
}

impl<'de> Entries<'de> for ParameterChannel<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if key != KEY_PARAMETERS {
            return map.next_value::<IgnoredAny>().map(|_| ());
        }
        map.next_value_seed(Walk(&mut Parameters {
            doc: &mut *self.doc,
            device: self.device,
            channel: self.channel,
        }))
    }
}

struct Parameters<'d, 'de> {
    doc: &'d mut Document<'de>,
    device: &'de str,
    channel: &'de str,
}

impl<'de> Entries<'de> for Parameters<'_, 'de> {
    fn entry<A: MapAccess<'de>>(&mut self, key: &'de str, map: &mut A) -> Result<(), A::Error> {
        if let Text(Some(value)) = map.next_value::<Text<'de>>()? {
            let entry = ParameterValue {
                device: self.device,
                channel: self.channel,
                key,
                value,
            };
            let doc = &mut *self.doc;
            Document::store(&mut doc.truncated, &mut doc.parameters, entry);
        }
        Ok(())
    }
}
