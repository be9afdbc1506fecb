//! Hub device identifiers.
//!
//! The hub addresses devices with a 64-bit id that travels as two zero-padded,
//! upper-case hex groups of six digits each: `ABB700000000` is the hub itself.

use core::fmt::{self, Write};
use heapless::String;

/// A 64-bit device id as used in URIs and push messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceId(pub u64);

/// The hub's own well-known id.
pub const HUB_ID: DeviceId = DeviceId(0xABB7_0000_0000);

/// Rendered id, wide enough for the full `u64` range.
pub type DeviceIdString = String<20>;

impl DeviceId {
    /// Render as the hub's hex form.
    pub fn to_hex(self) -> DeviceIdString {
        let mut out = String::new();
        // 20 bytes hold the widest u64 rendering, so this cannot fail.
        let _ = write!(out, "{}", self);
        out
    }

    /// Parse the hub's hex form. The last six digits are the low group,
    /// everything before them the high group.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let split = text.len().saturating_sub(6);
        let (high, low) = text.split_at(split);
        let high = match high {
            "" => 0,
            h => u64::from_str_radix(h, 16).ok()?,
        };
        let low = u64::from_str_radix(low, 16).ok()?;
        high.checked_mul(1 << 24)
            .and_then(|h| h.checked_add(low))
            .map(DeviceId)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}{:06X}", self.0 >> 24, self.0 & 0xFF_FFFF)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u64:x}", self.0)
    }
}

/// A channel or datapoint name such as `ch0001`.
pub type Name = String<8>;

fn name(prefix: &str, number: u8) -> Name {
    let mut out = Name::new();
    let _ = write!(out, "{}{:04X}", prefix, number);
    out
}

/// `ch` followed by four hex digits.
pub fn channel(number: u8) -> Name {
    name("ch", number)
}

/// Input datapoint name, `idp` followed by four hex digits.
pub fn input(number: u8) -> Name {
    name("idp", number)
}

/// Output datapoint name, `odp` followed by four hex digits.
pub fn output(number: u8) -> Name {
    name("odp", number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_two_padded_groups() {
        assert_eq!(DeviceId(1).to_hex().as_str(), "000000000001");
        assert_eq!(HUB_ID.to_hex().as_str(), "ABB700000000");
        assert_eq!(DeviceId(0x7EB1_0000_0A2C).to_hex().as_str(), "7EB100000A2C");
    }

    #[test]
    fn parses_twelve_digits() {
        assert_eq!(DeviceId::parse("ABB700000000"), Some(HUB_ID));
        assert_eq!(DeviceId::parse("abb700000000"), Some(HUB_ID));
        assert_eq!(DeviceId::parse("000000000001"), Some(DeviceId(1)));
    }

    #[test]
    fn short_ids_are_low_group() {
        assert_eq!(DeviceId::parse("0000000001"), Some(DeviceId(1)));
        assert_eq!(DeviceId::parse("2A"), Some(DeviceId(0x2A)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(DeviceId::parse(""), None);
        assert_eq!(DeviceId::parse("ch0000"), None);
        assert_eq!(DeviceId::parse("FFFFFFFFFFFFFFFFFFFFFF"), None);
    }

    #[test]
    fn wide_ids_round_trip() {
        let id = DeviceId(u64::MAX);
        assert_eq!(DeviceId::parse(&id.to_hex()), Some(id));
    }

    #[test]
    fn datapoint_names() {
        assert_eq!(channel(0).as_str(), "ch0000");
        assert_eq!(channel(0x1A).as_str(), "ch001A");
        assert_eq!(input(1).as_str(), "idp0001");
        assert_eq!(output(255).as_str(), "odp00FF");
    }
}
