use libfah::hub::{DeviceId, HUB_ID};
use rand::Rng;

#[test]
fn test_random_ids_survive_hex_form() {
    let mut rng = rand::thread_rng();
    for _ in 0..1_000 {
        let id = DeviceId(rng.gen_range(0..1u64 << 48));
        let hex = id.to_hex();
        assert_eq!(hex.len(), 12);
        assert!(hex.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));
        assert_eq!(DeviceId::parse(&hex), Some(id));
    }
}

#[test]
fn test_hub_id() {
    assert_eq!(HUB_ID.to_hex().as_str(), "ABB700000000");
    assert_eq!(DeviceId::parse("abb700000000"), Some(HUB_ID));
}

#[test]
fn test_short_and_invalid_ids() {
    assert_eq!(DeviceId::parse("0000000001"), Some(DeviceId(1)));
    assert_eq!(DeviceId::parse("1"), Some(DeviceId(1)));
    assert_eq!(DeviceId::parse(""), None);
    assert_eq!(DeviceId::parse("ABB7-0000"), None);
}
