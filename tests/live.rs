//! Against a real hub. Set `FAH_HOST`, `FAH_USERNAME` and `FAH_PASSWORD`
//! (a `.env` file works); without them the tests return early.

use dotenvy::dotenv;
use libfah::hub::{ConnectOptions, Credentials, Event, Personality, Registry};
use libfah::network::tcp::TcpFactory;
use libfah::system::{Clock, Delay, StdPlatform};
use std::cell::RefCell;
use std::env;

struct Hub {
    host: String,
    username: String,
    password: String,
}

fn hub() -> Option<Hub> {
    dotenv().ok();
    Some(Hub {
        host: env::var("FAH_HOST").ok()?,
        username: env::var("FAH_USERNAME").ok()?,
        password: env::var("FAH_PASSWORD").ok()?,
    })
}

#[test]
fn test_live_switch() {
    let Some(hub) = hub() else {
        eprintln!("FAH_HOST not set, skipping");
        return;
    };
    let platform = StdPlatform::new();
    let options = ConnectOptions::new(
        &hub.host,
        Credentials::Basic {
            username: &hub.username,
            password: &hub.password,
        },
    );

    let events = RefCell::new(Vec::new());
    let mut record = |event: &Event<'_>| events.borrow_mut().push(format!("{:?}", event));
    let mut registry: Registry<'_, _, _> = Registry::new(TcpFactory, platform.clone());
    registry.add_subscriber(&mut record).unwrap();
    registry.connect(&options).unwrap();
    assert!(registry.is_connected());

    let lamp = registry
        .create_device("libfah-live-test", Personality::switch(), "libfah test", 300)
        .unwrap();
    registry.with_device(lamp, |appliance, ctx| {
        if let Some(switch) = appliance.as_switch_mut() {
            switch.set_state(ctx, true);
        }
    });

    let start = platform.now_ms();
    while platform.now_ms() - start < 10_000 {
        assert!(registry.process());
        platform.delay_ms(10);
    }
    assert!(registry.device(lamp).is_some());
    assert!(!events.borrow().is_empty());
}
