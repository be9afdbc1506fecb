mod common;

use common::*;
use libfah::hub::{ConnectOptions, Credentials, HubInfo};
use libfah::network::application::http::{AsyncStatus, Method, Session, State};
use libfah::network::error::Error;
use libfah::system::Clock;

fn hub() -> HubInfo {
    HubInfo::new(&ConnectOptions::new("sysap.local", Credentials::Header("Basic abc"))).unwrap()
}

fn drive(session: &mut Session<MockSocket, MockPlatform>, hub: &HubInfo) -> AsyncStatus {
    for _ in 0..64 {
        session.process(hub);
        if session.status() != AsyncStatus::Pending {
            break;
        }
    }
    session.status()
}

#[test]
fn test_async_exchange() {
    let hub = hub();
    let socket = MockSocket::new();
    let platform = MockPlatform::new();
    socket.reply(&json_reply("{}"));
    let mut session = Session::new(socket.clone(), platform.clone());
    assert_eq!(session.status(), AsyncStatus::None);

    session.request_async(&hub, Method::Get, "/x", "").unwrap();
    assert_eq!(session.status(), AsyncStatus::Pending);
    assert_eq!(session.state(), State::Connected);
    assert_eq!(session.started_ms(), platform.now_ms());
    assert_eq!(socket.connects(), vec![("sysap.local".to_string(), 80)]);

    session.process(&hub);
    assert_eq!(session.state(), State::Requested);
    let request = socket.take_tx_string();
    assert!(request.starts_with("GET /x HTTP/1.1\r\n"));
    assert!(request.contains("Content-Type: application/json\r\n"));
    assert!(request.contains("Accept: application/json\r\n"));
    assert!(request.contains("Host: sysap\r\n"));
    assert!(request.contains("Authorization: Basic abc\r\n"));

    session.process(&hub);
    assert_eq!(session.state(), State::Headers);
    assert_eq!(session.status(), AsyncStatus::Pending);

    assert_eq!(drive(&mut session, &hub), AsyncStatus::Success);
    assert_eq!(session.body(), b"{}");
    assert_eq!(session.status_code(), 200);
    assert_eq!(session.response_header("content-type"), Some("application/json"));
    assert_eq!(session.last_method(), Some(Method::Get));
    assert_eq!(session.last_uri(), "/x");

    session.release();
    assert_eq!(session.status(), AsyncStatus::None);
    assert_eq!(session.state(), State::Closed);
    assert_eq!(session.last_method(), None);
}

#[test]
fn test_single_exchange_in_flight() {
    let hub = hub();
    let socket = MockSocket::new();
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    session.request_async(&hub, Method::Get, "/first", "").unwrap();
    assert_eq!(
        session.request_async(&hub, Method::Put, "/second", "1"),
        Err(Error::Busy)
    );
    assert_eq!(session.last_uri(), "/first");
    assert_eq!(session.last_method(), Some(Method::Get));
    assert_eq!(socket.connects().len(), 1);
}

#[test]
fn test_put_carries_body() {
    let hub = hub();
    let socket = MockSocket::new();
    socket.reply(&status_reply(200, "OK"));
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    session.request_async(&hub, Method::Put, "/dp", "1").unwrap();
    session.process(&hub);
    let request = socket.take_tx_string();
    assert!(request.starts_with("PUT /dp HTTP/1.1\r\n"));
    assert!(request.contains("Content-Length: 1\r\n"));
    assert!(request.ends_with("\r\n\r\n1"));
    assert_eq!(drive(&mut session, &hub), AsyncStatus::Success);
}

#[test]
fn test_error_status_fails() {
    let hub = hub();
    let socket = MockSocket::new();
    socket.reply(&status_reply(500, "Internal Server Error"));
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    session.request_async(&hub, Method::Get, "/x", "").unwrap();
    assert_eq!(drive(&mut session, &hub), AsyncStatus::Failed);
    assert!(!socket.is_open());

    session.release();
    assert_eq!(session.status(), AsyncStatus::None);
}

#[test]
fn test_failed_send_fails() {
    let hub = hub();
    let socket = MockSocket::new();
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    session.request_async(&hub, Method::Get, "/x", "").unwrap();
    socket.fail_writes(true);
    session.process(&hub);
    assert_eq!(session.status(), AsyncStatus::Failed);
}

#[test]
fn test_refused_connect_stays_idle() {
    let hub = hub();
    let socket = MockSocket::new();
    socket.refuse(1);
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    assert_eq!(
        session.request_async(&hub, Method::Get, "/x", ""),
        Err(Error::ConnectionRefused)
    );
    assert_eq!(session.status(), AsyncStatus::None);

    session.request_async(&hub, Method::Get, "/x", "").unwrap();
    assert_eq!(session.status(), AsyncStatus::Pending);
}

#[test]
fn test_blocking_request() {
    let hub = hub();
    let socket = MockSocket::new();
    socket.reply(&json_reply(r#"{"a":"b"}"#));
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    session.request_blocking(&hub, Method::Put, "/reg", "{}").unwrap();
    assert_eq!(session.body(), br#"{"a":"b"}"#);
    assert_eq!(session.status(), AsyncStatus::None);
}

#[test]
fn test_blocking_request_rejects_error_status() {
    let hub = hub();
    let socket = MockSocket::new();
    socket.reply(&status_reply(401, "Unauthorized"));
    let mut session = Session::new(socket.clone(), MockPlatform::new());

    assert_eq!(
        session.request_blocking(&hub, Method::Put, "/reg", "{}"),
        Err(Error::ProtocolError)
    );
    assert!(!socket.is_open());
}
