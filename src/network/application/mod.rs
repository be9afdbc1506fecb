//! # Application Layer Protocols
//!
//! Both protocols the hub speaks run over a plain [`Socket`](crate::network::Socket):
//!
//! - **[`http`]**: a non-blocking HTTP/1.1 state machine plus the async session
//!   wrapper devices use for their REST calls
//! - **[`websocket`]**: the client side of RFC 6455, used for the hub's push
//!   channel
//!
//! Neither allocates. Requests, responses and frames live in fixed-size
//! `heapless` buffers whose sizes are set in [`crate::hub::config`].

/// HTTP client implementation.
///
/// Provides the steppable [`Client`](http::Client) and the
/// [`Session`](http::Session) wrapper.
pub mod http;

/// WebSocket protocol implementation.
///
/// Handshake, frame codec, fragmentation and keepalive for the push channel.
pub mod websocket;
