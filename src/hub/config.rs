//! Compile-time tunables.
//!
//! Everything here sizes a fixed buffer or paces the scheduler. Cooldowns and
//! the refresh interval count scheduler ticks or renewals, never wall-clock
//! time.

/// Maximum number of devices a [`Registry`](crate::hub::Registry) can hold.
pub const MAX_DEVICES: usize = 10;

/// Capacity of each device's pending operation queue.
pub const MAX_PENDING_OPERATIONS: usize = 10;

/// Maximum number of generic event subscribers.
pub const MAX_SUBSCRIBERS: usize = 10;

/// Idle time after which the push channel sends a ping.
pub const WS_PING_INTERVAL_MS: u64 = 20_000;

/// Time allowed for the WebSocket upgrade response.
pub const WS_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;

/// Sleep between polls while a frame is still arriving.
pub const WS_READ_POLL_MS: u32 = 20;

/// Size of one reassembled WebSocket message.
pub const WS_MESSAGE_SIZE: usize = 2048;

/// Size of the per-tick push buffer all frames of one tick are concatenated into.
pub const PUSH_BUFFER_SIZE: usize = 8000;

/// A device exchange that has not finished after this long is abandoned.
pub const HTTP_SESSION_TIMEOUT_MS: u64 = 8_000;

/// Sleep between polls of the blocking HTTP call.
pub const HTTP_POLL_MS: u32 = 5;

/// Response bodies beyond this size are drained but not stored.
pub const MAX_BODY_SIZE: usize = 2048;

/// Maximum size of an outgoing HTTP request, head and body.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Cooldown after a failure or timeout.
pub const LONG_COOLDOWN: u16 = 200;

/// Cooldown after an ordinary success.
pub const SHORT_COOLDOWN: u16 = 50;

/// Number of lease renewals between two device-details refreshes.
pub const PARAMETER_REFRESH_INTERVAL: u8 = 5;
