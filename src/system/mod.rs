//! Platform services the hub client needs from its host.
//!
//! The scheduler never reads a hardware timer or random number generator
//! directly. Instead every component is generic over a [`Platform`], which
//! bundles a monotonic [`Clock`], a short blocking [`Delay`] and an
//! [`Entropy`] source for WebSocket keys and frame masks.
//!
//! # Usage
//!
//! ```rust
//! use libfah::system::{Clock, Delay, Entropy};
//!
//! #[derive(Clone)]
//! struct Board;
//!
//! impl Clock for Board {
//!     fn now_ms(&self) -> u64 { 0 }
//! }
//! impl Delay for Board {
//!     fn delay_ms(&self, _ms: u32) {}
//! }
//! impl Entropy for Board {
//!     fn random_u32(&self) -> u32 { 4 }
//! }
//!
//! fn takes_platform<P: libfah::system::Platform>(_p: P) {}
//! takes_platform(Board);
//! ```

/// A monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed starting point.
    fn now_ms(&self) -> u64;

    /// Whole seconds on the same time base.
    fn now_s(&self) -> u64 {
        self.now_ms() / 1000
    }
}

/// Blocking sleeps, used only while a frame or response is known to be in flight.
pub trait Delay {
    fn delay_ms(&self, ms: u32);
}

/// A source of random numbers. It does not need to be cryptographically strong.
pub trait Entropy {
    fn random_u32(&self) -> u32;
}

/// Everything the client needs from the host.
pub trait Platform: Clock + Delay + Entropy + Clone {}

impl<T: Clock + Delay + Entropy + Clone> Platform for T {}

/// Host platform backed by `std::time` and `std::thread::sleep`.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct StdPlatform {
    start: std::time::Instant,
    seed: std::rc::Rc<core::cell::Cell<u32>>,
}

#[cfg(feature = "std")]
impl Default for StdPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl StdPlatform {
    pub fn new() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0x9E37_79B9);
        Self {
            start: std::time::Instant::now(),
            seed: std::rc::Rc::new(core::cell::Cell::new(nanos | 1)),
        }
    }
}

#[cfg(feature = "std")]
impl Clock for StdPlatform {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(feature = "std")]
impl Delay for StdPlatform {
    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}

#[cfg(feature = "std")]
impl Entropy for StdPlatform {
    fn random_u32(&self) -> u32 {
        // xorshift32
        let mut x = self.seed.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed.set(x);
        x
    }
}
