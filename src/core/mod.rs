//! Core primitives.
//!
//! Time source shared by the game loop and its tests.

pub mod clock;

pub use clock::{MonotonicClock, NANOS_PER_SEC, ceil_secs, duration_to_ns};
