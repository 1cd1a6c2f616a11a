//! # FRC 2024 Field Server
//!
//! Authoritative match server for the amp and speaker field devices.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FIELD SERVER                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  └── clock.rs    - Monotonic nanosecond clock                │
//! │                                                              │
//! │  game/           - Match rules (no I/O)                      │
//! │  ├── types.rs    - Alliance, field element, mode             │
//! │  ├── state.rs    - Match state and mode state machine        │
//! │  ├── actions.rs  - Scoring, amp, coopertition                │
//! │  ├── output.rs   - Device display codes                      │
//! │  └── tick.rs     - Per-tick processing                       │
//! │                                                              │
//! │  network/        - Device connections                        │
//! │  ├── protocol.rs - Line protocol and handshake               │
//! │  ├── client.rs   - Per-connection task group                 │
//! │  ├── registry.rs - Connection grid and mailbox               │
//! │  └── server.rs   - Accept loop and game loop                 │
//! │                                                              │
//! │  operator.rs     - Operator console and scoreboard           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! Devices send events over TCP. Connection tasks decode them into the
//! registry mailbox. Every 50 ms the game loop drains the mailbox, applies
//! the rules, and routes display updates back through the registry to each
//! device's outbound queue. The game loop is the only writer of
//! `GameState`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::time::Duration;

pub mod core;
pub mod game;
pub mod network;
pub mod operator;

// Re-export commonly used types
pub use game::state::{GameState, MatchSnapshot};
pub use game::types::{Alliance, FieldElement, Mode};
pub use network::registry::ClientRegistry;
pub use network::server::{FieldServer, GameLoop, ServerConfig};
pub use operator::{OperatorCommand, Scoreboard};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game loop period
pub const TICK_PERIOD: Duration = Duration::from_millis(50);

/// Connection liveness poll period
pub const LIVENESS_INTERVAL: Duration = network::registry::DEFAULT_LIVENESS_INTERVAL;
