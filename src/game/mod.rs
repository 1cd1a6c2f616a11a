//! Game Logic Module
//!
//! Match rules for the 2024 game. Nothing here touches the network; the
//! action layer writes display updates into an `Outbox` that the server
//! delivers.
//!
//! ## Module Structure
//!
//! - `types`: Alliances, field elements, match modes
//! - `messages`: Device events queued for the game loop
//! - `constants`: Point values and period lengths
//! - `output`: Display codes sent to devices
//! - `state`: Match state and the mode state machine
//! - `actions`: Scoring, amp, and coopertition mutations
//! - `tick`: Per-tick processing

pub mod types;
pub mod messages;
pub mod constants;
pub mod output;
pub mod state;
pub mod actions;
pub mod tick;

// Re-export key types
pub use types::{Alliance, FieldElement, Mode};
pub use messages::{ClientMessage, Message};
pub use constants::GameTimings;
pub use output::{DeviceOutput, Outbox, OutputCommand};
pub use state::{GameState, AllianceState, MatchSnapshot, ModeTransition, TransitionCause};
pub use tick::{run_tick, TickResult};
