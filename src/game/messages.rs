//! Device Events
//!
//! Events decoded from device input and queued for the game loop.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::types::{Alliance, FieldElement};

/// An event raised by a field device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A note was scored in the given element.
    Score {
        /// Element the note went into
        element: FieldElement,
    },
    /// The amp activation button was pressed.
    AmpButtonPressed,
    /// The coopertition button was pressed.
    CoopertitionButtonPressed,
}

impl Message {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Score { .. } => "Score",
            Message::AmpButtonPressed => "AmpButtonPressed",
            Message::CoopertitionButtonPressed => "CoopertitionButtonPressed",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Score { element } => write!(f, "Score({})", element),
            other => f.write_str(other.name()),
        }
    }
}

/// A device event attributed to the connection slot it arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Alliance of the sending device
    pub alliance: Alliance,
    /// Kind of the sending device
    pub field_element: FieldElement,
    /// The event itself
    pub message: Message,
}

impl ClientMessage {
    /// Attribute a message to a slot.
    pub const fn new(alliance: Alliance, field_element: FieldElement, message: Message) -> Self {
        Self { alliance, field_element, message }
    }
}
