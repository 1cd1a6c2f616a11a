//! Field Vocabulary
//!
//! Fixed enumerations shared by the game and network layers.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// ALLIANCE
// =============================================================================

/// One of the two competing sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Alliance {
    /// Red alliance
    Red = 0,
    /// Blue alliance
    Blue = 1,
}

impl Alliance {
    /// Both alliances, in index order.
    pub const ALL: [Alliance; 2] = [Alliance::Red, Alliance::Blue];

    /// Array index for per-alliance tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The opposing alliance.
    pub const fn other(self) -> Alliance {
        match self {
            Alliance::Red => Alliance::Blue,
            Alliance::Blue => Alliance::Red,
        }
    }

    /// Decode the handshake letter (`R` or `B`).
    pub fn from_code(code: char) -> Option<Alliance> {
        match code {
            'R' => Some(Alliance::Red),
            'B' => Some(Alliance::Blue),
            _ => None,
        }
    }

    /// Upper-case name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Alliance::Red => "RED",
            Alliance::Blue => "BLUE",
        }
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// FIELD ELEMENT
// =============================================================================

/// Kind of field device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FieldElement {
    /// Speaker: high goal with the amp countdown display
    Speaker = 0,
    /// Amp: low goal with status lights and buttons
    Amp = 1,
}

impl FieldElement {
    /// Both element kinds, in index order.
    pub const ALL: [FieldElement; 2] = [FieldElement::Speaker, FieldElement::Amp];

    /// Array index for per-element tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode an element letter (`A` or `S`).
    pub fn from_code(code: char) -> Option<FieldElement> {
        match code {
            'A' => Some(FieldElement::Amp),
            'S' => Some(FieldElement::Speaker),
            _ => None,
        }
    }

    /// Upper-case name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            FieldElement::Speaker => "SPEAKER",
            FieldElement::Amp => "AMP",
        }
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// MODE
// =============================================================================

/// Match phase.
///
/// Progression is cyclic: Setup → Autonomous → WaitForTeleop → Teleop → Setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mode {
    /// Between matches
    #[default]
    Setup = 0,
    /// Autonomous period (timed)
    Autonomous = 1,
    /// Pause between autonomous and teleop
    WaitForTeleop = 2,
    /// Teleoperated period (timed)
    Teleop = 3,
}

impl Mode {
    /// Array index for per-mode tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether this mode runs on a countdown timer.
    pub const fn is_timed(self) -> bool {
        matches!(self, Mode::Autonomous | Mode::Teleop)
    }

    /// Label shown on the scoreboard.
    pub const fn display_name(self) -> &'static str {
        match self {
            Mode::Setup => "Setup",
            Mode::Autonomous => "Autonomous",
            Mode::WaitForTeleop => "(wait for Teleop)",
            Mode::Teleop => "Teleop",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
