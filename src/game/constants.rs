//! Game Rule Constants
//!
//! Point values and period lengths for the 2024 game.

use crate::core::clock::NANOS_PER_SEC;
use crate::game::types::Mode;

// =============================================================================
// SCORING
// =============================================================================

/// Amp note points, indexed by `Mode::index()`.
///
/// Setup and WaitForTeleop score like the period that just ended, so notes
/// landing after the buzzer still count (3-second rule).
pub const AMP_NOTE_SCORE_FOR_MODE: [u32; 4] = [
    1, // Setup
    2, // Autonomous
    2, // WaitForTeleop
    1, // Teleop
];

/// Unamplified speaker note points, indexed by `Mode::index()`.
pub const UNAMPLIFIED_SPEAKER_NOTE_SCORE_FOR_MODE: [u32; 4] = [
    2, // Setup
    5, // Autonomous
    5, // WaitForTeleop
    2, // Teleop
];

/// Speaker note points while the alliance's amp window is active.
pub const AMPLIFIED_SPEAKER_NOTE_SCORE: u32 = 5;

/// Maximum notes an alliance can bank toward amp activation.
pub const MAX_BANKED_NOTES: u8 = 2;

/// Banked notes spent to activate the amp.
pub const AMP_ACTIVATION_COST: u8 = 2;

/// Banked notes spent to offer coopertition.
pub const COOPERTITION_COST: u8 = 1;

/// Amp note value for a mode.
#[inline]
pub fn amp_note_score(mode: Mode) -> u32 {
    AMP_NOTE_SCORE_FOR_MODE[mode.index()]
}

/// Unamplified speaker note value for a mode.
#[inline]
pub fn unamplified_speaker_note_score(mode: Mode) -> u32 {
    UNAMPLIFIED_SPEAKER_NOTE_SCORE_FOR_MODE[mode.index()]
}

// =============================================================================
// TIMING
// =============================================================================

/// Autonomous period length.
pub const AUTON_PERIOD_NS: u64 = 15 * NANOS_PER_SEC;

/// Teleop period length.
pub const TELEOP_PERIOD_NS: u64 = 135 * NANOS_PER_SEC;

/// Coopertition is only available during the first part of teleop.
pub const COOPERTITION_WINDOW_NS: u64 = 45 * NANOS_PER_SEC;

/// Length of an amp window.
pub const AMP_TIME_NS: u64 = 10 * NANOS_PER_SEC;

/// Period lengths used by a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameTimings {
    /// Autonomous period length
    pub auton_period_ns: u64,
    /// Teleop period length
    pub teleop_period_ns: u64,
    /// Coopertition eligibility window, measured from teleop start
    pub coopertition_window_ns: u64,
    /// Amp window length
    pub amp_time_ns: u64,
}

impl Default for GameTimings {
    fn default() -> Self {
        Self {
            auton_period_ns: AUTON_PERIOD_NS,
            teleop_period_ns: TELEOP_PERIOD_NS,
            coopertition_window_ns: COOPERTITION_WINDOW_NS,
            amp_time_ns: AMP_TIME_NS,
        }
    }
}
