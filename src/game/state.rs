//! Game State Definitions
//!
//! The authoritative match state and its mode state machine.
//! Only the game loop writes this state; everything else reads snapshots.

use serde::{Serialize, Deserialize};

use crate::core::clock::NANOS_PER_SEC;
use crate::game::constants::{GameTimings, MAX_BANKED_NOTES};
use crate::game::types::{Alliance, Mode};

// =============================================================================
// ALLIANCE STATE
// =============================================================================

/// Match state for one alliance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceState {
    /// Points scored this round
    pub score: u32,

    /// Notes banked toward amp activation (0..=2)
    pub banked_notes: u8,

    /// Clock reading at which the amp window ends; 0 when inactive
    pub amp_end_ns: u64,

    /// Whether this alliance has offered coopertition
    pub coopertition_offered: bool,
}

impl AllianceState {
    /// Reset for the start of a round.
    pub fn start_round(&mut self) {
        *self = Self::default();
    }

    /// Whether the amp window is armed.
    #[inline]
    pub fn amp_active(&self) -> bool {
        self.amp_end_ns != 0
    }

    /// Bank one note, saturating at the cap.
    pub fn bank_note(&mut self) {
        if self.banked_notes < MAX_BANKED_NOTES {
            self.banked_notes += 1;
        }
    }

    /// Remaining amp time at `now_ns`, or 0 if the amp is off or expired.
    pub fn remaining_amp_time_ns(&self, now_ns: u64) -> u64 {
        if self.amp_end_ns == 0 || self.amp_end_ns < now_ns {
            0
        } else {
            self.amp_end_ns - now_ns
        }
    }
}

// =============================================================================
// MODE TRANSITIONS
// =============================================================================

/// What caused a mode change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Operator pressed the advance control
    Operator,
    /// A mode timer ran out
    Timer,
}

/// A mode change taken by the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTransition {
    /// Mode before the change
    pub from: Mode,
    /// Mode after the change
    pub to: Mode,
    /// Trigger
    pub cause: TransitionCause,
}

impl ModeTransition {
    /// Operator cancelled a running period.
    pub fn is_abort(&self) -> bool {
        self.cause == TransitionCause::Operator && self.to == Mode::Setup
    }

    /// Teleop ran to completion.
    pub fn is_match_end(&self) -> bool {
        self.cause == TransitionCause::Timer && self.from == Mode::Teleop && self.to == Mode::Setup
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of the match.
#[derive(Clone, Debug)]
pub struct GameState {
    /// Clock reading for the current tick
    pub cur_time_ns: u64,

    /// Clock reading for the previous tick
    pub prev_time_ns: u64,

    /// Clock reading at which the current timed mode ends; 0 when disarmed
    pub mode_end_ns: u64,

    /// Current match phase
    pub current_mode: Mode,

    /// Per-alliance state, indexed by `Alliance::index()`
    pub alliances: [AllianceState; 2],

    /// Push full display state on the next tick
    pub first_game_frame: bool,

    /// Period lengths
    pub timings: GameTimings,

    /// Operator transitions not yet seen by the tick
    pending_transitions: Vec<ModeTransition>,
}

impl GameState {
    /// Create a match in Setup with default timings.
    pub fn new() -> Self {
        Self::with_timings(GameTimings::default())
    }

    /// Create a match in Setup with custom timings.
    pub fn with_timings(timings: GameTimings) -> Self {
        Self {
            cur_time_ns: 0,
            prev_time_ns: 0,
            mode_end_ns: 0,
            current_mode: Mode::Setup,
            alliances: [AllianceState::default(), AllianceState::default()],
            first_game_frame: true,
            timings,
            pending_transitions: Vec::new(),
        }
    }

    /// State for one alliance.
    #[inline]
    pub fn alliance(&self, alliance: Alliance) -> &AllianceState {
        &self.alliances[alliance.index()]
    }

    /// Mutable state for one alliance.
    #[inline]
    pub fn alliance_mut(&mut self, alliance: Alliance) -> &mut AllianceState {
        &mut self.alliances[alliance.index()]
    }

    /// Move the clock forward to `now_ns`, keeping the previous reading.
    pub fn advance_clock(&mut self, now_ns: u64) {
        self.prev_time_ns = self.cur_time_ns;
        self.cur_time_ns = now_ns;
    }

    /// Take the timer-driven transition if the current period has run out.
    pub fn check_mode_progression(&mut self) -> Option<ModeTransition> {
        let next_mode = match self.current_mode {
            Mode::Autonomous => Mode::WaitForTeleop,
            Mode::Teleop => Mode::Setup,
            Mode::Setup | Mode::WaitForTeleop => return None,
        };

        if self.cur_time_ns <= self.mode_end_ns {
            return None;
        }

        let transition = ModeTransition {
            from: self.current_mode,
            to: next_mode,
            cause: TransitionCause::Timer,
        };
        self.current_mode = next_mode;
        self.mode_end_ns = 0;
        Some(transition)
    }

    /// Handle the operator's advance control.
    ///
    /// Setup starts a round, WaitForTeleop starts teleop, and a running
    /// period is aborted back to Setup without resetting scores.
    pub fn advance_mode(&mut self, now_ns: u64) -> ModeTransition {
        let from = self.current_mode;
        match from {
            Mode::Setup => {
                self.current_mode = Mode::Autonomous;
                self.start_round();
                self.mode_end_ns = now_ns + self.timings.auton_period_ns;
            }
            Mode::WaitForTeleop => {
                self.current_mode = Mode::Teleop;
                self.mode_end_ns = now_ns + self.timings.teleop_period_ns;
            }
            Mode::Autonomous | Mode::Teleop => {
                self.current_mode = Mode::Setup;
                self.mode_end_ns = 0;
            }
        }

        let transition = ModeTransition {
            from,
            to: self.current_mode,
            cause: TransitionCause::Operator,
        };
        self.pending_transitions.push(transition);
        transition
    }

    /// Take operator transitions recorded since the last call.
    pub fn take_transitions(&mut self) -> Vec<ModeTransition> {
        std::mem::take(&mut self.pending_transitions)
    }

    fn start_round(&mut self) {
        for alliance in &mut self.alliances {
            alliance.start_round();
        }
        self.first_game_frame = true;
    }

    /// Remaining time in the current period at the current tick.
    pub fn remaining_time_ns(&self) -> u64 {
        self.remaining_time_ns_at(self.cur_time_ns)
    }

    /// Remaining time in the current period as seen at `at_ns`.
    ///
    /// 0 if no timer is armed or `at_ns` is already past the end.
    pub fn remaining_time_ns_at(&self, at_ns: u64) -> u64 {
        if self.mode_end_ns == 0 || at_ns > self.mode_end_ns {
            return 0;
        }
        self.mode_end_ns - at_ns
    }

    /// Whether gameplay events are accepted.
    #[inline]
    pub fn game_active(&self) -> bool {
        matches!(self.current_mode, Mode::Autonomous | Mode::Teleop)
    }

    /// Whether coopertition can be offered at the current tick.
    pub fn coopertition_available(&self) -> bool {
        self.coopertition_available_at(self.cur_time_ns)
    }

    /// Whether coopertition could be offered at `at_ns`.
    ///
    /// Only true during the opening window of teleop.
    pub fn coopertition_available_at(&self, at_ns: u64) -> bool {
        if self.current_mode != Mode::Teleop {
            return false;
        }
        let remaining = self.remaining_time_ns_at(at_ns);
        remaining > self.timings.teleop_period_ns.saturating_sub(self.timings.coopertition_window_ns)
    }

    /// Both alliances have offered coopertition.
    pub fn coopertition_accepted(&self) -> bool {
        self.alliances.iter().all(|a| a.coopertition_offered)
    }

    /// Read-only view for displays.
    pub fn snapshot(&self) -> MatchSnapshot {
        let remaining_ns = self.remaining_time_ns();
        MatchSnapshot {
            mode: self.current_mode,
            mode_name: self.current_mode.display_name().to_string(),
            remaining_ns,
            remaining_secs: (remaining_ns as f64 / NANOS_PER_SEC as f64 * 10.0).round() / 10.0,
            coopertition_available: self.coopertition_available(),
            alliances: Alliance::ALL
                .iter()
                .map(|&alliance| {
                    let state = self.alliance(alliance);
                    AllianceSnapshot {
                        alliance,
                        score: state.score,
                        banked_notes: state.banked_notes,
                        amp_remaining_ns: state.remaining_amp_time_ns(self.cur_time_ns),
                        coopertition_offered: state.coopertition_offered,
                    }
                })
                .collect(),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Per-alliance part of a match snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllianceSnapshot {
    /// Which alliance
    pub alliance: Alliance,
    /// Points scored this round
    pub score: u32,
    /// Banked notes
    pub banked_notes: u8,
    /// Remaining amp time (0 when inactive)
    pub amp_remaining_ns: u64,
    /// Coopertition offered
    pub coopertition_offered: bool,
}

/// Read-only view of the match for the scoreboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Current phase
    pub mode: Mode,
    /// Scoreboard label for the phase
    pub mode_name: String,
    /// Remaining period time in nanoseconds
    pub remaining_ns: u64,
    /// Remaining period time in seconds, one decimal
    pub remaining_secs: f64,
    /// Coopertition window open
    pub coopertition_available: bool,
    /// Red then blue
    pub alliances: Vec<AllianceSnapshot>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{AUTON_PERIOD_NS, TELEOP_PERIOD_NS, COOPERTITION_WINDOW_NS};
    use proptest::prelude::*;

    const SEC: u64 = NANOS_PER_SEC;

    fn state_at(now: u64) -> GameState {
        let mut state = GameState::new();
        state.advance_clock(now);
        state
    }

    #[test]
    fn test_full_cycle() {
        let mut state = state_at(SEC);

        let t = state.advance_mode(SEC);
        assert_eq!((t.from, t.to), (Mode::Setup, Mode::Autonomous));
        assert_eq!(state.mode_end_ns, SEC + AUTON_PERIOD_NS);

        state.advance_clock(SEC + AUTON_PERIOD_NS);
        assert_eq!(state.check_mode_progression(), None, "timer expires strictly after end");

        state.advance_clock(SEC + AUTON_PERIOD_NS + 1);
        let t = state.check_mode_progression().unwrap();
        assert_eq!((t.from, t.to, t.cause), (Mode::Autonomous, Mode::WaitForTeleop, TransitionCause::Timer));
        assert_eq!(state.mode_end_ns, 0);

        // Waiting for teleop has no timer
        state.advance_clock(100 * SEC);
        assert_eq!(state.check_mode_progression(), None);

        state.advance_mode(100 * SEC);
        assert_eq!(state.current_mode, Mode::Teleop);
        assert_eq!(state.mode_end_ns, 100 * SEC + TELEOP_PERIOD_NS);

        state.advance_clock(100 * SEC + TELEOP_PERIOD_NS + 1);
        let t = state.check_mode_progression().unwrap();
        assert!(t.is_match_end());
        assert_eq!(state.current_mode, Mode::Setup);
        assert_eq!(state.mode_end_ns, 0);
    }

    #[test]
    fn test_round_start_resets_alliances() {
        let mut state = state_at(SEC);
        state.alliance_mut(Alliance::Red).score = 40;
        state.alliance_mut(Alliance::Blue).banked_notes = 2;
        state.alliance_mut(Alliance::Blue).coopertition_offered = true;
        state.first_game_frame = false;

        state.advance_mode(SEC);

        assert_eq!(state.alliances, [AllianceState::default(), AllianceState::default()]);
        assert!(state.first_game_frame);
    }

    #[test]
    fn test_abort_keeps_scores() {
        let mut state = state_at(SEC);
        state.advance_mode(SEC);
        state.alliance_mut(Alliance::Red).score = 12;

        state.advance_clock(5 * SEC);
        let t = state.advance_mode(5 * SEC);

        assert!(t.is_abort());
        assert_eq!(state.current_mode, Mode::Setup);
        assert_eq!(state.mode_end_ns, 0);
        assert_eq!(state.alliance(Alliance::Red).score, 12);
    }

    #[test]
    fn test_operator_transitions_are_recorded() {
        let mut state = state_at(SEC);
        state.advance_mode(SEC);
        state.advance_mode(2 * SEC);

        let transitions = state.take_transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].to, Mode::Autonomous);
        assert_eq!(transitions[1].to, Mode::Setup);
        assert!(state.take_transitions().is_empty());
    }

    #[test]
    fn test_remaining_time() {
        let mut state = state_at(SEC);
        assert_eq!(state.remaining_time_ns(), 0);

        state.advance_mode(SEC);
        assert_eq!(state.remaining_time_ns(), AUTON_PERIOD_NS);
        assert_eq!(state.remaining_time_ns_at(SEC + 5 * SEC), AUTON_PERIOD_NS - 5 * SEC);
        assert_eq!(state.remaining_time_ns_at(SEC + AUTON_PERIOD_NS + 1), 0);
    }

    #[test]
    fn test_game_active() {
        let mut state = state_at(SEC);
        assert!(!state.game_active());
        state.advance_mode(SEC);
        assert!(state.game_active());
        state.advance_clock(SEC + AUTON_PERIOD_NS + 1);
        state.check_mode_progression();
        assert!(!state.game_active());
        state.advance_mode(state.cur_time_ns);
        assert!(state.game_active());
    }

    #[test]
    fn test_coopertition_window() {
        let mut state = state_at(SEC);
        assert!(!state.coopertition_available());

        // Autonomous never allows coopertition
        state.advance_mode(SEC);
        assert!(!state.coopertition_available());

        state.current_mode = Mode::WaitForTeleop;
        state.mode_end_ns = 0;
        let start = 30 * SEC;
        state.advance_clock(start);
        state.advance_mode(start);

        assert!(state.coopertition_available());
        assert!(state.coopertition_available_at(start + COOPERTITION_WINDOW_NS - 1));
        assert!(!state.coopertition_available_at(start + COOPERTITION_WINDOW_NS));
        assert!(!state.coopertition_available_at(start + TELEOP_PERIOD_NS));
    }

    #[test]
    fn test_bank_note_clamps() {
        let mut alliance = AllianceState::default();
        for _ in 0..5 {
            alliance.bank_note();
        }
        assert_eq!(alliance.banked_notes, MAX_BANKED_NOTES);
    }

    #[test]
    fn test_remaining_amp_time() {
        let alliance = AllianceState { amp_end_ns: 10 * SEC, ..Default::default() };
        assert_eq!(alliance.remaining_amp_time_ns(4 * SEC), 6 * SEC);
        assert_eq!(alliance.remaining_amp_time_ns(11 * SEC), 0);
        assert_eq!(AllianceState::default().remaining_amp_time_ns(SEC), 0);
    }

    #[test]
    fn test_snapshot() {
        let mut state = state_at(SEC);
        state.advance_mode(SEC);
        state.alliance_mut(Alliance::Blue).score = 7;

        let snapshot = state.snapshot();
        assert_eq!(snapshot.mode, Mode::Autonomous);
        assert_eq!(snapshot.mode_name, "Autonomous");
        assert_eq!(snapshot.remaining_secs, 15.0);
        assert_eq!(snapshot.alliances[Alliance::Blue.index()].score, 7);
        assert_eq!(snapshot.alliances[Alliance::Red.index()].alliance, Alliance::Red);
    }

    proptest! {
        #[test]
        fn prop_mode_end_only_armed_in_timed_modes(
            steps in proptest::collection::vec((any::<bool>(), 1u64..200 * SEC), 1..40)
        ) {
            let mut state = GameState::new();
            let mut now = 1;
            for (press, delta) in steps {
                now += delta;
                state.advance_clock(now);
                if press {
                    state.advance_mode(now);
                } else {
                    state.check_mode_progression();
                }
                if state.current_mode.is_timed() {
                    prop_assert!(state.mode_end_ns != 0);
                } else {
                    prop_assert_eq!(state.mode_end_ns, 0);
                }
            }
        }

        #[test]
        fn prop_banked_notes_never_exceed_cap(scores in 0usize..20) {
            let mut alliance = AllianceState::default();
            for _ in 0..scores {
                alliance.bank_note();
                prop_assert!(alliance.banked_notes <= MAX_BANKED_NOTES);
            }
        }
    }
}
