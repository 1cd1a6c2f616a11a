//! Game Actions
//!
//! Discrete mutations of the match state. Each action may change state and
//! queue display updates for the affected devices.

use crate::core::clock::ceil_secs;
use crate::game::constants::{
    amp_note_score, unamplified_speaker_note_score,
    AMPLIFIED_SPEAKER_NOTE_SCORE, AMP_ACTIVATION_COST, COOPERTITION_COST,
};
use crate::game::output::{CoopertitionLight, DeviceOutput, HighLight, Outbox};
use crate::game::state::GameState;
use crate::game::types::{Alliance, FieldElement, Mode};

// =============================================================================
// ELIGIBILITY
// =============================================================================

/// Amp can be activated: two banked notes and no window running.
pub fn can_activate_amp(state: &GameState, alliance: Alliance) -> bool {
    let alliance_state = state.alliance(alliance);
    !alliance_state.amp_active() && alliance_state.banked_notes == AMP_ACTIVATION_COST
}

/// Coopertition can be offered: window open, not yet offered, a note to spend.
pub fn can_offer_coopertition(state: &GameState, alliance: Alliance) -> bool {
    let alliance_state = state.alliance(alliance);
    state.coopertition_available()
        && !alliance_state.coopertition_offered
        && alliance_state.banked_notes >= COOPERTITION_COST
}

// =============================================================================
// SCORING
// =============================================================================

/// Score a note in the amp and refresh the amp lights.
pub fn score_amp_note(state: &mut GameState, outbox: &mut Outbox, alliance: Alliance) {
    let points = amp_note_score(state.current_mode);
    let alliance_state = state.alliance_mut(alliance);
    alliance_state.score = alliance_state.score.saturating_add(points);
    alliance_state.bank_note();

    update_amp_status_light(state, outbox, alliance);
}

/// Score a note in the speaker.
pub fn score_speaker_note(state: &mut GameState, alliance: Alliance) {
    let mode = state.current_mode;
    let alliance_state = state.alliance_mut(alliance);
    let points = if alliance_state.amp_active() {
        AMPLIFIED_SPEAKER_NOTE_SCORE
    } else {
        unamplified_speaker_note_score(mode)
    };
    alliance_state.score = alliance_state.score.saturating_add(points);
}

// =============================================================================
// AMP
// =============================================================================

/// Spend two banked notes to start an amp window.
///
/// Callers check `can_activate_amp` first.
pub fn activate_amp(state: &mut GameState, outbox: &mut Outbox, alliance: Alliance) {
    let end_ns = state.cur_time_ns + state.timings.amp_time_ns;
    let amp_secs = ceil_secs(state.timings.amp_time_ns);

    let alliance_state = state.alliance_mut(alliance);
    alliance_state.banked_notes = alliance_state.banked_notes.saturating_sub(AMP_ACTIVATION_COST);
    alliance_state.amp_end_ns = end_ns;

    update_amp_status_light(state, outbox, alliance);
    set_speaker_amp_display(outbox, alliance, amp_secs);
}

/// Close the amp window.
pub fn end_amp_time(state: &mut GameState, outbox: &mut Outbox, alliance: Alliance) {
    state.alliance_mut(alliance).amp_end_ns = 0;
    update_amp_status_light(state, outbox, alliance);
    set_speaker_amp_display(outbox, alliance, 0);
}

/// Show `seconds` on the speaker countdown (10 and above shows `AA`).
pub fn set_speaker_amp_display(outbox: &mut Outbox, alliance: Alliance, seconds: u64) {
    outbox.push(alliance, FieldElement::Speaker, DeviceOutput::countdown(seconds));
}

/// Amp low and high indicator values for an alliance.
pub fn amp_status_lights(state: &GameState, alliance: Alliance) -> [DeviceOutput; 2] {
    let alliance_state = state.alliance(alliance);
    let low = DeviceOutput::LowLight(alliance_state.banked_notes >= 1);
    let high = if alliance_state.amp_active() {
        HighLight::Blinking
    } else if alliance_state.banked_notes >= 2 {
        HighLight::On
    } else {
        HighLight::Off
    };
    [low, DeviceOutput::HighLight(high)]
}

/// Push the amp status lights for an alliance.
pub fn update_amp_status_light(state: &GameState, outbox: &mut Outbox, alliance: Alliance) {
    for output in amp_status_lights(state, alliance) {
        outbox.push(alliance, FieldElement::Amp, output);
    }
}

// =============================================================================
// COOPERTITION
// =============================================================================

/// Spend a banked note to offer coopertition.
///
/// Callers check `can_offer_coopertition` first.
pub fn offer_coopertition(state: &mut GameState, outbox: &mut Outbox, alliance: Alliance) {
    let alliance_state = state.alliance_mut(alliance);
    alliance_state.banked_notes = alliance_state.banked_notes.saturating_sub(COOPERTITION_COST);
    alliance_state.coopertition_offered = true;

    update_amp_status_light(state, outbox, alliance);
    update_coopertition_lights(state, outbox);
}

/// Coopertition indicator value for an alliance.
pub fn coopertition_light(state: &GameState, alliance: Alliance) -> CoopertitionLight {
    if state.coopertition_accepted() {
        return CoopertitionLight::Lit;
    }

    if state.current_mode != Mode::Autonomous && !state.coopertition_available() {
        return CoopertitionLight::Unavailable;
    }

    if state.alliance(alliance).coopertition_offered {
        CoopertitionLight::Lit
    } else {
        CoopertitionLight::Blinking
    }
}

/// Push the coopertition indicator to both amps.
pub fn update_coopertition_lights(state: &GameState, outbox: &mut Outbox) {
    for alliance in [Alliance::Blue, Alliance::Red] {
        let light = coopertition_light(state, alliance);
        outbox.push(alliance, FieldElement::Amp, DeviceOutput::Coopertition(light));
    }
}

// =============================================================================
// FULL DISPLAY STATE
// =============================================================================

/// Seconds the speaker countdown should show for an alliance right now.
pub fn speaker_countdown_secs(state: &GameState, alliance: Alliance) -> u64 {
    if !state.game_active() {
        return 0;
    }
    ceil_secs(state.alliance(alliance).remaining_amp_time_ns(state.cur_time_ns))
}

/// Everything a device of the given kind should be showing.
pub fn initial_state(state: &GameState, alliance: Alliance, element: FieldElement) -> Vec<DeviceOutput> {
    match element {
        FieldElement::Amp => {
            let mut outputs = amp_status_lights(state, alliance).to_vec();
            outputs.push(DeviceOutput::Coopertition(coopertition_light(state, alliance)));
            outputs
        }
        FieldElement::Speaker => {
            vec![DeviceOutput::countdown(speaker_countdown_secs(state, alliance))]
        }
    }
}

/// Push full display state to every device.
pub fn push_full_state(state: &GameState, outbox: &mut Outbox) {
    for alliance in Alliance::ALL {
        update_amp_status_light(state, outbox, alliance);
        set_speaker_amp_display(outbox, alliance, speaker_countdown_secs(state, alliance));
    }
    update_coopertition_lights(state, outbox);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::NANOS_PER_SEC;
    use crate::game::constants::{AMP_TIME_NS, COOPERTITION_WINDOW_NS};

    const SEC: u64 = NANOS_PER_SEC;

    fn state_in(mode: Mode) -> GameState {
        let mut state = GameState::new();
        state.advance_clock(SEC);
        match mode {
            Mode::Setup => {}
            Mode::Autonomous => {
                state.advance_mode(SEC);
            }
            Mode::WaitForTeleop => {
                state.current_mode = Mode::WaitForTeleop;
            }
            Mode::Teleop => {
                state.current_mode = Mode::WaitForTeleop;
                state.advance_mode(SEC);
            }
        }
        state.take_transitions();
        state
    }

    #[test]
    fn test_two_amp_notes_in_autonomous() {
        let mut state = state_in(Mode::Autonomous);
        let mut outbox = Outbox::new();

        score_amp_note(&mut state, &mut outbox, Alliance::Red);
        score_amp_note(&mut state, &mut outbox, Alliance::Red);

        let red = state.alliance(Alliance::Red);
        assert_eq!(red.score, 2 * amp_note_score(Mode::Autonomous));
        assert_eq!(red.banked_notes, 2);
        assert_eq!(
            outbox.lines_for(Alliance::Red, FieldElement::Amp),
            vec!["L1", "H0", "L1", "H1"],
        );
        assert_eq!(state.alliance(Alliance::Blue).score, 0);
    }

    #[test]
    fn test_amp_note_at_cap_keeps_two() {
        let mut state = state_in(Mode::Teleop);
        let mut outbox = Outbox::new();
        for _ in 0..3 {
            score_amp_note(&mut state, &mut outbox, Alliance::Blue);
        }
        assert_eq!(state.alliance(Alliance::Blue).banked_notes, 2);
        assert_eq!(state.alliance(Alliance::Blue).score, 3);
    }

    #[test]
    fn test_speaker_note_scoring() {
        let mut state = state_in(Mode::Teleop);
        score_speaker_note(&mut state, Alliance::Red);
        assert_eq!(state.alliance(Alliance::Red).score, unamplified_speaker_note_score(Mode::Teleop));

        state.alliance_mut(Alliance::Red).amp_end_ns = state.cur_time_ns + SEC;
        score_speaker_note(&mut state, Alliance::Red);
        assert_eq!(
            state.alliance(Alliance::Red).score,
            unamplified_speaker_note_score(Mode::Teleop) + AMPLIFIED_SPEAKER_NOTE_SCORE,
        );
    }

    #[test]
    fn test_activate_amp() {
        let mut state = state_in(Mode::Teleop);
        state.alliance_mut(Alliance::Red).banked_notes = 2;
        assert!(can_activate_amp(&state, Alliance::Red));

        let mut outbox = Outbox::new();
        activate_amp(&mut state, &mut outbox, Alliance::Red);

        let red = state.alliance(Alliance::Red);
        assert_eq!(red.banked_notes, 0);
        assert_eq!(red.amp_end_ns, state.cur_time_ns + AMP_TIME_NS);
        assert_eq!(outbox.lines_for(Alliance::Red, FieldElement::Amp), vec!["L0", "HB"]);
        assert_eq!(outbox.lines_for(Alliance::Red, FieldElement::Speaker), vec!["AA"]);
        assert!(!can_activate_amp(&state, Alliance::Red));
    }

    #[test]
    fn test_amp_needs_exactly_two_notes() {
        let mut state = state_in(Mode::Teleop);
        state.alliance_mut(Alliance::Blue).banked_notes = 1;
        assert!(!can_activate_amp(&state, Alliance::Blue));

        state.alliance_mut(Alliance::Blue).banked_notes = 2;
        state.alliance_mut(Alliance::Blue).amp_end_ns = state.cur_time_ns + SEC;
        assert!(!can_activate_amp(&state, Alliance::Blue), "window already running");
    }

    #[test]
    fn test_end_amp_time() {
        let mut state = state_in(Mode::Teleop);
        state.alliance_mut(Alliance::Blue).amp_end_ns = state.cur_time_ns;
        let mut outbox = Outbox::new();

        end_amp_time(&mut state, &mut outbox, Alliance::Blue);

        assert!(!state.alliance(Alliance::Blue).amp_active());
        assert_eq!(outbox.lines_for(Alliance::Blue, FieldElement::Amp), vec!["L0", "H0"]);
        assert_eq!(outbox.lines_for(Alliance::Blue, FieldElement::Speaker), vec!["A0"]);
    }

    #[test]
    fn test_offer_and_accept_coopertition() {
        let mut state = state_in(Mode::Teleop);
        state.alliance_mut(Alliance::Red).banked_notes = 1;
        state.alliance_mut(Alliance::Blue).banked_notes = 2;

        assert!(can_offer_coopertition(&state, Alliance::Red));
        let mut outbox = Outbox::new();
        offer_coopertition(&mut state, &mut outbox, Alliance::Red);

        assert_eq!(state.alliance(Alliance::Red).banked_notes, 0);
        assert!(!can_offer_coopertition(&state, Alliance::Red), "already offered");
        assert_eq!(outbox.lines_for(Alliance::Red, FieldElement::Amp), vec!["L0", "H0", "C1"]);
        assert_eq!(outbox.lines_for(Alliance::Blue, FieldElement::Amp), vec!["CB"]);

        let mut outbox = Outbox::new();
        offer_coopertition(&mut state, &mut outbox, Alliance::Blue);
        assert!(state.coopertition_accepted());
        assert_eq!(outbox.lines_for(Alliance::Blue, FieldElement::Amp), vec!["L1", "H0", "C1"]);
        assert_eq!(outbox.lines_for(Alliance::Red, FieldElement::Amp), vec!["C1"]);
    }

    #[test]
    fn test_coopertition_needs_a_note_and_open_window() {
        let mut state = state_in(Mode::Teleop);
        assert!(!can_offer_coopertition(&state, Alliance::Red), "no banked notes");

        state.alliance_mut(Alliance::Red).banked_notes = 1;
        state.advance_clock(state.cur_time_ns + COOPERTITION_WINDOW_NS);
        assert!(!can_offer_coopertition(&state, Alliance::Red), "window closed");

        let mut auton = state_in(Mode::Autonomous);
        auton.alliance_mut(Alliance::Red).banked_notes = 1;
        assert!(!can_offer_coopertition(&auton, Alliance::Red));
    }

    #[test]
    fn test_coopertition_light_states() {
        let mut state = state_in(Mode::Setup);
        assert_eq!(coopertition_light(&state, Alliance::Red), CoopertitionLight::Unavailable);

        let auton = state_in(Mode::Autonomous);
        assert_eq!(coopertition_light(&auton, Alliance::Red), CoopertitionLight::Blinking);

        let wait = state_in(Mode::WaitForTeleop);
        assert_eq!(coopertition_light(&wait, Alliance::Red), CoopertitionLight::Unavailable);

        state = state_in(Mode::Teleop);
        state.alliance_mut(Alliance::Blue).coopertition_offered = true;
        assert_eq!(coopertition_light(&state, Alliance::Blue), CoopertitionLight::Lit);
        assert_eq!(coopertition_light(&state, Alliance::Red), CoopertitionLight::Blinking);

        // Window closes without full acceptance
        state.advance_clock(state.cur_time_ns + COOPERTITION_WINDOW_NS);
        assert_eq!(coopertition_light(&state, Alliance::Blue), CoopertitionLight::Unavailable);
        assert_eq!(coopertition_light(&state, Alliance::Red), CoopertitionLight::Unavailable);

        // Accepted stays lit after the window
        state.alliance_mut(Alliance::Red).coopertition_offered = true;
        assert_eq!(coopertition_light(&state, Alliance::Red), CoopertitionLight::Lit);
    }

    #[test]
    fn test_initial_state() {
        let mut state = state_in(Mode::Teleop);
        state.alliance_mut(Alliance::Red).banked_notes = 1;
        state.alliance_mut(Alliance::Red).amp_end_ns = state.cur_time_ns + 3 * SEC + 1;

        let amp: Vec<String> = initial_state(&state, Alliance::Red, FieldElement::Amp)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(amp, vec!["L1", "HB", "CB"]);

        let speaker: Vec<String> = initial_state(&state, Alliance::Red, FieldElement::Speaker)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(speaker, vec!["A4"]);

        let idle = GameState::new();
        let speaker = initial_state(&idle, Alliance::Blue, FieldElement::Speaker);
        assert_eq!(speaker, vec![DeviceOutput::AmpCountdown(0)]);
    }

    #[test]
    fn test_push_full_state_covers_every_device() {
        let state = state_in(Mode::Autonomous);
        let mut outbox = Outbox::new();
        push_full_state(&state, &mut outbox);

        for alliance in Alliance::ALL {
            assert_eq!(outbox.lines_for(alliance, FieldElement::Amp), vec!["L0", "H0", "CB"]);
            assert_eq!(outbox.lines_for(alliance, FieldElement::Speaker), vec!["A0"]);
        }
    }
}
