//! Match Tick
//!
//! One fixed-period step of the match: apply queued device events, run the
//! amp and coopertition timers, and advance the mode state machine.
//! The caller advances the clock and delivers the resulting outbox.

use tracing::{debug, info};

use crate::core::clock::ceil_secs;
use crate::game::actions;
use crate::game::messages::{ClientMessage, Message};
use crate::game::output::{DeviceOutput, Outbox};
use crate::game::state::{GameState, ModeTransition};
use crate::game::types::{Alliance, FieldElement, Mode};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Display updates produced this tick, in order
    pub outbox: Outbox,
    /// Mode changes seen this tick (operator first, then timer)
    pub transitions: Vec<ModeTransition>,
}

impl TickResult {
    /// Whether teleop ran out this tick.
    pub fn match_ended(&self) -> bool {
        self.transitions.iter().any(ModeTransition::is_match_end)
    }
}

/// Run one tick against state whose clock is already advanced.
///
/// Order within a tick:
/// 1. full display sync if requested (process start, round start)
/// 2. effects of operator mode changes since the last tick
/// 3. queued device events, in arrival order, only while the game is active
/// 4. amp countdowns and expiry
/// 5. coopertition window closing edge
/// 6. timer-driven mode progression
pub fn run_tick(state: &mut GameState, messages: &[ClientMessage]) -> TickResult {
    let mut result = TickResult {
        transitions: state.take_transitions(),
        ..Default::default()
    };
    result.transitions.iter().for_each(log_transition);

    // 1-2. Display sync
    if state.first_game_frame {
        state.first_game_frame = false;
        actions::push_full_state(state, &mut result.outbox);
    } else {
        for transition in &result.transitions {
            apply_transition_effects(state, &mut result.outbox, transition);
        }
    }

    // 3. Device events
    process_messages(state, &mut result.outbox, messages);

    // 4. Amp timers
    if state.game_active() {
        update_amp_timer(state, &mut result.outbox, Alliance::Blue);
        update_amp_timer(state, &mut result.outbox, Alliance::Red);
    }

    // 5. Coopertition window closing edge
    if state.coopertition_available_at(state.prev_time_ns) && !state.coopertition_available() {
        debug!("Coopertition window closed");
        actions::update_coopertition_lights(state, &mut result.outbox);
    }

    // 6. Mode progression
    if let Some(transition) = state.check_mode_progression() {
        log_transition(&transition);
        apply_transition_effects(state, &mut result.outbox, &transition);
        result.transitions.push(transition);
    }

    result
}

/// Apply queued device events. Dropped entirely while the game is inactive.
pub fn process_messages(state: &mut GameState, outbox: &mut Outbox, messages: &[ClientMessage]) {
    for msg in messages {
        debug!(
            alliance = %msg.alliance,
            element = %msg.field_element,
            message = %msg.message,
            "Received message"
        );
    }

    if !state.game_active() {
        return;
    }

    for msg in messages {
        match msg.message {
            Message::Score { element: FieldElement::Amp } => {
                actions::score_amp_note(state, outbox, msg.alliance);
            }
            Message::Score { element: FieldElement::Speaker } => {
                actions::score_speaker_note(state, msg.alliance);
            }
            Message::AmpButtonPressed => {
                if actions::can_activate_amp(state, msg.alliance) {
                    actions::activate_amp(state, outbox, msg.alliance);
                }
            }
            Message::CoopertitionButtonPressed => {
                if actions::can_offer_coopertition(state, msg.alliance) {
                    actions::offer_coopertition(state, outbox, msg.alliance);
                }
            }
        }
    }
}

/// Update the speaker countdown on second boundaries and expire the window.
pub fn update_amp_timer(state: &mut GameState, outbox: &mut Outbox, alliance: Alliance) {
    let amp_end_ns = state.alliance(alliance).amp_end_ns;
    if amp_end_ns == 0 {
        return;
    }

    if state.cur_time_ns > amp_end_ns {
        actions::end_amp_time(state, outbox, alliance);
        return;
    }

    // Zero is shown by end_amp_time once the window has passed
    let cur_secs = ceil_secs(amp_end_ns - state.cur_time_ns);
    if cur_secs == 0 {
        return;
    }

    let prev_secs = ceil_secs(amp_end_ns.saturating_sub(state.prev_time_ns));
    if DeviceOutput::countdown(cur_secs) != DeviceOutput::countdown(prev_secs) {
        actions::set_speaker_amp_display(outbox, alliance, cur_secs);
    }
}

fn log_transition(transition: &ModeTransition) {
    if transition.is_match_end() {
        info!("Match ended");
    } else if transition.is_abort() {
        info!(from = %transition.from, "Period aborted by operator");
    }
    info!(
        from = %transition.from,
        to = %transition.to,
        cause = ?transition.cause,
        "Mode changed"
    );
}

fn apply_transition_effects(state: &mut GameState, outbox: &mut Outbox, transition: &ModeTransition) {
    // No amp window survives the end of a round
    if transition.to == Mode::Setup && transition.from.is_timed() {
        for alliance in Alliance::ALL {
            if state.alliance(alliance).amp_active() {
                actions::end_amp_time(state, outbox, alliance);
            } else {
                actions::set_speaker_amp_display(outbox, alliance, 0);
            }
        }
    }

    actions::update_coopertition_lights(state, outbox);
}
