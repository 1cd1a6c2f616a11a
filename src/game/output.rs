//! Device Output Commands
//!
//! Display codes pushed from the game to field devices, and the per-tick
//! outbox the action layer writes them into.

use std::fmt;

use crate::game::types::{Alliance, FieldElement};

/// Amp high indicator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HighLight {
    /// Fewer than two banked notes
    Off,
    /// Two banked notes, amp can be activated
    On,
    /// Amp window running
    Blinking,
}

/// Amp coopertition indicator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoopertitionLight {
    /// Window closed or not yet relevant
    Unavailable,
    /// Offered by this alliance, or accepted by both
    Lit,
    /// Window open, not yet offered
    Blinking,
}

/// A single display update for one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceOutput {
    /// Amp low indicator (at least one banked note)
    LowLight(bool),
    /// Amp high indicator
    HighLight(HighLight),
    /// Amp coopertition indicator
    Coopertition(CoopertitionLight),
    /// Speaker amp countdown in whole seconds; 10 and above shows `AA`
    AmpCountdown(u8),
}

impl DeviceOutput {
    /// Largest countdown value with its own digit.
    pub const MAX_COUNTDOWN_DIGIT: u8 = 9;

    /// Countdown display for a remaining-seconds value.
    pub fn countdown(seconds: u64) -> Self {
        DeviceOutput::AmpCountdown(seconds.min(10) as u8)
    }
}

impl fmt::Display for DeviceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceOutput::LowLight(on) => f.write_str(if *on { "L1" } else { "L0" }),
            DeviceOutput::HighLight(HighLight::Off) => f.write_str("H0"),
            DeviceOutput::HighLight(HighLight::On) => f.write_str("H1"),
            DeviceOutput::HighLight(HighLight::Blinking) => f.write_str("HB"),
            DeviceOutput::Coopertition(CoopertitionLight::Unavailable) => f.write_str("C0"),
            DeviceOutput::Coopertition(CoopertitionLight::Lit) => f.write_str("C1"),
            DeviceOutput::Coopertition(CoopertitionLight::Blinking) => f.write_str("CB"),
            DeviceOutput::AmpCountdown(secs) if *secs > Self::MAX_COUNTDOWN_DIGIT => f.write_str("AA"),
            DeviceOutput::AmpCountdown(secs) => write!(f, "A{}", secs),
        }
    }
}

/// A display update addressed to a connection slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputCommand {
    /// Target alliance
    pub alliance: Alliance,
    /// Target device kind
    pub element: FieldElement,
    /// What to display
    pub output: DeviceOutput,
}

/// Output commands produced during one tick, in emission order.
#[derive(Debug, Default)]
pub struct Outbox {
    commands: Vec<OutputCommand>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a display update for a slot.
    pub fn push(&mut self, alliance: Alliance, element: FieldElement, output: DeviceOutput) {
        self.commands.push(OutputCommand { alliance, element, output });
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing was queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queued commands in order.
    pub fn commands(&self) -> &[OutputCommand] {
        &self.commands
    }

    /// Wire strings queued for one slot, in order.
    pub fn lines_for(&self, alliance: Alliance, element: FieldElement) -> Vec<String> {
        self.commands
            .iter()
            .filter(|c| c.alliance == alliance && c.element == element)
            .map(|c| c.output.to_string())
            .collect()
    }

    /// Take all queued commands, leaving the outbox empty.
    pub fn take(&mut self) -> Vec<OutputCommand> {
        std::mem::take(&mut self.commands)
    }
}
