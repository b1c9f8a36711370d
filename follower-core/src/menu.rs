//! Cooperative configuration state machine driven by the button panel.
//!
//! One [`ConfigStateMachine::pass`] runs per foreground iteration: sample the
//! buttons, apply at most one edit to the [`TuningStore`], and render the
//! status screen. Edits are only accepted while the robot is stopped; the run
//! toggle is accepted in both states.

use core::time::Duration;

use crate::buttons::{Button, ButtonActivity, ButtonInput, ButtonTracker, RepeatDivider};
use crate::display::{Screen, TextDisplay, render};
use crate::telemetry::{StopReason, TelemetryEvent};
use crate::tuning::{LiveReadout, TuningStore};

/// Passes between menu advances while `SelectNext` is held.
pub const SELECT_REPEAT_PASSES: u32 = 10;
/// Passes between edits while Increment or Decrement is held.
pub const ADJUST_REPEAT_PASSES: u32 = 5;
/// Delay between foreground passes.
pub const MENU_PERIOD: Duration = Duration::from_millis(20);

/// Repeat cadence and pacing of the configuration pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MenuConfig {
    pub select_divider: RepeatDivider,
    pub adjust_divider: RepeatDivider,
    pub period: Duration,
}

impl MenuConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            select_divider: RepeatDivider::new(SELECT_REPEAT_PASSES),
            adjust_divider: RepeatDivider::new(ADJUST_REPEAT_PASSES),
            period: MENU_PERIOD,
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PassReport {
    pub activity: ButtonActivity,
    pub event: Option<TelemetryEvent>,
    pub screen: Screen,
}

/// Foreground state machine.
#[derive(Clone, Debug, Default)]
pub struct ConfigStateMachine {
    config: MenuConfig,
    tracker: ButtonTracker,
}

impl ConfigStateMachine {
    #[must_use]
    pub const fn new(config: MenuConfig) -> Self {
        Self {
            config,
            tracker: ButtonTracker::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &MenuConfig {
        &self.config
    }

    /// Passes the current press has been held for.
    #[must_use]
    pub const fn held_passes(&self) -> u32 {
        self.tracker.held_passes()
    }

    /// Samples the panel, applies any edit, and redraws the display.
    pub fn pass<B, D>(
        &mut self,
        store: &TuningStore,
        readout: &LiveReadout,
        buttons: &mut B,
        display: &mut D,
    ) -> PassReport
    where
        B: ButtonInput + ?Sized,
        D: TextDisplay + ?Sized,
    {
        let activity = self.tracker.observe(buttons.sample());
        let event = self.apply(&activity, store);

        let screen = render(store, &readout.snapshot());
        screen.draw(display);

        PassReport {
            activity,
            event,
            screen,
        }
    }

    fn apply(&self, activity: &ButtonActivity, store: &TuningStore) -> Option<TelemetryEvent> {
        if activity.is_new_press(Button::ToggleRun) {
            return Some(if store.toggle_running() {
                TelemetryEvent::RunStarted
            } else {
                TelemetryEvent::RunStopped(StopReason::Operator)
            });
        }

        if store.is_running() {
            return None;
        }

        if activity.repeats(Button::SelectNext, self.config.select_divider) {
            return Some(TelemetryEvent::SelectionChanged(store.select_next()));
        }

        let parameter = store.selected();
        let value = if activity.repeats(Button::Increment, self.config.adjust_divider) {
            store.increment(parameter)
        } else if activity.repeats(Button::Decrement, self.config.adjust_divider) {
            store.decrement(parameter)
        } else {
            None
        }?;

        Some(TelemetryEvent::ParameterChanged { parameter, value })
    }
}
