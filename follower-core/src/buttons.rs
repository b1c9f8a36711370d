//! Button sampling, edge detection and held-press repeat.
//!
//! Buttons are sampled once per configuration pass as a level bitmask. The
//! tracker turns successive samples into [`ButtonActivity`]: which single
//! button is held, how many passes it has been held for, and whether this
//! pass is a new press.

/// Logical buttons on the operator panel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    SelectNext,
    Decrement,
    Increment,
    ToggleRun,
}

impl Button {
    pub const ALL: [Button; 4] = [
        Button::SelectNext,
        Button::Decrement,
        Button::Increment,
        Button::ToggleRun,
    ];

    /// Bit assigned to the button within a [`ButtonMask`].
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Button::SelectNext => 1 << 0,
            Button::Decrement => 1 << 1,
            Button::Increment => 1 << 2,
            Button::ToggleRun => 1 << 3,
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Button::SelectNext => "select",
            Button::Decrement => "dec",
            Button::Increment => "inc",
            Button::ToggleRun => "run",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Button::ALL
            .into_iter()
            .find(|button| button.tag().eq_ignore_ascii_case(tag))
    }
}

/// Pressed-state bitmask restricted to the four logical buttons.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ButtonMask(u8);

impl ButtonMask {
    pub const NONE: Self = Self(0);
    const VALID: u8 = 0x0F;

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::VALID)
    }

    #[must_use]
    pub const fn only(button: Button) -> Self {
        Self(button.bit())
    }

    #[must_use]
    pub const fn with(self, button: Button) -> Self {
        Self(self.0 | button.bit())
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    /// The pressed button when exactly one is down.
    #[must_use]
    pub fn single(self) -> Option<Button> {
        if self.0.count_ones() != 1 {
            return None;
        }
        Button::ALL.into_iter().find(|button| self.contains(*button))
    }

    /// Bits that differ from `previous`.
    #[must_use]
    pub const fn changed_since(self, previous: ButtonMask) -> ButtonMask {
        ButtonMask(self.0 ^ previous.0)
    }
}

/// Read-only level sampling of the button panel.
pub trait ButtonInput {
    /// Returns the buttons currently held down.
    fn sample(&mut self) -> ButtonMask;
}

/// Repeat cadence for a held button.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RepeatDivider(u32);

impl RepeatDivider {
    /// Divider of zero is treated as one (fire every pass).
    #[must_use]
    pub const fn new(passes: u32) -> Self {
        Self(if passes == 0 { 1 } else { passes })
    }

    #[must_use]
    pub const fn passes(self) -> u32 {
        self.0
    }

    /// Fires on the first held pass and every `passes` passes after it.
    #[must_use]
    pub const fn fires(self, held_passes: u32) -> bool {
        held_passes % self.0 == 1 % self.0
    }
}

/// What one pass observed on the panel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonActivity {
    pub sample: ButtonMask,
    pub changed: ButtonMask,
    /// The single button held this pass, if exactly one is down.
    pub held: Option<Button>,
    /// Passes the current press has lasted, counting this one.
    pub held_passes: u32,
}

impl ButtonActivity {
    /// Returns `true` when `button` alone is down and this pass differs from
    /// the previous sample.
    #[must_use]
    pub fn is_new_press(&self, button: Button) -> bool {
        self.held == Some(button) && !self.changed.is_empty()
    }

    /// Returns `true` when `button` is held and the repeat divider lets it fire.
    #[must_use]
    pub fn repeats(&self, button: Button, divider: RepeatDivider) -> bool {
        self.held == Some(button) && divider.fires(self.held_passes)
    }
}

/// Tracks samples across passes.
#[derive(Clone, Debug, Default)]
pub struct ButtonTracker {
    last: ButtonMask,
    held_passes: u32,
}

impl ButtonTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: ButtonMask::NONE,
            held_passes: 0,
        }
    }

    /// Consumes one sample.
    ///
    /// The held counter grows while a single adjustment button stays down and
    /// resets on any other pattern: nothing pressed, several buttons, or the
    /// run toggle, which only reacts to edges.
    pub fn observe(&mut self, sample: ButtonMask) -> ButtonActivity {
        let changed = sample.changed_since(self.last);
        let held = sample.single();
        self.held_passes = match held {
            Some(Button::ToggleRun) | None => 0,
            Some(_) => self.held_passes.saturating_add(1),
        };
        self.last = sample;

        ButtonActivity {
            sample,
            changed,
            held,
            held_passes: self.held_passes,
        }
    }

    #[must_use]
    pub const fn held_passes(&self) -> u32 {
        self.held_passes
    }

    #[must_use]
    pub const fn last_sample(&self) -> ButtonMask {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_ignores_bits_outside_the_panel() {
        assert_eq!(ButtonMask::from_bits(0xF4).bits(), 0x04);
    }

    #[test]
    fn single_requires_exactly_one_button() {
        assert_eq!(ButtonMask::NONE.single(), None);
        assert_eq!(
            ButtonMask::only(Button::Increment).single(),
            Some(Button::Increment)
        );
        let chord = ButtonMask::only(Button::Increment).with(Button::Decrement);
        assert_eq!(chord.single(), None);
    }

    #[test]
    fn divider_fires_on_first_pass_then_every_interval() {
        let divider = RepeatDivider::new(5);
        let fired: heapless::Vec<u32, 8> = (1..=16).filter(|pass| divider.fires(*pass)).collect();
        assert_eq!(fired.as_slice(), &[1, 6, 11, 16]);
        assert!(RepeatDivider::new(0).fires(3));
        assert!(RepeatDivider::new(1).fires(1));
    }

    #[test]
    fn held_counter_resets_on_release_and_chords() {
        let mut tracker = ButtonTracker::new();
        let inc = ButtonMask::only(Button::Increment);
        assert_eq!(tracker.observe(inc).held_passes, 1);
        assert_eq!(tracker.observe(inc).held_passes, 2);
        assert_eq!(tracker.observe(ButtonMask::NONE).held_passes, 0);
        assert_eq!(tracker.observe(inc).held_passes, 1);
        assert_eq!(tracker.observe(inc.with(Button::SelectNext)).held_passes, 0);
    }

    #[test]
    fn run_button_reports_a_single_new_press() {
        let mut tracker = ButtonTracker::new();
        let run = ButtonMask::only(Button::ToggleRun);
        assert!(tracker.observe(run).is_new_press(Button::ToggleRun));
        assert!(!tracker.observe(run).is_new_press(Button::ToggleRun));
        assert!(!tracker.observe(run).is_new_press(Button::ToggleRun));
        assert!(!tracker.observe(ButtonMask::NONE).is_new_press(Button::ToggleRun));
        assert!(tracker.observe(run).is_new_press(Button::ToggleRun));
        assert_eq!(tracker.held_passes(), 0);
    }

    #[test]
    fn tags_resolve_to_buttons() {
        assert_eq!(Button::from_tag("INC"), Some(Button::Increment));
        assert_eq!(Button::from_tag("run"), Some(Button::ToggleRun));
        assert_eq!(Button::from_tag("stop"), None);
    }
}
