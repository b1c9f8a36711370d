//! Operator-adjustable parameters shared between the two execution contexts.
//!
//! Every field is its own atomic at its natural width and no operation spans
//! more than one field, so no lock is needed. Ownership per field:
//!
//! | field            | writer                                  | reader        |
//! |------------------|-----------------------------------------|---------------|
//! | gains, min speed | configuration pass                      | control tick  |
//! | selection        | configuration pass                      | configuration |
//! | run flag         | configuration pass (toggle), control    | both          |
//! |                  | tick (safety cutout, store `false` only)|               |
//!
//! [`LiveReadout`] goes the other way: written by the control tick, read by
//! the display. A reader may see a value that is one tick stale.

use core::fmt;

use portable_atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use crate::mixer::MotorMix;
use crate::pid::PidGains;
use crate::sensors::SensorFrame;

/// Power-on proportional gain.
pub const DEFAULT_KP: u8 = 4;
/// Power-on integral gain.
pub const DEFAULT_KI: u8 = 0;
/// Power-on derivative gain.
pub const DEFAULT_KD: u8 = 1;
/// Power-on minimum motor speed.
pub const DEFAULT_MIN_SPEED: u8 = 105;
/// Motor speed shown before the first driving tick.
pub const INITIAL_DISPLAY_SPEED: u8 = 180;

/// Bounds and step for gain edits.
pub const GAIN_BOUNDS: ParameterBounds = ParameterBounds::new(0, 255, 1);
/// Bounds and step for minimum-speed edits. The floor keeps the motors above
/// their stall duty cycle.
pub const MIN_SPEED_BOUNDS: ParameterBounds = ParameterBounds::new(95, 255, 5);

/// Inclusive range and step size for one tunable field.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParameterBounds {
    pub min: u8,
    pub max: u8,
    pub step: u8,
}

impl ParameterBounds {
    #[must_use]
    pub const fn new(min: u8, max: u8, step: u8) -> Self {
        Self { min, max, step }
    }

    /// One step up, stopping at `max`.
    #[must_use]
    pub const fn increment(&self, value: u8) -> u8 {
        let next = value.saturating_add(self.step);
        if next > self.max { self.max } else { next }
    }

    /// One step down, stopping at `min`.
    #[must_use]
    pub const fn decrement(&self, value: u8) -> u8 {
        let next = value.saturating_sub(self.step);
        if next < self.min { self.min } else { next }
    }

    #[must_use]
    pub const fn clamp(&self, value: u8) -> u8 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

/// Menu entry selected with the `SelectNext` button.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Parameter {
    Proportional,
    Integral,
    Derivative,
    MinSpeed,
    SensorCalibration,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::Proportional,
        Parameter::Integral,
        Parameter::Derivative,
        Parameter::MinSpeed,
        Parameter::SensorCalibration,
    ];

    /// Next entry in the menu cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Parameter::Proportional => Parameter::Integral,
            Parameter::Integral => Parameter::Derivative,
            Parameter::Derivative => Parameter::MinSpeed,
            Parameter::MinSpeed => Parameter::SensorCalibration,
            Parameter::SensorCalibration => Parameter::Proportional,
        }
    }

    /// Edit bounds, or `None` for view-only entries.
    #[must_use]
    pub const fn bounds(self) -> Option<ParameterBounds> {
        match self {
            Parameter::Proportional | Parameter::Integral | Parameter::Derivative => {
                Some(GAIN_BOUNDS)
            }
            Parameter::MinSpeed => Some(MIN_SPEED_BOUNDS),
            Parameter::SensorCalibration => None,
        }
    }

    /// Short tag used in logs and by the emulator.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Parameter::Proportional => "kp",
            Parameter::Integral => "ki",
            Parameter::Derivative => "kd",
            Parameter::MinSpeed => "min-speed",
            Parameter::SensorCalibration => "sensors",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Parameter::ALL
            .into_iter()
            .find(|parameter| parameter.tag().eq_ignore_ascii_case(tag))
    }

    const fn to_raw(self) -> u8 {
        match self {
            Parameter::Proportional => 0,
            Parameter::Integral => 1,
            Parameter::Derivative => 2,
            Parameter::MinSpeed => 3,
            Parameter::SensorCalibration => 4,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Parameter::Integral,
            2 => Parameter::Derivative,
            3 => Parameter::MinSpeed,
            4 => Parameter::SensorCalibration,
            _ => Parameter::Proportional,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Plain copy of the tunable values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TuningParameters {
    pub gains: PidGains,
    pub min_speed: u8,
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            gains: PidGains::new(DEFAULT_KP, DEFAULT_KI, DEFAULT_KD),
            min_speed: DEFAULT_MIN_SPEED,
        }
    }
}

/// Shared tuning fields plus the run flag and menu selection.
#[derive(Debug)]
pub struct TuningStore {
    kp: AtomicU8,
    ki: AtomicU8,
    kd: AtomicU8,
    min_speed: AtomicU8,
    running: AtomicBool,
    selected: AtomicU8,
}

impl TuningStore {
    /// Store holding the power-on defaults, usable in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kp: AtomicU8::new(DEFAULT_KP),
            ki: AtomicU8::new(DEFAULT_KI),
            kd: AtomicU8::new(DEFAULT_KD),
            min_speed: AtomicU8::new(DEFAULT_MIN_SPEED),
            running: AtomicBool::new(false),
            selected: AtomicU8::new(Parameter::Proportional.to_raw()),
        }
    }

    /// Store seeded with `parameters`, each clamped into its bounds.
    #[must_use]
    pub fn with_parameters(parameters: TuningParameters) -> Self {
        let store = Self::new();
        store.kp.store(GAIN_BOUNDS.clamp(parameters.gains.kp), Ordering::Relaxed);
        store.ki.store(GAIN_BOUNDS.clamp(parameters.gains.ki), Ordering::Relaxed);
        store.kd.store(GAIN_BOUNDS.clamp(parameters.gains.kd), Ordering::Relaxed);
        store
            .min_speed
            .store(MIN_SPEED_BOUNDS.clamp(parameters.min_speed), Ordering::Relaxed);
        store
    }

    /// Reads the gains field by field.
    #[must_use]
    pub fn gains(&self) -> PidGains {
        PidGains::new(
            self.kp.load(Ordering::Relaxed),
            self.ki.load(Ordering::Relaxed),
            self.kd.load(Ordering::Relaxed),
        )
    }

    #[must_use]
    pub fn min_speed(&self) -> u8 {
        self.min_speed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn parameters(&self) -> TuningParameters {
        TuningParameters {
            gains: self.gains(),
            min_speed: self.min_speed(),
        }
    }

    /// Current value of a tunable entry, `None` for view-only entries.
    #[must_use]
    pub fn value(&self, parameter: Parameter) -> Option<u8> {
        self.field(parameter).map(|field| field.load(Ordering::Relaxed))
    }

    /// Moves `parameter` one step up within its bounds and returns the new value.
    pub fn increment(&self, parameter: Parameter) -> Option<u8> {
        let bounds = parameter.bounds()?;
        let field = self.field(parameter)?;
        let next = bounds.increment(field.load(Ordering::Relaxed));
        field.store(next, Ordering::Relaxed);
        Some(next)
    }

    /// Moves `parameter` one step down within its bounds and returns the new value.
    pub fn decrement(&self, parameter: Parameter) -> Option<u8> {
        let bounds = parameter.bounds()?;
        let field = self.field(parameter)?;
        let next = bounds.decrement(field.load(Ordering::Relaxed));
        field.store(next, Ordering::Relaxed);
        Some(next)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Flips the run flag and returns the new value.
    pub fn toggle_running(&self) -> bool {
        !self.running.fetch_not(Ordering::Relaxed)
    }

    /// Clears the run flag from the control tick. Returns the previous value.
    pub fn force_stop(&self) -> bool {
        self.running.swap(false, Ordering::Relaxed)
    }

    #[must_use]
    pub fn selected(&self) -> Parameter {
        Parameter::from_raw(self.selected.load(Ordering::Relaxed))
    }

    /// Advances the menu selection and returns the new entry.
    pub fn select_next(&self) -> Parameter {
        let next = self.selected().next();
        self.selected.store(next.to_raw(), Ordering::Relaxed);
        next
    }

    fn field(&self, parameter: Parameter) -> Option<&AtomicU8> {
        match parameter {
            Parameter::Proportional => Some(&self.kp),
            Parameter::Integral => Some(&self.ki),
            Parameter::Derivative => Some(&self.kd),
            Parameter::MinSpeed => Some(&self.min_speed),
            Parameter::SensorCalibration => None,
        }
    }
}

impl Default for TuningStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Values published by the control tick for display.
#[derive(Debug)]
pub struct LiveReadout {
    frame: AtomicU8,
    error: AtomicI32,
    speed_a: AtomicU8,
    speed_b: AtomicU8,
    line_lost: AtomicBool,
}

impl LiveReadout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame: AtomicU8::new(0),
            error: AtomicI32::new(0),
            speed_a: AtomicU8::new(INITIAL_DISPLAY_SPEED),
            speed_b: AtomicU8::new(INITIAL_DISPLAY_SPEED),
            line_lost: AtomicBool::new(false),
        }
    }

    pub fn record_frame(&self, frame: SensorFrame) {
        self.frame.store(frame.bits(), Ordering::Relaxed);
    }

    pub fn record_error(&self, error: i32, line_lost: bool) {
        self.error.store(error, Ordering::Relaxed);
        self.line_lost.store(line_lost, Ordering::Relaxed);
    }

    pub fn record_speeds(&self, mix: MotorMix) {
        self.speed_a.store(mix.a, Ordering::Relaxed);
        self.speed_b.store(mix.b, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> ReadoutSnapshot {
        ReadoutSnapshot {
            frame: SensorFrame::from_bits(self.frame.load(Ordering::Relaxed)),
            error: self.error.load(Ordering::Relaxed),
            speeds: MotorMix::new(
                self.speed_a.load(Ordering::Relaxed),
                self.speed_b.load(Ordering::Relaxed),
            ),
            line_lost: self.line_lost.load(Ordering::Relaxed),
        }
    }
}

impl Default for LiveReadout {
    fn default() -> Self {
        Self::new()
    }
}

/// Field-by-field copy of [`LiveReadout`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReadoutSnapshot {
    pub frame: SensorFrame,
    pub error: i32,
    pub speeds: MotorMix,
    pub line_lost: bool,
}
