//! Differential motor mixing and motor command types.

use core::fmt;

/// Highest speed command a motor accepts.
pub const MAX_MOTOR_SPEED: u8 = 255;

/// Identifier for the two drive motors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MotorId {
    A,
    B,
}

impl MotorId {
    pub const ALL: [MotorId; 2] = [MotorId::A, MotorId::B];
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorId::A => f.write_str("A"),
            MotorId::B => f.write_str("B"),
        }
    }
}

/// H-bridge direction for a single motor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Forward,
    Reverse,
    /// Both bridge inputs high, braking the motor.
    FastStop,
}

/// Direction and speed for one motor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MotorCommand {
    pub direction: Direction,
    pub speed: u8,
}

impl MotorCommand {
    /// Braking command used by the safety cutout.
    pub const FAST_STOP: Self = Self::new(Direction::FastStop, 0);

    #[must_use]
    pub const fn new(direction: Direction, speed: u8) -> Self {
        Self { direction, speed }
    }
}

/// Fixed direction of each motor for forward travel.
///
/// The motors are mounted mirrored, so forward travel needs them to spin in
/// opposite directions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DrivetrainLayout {
    pub a: Direction,
    pub b: Direction,
}

impl DrivetrainLayout {
    #[must_use]
    pub const fn new(a: Direction, b: Direction) -> Self {
        Self { a, b }
    }

    #[must_use]
    pub const fn direction(&self, motor: MotorId) -> Direction {
        match motor {
            MotorId::A => self.a,
            MotorId::B => self.b,
        }
    }
}

impl Default for DrivetrainLayout {
    fn default() -> Self {
        Self::new(Direction::Forward, Direction::Reverse)
    }
}

/// Speed pair produced by [`MotionMixer::mix`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MotorMix {
    pub a: u8,
    pub b: u8,
}

impl MotorMix {
    #[must_use]
    pub const fn new(a: u8, b: u8) -> Self {
        Self { a, b }
    }

    #[must_use]
    pub const fn speed(&self, motor: MotorId) -> u8 {
        match motor {
            MotorId::A => self.a,
            MotorId::B => self.b,
        }
    }

    /// Pairs each speed with the layout direction of its motor.
    #[must_use]
    pub const fn command(&self, layout: &DrivetrainLayout, motor: MotorId) -> MotorCommand {
        MotorCommand::new(layout.direction(motor), self.speed(motor))
    }
}

/// Maps a steering correction onto two wheel speeds.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MotionMixer;

impl MotionMixer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Splits `correction` around the midpoint of `[min_speed, max_speed]`.
    ///
    /// A positive correction slows motor A and speeds motor B. Each output is
    /// clamped into the speed window independently.
    #[must_use]
    pub fn mix(&self, correction: i32, min_speed: u8, max_speed: u8) -> MotorMix {
        let (low, high) = if min_speed <= max_speed {
            (i32::from(min_speed), i32::from(max_speed))
        } else {
            (i32::from(max_speed), i32::from(min_speed))
        };
        let midpoint = (low + high) / 2;
        let a = midpoint.saturating_sub(correction).clamp(low, high);
        let b = midpoint.saturating_add(correction).clamp(low, high);
        MotorMix::new(to_speed(a), to_speed(b))
    }
}

fn to_speed(value: i32) -> u8 {
    u8::try_from(value).unwrap_or(if value < 0 { 0 } else { MAX_MOTOR_SPEED })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_correction_runs_both_at_midpoint() {
        let mix = MotionMixer::new().mix(0, 105, 255);
        assert_eq!(mix, MotorMix::new(180, 180));
    }

    #[test]
    fn correction_splits_around_midpoint() {
        let mix = MotionMixer::new().mix(30, 105, 255);
        assert_eq!(mix, MotorMix::new(150, 210));
    }

    #[test]
    fn large_corrections_clamp_to_window() {
        let mixer = MotionMixer::new();
        assert_eq!(mixer.mix(200, 105, 255), MotorMix::new(105, 255));
        assert_eq!(mixer.mix(-200, 105, 255), MotorMix::new(255, 105));
        assert_eq!(mixer.mix(i32::MAX, 95, 255), MotorMix::new(95, 255));
        assert_eq!(mixer.mix(i32::MIN, 95, 255), MotorMix::new(255, 95));
    }

    #[test]
    fn degenerate_window_pins_both_motors() {
        let mix = MotionMixer::new().mix(40, 255, 255);
        assert_eq!(mix, MotorMix::new(255, 255));
    }

    #[test]
    fn commands_follow_layout() {
        let layout = DrivetrainLayout::default();
        let mix = MotorMix::new(150, 210);
        assert_eq!(
            mix.command(&layout, MotorId::A),
            MotorCommand::new(Direction::Forward, 150)
        );
        assert_eq!(
            mix.command(&layout, MotorId::B),
            MotorCommand::new(Direction::Reverse, 210)
        );
    }
}
