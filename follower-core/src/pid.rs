//! Integer PID controller for steering.
//!
//! Works in `no_std` and does not allocate memory. The integral term is
//! deliberately left unclamped: windup carried across run/stop transitions
//! is part of the robot's tuned behaviour and is never reset implicitly.

/// Proportional, integral and derivative gains.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PidGains {
    pub kp: u8,
    pub ki: u8,
    pub kd: u8,
}

impl PidGains {
    #[must_use]
    pub const fn new(kp: u8, ki: u8, kd: u8) -> Self {
        Self { kp, ki, kd }
    }
}

/// Running state carried between updates.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PidState {
    /// Sum of every `ki * error` applied so far.
    ///
    /// 64 bits: at the worst case of 255 * 4 per tick and 50 ticks per second
    /// a 32-bit sum would overflow after roughly twelve hours of running.
    pub integral: i64,
    /// Error passed to the previous update.
    pub last_error: i32,
}

/// Terms of the most recent update.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PidTerms {
    pub proportional: i64,
    pub integral: i64,
    pub derivative: i64,
}

impl PidTerms {
    /// Sum of the three terms, saturated to `i32`.
    #[must_use]
    pub fn correction(&self) -> i32 {
        let sum = self
            .proportional
            .saturating_add(self.integral)
            .saturating_add(self.derivative);
        i32::try_from(sum).unwrap_or(if sum < 0 { i32::MIN } else { i32::MAX })
    }
}

/// Stateful PID controller.
#[derive(Clone, Debug, Default)]
pub struct PidController {
    gains: PidGains,
    state: PidState,
    terms: PidTerms,
}

impl PidController {
    /// Creates a controller with zeroed state.
    #[must_use]
    pub const fn new(gains: PidGains) -> Self {
        Self {
            gains,
            state: PidState {
                integral: 0,
                last_error: 0,
            },
            terms: PidTerms {
                proportional: 0,
                integral: 0,
                derivative: 0,
            },
        }
    }

    /// Replaces the gains without touching the accumulated state.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    #[must_use]
    pub const fn gains(&self) -> PidGains {
        self.gains
    }

    #[must_use]
    pub const fn state(&self) -> PidState {
        self.state
    }

    /// Terms computed by the last call to [`PidController::update`].
    #[must_use]
    pub const fn terms(&self) -> PidTerms {
        self.terms
    }

    /// Feeds one error sample and returns the signed correction.
    pub fn update(&mut self, error: i32) -> i32 {
        let error = i64::from(error);
        let kp = i64::from(self.gains.kp);
        let ki = i64::from(self.gains.ki);
        let kd = i64::from(self.gains.kd);

        let proportional = kp * error;
        self.state.integral = self.state.integral.saturating_add(ki * error);
        let derivative = kd * (error - i64::from(self.state.last_error));
        // `error` came from an i32.
        self.state.last_error = i32::try_from(error).unwrap_or_default();

        self.terms = PidTerms {
            proportional,
            integral: self.state.integral,
            derivative,
        };
        self.terms.correction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_only_scales_error() {
        let mut pid = PidController::new(PidGains::new(7, 0, 0));
        assert_eq!(pid.update(3), 21);
        assert_eq!(pid.update(-2), -14);
        assert_eq!(pid.state().integral, 0);
    }

    #[test]
    fn integral_accumulates_without_clamp() {
        let mut pid = PidController::new(PidGains::new(0, 255, 0));
        let mut last = 0;
        for _ in 0..1_000 {
            last = pid.update(4);
        }
        assert_eq!(pid.state().integral, 255 * 4 * 1_000);
        assert_eq!(last, 1_020_000);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let mut pid = PidController::new(PidGains::new(0, 0, 5));
        assert_eq!(pid.update(2), 10);
        assert_eq!(pid.update(2), 0);
        assert_eq!(pid.update(-1), -15);
        assert_eq!(pid.state().last_error, -1);
    }

    #[test]
    fn gain_changes_keep_state() {
        let mut pid = PidController::new(PidGains::new(1, 1, 0));
        pid.update(3);
        pid.set_gains(PidGains::new(0, 0, 0));
        assert_eq!(pid.state().integral, 3);
        assert_eq!(pid.update(1), 3);
    }

    #[test]
    fn terms_expose_breakdown() {
        let mut pid = PidController::new(PidGains::new(2, 1, 3));
        pid.update(4);
        let terms = pid.terms();
        assert_eq!(terms.proportional, 8);
        assert_eq!(terms.integral, 4);
        assert_eq!(terms.derivative, 12);
        assert_eq!(terms.correction(), 24);
    }
}
