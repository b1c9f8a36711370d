//! Fixed-period control loop: sensors → fusion → PID → mixer → motors.
//!
//! [`ControlLoop::tick`] is written for the high-priority periodic context.
//! It never blocks and never waits on the configuration pass: it reads the
//! [`TuningStore`] once per field, publishes to the [`LiveReadout`], and
//! drives the motors through the [`MotorDriver`] capability.

use core::time::Duration;

use crate::mixer::{
    Direction, DrivetrainLayout, MAX_MOTOR_SPEED, MotionMixer, MotorCommand, MotorId, MotorMix,
};
use crate::pid::{PidController, PidState};
use crate::sensors::{ARRAY_CENTER, SensorFrame, SensorFusion};
use crate::telemetry::{StopReason, TelemetryEvent};
use crate::tuning::{LiveReadout, TuningStore};

/// Nominal control period.
pub const CONTROL_PERIOD: Duration = Duration::from_millis(20);

/// Read-only access to the sensor array.
pub trait LineSensor {
    /// Samples the array with polarity already normalized.
    fn read(&mut self) -> SensorFrame;
}

/// Output capability of the dual motor driver.
pub trait MotorDriver {
    fn set_direction(&mut self, motor: MotorId, direction: Direction);

    /// Enables or disables the PWM output of `motor`.
    fn set_enabled(&mut self, motor: MotorId, enabled: bool);

    /// Sets the duty cycle as `speed / 255` of the PWM period.
    fn set_speed(&mut self, motor: MotorId, speed: u8);

    /// Applies direction and speed together.
    fn apply(&mut self, motor: MotorId, command: MotorCommand) {
        self.set_direction(motor, command.direction);
        self.set_speed(motor, command.speed);
    }

    /// Disables both outputs.
    fn stop_all(&mut self) {
        for motor in MotorId::ALL {
            self.set_enabled(motor, false);
        }
    }
}

/// Static configuration of the control loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControlConfig {
    pub period: Duration,
    pub center: i32,
    pub max_speed: u8,
    /// Frame that trips the safety cutout.
    pub cutout_pattern: SensorFrame,
    pub layout: DrivetrainLayout,
}

impl ControlConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period: CONTROL_PERIOD,
            center: ARRAY_CENTER,
            max_speed: MAX_MOTOR_SPEED,
            cutout_pattern: SensorFrame::SATURATED,
            layout: DrivetrainLayout::new(Direction::Forward, Direction::Reverse),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the loop is driving the motors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DriveState {
    Idle,
    Driving,
}

/// What a tick did to the motors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TickOutcome {
    /// Cutout frame seen; motors braked and the run flag cleared.
    Cutout,
    /// Outputs held disabled.
    Stopped,
    /// Both motors driven with the given commands.
    Driving { a: MotorCommand, b: MotorCommand },
}

/// Summary of one tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickReport {
    pub frame: SensorFrame,
    pub outcome: TickOutcome,
    /// Error fed to the PID, `None` on a cutout tick.
    pub error: Option<i32>,
    pub correction: Option<i32>,
    /// At most one event per tick; a run transition wins over line events.
    pub event: Option<TelemetryEvent>,
}

/// Control loop state owned by the periodic context.
#[derive(Clone, Debug)]
pub struct ControlLoop {
    config: ControlConfig,
    fusion: SensorFusion,
    pid: PidController,
    mixer: MotionMixer,
    state: DriveState,
    last_error: i32,
    line_lost: bool,
}

impl ControlLoop {
    #[must_use]
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            fusion: SensorFusion::new(config.center),
            pid: PidController::default(),
            mixer: MotionMixer::new(),
            state: DriveState::Idle,
            last_error: 0,
            line_lost: false,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> DriveState {
        self.state
    }

    #[must_use]
    pub fn pid_state(&self) -> PidState {
        self.pid.state()
    }

    /// Applies the fixed drivetrain directions and leaves both outputs off.
    ///
    /// Call once before the periodic timer is armed.
    pub fn start<M: MotorDriver + ?Sized>(&mut self, motors: &mut M) {
        for motor in MotorId::ALL {
            motors.set_direction(motor, self.config.layout.direction(motor));
            motors.set_speed(motor, 0);
        }
        motors.stop_all();
        self.state = DriveState::Idle;
    }

    /// Runs one control period.
    pub fn tick<S, M>(
        &mut self,
        store: &TuningStore,
        readout: &LiveReadout,
        sensor: &mut S,
        motors: &mut M,
    ) -> TickReport
    where
        S: LineSensor + ?Sized,
        M: MotorDriver + ?Sized,
    {
        let frame = sensor.read();
        readout.record_frame(frame);

        if frame == self.config.cutout_pattern {
            return self.cutout(frame, store, motors);
        }

        let mut event = self.observe_run_flag(store, motors);

        let fused = self.fusion.fuse(frame);
        let error = fused.error_or(self.last_error);
        // A run transition takes the report slot; the line change is
        // latched only once reported, so it goes out on the next tick.
        if fused.is_lost() != self.line_lost && event.is_none() {
            self.line_lost = fused.is_lost();
            event = Some(if self.line_lost {
                TelemetryEvent::LineLost
            } else {
                TelemetryEvent::LineReacquired
            });
        }
        self.last_error = error;
        readout.record_error(error, fused.is_lost());

        // The controller keeps integrating while idle so the readout stays live.
        self.pid.set_gains(store.gains());
        let correction = self.pid.update(error);

        let outcome = match self.state {
            DriveState::Driving => {
                let mix = self
                    .mixer
                    .mix(correction, store.min_speed(), self.config.max_speed);
                readout.record_speeds(mix);
                self.drive(mix, motors)
            }
            DriveState::Idle => {
                motors.stop_all();
                TickOutcome::Stopped
            }
        };

        TickReport {
            frame,
            outcome,
            error: Some(error),
            correction: Some(correction),
            event,
        }
    }

    fn observe_run_flag<M>(&mut self, store: &TuningStore, motors: &mut M) -> Option<TelemetryEvent>
    where
        M: MotorDriver + ?Sized,
    {
        match (self.state, store.is_running()) {
            (DriveState::Idle, true) => {
                for motor in MotorId::ALL {
                    motors.set_direction(motor, self.config.layout.direction(motor));
                    motors.set_enabled(motor, true);
                }
                self.state = DriveState::Driving;
                Some(TelemetryEvent::RunStarted)
            }
            (DriveState::Driving, false) => {
                self.state = DriveState::Idle;
                Some(TelemetryEvent::RunStopped(StopReason::Operator))
            }
            _ => None,
        }
    }

    fn drive<M>(&self, mix: MotorMix, motors: &mut M) -> TickOutcome
    where
        M: MotorDriver + ?Sized,
    {
        let a = mix.command(&self.config.layout, MotorId::A);
        let b = mix.command(&self.config.layout, MotorId::B);
        motors.apply(MotorId::A, a);
        motors.apply(MotorId::B, b);
        TickOutcome::Driving { a, b }
    }

    fn cutout<M>(&mut self, frame: SensorFrame, store: &TuningStore, motors: &mut M) -> TickReport
    where
        M: MotorDriver + ?Sized,
    {
        let was_requested = store.force_stop();
        let was_driving = self.state == DriveState::Driving;
        for motor in MotorId::ALL {
            motors.apply(motor, MotorCommand::FAST_STOP);
        }
        motors.stop_all();
        self.state = DriveState::Idle;

        TickReport {
            frame,
            outcome: TickOutcome::Cutout,
            error: None,
            correction: None,
            event: (was_requested || was_driving)
                .then_some(TelemetryEvent::RunStopped(StopReason::SafetyCutout)),
        }
    }
}

impl Default for ControlLoop {
    fn default() -> Self {
        Self::new(ControlConfig::default())
    }
}
