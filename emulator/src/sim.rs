//! Kinematic stand-in for the robot on a track.
//!
//! The plant is one dimensional: the position of the line under the sensor
//! array, measured in sensor indices. A speed difference between the wheels
//! turns the robot and moves the line across the array; a constant drift
//! models a curve in the track.

use std::time::Duration;

use follower_core::control::{LineSensor, MotorDriver};
use follower_core::mixer::{Direction, DrivetrainLayout, MotorId};
use follower_core::sensors::{ARRAY_CENTER, SENSOR_COUNT, SensorFrame};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackConfig {
    /// Line travel in sensor indices per second, per unit of wheel speed
    /// difference.
    pub steering_gain: f32,
    /// Line travel in sensor indices per second with both wheels matched.
    pub drift: f32,
    /// Width of the tape in sensor indices.
    pub line_width: f32,
    /// Where the line starts under the array.
    pub start_position: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            steering_gain: 0.05,
            drift: 0.0,
            line_width: 1.2,
            start_position: center(),
        }
    }
}

fn center() -> f32 {
    i16::try_from(ARRAY_CENTER).map_or(3.0, f32::from)
}

/// Sensor side of the plant.
#[derive(Clone, Debug)]
pub struct Track {
    config: TrackConfig,
    line_position: f32,
    fixed: Option<SensorFrame>,
    lifted: bool,
}

impl Track {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            line_position: config.start_position,
            fixed: None,
            lifted: false,
        }
    }

    pub fn line_position(&self) -> f32 {
        self.line_position
    }

    #[cfg(test)]
    pub fn set_line_position(&mut self, position: f32) {
        self.line_position = position;
    }

    /// Pins the array to `frame` until cleared with `None`.
    pub fn fix_frame(&mut self, frame: Option<SensorFrame>) {
        self.fixed = frame;
    }

    pub fn fixed_frame(&self) -> Option<SensorFrame> {
        self.fixed
    }

    pub fn set_lifted(&mut self, lifted: bool) {
        self.lifted = lifted;
    }

    pub fn is_lifted(&self) -> bool {
        self.lifted
    }

    /// Frame the array would report right now.
    pub fn frame(&self) -> SensorFrame {
        // Off the ground every channel sees the same dark surface.
        if self.lifted {
            return SensorFrame::SATURATED;
        }
        if let Some(frame) = self.fixed {
            return frame;
        }
        let half_width = self.config.line_width / 2.0;
        let bits = (0..SENSOR_COUNT)
            .filter(|index| (f32::from(*index) - self.line_position).abs() <= half_width)
            .fold(0u8, |bits, index| bits | (1 << index));
        SensorFrame::from_bits(bits)
    }

    fn advance(&mut self, wheels: &Wheels, elapsed: Duration) {
        if self.lifted {
            return;
        }
        let difference = wheels.velocity(MotorId::B) - wheels.velocity(MotorId::A);
        let rate = self.config.drift - self.config.steering_gain * difference;
        let limit = f32::from(SENSOR_COUNT) + 1.0;
        self.line_position =
            (self.line_position + rate * elapsed.as_secs_f32()).clamp(-2.0, limit);
    }
}

impl LineSensor for Track {
    fn read(&mut self) -> SensorFrame {
        self.frame()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WheelOutput {
    pub direction: Direction,
    pub enabled: bool,
    pub speed: u8,
}

/// Motor side of the plant.
#[derive(Clone, Debug)]
pub struct Wheels {
    layout: DrivetrainLayout,
    outputs: [WheelOutput; 2],
}

impl Wheels {
    pub fn new(layout: DrivetrainLayout) -> Self {
        let idle = WheelOutput {
            direction: Direction::FastStop,
            enabled: false,
            speed: 0,
        };
        Self {
            layout,
            outputs: [idle; 2],
        }
    }

    pub fn output(&self, motor: MotorId) -> WheelOutput {
        self.outputs[slot(motor)]
    }

    /// Signed ground speed: positive drives the robot forward.
    pub fn velocity(&self, motor: MotorId) -> f32 {
        let output = self.output(motor);
        if !output.enabled || output.direction == Direction::FastStop {
            return 0.0;
        }
        let speed = f32::from(output.speed);
        if output.direction == self.layout.direction(motor) {
            speed
        } else {
            -speed
        }
    }
}

const fn slot(motor: MotorId) -> usize {
    match motor {
        MotorId::A => 0,
        MotorId::B => 1,
    }
}

impl MotorDriver for Wheels {
    fn set_direction(&mut self, motor: MotorId, direction: Direction) {
        self.outputs[slot(motor)].direction = direction;
    }

    fn set_enabled(&mut self, motor: MotorId, enabled: bool) {
        self.outputs[slot(motor)].enabled = enabled;
    }

    fn set_speed(&mut self, motor: MotorId, speed: u8) {
        self.outputs[slot(motor)].speed = speed;
    }
}

/// Both halves of the plant. They are separate fields so the control loop
/// can borrow the sensor and the motors at the same time.
#[derive(Clone, Debug)]
pub struct SimRobot {
    pub track: Track,
    pub wheels: Wheels,
}

impl SimRobot {
    pub fn new(layout: DrivetrainLayout, config: TrackConfig) -> Self {
        Self {
            track: Track::new(config),
            wheels: Wheels::new(layout),
        }
    }

    /// Integrates the plant over one period.
    pub fn advance(&mut self, elapsed: Duration) {
        self.track.advance(&self.wheels, elapsed);
    }
}
