#![allow(dead_code)]

use std::collections::VecDeque;

use follower_core::buttons::{Button, ButtonInput, ButtonMask};
use follower_core::control::{LineSensor, MotorDriver};
use follower_core::display::TextDisplay;
use follower_core::mixer::{Direction, MotorId};
use follower_core::sensors::SensorFrame;

/// Sensor that replays queued frames and then repeats the last one.
pub struct ScriptedSensor {
    frames: VecDeque<SensorFrame>,
    last: SensorFrame,
}

impl ScriptedSensor {
    pub fn new(initial: u8) -> Self {
        Self {
            frames: VecDeque::new(),
            last: SensorFrame::from_bits(initial),
        }
    }

    pub fn queue(&mut self, bits: u8) {
        self.frames.push_back(SensorFrame::from_bits(bits));
    }

    pub fn hold(&mut self, bits: u8) {
        self.frames.clear();
        self.last = SensorFrame::from_bits(bits);
    }
}

impl LineSensor for ScriptedSensor {
    fn read(&mut self) -> SensorFrame {
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        self.last
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MotorCall {
    Direction(MotorId, Direction),
    Enabled(MotorId, bool),
    Speed(MotorId, u8),
}

/// Records every call and tracks the resulting output state.
#[derive(Default)]
pub struct RecordingMotors {
    pub calls: Vec<MotorCall>,
    pub enabled: [bool; 2],
    pub speed: [u8; 2],
    pub direction: [Option<Direction>; 2],
}

fn slot(motor: MotorId) -> usize {
    match motor {
        MotorId::A => 0,
        MotorId::B => 1,
    }
}

impl RecordingMotors {
    pub fn is_enabled(&self, motor: MotorId) -> bool {
        self.enabled[slot(motor)]
    }

    pub fn speed(&self, motor: MotorId) -> u8 {
        self.speed[slot(motor)]
    }

    pub fn direction(&self, motor: MotorId) -> Option<Direction> {
        self.direction[slot(motor)]
    }

    pub fn take_calls(&mut self) -> Vec<MotorCall> {
        std::mem::take(&mut self.calls)
    }
}

impl MotorDriver for RecordingMotors {
    fn set_direction(&mut self, motor: MotorId, direction: Direction) {
        self.direction[slot(motor)] = Some(direction);
        self.calls.push(MotorCall::Direction(motor, direction));
    }

    fn set_enabled(&mut self, motor: MotorId, enabled: bool) {
        self.enabled[slot(motor)] = enabled;
        self.calls.push(MotorCall::Enabled(motor, enabled));
    }

    fn set_speed(&mut self, motor: MotorId, speed: u8) {
        self.speed[slot(motor)] = speed;
        self.calls.push(MotorCall::Speed(motor, speed));
    }
}

/// Button panel driven by the test, one sample per pass.
#[derive(Default)]
pub struct PanelScript {
    samples: VecDeque<ButtonMask>,
}

impl PanelScript {
    pub fn press(&mut self, button: Button, passes: usize) -> &mut Self {
        for _ in 0..passes {
            self.samples.push_back(ButtonMask::only(button));
        }
        self
    }

    pub fn release(&mut self, passes: usize) -> &mut Self {
        for _ in 0..passes {
            self.samples.push_back(ButtonMask::NONE);
        }
        self
    }

    pub fn chord(&mut self, mask: ButtonMask, passes: usize) -> &mut Self {
        for _ in 0..passes {
            self.samples.push_back(mask);
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl ButtonInput for PanelScript {
    fn sample(&mut self) -> ButtonMask {
        self.samples.pop_front().unwrap_or(ButtonMask::NONE)
    }
}

/// Display that only counts redraws.
#[derive(Default)]
pub struct NullDisplay {
    pub clears: usize,
}

impl TextDisplay for NullDisplay {
    fn clear(&mut self) {
        self.clears += 1;
    }

    fn set_cursor(&mut self, _: u8, _: u8) {}

    fn write_char(&mut self, _: char) {}
}
