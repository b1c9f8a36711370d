//! Board wiring for the STM32G0B1 line follower.
//!
//! | Function                   | Pins                       | Notes                      |
//! |----------------------------|----------------------------|----------------------------|
//! | Line sensors 0..=7         | PB0..PB7                   | active low, 0 = line seen  |
//! | `SelectNext` / `Decrement` | PA0 / PA1                  | to ground, pulled up       |
//! | `Increment` / `ToggleRun`  | PA4 / PA5                  | to ground, pulled up       |
//! | Motor A / B enable         | PA6 (TIM3 CH1) / PA7 (CH2) | 1 kHz PWM                  |
//! | Motor A IN1 / IN2          | PA8 / PA11                 | H-bridge direction         |
//! | Motor B IN1 / IN2          | PA12 / PA15                | H-bridge direction         |
//! | Display RS / E             | PB8 / PB9                  | HD44780, 4-bit, write only |
//! | Display D4..D7             | PA2, PA3, PC14, PC15       |                            |

#![cfg(target_os = "none")]

use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::khz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm, SimplePwmChannels};

mod buttons;
mod lcd;
mod motors;
mod sensors;

pub use buttons::ButtonPanel;
pub use lcd::CharacterLcd;
pub use motors::{HBridge, MotorOutputs};
pub use sensors::SensorArray;

/// PWM carrier for both motor enables.
const MOTOR_PWM_KHZ: u32 = 1;

/// Every peripheral the control core talks to.
pub struct Board {
    pub sensors: SensorArray<'static>,
    pub motors: MotorOutputs<'static>,
    pub buttons: ButtonPanel<'static>,
    pub display: CharacterLcd<'static>,
}

impl Board {
    pub fn new(peripherals: hal::Peripherals) -> Self {
        let hal::Peripherals {
            PA0,
            PA1,
            PA2,
            PA3,
            PA4,
            PA5,
            PA6,
            PA7,
            PA8,
            PA11,
            PA12,
            PA15,
            PB0,
            PB1,
            PB2,
            PB3,
            PB4,
            PB5,
            PB6,
            PB7,
            PB8,
            PB9,
            PC14,
            PC15,
            TIM3,
            ..
        } = peripherals;

        let sensors = SensorArray::new([
            Input::new(PB0, Pull::None),
            Input::new(PB1, Pull::None),
            Input::new(PB2, Pull::None),
            Input::new(PB3, Pull::None),
            Input::new(PB4, Pull::None),
            Input::new(PB5, Pull::None),
            Input::new(PB6, Pull::None),
            Input::new(PB7, Pull::None),
        ]);

        let buttons = ButtonPanel::new(
            Input::new(PA0, Pull::Up),
            Input::new(PA1, Pull::Up),
            Input::new(PA4, Pull::Up),
            Input::new(PA5, Pull::Up),
        );

        let pwm = SimplePwm::new(
            TIM3,
            Some(PwmPin::new(PA6, OutputType::PushPull)),
            Some(PwmPin::new(PA7, OutputType::PushPull)),
            None,
            None,
            khz(MOTOR_PWM_KHZ),
            CountingMode::EdgeAlignedUp,
        );
        let SimplePwmChannels { ch1, ch2, .. } = pwm.split();
        let motors = MotorOutputs::new(
            ch1,
            HBridge::new(
                Output::new(PA8, Level::Low, Speed::Low),
                Output::new(PA11, Level::Low, Speed::Low),
            ),
            ch2,
            HBridge::new(
                Output::new(PA12, Level::Low, Speed::Low),
                Output::new(PA15, Level::Low, Speed::Low),
            ),
        );

        let display = CharacterLcd::new(
            Output::new(PB8, Level::Low, Speed::Low),
            Output::new(PB9, Level::Low, Speed::Low),
            [
                Output::new(PA2, Level::Low, Speed::Low),
                Output::new(PA3, Level::Low, Speed::Low),
                Output::new(PC14, Level::Low, Speed::Low),
                Output::new(PC15, Level::Low, Speed::Low),
            ],
        );

        Self {
            sensors,
            motors,
            buttons,
            display,
        }
    }
}
