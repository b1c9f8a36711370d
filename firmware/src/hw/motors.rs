use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::timer::simple_pwm::SimplePwmChannel;
use follower_core::control::MotorDriver;
use follower_core::mixer::{Direction, MAX_MOTOR_SPEED, MotorId};

/// Direction inputs of one H-bridge channel.
pub struct HBridge<'d> {
    in1: Output<'d>,
    in2: Output<'d>,
}

impl<'d> HBridge<'d> {
    pub fn new(in1: Output<'d>, in2: Output<'d>) -> Self {
        Self { in1, in2 }
    }

    fn set(&mut self, direction: Direction) {
        match direction {
            Direction::Forward => {
                self.in1.set_low();
                self.in2.set_high();
            }
            Direction::Reverse => {
                self.in1.set_high();
                self.in2.set_low();
            }
            // Both high shorts the windings through the bridge: active brake.
            Direction::FastStop => {
                self.in1.set_high();
                self.in2.set_high();
            }
        }
    }
}

/// One motor: PWM enable plus its bridge.
struct Channel<'d> {
    pwm: SimplePwmChannel<'d, TIM3>,
    bridge: HBridge<'d>,
}

/// Dual motor driver on TIM3 CH1 / CH2.
pub struct MotorOutputs<'d> {
    a: Channel<'d>,
    b: Channel<'d>,
}

impl<'d> MotorOutputs<'d> {
    pub fn new(
        pwm_a: SimplePwmChannel<'d, TIM3>,
        bridge_a: HBridge<'d>,
        pwm_b: SimplePwmChannel<'d, TIM3>,
        bridge_b: HBridge<'d>,
    ) -> Self {
        let mut outputs = Self {
            a: Channel {
                pwm: pwm_a,
                bridge: bridge_a,
            },
            b: Channel {
                pwm: pwm_b,
                bridge: bridge_b,
            },
        };
        for motor in MotorId::ALL {
            let channel = outputs.channel_mut(motor);
            channel.pwm.set_duty_cycle_fully_off();
            channel.pwm.disable();
        }
        outputs
    }

    fn channel_mut(&mut self, motor: MotorId) -> &mut Channel<'d> {
        match motor {
            MotorId::A => &mut self.a,
            MotorId::B => &mut self.b,
        }
    }
}

impl MotorDriver for MotorOutputs<'_> {
    fn set_direction(&mut self, motor: MotorId, direction: Direction) {
        self.channel_mut(motor).bridge.set(direction);
    }

    fn set_enabled(&mut self, motor: MotorId, enabled: bool) {
        let pwm = &mut self.channel_mut(motor).pwm;
        if enabled {
            pwm.enable();
        } else {
            pwm.disable();
        }
    }

    fn set_speed(&mut self, motor: MotorId, speed: u8) {
        self.channel_mut(motor)
            .pwm
            .set_duty_cycle_fraction(u16::from(speed), u16::from(MAX_MOTOR_SPEED));
    }
}
