use embassy_stm32::gpio::Input;
use follower_core::control::LineSensor;
use follower_core::sensors::{SENSOR_COUNT, SensorFrame};

/// Eight reflectance sensors on GPIO inputs, indexed left to right.
pub struct SensorArray<'d> {
    inputs: [Input<'d>; SENSOR_COUNT as usize],
}

impl<'d> SensorArray<'d> {
    pub fn new(inputs: [Input<'d>; SENSOR_COUNT as usize]) -> Self {
        Self { inputs }
    }

    fn levels(&self) -> u8 {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| input.is_high())
            .fold(0, |levels, (index, _)| levels | (1 << index))
    }
}

impl LineSensor for SensorArray<'_> {
    fn read(&mut self) -> SensorFrame {
        SensorFrame::from_active_low(self.levels())
    }
}
