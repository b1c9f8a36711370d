use embassy_time::Ticker;
use follower_core::control::ControlLoop;

use super::{READOUT, TELEMETRY_QUEUE, TUNING, ticks};
use crate::hw::{MotorOutputs, SensorArray};

/// Fixed-period control loop. Never awaits anything but the ticker.
#[embassy_executor::task]
pub async fn run(
    mut control: ControlLoop,
    mut sensors: SensorArray<'static>,
    mut motors: MotorOutputs<'static>,
) -> ! {
    let events = TELEMETRY_QUEUE.sender();
    let mut ticker = Ticker::every(ticks(control.config().period));

    loop {
        let report = control.tick(&TUNING, &READOUT, &mut sensors, &mut motors);
        if let Some(event) = report.event {
            // Dropped when the foreground falls behind.
            let _ = events.try_send(event);
        }
        ticker.next().await;
    }
}
