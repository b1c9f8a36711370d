use embassy_time::{Instant, Timer};
use follower_core::menu::{ConfigStateMachine, MenuConfig};

use super::{READOUT, TELEMETRY_QUEUE, TUNING, ticks};
use crate::hw::{ButtonPanel, CharacterLcd};
use crate::telemetry::TelemetryRecorder;

/// Foreground loop: one configuration pass, then drain control telemetry.
#[embassy_executor::task]
pub async fn run(
    mut buttons: ButtonPanel<'static>,
    mut display: CharacterLcd<'static>,
    mut telemetry: TelemetryRecorder,
) -> ! {
    let mut menu = ConfigStateMachine::new(MenuConfig::default());
    let period = ticks(menu.config().period);

    loop {
        let report = menu.pass(&TUNING, &READOUT, &mut buttons, &mut display);
        let now = Instant::now();
        // Run transitions are logged when the control task acts on them.
        if let Some(event) = report.event.filter(|event| !event.is_run_transition()) {
            telemetry.record(event, now);
        }
        telemetry.drain(&TELEMETRY_QUEUE, now);

        Timer::after(period).await;
    }
}
