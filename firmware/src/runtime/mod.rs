//! Two execution contexts over shared atomics.
//!
//! The control loop runs on an [`InterruptExecutor`] pended through a spare
//! USART vector at elevated priority, so it preempts everything in thread
//! mode. The configuration pass and logging run on the thread-mode
//! [`Executor`]. The only shared state is [`TUNING`], [`READOUT`] and the
//! telemetry queue; none of them take a lock.

use cortex_m::interrupt;
use cortex_m::register::primask;
use cortex_m_rt::entry;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{Executor, InterruptExecutor};
use embassy_stm32 as hal;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_sync::channel::Channel;
use follower_core::control::{ControlConfig, ControlLoop};
use follower_core::tuning::{LiveReadout, TuningStore};
use static_cell::StaticCell;

use crate::hw::Board;
use crate::telemetry::{TelemetryQueue, TelemetryRecorder};

mod control_task;
mod menu_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Tuning values and the run flag. Written by the menu; the control task
/// only clears the run flag on a safety cutout.
pub(super) static TUNING: TuningStore = TuningStore::new();
/// Written by the control task, read by the display.
pub(super) static READOUT: LiveReadout = LiveReadout::new();
pub(super) static TELEMETRY_QUEUE: TelemetryQueue = Channel::new();

static CONTROL_EXECUTOR: InterruptExecutor = InterruptExecutor::new();
static FOREGROUND_EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[hal::interrupt]
unsafe fn USART3_4_5_6_LPUART1() {
    unsafe { CONTROL_EXECUTOR.on_interrupt() }
}

/// Converts a core duration into the embassy tick representation.
fn ticks(duration: core::time::Duration) -> embassy_time::Duration {
    embassy_time::Duration::from_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
}

#[entry]
fn main() -> ! {
    defmt::info!("line-follower: starting");
    let Board {
        sensors,
        mut motors,
        buttons,
        display,
    } = Board::new(hal::init(hal::Config::default()));

    let mut control = ControlLoop::new(ControlConfig::default());
    control.start(&mut motors);
    defmt::info!(
        "line-follower: motors parked, control period {}ms",
        control.config().period.as_millis()
    );

    hal::interrupt::USART3_4_5_6_LPUART1.set_priority(Priority::P1);
    let control_spawner = CONTROL_EXECUTOR.start(hal::interrupt::USART3_4_5_6_LPUART1);
    control_spawner
        .spawn(control_task::run(control, sensors, motors))
        .expect("failed to spawn control task");

    let executor = FOREGROUND_EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner
            .spawn(menu_task::run(buttons, display, TelemetryRecorder::new()))
            .expect("failed to spawn menu task");
    })
}
