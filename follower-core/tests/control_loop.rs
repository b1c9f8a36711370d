mod common;

use common::{MotorCall, RecordingMotors, ScriptedSensor};
use follower_core::control::{ControlLoop, DriveState, TickOutcome};
use follower_core::mixer::{Direction, MotorCommand, MotorId};
use follower_core::sensors::SensorFrame;
use follower_core::telemetry::{StopReason, TelemetryEvent};
use follower_core::tuning::{LiveReadout, TuningStore};

const CENTERED: u8 = 0b0000_1000;

struct Rig {
    store: TuningStore,
    readout: LiveReadout,
    control: ControlLoop,
    sensor: ScriptedSensor,
    motors: RecordingMotors,
}

impl Rig {
    fn new(initial: u8) -> Self {
        let mut rig = Self {
            store: TuningStore::new(),
            readout: LiveReadout::new(),
            control: ControlLoop::default(),
            sensor: ScriptedSensor::new(initial),
            motors: RecordingMotors::default(),
        };
        rig.control.start(&mut rig.motors);
        rig
    }

    fn tick(&mut self) -> follower_core::control::TickReport {
        self.control
            .tick(&self.store, &self.readout, &mut self.sensor, &mut self.motors)
    }
}

#[test]
fn start_sets_layout_and_leaves_outputs_disabled() {
    let rig = Rig::new(CENTERED);
    assert_eq!(rig.motors.direction(MotorId::A), Some(Direction::Forward));
    assert_eq!(rig.motors.direction(MotorId::B), Some(Direction::Reverse));
    assert!(!rig.motors.is_enabled(MotorId::A));
    assert!(!rig.motors.is_enabled(MotorId::B));
    assert_eq!(rig.control.state(), DriveState::Idle);
}

#[test]
fn idle_ticks_hold_motors_stopped_but_track_error() {
    let mut rig = Rig::new(0b0100_0000);
    let report = rig.tick();

    assert_eq!(report.outcome, TickOutcome::Stopped);
    assert_eq!(report.error, Some(3));
    assert!(!rig.motors.is_enabled(MotorId::A));
    assert!(!rig.motors.is_enabled(MotorId::B));

    let snapshot = rig.readout.snapshot();
    assert_eq!(snapshot.error, 3);
    assert_eq!(snapshot.frame, SensorFrame::from_bits(0b0100_0000));
    // Speeds are only published while driving.
    assert_eq!(snapshot.speeds.a, 180);
}

#[test]
fn run_flag_takes_effect_on_the_next_tick() {
    let mut rig = Rig::new(CENTERED);
    rig.tick();
    rig.store.toggle_running();
    assert_eq!(rig.control.state(), DriveState::Idle);

    let report = rig.tick();
    assert_eq!(report.event, Some(TelemetryEvent::RunStarted));
    assert_eq!(rig.control.state(), DriveState::Driving);
    assert!(rig.motors.is_enabled(MotorId::A));
    assert!(rig.motors.is_enabled(MotorId::B));

    rig.store.toggle_running();
    let report = rig.tick();
    assert_eq!(
        report.event,
        Some(TelemetryEvent::RunStopped(StopReason::Operator))
    );
    assert_eq!(report.outcome, TickOutcome::Stopped);
    assert!(!rig.motors.is_enabled(MotorId::A));
}

#[test]
fn driving_mixes_correction_into_wheel_speeds() {
    let mut rig = Rig::new(0b0010_0000);
    rig.store.toggle_running();
    let report = rig.tick();

    // Error +2: P = 4 * 2, D = 1 * (2 - 0), correction 10 around midpoint 180.
    assert_eq!(report.correction, Some(10));
    assert_eq!(
        report.outcome,
        TickOutcome::Driving {
            a: MotorCommand::new(Direction::Forward, 170),
            b: MotorCommand::new(Direction::Reverse, 190),
        }
    );
    assert_eq!(rig.motors.speed(MotorId::A), 170);
    assert_eq!(rig.motors.speed(MotorId::B), 190);
    assert_eq!(rig.readout.snapshot().speeds.b, 190);
}

#[test]
fn saturated_frame_cuts_out_while_running() {
    let mut rig = Rig::new(CENTERED);
    rig.store.toggle_running();
    rig.tick();
    assert_eq!(rig.control.state(), DriveState::Driving);
    rig.motors.take_calls();

    rig.sensor.queue(0xFF);
    let report = rig.tick();
    assert_eq!(report.outcome, TickOutcome::Cutout);
    assert_eq!(
        report.event,
        Some(TelemetryEvent::RunStopped(StopReason::SafetyCutout))
    );
    assert_eq!(report.correction, None);

    let calls = rig.motors.take_calls();
    assert!(calls.contains(&MotorCall::Direction(MotorId::A, Direction::FastStop)));
    assert!(calls.contains(&MotorCall::Direction(MotorId::B, Direction::FastStop)));
    assert!(calls.contains(&MotorCall::Enabled(MotorId::A, false)));
    assert!(calls.contains(&MotorCall::Enabled(MotorId::B, false)));
    assert!(!rig.store.is_running());

    // Following tick, back on the line: flag still clear, nothing re-enabled.
    rig.sensor.hold(CENTERED);
    let report = rig.tick();
    assert!(!rig.store.is_running());
    assert_eq!(report.outcome, TickOutcome::Stopped);
    assert_eq!(rig.control.state(), DriveState::Idle);
    assert!(!rig.motors.is_enabled(MotorId::A));
}

#[test]
fn cutout_overrides_a_pending_run_request() {
    let mut rig = Rig::new(0xFF);
    rig.store.toggle_running();
    let report = rig.tick();
    assert_eq!(report.outcome, TickOutcome::Cutout);
    assert!(!rig.store.is_running());
    assert_eq!(rig.control.state(), DriveState::Idle);
}

#[test]
fn cutout_while_idle_is_silent() {
    let mut rig = Rig::new(0xFF);
    let report = rig.tick();
    assert_eq!(report.outcome, TickOutcome::Cutout);
    assert_eq!(report.event, None);
}

#[test]
fn lost_line_holds_the_last_error() {
    let mut rig = Rig::new(0b1000_0000);
    rig.store.toggle_running();
    rig.tick();
    let lost_at = rig.control.pid_state().integral;

    rig.sensor.hold(0x00);
    let report = rig.tick();
    assert_eq!(report.error, Some(4));
    assert_eq!(report.event, Some(TelemetryEvent::LineLost));
    assert!(rig.readout.snapshot().line_lost);
    assert_eq!(rig.control.pid_state().integral, lost_at);

    let report = rig.tick();
    assert_eq!(report.error, Some(4));
    assert_eq!(report.event, None);

    rig.sensor.hold(CENTERED);
    let report = rig.tick();
    assert_eq!(report.error, Some(0));
    assert_eq!(report.event, Some(TelemetryEvent::LineReacquired));
    assert!(!rig.readout.snapshot().line_lost);
}

#[test]
fn line_lost_before_any_sighting_uses_zero() {
    let mut rig = Rig::new(0x00);
    let report = rig.tick();
    assert_eq!(report.error, Some(0));
    assert_eq!(report.event, Some(TelemetryEvent::LineLost));
}

#[test]
fn starting_off_the_line_still_reports_the_loss() {
    let mut rig = Rig::new(0x00);
    rig.store.toggle_running();

    let report = rig.tick();
    assert_eq!(report.event, Some(TelemetryEvent::RunStarted));
    assert!(rig.readout.snapshot().line_lost);

    let report = rig.tick();
    assert_eq!(report.event, Some(TelemetryEvent::LineLost));

    let events: Vec<_> = (0..10).filter_map(|_| rig.tick().event).collect();
    assert!(events.is_empty(), "unexpected events {events:?}");

    rig.sensor.hold(CENTERED);
    assert_eq!(rig.tick().event, Some(TelemetryEvent::LineReacquired));
}

#[test]
fn minimum_speed_edit_is_seen_on_the_next_tick() {
    let mut rig = Rig::new(CENTERED);
    rig.store.toggle_running();
    rig.tick();
    assert_eq!(rig.motors.speed(MotorId::A), 180);

    for _ in 0..30 {
        rig.store.increment(follower_core::tuning::Parameter::MinSpeed);
    }
    rig.tick();
    assert_eq!(rig.motors.speed(MotorId::A), 255);
    assert_eq!(rig.motors.speed(MotorId::B), 255);
}
