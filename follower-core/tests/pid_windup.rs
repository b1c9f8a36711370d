mod common;

use common::{RecordingMotors, ScriptedSensor};
use follower_core::control::{ControlLoop, DriveState};
use follower_core::pid::{PidController, PidGains};
use follower_core::tuning::{LiveReadout, Parameter, TuningStore};

#[test]
fn documented_error_sequence_produces_exact_corrections() {
    let mut pid = PidController::new(PidGains::new(4, 0, 1));

    // P = 8, I = 0, D = 1 * (2 - 0)
    assert_eq!(pid.update(2), 10);
    // P = 8, D = 1 * (2 - 2)
    assert_eq!(pid.update(2), 8);
    // P = -4, D = 1 * (-1 - 2)
    assert_eq!(pid.update(-1), -7);
}

#[test]
fn integral_keeps_accumulating_while_idle() {
    let store = TuningStore::new();
    let readout = LiveReadout::new();
    for _ in 0..2 {
        store.increment(Parameter::Integral);
    }
    let mut control = ControlLoop::default();
    let mut motors = RecordingMotors::default();
    // Sensor 5 only: error of +2.
    let mut sensor = ScriptedSensor::new(0b0010_0000);

    for _ in 0..10 {
        control.tick(&store, &readout, &mut sensor, &mut motors);
    }

    assert_eq!(control.state(), DriveState::Idle);
    assert_eq!(control.pid_state().integral, 2 * 2 * 10);
    assert!(!motors.is_enabled(follower_core::mixer::MotorId::A));
}

#[test]
fn integral_carries_over_into_the_next_run() {
    // Windup from a previous run is intentionally not cleared on restart.
    let store = TuningStore::new();
    let readout = LiveReadout::new();
    store.increment(Parameter::Integral);
    let mut control = ControlLoop::default();
    let mut motors = RecordingMotors::default();
    let mut sensor = ScriptedSensor::new(0b1000_0000);

    store.toggle_running();
    for _ in 0..5 {
        control.tick(&store, &readout, &mut sensor, &mut motors);
    }
    store.toggle_running();
    control.tick(&store, &readout, &mut sensor, &mut motors);
    assert_eq!(control.state(), DriveState::Idle);
    let carried = control.pid_state().integral;
    assert_eq!(carried, 4 * 6);

    sensor.hold(0b0000_1000);
    store.toggle_running();
    let report = control.tick(&store, &readout, &mut sensor, &mut motors);
    assert_eq!(control.state(), DriveState::Driving);
    assert_eq!(control.pid_state().integral, carried);
    // Centered line, zero P, yet the stale integral still steers:
    // Kp * 0 + 24 + Kd * (0 - 4).
    assert_eq!(report.correction, Some(24 - 4));
}
