//! Telemetry event catalog shared by firmware and host targets.
//!
//! Both execution contexts report what happened on a tick or pass as a
//! [`TelemetryEvent`]. Events carry a compact numeric code so the firmware
//! can keep them in a small ring and log them without formatting in the
//! periodic context.

use core::fmt;

use crate::tuning::Parameter;

/// Why the motors were stopped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StopReason {
    /// Run toggled off from the panel.
    Operator,
    /// Cutout frame observed by the control tick.
    SafetyCutout,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Operator => f.write_str("operator"),
            StopReason::SafetyCutout => f.write_str("safety-cutout"),
        }
    }
}

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEvent {
    RunStarted,
    RunStopped(StopReason),
    LineLost,
    LineReacquired,
    SelectionChanged(Parameter),
    ParameterChanged { parameter: Parameter, value: u8 },
    Custom(u16),
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEvent::RunStarted => f.write_str("run-started"),
            TelemetryEvent::RunStopped(reason) => write!(f, "run-stopped {reason}"),
            TelemetryEvent::LineLost => f.write_str("line-lost"),
            TelemetryEvent::LineReacquired => f.write_str("line-reacquired"),
            TelemetryEvent::SelectionChanged(parameter) => write!(f, "selected {parameter}"),
            TelemetryEvent::ParameterChanged { parameter, value } => {
                write!(f, "set {parameter}={value}")
            }
            TelemetryEvent::Custom(code) => write!(f, "custom({code:#06x})"),
        }
    }
}

impl TelemetryEvent {
    const RUN_STARTED_CODE: u16 = 0x0001;
    const STOP_OPERATOR_CODE: u16 = 0x0002;
    const STOP_CUTOUT_CODE: u16 = 0x0003;
    const LINE_LOST_CODE: u16 = 0x0004;
    const LINE_REACQUIRED_CODE: u16 = 0x0005;
    const SELECTION_BASE: u16 = 0x0010;
    const PARAMETER_BASE: u16 = 0x0100;

    /// Encodes the event into a compact discriminant.
    ///
    /// Parameter edits keep the new value in the low byte.
    #[must_use]
    pub fn to_raw(self) -> u16 {
        match self {
            TelemetryEvent::RunStarted => Self::RUN_STARTED_CODE,
            TelemetryEvent::RunStopped(StopReason::Operator) => Self::STOP_OPERATOR_CODE,
            TelemetryEvent::RunStopped(StopReason::SafetyCutout) => Self::STOP_CUTOUT_CODE,
            TelemetryEvent::LineLost => Self::LINE_LOST_CODE,
            TelemetryEvent::LineReacquired => Self::LINE_REACQUIRED_CODE,
            TelemetryEvent::SelectionChanged(parameter) => {
                Self::SELECTION_BASE + parameter_index(parameter)
            }
            TelemetryEvent::ParameterChanged { parameter, value } => {
                Self::PARAMETER_BASE * (parameter_index(parameter) + 1) + u16::from(value)
            }
            TelemetryEvent::Custom(code) => code,
        }
    }

    /// Decodes a discriminant, falling back to [`TelemetryEvent::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::RUN_STARTED_CODE => TelemetryEvent::RunStarted,
            Self::STOP_OPERATOR_CODE => TelemetryEvent::RunStopped(StopReason::Operator),
            Self::STOP_CUTOUT_CODE => TelemetryEvent::RunStopped(StopReason::SafetyCutout),
            Self::LINE_LOST_CODE => TelemetryEvent::LineLost,
            Self::LINE_REACQUIRED_CODE => TelemetryEvent::LineReacquired,
            value if (Self::SELECTION_BASE..Self::SELECTION_BASE + 5).contains(&value) => {
                parameter_from_index(value - Self::SELECTION_BASE)
                    .map_or(TelemetryEvent::Custom(value), TelemetryEvent::SelectionChanged)
            }
            value if value >= Self::PARAMETER_BASE => {
                let [high, low] = value.to_be_bytes();
                parameter_from_index(u16::from(high) - 1)
                    .filter(|parameter| parameter.bounds().is_some())
                    .map_or(TelemetryEvent::Custom(value), |parameter| {
                        TelemetryEvent::ParameterChanged {
                            parameter,
                            value: low,
                        }
                    })
            }
            value => TelemetryEvent::Custom(value),
        }
    }

    /// Returns `true` for events that change whether the motors are driven.
    #[must_use]
    pub const fn is_run_transition(self) -> bool {
        matches!(
            self,
            TelemetryEvent::RunStarted | TelemetryEvent::RunStopped(_)
        )
    }
}

const fn parameter_index(parameter: Parameter) -> u16 {
    match parameter {
        Parameter::Proportional => 0,
        Parameter::Integral => 1,
        Parameter::Derivative => 2,
        Parameter::MinSpeed => 3,
        Parameter::SensorCalibration => 4,
    }
}

fn parameter_from_index(index: u16) -> Option<Parameter> {
    Parameter::ALL.get(usize::from(index)).copied()
}
