use std::time::Duration;

use follower_core::buttons::{ButtonInput, ButtonMask};
use follower_core::control::{ControlConfig, ControlLoop, DriveState};
use follower_core::display::{DISPLAY_COLUMNS, DISPLAY_ROWS, TextDisplay, render};
use follower_core::menu::{ConfigStateMachine, MenuConfig};
use follower_core::telemetry::TelemetryEvent;
use follower_core::tuning::{LiveReadout, Parameter, TuningStore};

use crate::command::{self, Command, CommandError, FrameSource};
use crate::sim::{SimRobot, TrackConfig};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("press", "press <button> [passes]  - hold a button for N passes, then release"),
    ("hold", "hold <button>            - keep a button down across ticks"),
    ("release", "release                  - let go of every held button"),
    ("tick", "tick [count]             - advance both contexts by N periods"),
    ("line", "line <bits>|auto         - pin the sensor frame (sensor 0 first) or follow the track"),
    ("lift", "lift | place             - take the robot off the track / put it back"),
    ("status", "status [parameter]       - tuning values and live readout"),
    ("screen", "screen                   - show the display"),
    ("help", "help                     - this list"),
];

/// Buttons: select, dec, inc, run.
pub const BUTTON_TAGS: &str = "select, dec, inc, run";

/// Character grid behind the two-row display.
#[derive(Clone, Debug)]
pub struct ScreenBuffer {
    rows: [[char; DISPLAY_COLUMNS]; DISPLAY_ROWS as usize],
    column: usize,
    row: usize,
}

impl ScreenBuffer {
    pub fn new() -> Self {
        Self {
            rows: [[' '; DISPLAY_COLUMNS]; DISPLAY_ROWS as usize],
            column: 0,
            row: 0,
        }
    }

    pub fn row(&self, index: usize) -> String {
        self.rows
            .get(index)
            .map(|row| row.iter().collect())
            .unwrap_or_default()
    }

    /// Both rows framed the way the glass looks.
    pub fn framed(&self) -> Vec<String> {
        let border = format!("+{}+", "-".repeat(DISPLAY_COLUMNS));
        let mut lines = vec![border.clone()];
        lines.extend((0..self.rows.len()).map(|index| format!("|{}|", self.row(index))));
        lines.push(border);
        lines
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDisplay for ScreenBuffer {
    fn clear(&mut self) {
        *self = Self::new();
    }

    fn set_cursor(&mut self, column: u8, row: u8) {
        self.column = usize::from(column);
        self.row = usize::from(row);
    }

    fn write_char(&mut self, ch: char) {
        if let Some(cell) = self
            .rows
            .get_mut(self.row)
            .and_then(|row| row.get_mut(self.column))
        {
            *cell = ch;
        }
        self.column += 1;
    }
}

/// Panel whose buttons stay wherever the operator left them.
#[derive(Clone, Copy, Debug, Default)]
struct LatchedPanel {
    mask: ButtonMask,
}

impl ButtonInput for LatchedPanel {
    fn sample(&mut self) -> ButtonMask {
        self.mask
    }
}

/// Lock-step run of both contexts against the simulated robot.
///
/// Each period runs one control tick, then one configuration pass, then
/// advances the plant. The two contexts share only the store and the
/// readout, as on the robot.
pub struct Session {
    store: TuningStore,
    readout: LiveReadout,
    control: ControlLoop,
    menu: ConfigStateMachine,
    robot: SimRobot,
    held: ButtonMask,
    panel: LatchedPanel,
    screen: ScreenBuffer,
    periods: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::with_track(TrackConfig::default())
    }

    pub fn with_track(track: TrackConfig) -> Self {
        let config = ControlConfig::default();
        let mut robot = SimRobot::new(config.layout, track);
        let mut control = ControlLoop::new(config);
        control.start(&mut robot.wheels);

        let store = TuningStore::new();
        let readout = LiveReadout::new();
        let mut screen = ScreenBuffer::new();
        render(&store, &readout.snapshot()).draw(&mut screen);

        Self {
            store,
            readout,
            control,
            menu: ConfigStateMachine::new(MenuConfig::default()),
            robot,
            held: ButtonMask::NONE,
            panel: LatchedPanel::default(),
            screen,
            periods: 0,
        }
    }

    pub fn store(&self) -> &TuningStore {
        &self.store
    }

    pub fn screen(&self) -> &ScreenBuffer {
        &self.screen
    }

    pub fn drive_state(&self) -> DriveState {
        self.control.state()
    }

    /// Simulated time since power-on.
    pub fn elapsed(&self) -> Duration {
        let period = self.control.config().period;
        let periods = u32::try_from(self.periods).unwrap_or(u32::MAX);
        period.saturating_mul(periods)
    }

    pub fn handle_command(&mut self, line: &str) -> Result<Vec<String>, CommandError> {
        let command = command::parse(line)?;
        let mut lines = Vec::new();
        match command {
            Command::Press { button, passes } => {
                self.run_with(self.held.with(button), passes, &mut lines);
                self.run_with(self.held, 1, &mut lines);
                lines.push(format!(
                    "pressed {} for {passes} pass(es)",
                    button.tag()
                ));
            }
            Command::Hold(button) => {
                self.held = self.held.with(button);
                lines.push(format!("holding {}", button.tag()));
            }
            Command::Release => {
                self.held = ButtonMask::NONE;
                lines.push("released all buttons".to_string());
            }
            Command::Tick(count) => {
                self.run_with(self.held, count, &mut lines);
                lines.push(format!("advanced {count} period(s), t={}", self.clock()));
            }
            Command::Line(FrameSource::Track) => {
                self.robot.track.fix_frame(None);
                lines.push("sensors follow the track".to_string());
            }
            Command::Line(FrameSource::Fixed(frame)) => {
                self.robot.track.fix_frame(Some(frame));
                lines.push(format!("sensors pinned to {frame}"));
            }
            Command::Lift => {
                self.robot.track.set_lifted(true);
                lines.push("robot lifted off the track".to_string());
            }
            Command::Place => {
                self.robot.track.set_lifted(false);
                lines.push("robot placed on the track".to_string());
            }
            Command::Status(None) => lines.extend(self.status_lines()),
            Command::Status(Some(parameter)) => lines.push(self.describe(parameter)),
            Command::Screen => lines.extend(self.screen.framed()),
            Command::Help => {
                lines.extend(HELP_TOPICS.iter().map(|(_, text)| (*text).to_string()));
                lines.push(format!("buttons: {BUTTON_TAGS}"));
            }
        }
        Ok(lines)
    }

    fn run_with(&mut self, mask: ButtonMask, periods: u32, lines: &mut Vec<String>) {
        self.panel.mask = mask;
        for _ in 0..periods {
            for event in self.step() {
                lines.push(format!("{} {event}", self.clock()));
            }
        }
        self.panel.mask = self.held;
    }

    /// One period of both contexts.
    fn step(&mut self) -> Vec<TelemetryEvent> {
        let mut events = Vec::new();
        let tick = self.control.tick(
            &self.store,
            &self.readout,
            &mut self.robot.track,
            &mut self.robot.wheels,
        );
        events.extend(tick.event);

        let pass = self
            .menu
            .pass(&self.store, &self.readout, &mut self.panel, &mut self.screen);
        // Run transitions are reported when the control loop acts on them.
        events.extend(pass.event.filter(|event| !event.is_run_transition()));

        let period = self.control.config().period;
        self.robot.advance(period);
        self.periods += 1;
        events
    }

    fn clock(&self) -> String {
        format!("[{:>8.3}s]", self.elapsed().as_secs_f64())
    }

    fn describe(&self, parameter: Parameter) -> String {
        match self.store.value(parameter) {
            Some(value) => format!("{parameter}={value}"),
            None => format!("{parameter}={}", self.readout.snapshot().frame),
        }
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = self.readout.snapshot();
        let state = match self.control.state() {
            DriveState::Idle => "idle",
            DriveState::Driving => "driving",
        };
        let run_flag = if self.store.is_running() { "on" } else { "off" };
        let tuning = Parameter::ALL
            .iter()
            .filter(|parameter| parameter.bounds().is_some())
            .map(|parameter| self.describe(*parameter))
            .collect::<Vec<_>>()
            .join(" ");
        let line = if snapshot.line_lost { "lost" } else { "tracking" };
        let placement = if self.robot.track.is_lifted() {
            "lifted"
        } else {
            "on-track"
        };
        let source = if self.robot.track.fixed_frame().is_some() {
            "pinned"
        } else {
            "track"
        };

        vec![
            format!(
                "state={state} run-flag={run_flag} selected={} t={}",
                self.store.selected(),
                self.clock()
            ),
            tuning,
            format!(
                "frame={} ({source}) error={} line={line} robot={placement}",
                snapshot.frame, snapshot.error
            ),
            format!(
                "motor A={} B={} line-position={:.2}",
                snapshot.speeds.a,
                snapshot.speeds.b,
                self.robot.track.line_position()
            ),
        ]
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
