//! Real-time terminal mode.
//!
//! The control loop runs on its own thread at the real period, sharing only
//! the tuning store and the live readout with the foreground, which runs the
//! configuration pass and paints the display with `crossterm`.
//!
//! Keys `1`..`4` are SelectNext, Decrement, Increment and ToggleRun. Most
//! terminals only report presses and auto-repeat, so a key counts as held
//! for [`HOLD_WINDOW`] after its last report. `l` lifts the robot or puts it
//! back, `q` or Esc quits.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use follower_core::buttons::{Button, ButtonInput, ButtonMask};
use follower_core::control::{ControlConfig, ControlLoop};
use follower_core::menu::{ConfigStateMachine, MenuConfig};
use follower_core::telemetry::TelemetryEvent;
use follower_core::tuning::{LiveReadout, TuningStore};

use crate::session::ScreenBuffer;
use crate::sim::{SimRobot, TrackConfig};

/// How long a key press keeps its button down without a repeat.
pub const HOLD_WINDOW: Duration = Duration::from_millis(120);
const EVENT_LOG_LINES: usize = 8;

/// State shared between the two threads.
struct Shared {
    store: TuningStore,
    readout: LiveReadout,
    lifted: AtomicBool,
    shutdown: AtomicBool,
}

/// Restores the terminal on every exit path.
struct TerminalGuard;

impl TerminalGuard {
    fn enter(out: &mut impl Write) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Keyboard-backed panel with a hold window per key.
#[derive(Default)]
struct KeyPanel {
    last_seen: [Option<Instant>; 4],
}

impl KeyPanel {
    fn slot(button: Button) -> usize {
        match button {
            Button::SelectNext => 0,
            Button::Decrement => 1,
            Button::Increment => 2,
            Button::ToggleRun => 3,
        }
    }

    fn key(&mut self, button: Button, kind: KeyEventKind, now: Instant) {
        self.last_seen[Self::slot(button)] = match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => Some(now),
            KeyEventKind::Release => None,
        };
    }
}

impl ButtonInput for KeyPanel {
    fn sample(&mut self) -> ButtonMask {
        let now = Instant::now();
        Button::ALL
            .into_iter()
            .filter(|button| {
                self.last_seen[Self::slot(*button)]
                    .is_some_and(|seen| now.duration_since(seen) <= HOLD_WINDOW)
            })
            .fold(ButtonMask::NONE, ButtonMask::with)
    }
}

fn button_for(code: KeyCode) -> Option<Button> {
    match code {
        KeyCode::Char('1') => Some(Button::SelectNext),
        KeyCode::Char('2') => Some(Button::Decrement),
        KeyCode::Char('3') => Some(Button::Increment),
        KeyCode::Char('4') => Some(Button::ToggleRun),
        _ => None,
    }
}

fn spawn_control(shared: Arc<Shared>, events: Sender<TelemetryEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let config = ControlConfig::default();
        let mut robot = SimRobot::new(config.layout, TrackConfig::default());
        let mut control = ControlLoop::new(config);
        control.start(&mut robot.wheels);

        let period = config.period;
        let mut deadline = Instant::now();
        while !shared.shutdown.load(Ordering::Relaxed) {
            robot
                .track
                .set_lifted(shared.lifted.load(Ordering::Relaxed));
            let report = control.tick(
                &shared.store,
                &shared.readout,
                &mut robot.track,
                &mut robot.wheels,
            );
            if let Some(event) = report.event {
                // The foreground may already be gone during shutdown.
                let _ = events.send(event);
            }
            robot.advance(period);

            deadline += period;
            if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
    })
}

/// Runs until the operator quits.
pub fn run() -> io::Result<()> {
    let shared = Arc::new(Shared {
        store: TuningStore::new(),
        readout: LiveReadout::new(),
        lifted: AtomicBool::new(false),
        shutdown: AtomicBool::new(false),
    });
    let (sender, receiver) = mpsc::channel();
    let control = spawn_control(Arc::clone(&shared), sender);

    let result = foreground(&shared, &receiver);

    shared.shutdown.store(true, Ordering::Relaxed);
    if control.join().is_err() {
        eprintln!("control thread panicked");
    }
    result
}

fn foreground(shared: &Shared, events: &Receiver<TelemetryEvent>) -> io::Result<()> {
    let mut out = io::stdout();
    let _guard = TerminalGuard::enter(&mut out)?;

    let config = MenuConfig::default();
    let mut menu = ConfigStateMachine::new(config);
    let mut panel = KeyPanel::default();
    let mut screen = ScreenBuffer::new();
    let mut log: Vec<String> = Vec::new();
    let started = Instant::now();

    loop {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('l') if kind == KeyEventKind::Press => {
                        shared.lifted.fetch_xor(true, Ordering::Relaxed);
                    }
                    other => {
                        if let Some(button) = button_for(other) {
                            panel.key(button, kind, Instant::now());
                        }
                    }
                }
            }
        }

        let report = menu.pass(&shared.store, &shared.readout, &mut panel, &mut screen);
        let stamp = started.elapsed().as_secs_f64();
        let pass_event = report.event.filter(|event| !event.is_run_transition());
        for event in pass_event.into_iter().chain(events.try_iter()) {
            log.push(format!("{stamp:>8.2}s {event}"));
        }
        if log.len() > EVENT_LOG_LINES {
            log.drain(..log.len() - EVENT_LOG_LINES);
        }

        paint(&mut out, shared, &screen, &log)?;
        thread::sleep(config.period);
    }
}

fn paint(
    out: &mut impl Write,
    shared: &Shared,
    screen: &ScreenBuffer,
    log: &[String],
) -> io::Result<()> {
    let snapshot = shared.readout.snapshot();
    let placement = if shared.lifted.load(Ordering::Relaxed) {
        "lifted"
    } else {
        "on track"
    };
    let mut lines = screen.framed();
    lines.push(String::new());
    lines.push(format!(
        "frame {}  error {:>3}  A {:>3}  B {:>3}  {placement}",
        snapshot.frame, snapshot.error, snapshot.speeds.a, snapshot.speeds.b
    ));
    lines.push("1 select  2 dec  3 inc  4 run  l lift  q quit".to_string());
    lines.push(String::new());
    lines.extend(log.iter().cloned());

    for (row, line) in (0u16..).zip(lines.iter()) {
        queue!(
            out,
            MoveTo(0, row),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
    }
    queue!(out, Clear(ClearType::FromCursorDown))?;
    out.flush()
}
