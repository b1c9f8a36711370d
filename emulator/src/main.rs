mod command;
mod live;
mod session;
mod sim;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::Session;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Console,
    Live,
}

fn main() -> io::Result<()> {
    let mode = parse_mode().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: follower-emulator [--live]");
        process::exit(2);
    });

    match mode {
        Mode::Live => live::run(),
        Mode::Console => console(),
    }
}

fn console() -> io::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new();
    let mut line = String::new();

    writeln!(
        writer,
        "Line Follower Emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    for row in session.screen().framed() {
        writeln!(writer, "{row}")?;
    }

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        match session.handle_command(trimmed) {
            Ok(responses) => {
                for response in responses {
                    writeln!(writer, "{response}")?;
                }
            }
            Err(err) => writeln!(writer, "ERR {err}")?,
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_mode() -> Result<Mode, String> {
    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (None, _) => Ok(Mode::Console),
        (Some(arg), None) if arg == "--live" => Ok(Mode::Live),
        (Some(arg), None) if arg == "--console" => Ok(Mode::Console),
        (Some(arg), None) => Err(format!("Unknown argument `{arg}`")),
        (Some(_), Some(extra)) => Err(format!("Unexpected argument `{extra}`")),
    }
}
