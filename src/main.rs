use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use touchterm::cli::{handle_config_action, line_to_command, Args, Command};
use touchterm::config::Config;
use touchterm::session::{Session, SubmitError};
use touchterm::terminal::Transcript;

/// How often the UI side checks for input and output
const UI_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Sent when input ends, so the shell winds down with it
const EXIT_COMMAND: &[u8] = b"exit\r";

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Read stdin on a separate thread, one keyboard submission per line.
fn spawn_input_reader() -> io::Result<Receiver<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut reader = stdin.lock();
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(line_to_command(&line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            log::debug!("Input closed, asking the shell to exit");
            let _ = tx.send(EXIT_COMMAND.to_vec());
        })?;

    Ok(rx)
}

/// Append a chunk to the transcript and show what changed.
fn render(out: &mut impl Write, transcript: &mut Transcript, chunk: &[u8], rows: usize) -> io::Result<()> {
    let appended = transcript.append(chunk);
    if appended.cleared {
        write!(out, "\x1b[2J\x1b[H{}", transcript.visible_content(rows))?;
    } else {
        out.write_all(appended.text.as_bytes())?;
    }
    out.flush()
}

/// Run the session until the shell exits. Returns the process exit code.
fn run(args: &Args, config: &Config) -> i32 {
    #[cfg(target_os = "linux")]
    let _console = match args
        .console
        .as_deref()
        .map(touchterm::terminal::ConsoleModeGuard::enter)
        .transpose()
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let session = match Session::prepare(&config.session_options(), args.width, args.height) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Failed to start session: {}", e);
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let interrupt = session.interrupt_handle();
    if let Err(e) = ctrlc::set_handler(move || interrupt.request()) {
        eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
    }

    let input = match spawn_input_reader() {
        Ok(rx) => rx,
        Err(e) => {
            eprintln!("Error: failed to start input reader: {}", e);
            return 1;
        }
    };

    let rows = usize::from(session.geometry().rows);
    let mut transcript = Transcript::with_max_len(config.display.max_transcript_len);
    let mut stdout = io::stdout();
    let mut pending: Option<Vec<u8>> = None;

    loop {
        if pending.is_none() {
            match input.try_recv() {
                Ok(command) => pending = Some(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }

        if let Some(command) = pending.take() {
            match session.submit_command(&command) {
                Ok(()) => {}
                // The previous command is still being written; try again next tick
                Err(SubmitError::Pending) => pending = Some(command),
                Err(e) => eprintln!("Warning: {}", e),
            }
        }

        if let Some(chunk) = session.poll_output() {
            if let Err(e) = render(&mut stdout, &mut transcript, &chunk, rows) {
                log::warn!("Failed to write output: {}", e);
            }
        }

        if let Some(exit) = session.exit_status() {
            if let Some(chunk) = session.poll_output() {
                let _ = render(&mut stdout, &mut transcript, &chunk, rows);
            }
            log::info!("Shell {}", exit);
            return exit.code();
        }

        thread::sleep(UI_POLL_INTERVAL);
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(Command::Config { action }) = &args.command {
        if let Err(e) = handle_config_action(*action, args.config.as_deref()) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply_to(&mut config);

    // Guards inside run() are dropped before the process exits
    let code = run(&args, &config);
    std::process::exit(code);
}
