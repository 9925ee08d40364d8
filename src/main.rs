//! lmsterm - terminal session controller for the Logistics Management System demo
//!
//! Drives one console session from a single line source:
//!
//! - **Interactive**: a built-in program runs against the console; each
//!   `input()` suspends until the user edits and submits a line
//! - **Scripted**: a recorded transcript is replayed with human-paced typing
//!
//! # Quick Start
//!
//! ```text
//! lmsterm                  # Interactive Logistics Management System
//! lmsterm -s               # Replay the built-in demo transcript
//! lmsterm -p greeter       # Interactive greeter
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Submit line |
//! | Backspace | Erase last character |
//! | Ctrl+Y | Copy session transcript to clipboard |
//! | Ctrl+C / Ctrl+D | End session |

mod config;
mod core;
mod program;
mod ui;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::session::{Session, SessionReport, SessionState};
use crate::core::source::{LineSource, SourceKind, Transcript};
use crate::core::terminal::{MemoryTerminal, Terminal};
use crate::core::typing::TypingSimulator;
use crate::ui::{spawn_key_reader, spawn_line_reader, CrosstermTerminal};

/// Command line overrides for the config file
#[derive(Debug, Default, PartialEq)]
struct Options {
    mode: Option<SourceKind>,
    program: Option<String>,
    transcript: Option<PathBuf>,
    /// Run without a console; output is printed at exit
    headless: bool,
    list_programs: bool,
}

impl Options {
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if let Some(path) = &self.transcript {
            config.transcript = Some(path.clone());
        }
    }
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("lmsterm {}", VERSION);
}

fn print_help() {
    eprintln!("lmsterm {} - Terminal session for the Logistics Management System demo", VERSION);
    eprintln!();
    eprintln!("Usage: lmsterm [OPTIONS]");
    eprintln!();
    eprintln!("Mode options:");
    eprintln!("  (default)             From config.toml, or interactive");
    eprintln!("  -i, --interactive     Run a built-in program against the console");
    eprintln!("  -s, --scripted        Replay a transcript with simulated typing");
    eprintln!();
    eprintln!("Source options:");
    eprintln!("  -p, --program <NAME>  Built-in program (default: logistics)");
    eprintln!("  -t, --transcript <PATH>");
    eprintln!("                        Transcript file (implies --scripted)");
    eprintln!("  -l, --list-programs   List built-in programs");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  --headless            No console; read lines from stdin, print output at exit");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Enter                 Submit line");
    eprintln!("  Backspace             Erase last character");
    eprintln!("  Ctrl+Y                Copy session transcript to clipboard");
    eprintln!("  Ctrl+C, Ctrl+D        End session");
    eprintln!();
    eprintln!("Configuration: ~/.lmsterm/config.toml");
    eprintln!("Log file:      ~/.lmsterm/lmsterm.log (level from LMSTERM_LOG)");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            // Mode selection
            "-i" | "--interactive" => {
                options.mode = Some(SourceKind::Interactive);
            }
            "-s" | "--scripted" => {
                options.mode = Some(SourceKind::Scripted);
            }
            // Source selection
            "-p" | "--program" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing program argument".to_string());
                }
                options.program = Some(args[i].clone());
            }
            "-t" | "--transcript" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing transcript argument".to_string());
                }
                options.transcript = Some(PathBuf::from(&args[i]));
                options.mode.get_or_insert(SourceKind::Scripted);
            }
            "-l" | "--list-programs" => {
                options.list_programs = true;
            }
            // Other
            "--headless" => {
                options.headless = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to `~/.lmsterm/lmsterm.log`; the console belongs to the session
fn init_logging() {
    let log_path = config::app_dir()
        .map(|dir| dir.join("lmsterm.log"))
        .unwrap_or_else(|| PathBuf::from("lmsterm.log"));

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("LMSTERM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn build_source(config: &Config) -> anyhow::Result<LineSource> {
    Ok(match config.mode {
        SourceKind::Interactive => LineSource::interactive(program::resolve(&config.program)),
        SourceKind::Scripted => {
            let transcript = match &config.transcript {
                Some(path) => Transcript::load(path)
                    .with_context(|| format!("Failed to load transcript {}", path.display()))?,
                None => Transcript::demo().context("Built-in transcript is invalid")?,
            };
            info!("Transcript with {} steps", transcript.len());
            LineSource::scripted(transcript)
        }
    })
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    if options.list_programs {
        for name in program::list() {
            println!("{}", name);
        }
        return Ok(());
    }

    init_logging();
    info!("lmsterm {} starting...", VERSION);

    let mut config = Config::load();
    options.apply(&mut config);
    info!("Config: {:?}", config);

    let source = build_source(&config)?;
    let typing = TypingSimulator::new(config.typing.min_delay_ms, config.typing.max_delay_ms);
    let runtime = Builder::new_current_thread().enable_time().build()?;

    let report = if options.headless {
        run_headless(&runtime, source, typing)?
    } else {
        let terminal = CrosstermTerminal::new(config.theme.to_theme());
        run_console(&runtime, Box::new(terminal), source, typing)
    };

    info!("Session ended: {:?}", report);
    if report.state == SessionState::Failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Run against the console with the key reader thread
fn run_console(
    runtime: &Runtime,
    terminal: Box<dyn Terminal>,
    source: LineSource,
    typing: TypingSimulator,
) -> SessionReport {
    let mut session = Session::new(terminal, source).with_typing(typing);
    let (reader, mut keys) = spawn_key_reader();

    let report = runtime.block_on(session.run(&mut keys));

    // Closing the stream stops the reader at its next poll
    drop(keys);
    if reader.join().is_err() {
        error!("Key reader panicked");
    }
    report
}

/// Run against an in-memory terminal and print the plain transcript
fn run_headless(
    runtime: &Runtime,
    source: LineSource,
    typing: TypingSimulator,
) -> anyhow::Result<SessionReport> {
    let scripted = source.kind() == SourceKind::Scripted;
    let terminal = MemoryTerminal::default();
    let mut session = Session::new(Box::new(terminal), source).with_typing(typing);

    let report = if scripted {
        // Nothing to read; the stream stays open until playback ends
        let (_tx, mut keys) = unbounded_channel();
        runtime.block_on(session.run(&mut keys))
    } else {
        // Reader thread is left blocked on stdin; the process exits after this
        let (_reader, mut keys) = spawn_line_reader(io::BufReader::new(io::stdin()));
        runtime.block_on(session.run(&mut keys))
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(session.terminal().plain_text().as_bytes())?;
    stdout.flush()?;
    Ok(report)
}
