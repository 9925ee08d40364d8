//! Programs hosted by an interactive session.
//!
//! A program sees a console: `input(prompt)` that suspends until the user
//! submits a line, and buffered stdout/stderr channels. It never touches
//! the terminal directly.
//!
//! - **greeter**: asks for a name and greets it
//! - **logistics**: the menu-driven Logistics Management System demo

pub mod greeter;
pub mod logistics;

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::core::bridge::InputBridge;
use crate::core::error::{Result, SessionError};
use crate::core::reassembler::OutputReassembler;
use crate::core::terminal::TerminalHandle;

pub use greeter::Greeter;
pub use logistics::Logistics;

/// A console program driven by the session
#[async_trait]
pub trait Program: Send {
    /// Human-readable title for the loading banner
    fn title(&self) -> &str;

    /// Prepare the program before it runs
    async fn load(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run to completion
    async fn run(&mut self, io: &ProgramIo) -> Result<()>;
}

/// Console surface handed to a running program
#[derive(Debug)]
pub struct ProgramIo {
    terminal: TerminalHandle,
    bridge: InputBridge,
    stdout: Mutex<OutputReassembler>,
    stderr: Mutex<OutputReassembler>,
}

fn lock(channel: &Mutex<OutputReassembler>) -> MutexGuard<'_, OutputReassembler> {
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgramIo {
    pub fn new(terminal: TerminalHandle, bridge: InputBridge) -> Self {
        Self {
            terminal,
            bridge,
            stdout: Mutex::new(OutputReassembler::new()),
            stderr: Mutex::new(OutputReassembler::new()),
        }
    }

    /// Read one line from the user.
    ///
    /// Pending stdout is flushed first so the prompt follows it.
    pub async fn input(&self, prompt: &str) -> Result<String> {
        self.flush_channel(&self.stdout)?;
        let receiver = self.bridge.request_line(prompt, &self.terminal)?;
        receiver.await.map_err(|_| SessionError::Closed)
    }

    /// Print `text` followed by a newline on stdout
    pub fn print(&self, text: &str) -> Result<()> {
        self.write_stdout(text)?;
        self.write_stdout("\n")
    }

    pub fn write_stdout(&self, fragment: &str) -> Result<()> {
        self.write_channel(&self.stdout, fragment)
    }

    pub fn write_stderr(&self, fragment: &str) -> Result<()> {
        self.write_channel(&self.stderr, fragment)
    }

    /// Emit any partial lines left on either channel
    pub fn flush(&self) -> Result<()> {
        self.flush_channel(&self.stdout)?;
        self.flush_channel(&self.stderr)
    }

    fn write_channel(&self, channel: &Mutex<OutputReassembler>, fragment: &str) -> Result<()> {
        let lines = lock(channel).feed(fragment);
        for line in lines {
            self.terminal.write(&line)?;
        }
        Ok(())
    }

    fn flush_channel(&self, channel: &Mutex<OutputReassembler>) -> Result<()> {
        let rest = lock(channel).flush();
        if let Some(rest) = rest {
            self.terminal.write(&rest)?;
        }
        Ok(())
    }
}

/// Stand-in for a program that could not be found; fails on load
#[derive(Debug)]
pub struct Unavailable {
    name: String,
}

#[async_trait]
impl Program for Unavailable {
    fn title(&self) -> &str {
        &self.name
    }

    async fn load(&mut self) -> Result<()> {
        Err(SessionError::RuntimeInitialization(format!(
            "unknown program '{}'",
            self.name
        )))
    }

    async fn run(&mut self, _io: &ProgramIo) -> Result<()> {
        self.load().await
    }
}

/// Resolve a built-in program by name.
///
/// Unknown names resolve to `Unavailable`, so the failure surfaces when the
/// session initializes.
pub fn resolve(name: &str) -> Box<dyn Program> {
    match name.to_lowercase().as_str() {
        "greeter" => Box::new(Greeter),
        "logistics" | "lms" => Box::new(Logistics::new()),
        other => Box::new(Unavailable {
            name: other.to_string(),
        }),
    }
}

/// List built-in programs
pub fn list() -> Vec<&'static str> {
    vec!["greeter", "logistics"]
}
