//! Terminal handle
//!
//! The session owns exactly one terminal surface. `Terminal` is the minimal
//! widget contract (open, fit, write, title, close); `TerminalHandle` wraps it
//! so the input bridge, the program output channels and the typing simulator
//! can all write to the same surface in the order their operations resume.
//!
//! The handle also carries the session-liveness flag. After `close()` every
//! write is silently dropped, so late timers or a cancelled program can never
//! paint over a finished session.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::trace;
use unicode_width::UnicodeWidthChar;

/// Upper bound for the plain-text record kept for transcript copy
const RECORD_LIMIT: usize = 256 * 1024;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Terminal unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, TerminalError>;

/// Input event delivered by the terminal (its `onData` stream)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Keystroke data: printable text or a control character
    Data(String),
    /// End the session
    Interrupt,
    /// Copy the session transcript to the clipboard
    CopyTranscript,
    /// Container resized to (cols, rows)
    Resize(u16, u16),
}

/// Receiving end of the terminal's input stream
pub type KeyReceiver = tokio::sync::mpsc::UnboundedReceiver<KeyInput>;

/// A text terminal surface
pub trait Terminal: Send {
    /// Attach to the output device
    fn open(&mut self) -> Result<()>;

    /// Fit to the container and return (cols, rows)
    fn fit(&mut self) -> Result<(u16, u16)>;

    /// Container size changed
    fn resize(&mut self, cols: u16, rows: u16) -> Result<()>;

    /// Write raw text (may contain control sequences)
    fn write(&mut self, text: &str) -> Result<()>;

    /// Set the window title
    fn set_title(&mut self, _title: &str) -> Result<()> {
        Ok(())
    }

    /// Release the output device
    fn close(&mut self) -> Result<()>;
}

struct Shared {
    terminal: Box<dyn Terminal>,
    /// Plain text of everything written, `\r` dropped, erasures applied
    record: String,
}

impl Shared {
    fn record(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '\r' => {}
                '\u{8}' => {
                    self.record.pop();
                }
                _ => self.record.push(ch),
            }
        }

        if self.record.len() > RECORD_LIMIT {
            let mut cut = self.record.len() - RECORD_LIMIT;
            while !self.record.is_char_boundary(cut) {
                cut += 1;
            }
            self.record.drain(..cut);
        }
    }
}

/// Shared, liveness-aware handle to the session's terminal
#[derive(Clone)]
pub struct TerminalHandle {
    shared: Arc<Mutex<Shared>>,
    live: Arc<AtomicBool>,
}

impl std::fmt::Debug for TerminalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalHandle")
            .field("live", &self.is_live())
            .finish()
    }
}

impl TerminalHandle {
    pub fn new(terminal: Box<dyn Terminal>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                terminal,
                record: String::new(),
            })),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the terminal and fit it to its container
    pub fn open(&self) -> Result<(u16, u16)> {
        let mut shared = self.lock();
        shared.terminal.open()?;
        shared.terminal.fit()
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        if !self.is_live() {
            return Ok(());
        }
        self.lock().terminal.resize(cols, rows)
    }

    /// Write text, or do nothing once the session is closed
    pub fn write(&self, text: &str) -> Result<()> {
        if !self.is_live() {
            trace!("Dropped write after close: {:?}", text);
            return Ok(());
        }
        let mut shared = self.lock();
        shared.terminal.write(text)?;
        shared.record(text);
        Ok(())
    }

    /// Destructively erase `ch` left of the cursor (move left, blank, move left).
    ///
    /// Zero-width characters occupy no cell, so only the record changes.
    pub fn erase(&self, ch: char) -> Result<()> {
        if !self.is_live() {
            return Ok(());
        }
        let width = ch.width().unwrap_or(0);

        let mut shared = self.lock();
        if width > 0 {
            let back = "\u{8}".repeat(width);
            shared.terminal.write(&format!("{}{}{}", back, " ".repeat(width), back))?;
        }
        // the record holds `ch` itself as its last char
        shared.record.pop();
        Ok(())
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        if !self.is_live() {
            return Ok(());
        }
        self.lock().terminal.set_title(title)
    }

    /// Session liveness; false after `close()`
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Close the terminal. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.live.swap(false, Ordering::SeqCst) {
            self.lock().terminal.close()
        } else {
            Ok(())
        }
    }

    /// Plain text of the session so far
    pub fn plain_text(&self) -> String {
        self.lock().record.clone()
    }
}

#[derive(Debug, Default)]
struct LogState {
    writes: Vec<String>,
    title: Option<String>,
    size: (u16, u16),
    opened: bool,
    closed: bool,
}

/// Shared view of what a `MemoryTerminal` received
#[derive(Clone, Debug, Default)]
pub struct WriteLog(Arc<Mutex<LogState>>);

impl WriteLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every write, in order
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// All writes concatenated
    pub fn contents(&self) -> String {
        self.lock().writes.concat()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    pub fn title(&self) -> Option<String> {
        self.lock().title.clone()
    }

    pub fn is_opened(&self) -> bool {
        self.lock().opened
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// In-memory terminal used headless and in tests
#[derive(Debug)]
pub struct MemoryTerminal {
    log: WriteLog,
}

impl Default for MemoryTerminal {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl MemoryTerminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        let log = WriteLog::default();
        log.lock().size = (cols, rows);
        Self { log }
    }

    pub fn log(&self) -> WriteLog {
        self.log.clone()
    }
}

impl Terminal for MemoryTerminal {
    fn open(&mut self) -> Result<()> {
        self.log.lock().opened = true;
        Ok(())
    }

    fn fit(&mut self) -> Result<(u16, u16)> {
        Ok(self.log.lock().size)
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.log.lock().size = (cols, rows);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.log.lock().writes.push(text.to_string());
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.log.lock().title = Some(title.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.log.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_handle() -> (TerminalHandle, WriteLog) {
        let term = MemoryTerminal::default();
        let log = term.log();
        (TerminalHandle::new(Box::new(term)), log)
    }

    #[test]
    fn test_open_fits_to_size() {
        let term = MemoryTerminal::new(100, 30);
        let log = term.log();
        let handle = TerminalHandle::new(Box::new(term));

        assert_eq!(handle.open().unwrap(), (100, 30));
        assert!(log.is_opened());
    }

    #[test]
    fn test_writes_dropped_after_close() {
        let (handle, log) = memory_handle();
        handle.write("before").unwrap();
        handle.close().unwrap();
        handle.write("after").unwrap();
        handle.set_title("late").unwrap();

        assert_eq!(log.writes(), vec!["before".to_string()]);
        assert!(log.title().is_none());
        assert!(!handle.is_live());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (handle, log) = memory_handle();
        let clone = handle.clone();
        handle.close().unwrap();
        clone.close().unwrap();

        assert!(log.is_closed());
        assert!(!clone.is_live());
    }

    #[test]
    fn test_erase_sequence_by_width() {
        let (handle, log) = memory_handle();
        handle.erase('a').unwrap();
        handle.erase('漢').unwrap();

        assert_eq!(
            log.writes(),
            vec!["\u{8} \u{8}".to_string(), "\u{8}\u{8}  \u{8}\u{8}".to_string()]
        );
    }

    #[test]
    fn test_erase_zero_width_writes_nothing() {
        let (handle, log) = memory_handle();
        handle.write("e\u{301}").unwrap();
        handle.erase('\u{301}').unwrap();

        assert_eq!(log.writes(), vec!["e\u{301}".to_string()]);
        assert_eq!(handle.plain_text(), "e");
    }

    #[test]
    fn test_plain_text_applies_erasures() {
        let (handle, _log) = memory_handle();
        handle.write("Name: ").unwrap();
        handle.write("B").unwrap();
        handle.write("o").unwrap();
        handle.erase('o').unwrap();
        handle.write("ob\r\n").unwrap();

        assert_eq!(handle.plain_text(), "Name: Bob\n");
    }
}
