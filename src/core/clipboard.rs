//! Transcript copy to the system clipboard
//!
//! Failures here never end the session; they surface as a transient title.

use tracing::{debug, warn};

use super::error::{Result, SessionError};
use super::terminal::TerminalHandle;

pub trait ClipboardSink: Send {
    fn set_text(&mut self, text: String) -> Result<()>;
}

/// Clipboard backed by `arboard`, opened per copy
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| SessionError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| SessionError::Clipboard(e.to_string()))
    }
}

/// Copy the session's plain text and report the result in the title
pub fn copy_transcript(terminal: &TerminalHandle, clipboard: &mut dyn ClipboardSink) {
    let text = terminal.plain_text();
    let chars = text.chars().count();

    let title = match clipboard.set_text(text) {
        Ok(()) => {
            debug!("Copied {} chars to clipboard", chars);
            "lmsterm - transcript copied"
        }
        Err(e) => {
            warn!("Transcript copy failed: {}", e);
            "lmsterm - copy failed"
        }
    };

    if let Err(e) = terminal.set_title(title) {
        debug!("Failed to set title: {}", e);
    }
}
