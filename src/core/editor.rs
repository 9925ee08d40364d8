//! Line editor
//!
//! Accumulates keystrokes into a line buffer and echoes accepted input.
//! Enter commits the buffer, Backspace (BS or DEL) erases one character.
//! There is no history or cursor navigation.

use super::terminal::{Result, TerminalHandle};

const ENTER: char = '\r';
const BACKSPACE: char = '\u{8}';
const DELETE: char = '\u{7f}';

/// Editable line buffer for one input request
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one keystroke, echoing to `term`.
    ///
    /// Returns the committed line on Enter and clears the buffer.
    pub fn on_keystroke(&mut self, key: char, term: &TerminalHandle) -> Result<Option<String>> {
        match key {
            ENTER => {
                term.write("\r\n")?;
                Ok(Some(std::mem::take(&mut self.buffer)))
            }
            BACKSPACE | DELETE => {
                // Empty buffer: no echo
                if let Some(erased) = self.buffer.pop() {
                    term.erase(erased)?;
                }
                Ok(None)
            }
            ch if ch.is_control() => Ok(None),
            ch => {
                self.buffer.push(ch);
                let mut utf8 = [0u8; 4];
                term.write(ch.encode_utf8(&mut utf8))?;
                Ok(None)
            }
        }
    }

    /// Current buffer contents
    pub fn line(&self) -> &str {
        &self.buffer
    }

    /// Buffer length in characters
    pub fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
