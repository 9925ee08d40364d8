//! Key mapping for terminal input
//!
//! Converts crossterm key events into the session's input stream. Editing
//! is line-based, so only printable characters, Enter, Backspace, Tab and
//! control characters are forwarded.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::terminal::KeyInput;

bitflags! {
    /// Modifier keys that change a key's meaning; Shift is already in the char
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0001;
        const ALT  = 0b0010;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Key mapper for converting key events to session input
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent, or `None` when the key has no meaning here
    pub fn map(event: &KeyEvent) -> Option<KeyInput> {
        let mods = Modifiers::from(event.modifiers);
        if mods.contains(Modifiers::ALT) {
            return None;
        }

        match event.code {
            KeyCode::Char(ch) if mods.contains(Modifiers::CTRL) => Self::map_ctrl(ch),
            KeyCode::Char(ch) => Some(KeyInput::Data(ch.to_string())),
            KeyCode::Enter => Some(KeyInput::Data("\r".to_string())),
            KeyCode::Backspace => Some(KeyInput::Data("\u{8}".to_string())),
            KeyCode::Tab => Some(KeyInput::Data("\t".to_string())),
            _ => None,
        }
    }

    /// Ctrl + key: session commands, otherwise the control character
    fn map_ctrl(ch: char) -> Option<KeyInput> {
        match ch.to_ascii_lowercase() {
            'c' | 'd' => Some(KeyInput::Interrupt),
            'y' => Some(KeyInput::CopyTranscript),
            // Ctrl+H is a backspace on most terminals
            lower @ 'a'..='z' => {
                let code = (lower as u8) - b'a' + 1;
                Some(KeyInput::Data(char::from(code).to_string()))
            }
            _ => None,
        }
    }
}
