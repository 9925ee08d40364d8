//! Terminal surface using crossterm
//!
//! Writes session output straight to the console in raw mode, so the
//! session's own CR+LF and erase sequences drive the cursor.

use std::io::{self, Write};

use crossterm::{
    cursor::{MoveTo, SetCursorStyle, Show},
    execute,
    style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, SetTitle},
};
use tracing::{debug, info};

use crate::core::terminal::{Result, Terminal};

/// Console colors and cursor style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub foreground: Color,
    pub cursor_blink: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb { r: 0x1e, g: 0x1e, b: 0x1e },
            foreground: Color::Rgb { r: 0xf0, g: 0xf0, b: 0xf0 },
            cursor_blink: true,
        }
    }
}

/// Raw-mode console terminal
pub struct CrosstermTerminal {
    theme: Theme,
    /// Whether raw mode is active
    initialized: bool,
    size: (u16, u16),
}

impl CrosstermTerminal {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            initialized: false,
            size: (0, 0),
        }
    }

    /// Restore the console. Safe to call more than once.
    fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();

        // Reset attributes first so the shell prompt is not themed
        let _ = execute!(stdout, ResetColor, SetCursorStyle::DefaultUserShape, Show);
        let _ = stdout.flush();

        terminal::disable_raw_mode()?;

        // Fresh line for whatever runs next
        println!();
        Ok(())
    }
}

impl Terminal for CrosstermTerminal {
    fn open(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.initialized = true;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetBackgroundColor(self.theme.background),
            SetForegroundColor(self.theme.foreground),
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        if self.theme.cursor_blink {
            execute!(stdout, SetCursorStyle::BlinkingBlock)?;
        } else {
            execute!(stdout, SetCursorStyle::SteadyBlock)?;
        }
        stdout.flush()?;

        info!("Console opened (raw mode)");
        Ok(())
    }

    fn fit(&mut self) -> Result<(u16, u16)> {
        self.size = terminal::size()?;
        Ok(self.size)
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        debug!("Console resized {:?} -> {}x{}", self.size, cols, rows);
        self.size = (cols, rows);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(io::stdout(), SetTitle(title))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.cleanup()?;
        Ok(())
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_before_open_is_noop() {
        let mut term = CrosstermTerminal::new(Theme::default());
        assert!(term.close().is_ok());
        assert!(term.close().is_ok());
    }

    #[test]
    fn test_default_theme() {
        let theme = Theme::default();
        assert_eq!(theme.background, Color::Rgb { r: 30, g: 30, b: 30 });
        assert!(theme.cursor_blink);
    }
}
