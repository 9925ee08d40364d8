//! Console front end.
//!
//! - **renderer**: raw-mode crossterm implementation of `Terminal`
//! - **keymapper**: key events to session input
//! - **input**: background thread feeding the session's key stream

pub mod input;
pub mod keymapper;
pub mod renderer;

pub use input::{spawn_key_reader, spawn_line_reader};
pub use keymapper::KeyMapper;
pub use renderer::{CrosstermTerminal, Theme};
