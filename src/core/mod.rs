//! Core session components.
//!
//! - **terminal**: terminal surface contract, shared handle and in-memory terminal
//! - **editor**: single-line editor with echo and destructive backspace
//! - **bridge**: suspends a program's `input()` until the user submits a line
//! - **reassembler**: line-buffered program output, CR+LF normalized
//! - **typing**: human-paced replay of typed input
//! - **source**: interactive program or scripted transcript
//! - **session**: lifecycle state machine tying it together
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── TerminalHandle (open/fit/write/close + liveness)
//! └── LineSource
//!     ├── Interactive
//!     │   ├── Program (async, sees ProgramIo)
//!     │   └── InputBridge ── LineEditor
//!     └── Scripted
//!         ├── Transcript (ordered steps)
//!         └── TypingSimulator
//! ```

pub mod bridge;
pub mod clipboard;
pub mod editor;
pub mod error;
pub mod reassembler;
pub mod session;
pub mod source;
pub mod terminal;
pub mod typing;

pub use error::SessionError;
pub use session::{Session, SessionReport, SessionState};
pub use source::{LineSource, Transcript};
pub use terminal::{KeyInput, MemoryTerminal, Terminal, TerminalHandle};
