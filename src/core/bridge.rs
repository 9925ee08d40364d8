//! Interactive input bridge
//!
//! Programs read lines with a blocking-looking `input(prompt)`. The terminal
//! delivers keystrokes asynchronously. The bridge is the suspension point
//! between the two: `request_line` writes the prompt, parks a single pending
//! request holding its own line editor and a oneshot reply, and returns the
//! receiver. `dispatch` routes keystrokes into that editor; the request is
//! removed the moment its line commits, so it resolves exactly once and no
//! handler outlives it.
//!
//! ```text
//! program ── request_line(prompt) ──► PendingRequest ◄── dispatch(chunk) ── keys
//!    ▲                                     │
//!    └──────────── oneshot (line) ◄────────┘ on Enter
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::editor::LineEditor;
use super::error::{Result, SessionError};
use super::reassembler::to_crlf;
use super::terminal::TerminalHandle;

/// The one outstanding input request
#[derive(Debug)]
struct PendingRequest {
    prompt: String,
    editor: LineEditor,
    reply: oneshot::Sender<String>,
}

#[derive(Debug, Default)]
struct BridgeState {
    pending: Option<PendingRequest>,
    detached: bool,
    submitted: usize,
}

/// Receiver side of an input request
pub type LineReceiver = oneshot::Receiver<String>;

/// Shared suspend/resume state between the program and the key stream
#[derive(Clone, Debug, Default)]
pub struct InputBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl InputBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `prompt` and register the request.
    ///
    /// Fails fast if another request is outstanding or the bridge is detached.
    pub fn request_line(&self, prompt: &str, term: &TerminalHandle) -> Result<LineReceiver> {
        let mut state = self.lock();
        if state.detached {
            return Err(SessionError::Closed);
        }
        if let Some(outstanding) = &state.pending {
            return Err(SessionError::ReentrantInputRequest {
                prompt: prompt.to_string(),
                outstanding: outstanding.prompt.clone(),
            });
        }

        term.write(&to_crlf(prompt))?;

        let (reply, receiver) = oneshot::channel();
        state.pending = Some(PendingRequest {
            prompt: prompt.to_string(),
            editor: LineEditor::new(),
            reply,
        });
        trace!("Input requested: {:?}", prompt);
        Ok(receiver)
    }

    /// Route a keystroke chunk to the pending request.
    ///
    /// Returns the committed line if this chunk completed one. Characters after
    /// the Enter that committed are discarded.
    pub fn dispatch(&self, chunk: &str, term: &TerminalHandle) -> Result<Option<String>> {
        let mut state = self.lock();
        let Some(pending) = state.pending.as_mut() else {
            trace!("No input request outstanding, dropped {:?}", chunk);
            return Ok(None);
        };

        let mut committed = None;
        for key in chunk.chars() {
            if let Some(line) = pending.editor.on_keystroke(key, term)? {
                committed = Some(line);
                break;
            }
        }
        let Some(line) = committed else {
            return Ok(None);
        };

        if let Some(request) = state.pending.take() {
            // receiver gone means the program was cancelled
            let _ = request.reply.send(line.clone());
        }
        state.submitted += 1;
        debug!("Input line submitted ({} chars)", line.chars().count());
        Ok(Some(line))
    }

    /// Whether an input request is outstanding
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Prompt of the outstanding request
    pub fn pending_prompt(&self) -> Option<String> {
        self.lock().pending.as_ref().map(|p| p.prompt.clone())
    }

    /// Number of lines submitted so far
    pub fn submitted(&self) -> usize {
        self.lock().submitted
    }

    /// Drop any pending request and refuse new ones. Idempotent.
    pub fn detach(&self) {
        let mut state = self.lock();
        state.detached = true;
        if let Some(pending) = state.pending.take() {
            debug!("Detached pending input request {:?}", pending.prompt);
        }
    }

    pub fn is_detached(&self) -> bool {
        self.lock().detached
    }
}
