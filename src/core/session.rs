//! Session controller
//!
//! Drives one terminal from open to teardown through a single line source.
//!
//! ```text
//! Initializing ──► Running ──► Completed
//!      │              │
//!      └──────────────┴──────► Failed
//! ```
//!
//! Keystrokes, program progress and pacing timers are multiplexed on one
//! task with `tokio::select!`. The only suspension points are an outstanding
//! `input()`, a typing delay and an inter-step delay.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use super::clipboard::{copy_transcript, ClipboardSink, SystemClipboard};
use super::error::SessionError;
use super::reassembler::to_crlf;
use super::source::{InteractiveSource, LineSource, ScriptedSource, TranscriptStep};
use super::terminal::{KeyInput, KeyReceiver, Terminal, TerminalHandle};
use super::typing::{split_terminator, TypingSimulator};
use crate::program::ProgramIo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Running,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Summary returned when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub state: SessionState,
    /// Transcript steps fully played (scripted sessions)
    pub steps_played: usize,
    /// Lines submitted through the input bridge (interactive sessions)
    pub lines_submitted: usize,
}

/// How the running phase ended
#[derive(Debug)]
enum Outcome {
    Finished,
    TornDown,
    Failed(SessionError),
}

/// Controller for one terminal session
pub struct Session {
    state: SessionState,
    terminal: TerminalHandle,
    source: LineSource,
    typing: TypingSimulator,
    clipboard: Box<dyn ClipboardSink>,
    steps_played: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("source", &self.source.kind())
            .field("steps_played", &self.steps_played)
            .finish()
    }
}

impl Session {
    /// Create a session; the source is fixed for its lifetime
    pub fn new(terminal: Box<dyn Terminal>, source: LineSource) -> Self {
        Self {
            state: SessionState::Initializing,
            terminal: TerminalHandle::new(terminal),
            source,
            typing: TypingSimulator::default(),
            clipboard: Box::new(SystemClipboard),
            steps_played: 0,
        }
    }

    pub fn with_typing(mut self, typing: TypingSimulator) -> Self {
        self.typing = typing;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn terminal(&self) -> TerminalHandle {
        self.terminal.clone()
    }

    pub fn report(&self) -> SessionReport {
        let lines_submitted = match &self.source {
            LineSource::Interactive(source) => source.bridge.submitted(),
            LineSource::Scripted(_) => 0,
        };
        SessionReport {
            state: self.state,
            steps_played: self.steps_played,
            lines_submitted,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.is_terminal() {
            debug!("Ignoring transition {:?} -> {:?}", self.state, next);
            return;
        }
        info!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the session to a terminal state, reading input from `keys`.
    ///
    /// A session runs once; later calls return the existing report.
    pub async fn run(&mut self, keys: &mut KeyReceiver) -> SessionReport {
        if self.state != SessionState::Initializing {
            warn!("Session already started ({:?})", self.state);
            return self.report();
        }

        if let Err(e) = self.initialize().await {
            error!("Initialization failed: {}", e);
            if let Err(write_err) = self
                .terminal
                .write(&format!("\r\nFailed to initialize: {}\r\n", e))
            {
                error!("Failed to write diagnostic: {}", write_err);
            }
            return self.finish(SessionState::Failed);
        }

        self.transition(SessionState::Running);
        info!("Running {} session", self.source.kind());

        let outcome = match &mut self.source {
            LineSource::Interactive(source) => {
                run_interactive(source, &self.terminal, self.clipboard.as_mut(), keys).await
            }
            LineSource::Scripted(source) => {
                run_scripted(
                    source,
                    &mut self.typing,
                    &mut self.steps_played,
                    &self.terminal,
                    self.clipboard.as_mut(),
                    keys,
                )
                .await
            }
        };

        match outcome {
            Outcome::Finished => self.finish(SessionState::Completed),
            Outcome::TornDown => {
                info!("Session torn down");
                self.finish(SessionState::Completed)
            }
            Outcome::Failed(e) => {
                error!("Session failed: {}", e);
                self.finish(SessionState::Failed)
            }
        }
    }

    async fn initialize(&mut self) -> Result<(), SessionError> {
        let (cols, rows) = self.terminal.open()?;
        info!("Terminal opened at {}x{}", cols, rows);
        self.terminal.write("Initializing environment...\r\n")?;

        if let LineSource::Interactive(source) = &mut self.source {
            source.program.load().await?;
            let banner = format!("Loading {}...\r\n", source.program.title());
            self.terminal.write(&banner)?;
        }
        Ok(())
    }

    fn finish(&mut self, state: SessionState) -> SessionReport {
        self.transition(state);
        self.teardown();
        self.report()
    }

    /// Detach input and close the terminal. Idempotent.
    pub fn teardown(&mut self) {
        if let LineSource::Interactive(source) = &self.source {
            source.bridge.detach();
        }
        if let Err(e) = self.terminal.close() {
            warn!("Failed to close terminal: {}", e);
        }
    }
}

/// Best-effort diagnostic straight to the terminal
fn write_failure(terminal: &TerminalHandle, e: &SessionError) {
    if let Err(write_err) = terminal.write(&format!("\r\nError: {}\r\n", e)) {
        error!("Failed to write diagnostic: {}", write_err);
    }
}

fn resize(terminal: &TerminalHandle, cols: u16, rows: u16) {
    debug!("Resize to {}x{}", cols, rows);
    if let Err(e) = terminal.resize(cols, rows) {
        warn!("Resize failed: {}", e);
    }
}

async fn run_interactive(
    source: &mut InteractiveSource,
    terminal: &TerminalHandle,
    clipboard: &mut dyn ClipboardSink,
    keys: &mut KeyReceiver,
) -> Outcome {
    let bridge = source.bridge.clone();
    let io = ProgramIo::new(terminal.clone(), bridge.clone());

    let result = {
        let mut program = source.program.run(&io);
        loop {
            // program first, so it reaches its next input() before keys are taken
            tokio::select! {
                biased;

                result = &mut program => break result.map(|()| Outcome::Finished),
                key = keys.recv() => match key {
                    Some(KeyInput::Data(chunk)) => {
                        if let Err(e) = bridge.dispatch(&chunk, terminal) {
                            break Err(e);
                        }
                    }
                    Some(KeyInput::Resize(cols, rows)) => resize(terminal, cols, rows),
                    Some(KeyInput::CopyTranscript) => copy_transcript(terminal, clipboard),
                    Some(KeyInput::Interrupt) | None => break Ok(Outcome::TornDown),
                },
            }
        }
    };

    match result {
        Ok(Outcome::Finished) => match io.flush() {
            Ok(()) => Outcome::Finished,
            Err(e) => {
                write_failure(terminal, &e);
                Outcome::Failed(e)
            }
        },
        Ok(outcome) => outcome,
        Err(SessionError::Closed) => Outcome::TornDown,
        Err(e) => {
            // stdout first so the diagnostic lands after the program's output
            let written = io
                .flush()
                .and_then(|()| io.write_stderr(&format!("\nError: {}\n", e)))
                .and_then(|()| io.flush());
            if let Err(write_err) = written {
                error!("Failed to write diagnostic: {}", write_err);
            }
            Outcome::Failed(e)
        }
    }
}

/// Drive `fut` while servicing the key stream; `None` on teardown
async fn until_interrupted<F: Future>(
    fut: F,
    keys: &mut KeyReceiver,
    terminal: &TerminalHandle,
    clipboard: &mut dyn ClipboardSink,
) -> Option<F::Output> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            biased;

            output = &mut fut => return Some(output),
            key = keys.recv() => match key {
                Some(KeyInput::Data(chunk)) => trace!("Ignored input during playback: {:?}", chunk),
                Some(KeyInput::Resize(cols, rows)) => resize(terminal, cols, rows),
                Some(KeyInput::CopyTranscript) => copy_transcript(terminal, clipboard),
                Some(KeyInput::Interrupt) | None => return None,
            },
        }
    }
}

async fn play_step(
    step: &TranscriptStep,
    typing: &mut TypingSimulator,
    terminal: &TerminalHandle,
) -> Result<(), SessionError> {
    if step.is_input {
        typing.play(&step.text, terminal).await?;
        // typed lines are always submitted
        if split_terminator(&step.text).1.is_empty() {
            terminal.write("\r\n")?;
        }
    } else {
        terminal.write(&to_crlf(&step.text))?;
    }
    Ok(())
}

async fn run_scripted(
    source: &mut ScriptedSource,
    typing: &mut TypingSimulator,
    steps_played: &mut usize,
    terminal: &TerminalHandle,
    clipboard: &mut dyn ClipboardSink,
    keys: &mut KeyReceiver,
) -> Outcome {
    while let Some(step) = source.next_step().cloned() {
        trace!("Step {}: {:?}", source.position(), step);

        let played = play_step(&step, typing, terminal);
        match until_interrupted(played, keys, terminal, clipboard).await {
            None => return Outcome::TornDown,
            Some(Err(e)) => {
                write_failure(terminal, &e);
                return Outcome::Failed(e);
            }
            Some(Ok(())) => *steps_played += 1,
        }

        if step.wait_millis == 0 {
            break;
        }
        let pause = sleep(Duration::from_millis(step.wait_millis));
        if until_interrupted(pause, keys, terminal, clipboard).await.is_none() {
            return Outcome::TornDown;
        }
    }
    Outcome::Finished
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::Transcript;
    use crate::core::terminal::{self, MemoryTerminal, TerminalError, WriteLog};
    use crate::program::{self, Program};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

    fn interactive(program: Box<dyn Program>) -> (Session, WriteLog) {
        let term = MemoryTerminal::default();
        let log = term.log();
        let session = Session::new(Box::new(term), LineSource::interactive(program))
            .with_clipboard(Box::new(NoClipboard));
        (session, log)
    }

    fn scripted(steps: Vec<TranscriptStep>) -> (Session, WriteLog) {
        let term = MemoryTerminal::default();
        let log = term.log();
        let transcript = Transcript::new(steps).unwrap();
        let session = Session::new(Box::new(term), LineSource::scripted(transcript))
            .with_typing(TypingSimulator::with_rng(80, 230, StdRng::seed_from_u64(1)))
            .with_clipboard(Box::new(NoClipboard));
        (session, log)
    }

    fn send_keys(tx: &UnboundedSender<KeyInput>, keys: &str) {
        for key in keys.chars() {
            tx.send(KeyInput::Data(key.to_string())).unwrap();
        }
    }

    struct NoClipboard;

    impl ClipboardSink for NoClipboard {
        fn set_text(&mut self, _text: String) -> Result<(), SessionError> {
            Err(SessionError::Clipboard("disabled".into()))
        }
    }

    struct Shared(Arc<Mutex<Vec<String>>>);

    impl ClipboardSink for Shared {
        fn set_text(&mut self, text: String) -> Result<(), SessionError> {
            self.0.lock().unwrap().push(text);
            Ok(())
        }
    }

    /// Prints partial output, then faults
    struct Faulty;

    #[async_trait]
    impl Program for Faulty {
        fn title(&self) -> &str {
            "Faulty"
        }

        async fn run(&mut self, io: &ProgramIo) -> Result<(), SessionError> {
            io.write_stdout("partial")?;
            Err(SessionError::fault("ZeroDivisionError: division by zero"))
        }
    }

    /// Memory terminal that rejects any write containing "boom"
    struct Flaky(MemoryTerminal);

    impl Terminal for Flaky {
        fn open(&mut self) -> terminal::Result<()> {
            self.0.open()
        }

        fn fit(&mut self) -> terminal::Result<(u16, u16)> {
            self.0.fit()
        }

        fn resize(&mut self, cols: u16, rows: u16) -> terminal::Result<()> {
            self.0.resize(cols, rows)
        }

        fn write(&mut self, text: &str) -> terminal::Result<()> {
            if text.contains("boom") {
                return Err(TerminalError::Unavailable("write rejected".into()));
            }
            self.0.write(text)
        }

        fn close(&mut self) -> terminal::Result<()> {
            self.0.close()
        }
    }

    fn flaky() -> (Box<dyn Terminal>, WriteLog) {
        let term = MemoryTerminal::default();
        let log = term.log();
        (Box::new(Flaky(term)), log)
    }

    /// Leaves an unterminated line behind for the final flush
    struct Trailing;

    #[async_trait]
    impl Program for Trailing {
        fn title(&self) -> &str {
            "Trailing"
        }

        async fn run(&mut self, io: &ProgramIo) -> Result<(), SessionError> {
            io.write_stdout("done\nboom")
        }
    }

    /// Issues two input requests at once
    struct DoubleReader;

    #[async_trait]
    impl Program for DoubleReader {
        fn title(&self) -> &str {
            "DoubleReader"
        }

        async fn run(&mut self, io: &ProgramIo) -> Result<(), SessionError> {
            tokio::try_join!(io.input("First: "), io.input("Second: "))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_interactive_greeting() {
        let (mut session, log) = interactive(program::resolve("greeter"));
        let (tx, mut rx) = unbounded_channel();

        let typist = async {
            tokio::task::yield_now().await;
            send_keys(&tx, "Name\r");
        };
        let (report, ()) = tokio::join!(session.run(&mut rx), typist);

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.lines_submitted, 1);
        assert_eq!(
            log.contents(),
            "Initializing environment...\r\nLoading Greeter...\r\nName: Name\r\nHi, Name\r\n"
        );
        assert!(log.is_closed());
    }

    #[tokio::test]
    async fn test_buffered_lines_reach_each_prompt() {
        let (mut session, log) = interactive(program::resolve("logistics"));
        let (tx, mut rx) = unbounded_channel();
        send_keys(&tx, "1\r4\rq\r0\r");
        drop(tx);

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.lines_submitted, 4);
        let out = log.contents();
        assert!(out.contains("Exiting Fleet Management...\r\n"));
        assert!(out.ends_with("Goodbye!\r\n"));
    }

    #[tokio::test]
    async fn test_line_editing_through_session() {
        let (mut session, log) = interactive(program::resolve("greeter"));
        let (tx, mut rx) = unbounded_channel();

        let typist = async {
            tokio::task::yield_now().await;
            send_keys(&tx, "Hi\u{8}i\r");
        };
        let (report, ()) = tokio::join!(session.run(&mut rx), typist);

        assert_eq!(report.state, SessionState::Completed);
        assert!(log.contents().ends_with("Hi, Hi\r\n"));
    }

    #[tokio::test]
    async fn test_execution_fault_writes_diagnostic() {
        let (mut session, log) = interactive(Box::new(Faulty));
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Failed);
        assert!(log
            .contents()
            .ends_with("partial\r\nError: ZeroDivisionError: division by zero\r\n"));
        assert!(log.is_closed());
    }

    #[tokio::test]
    async fn test_final_flush_failure_writes_diagnostic() {
        let (term, log) = flaky();
        let mut session = Session::new(term, LineSource::interactive(Box::new(Trailing)))
            .with_clipboard(Box::new(NoClipboard));
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Failed);
        assert!(log
            .contents()
            .ends_with("done\r\n\r\nError: Terminal unavailable: write rejected\r\n"));
        assert!(log.is_closed());
    }

    #[tokio::test]
    async fn test_reentrant_request_fails_session() {
        let (mut session, log) = interactive(Box::new(DoubleReader));
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Failed);
        let out = log.contents();
        assert!(out.contains("First: "));
        assert!(out.contains("Error: Reentrant input request \"Second: \""));
    }

    #[tokio::test]
    async fn test_initialization_failure_skips_running() {
        let (mut session, log) = interactive(program::resolve("tetris"));
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Failed);
        let out = log.contents();
        assert!(out.contains("Failed to initialize: Runtime failed to initialize: unknown program 'tetris'"));
        assert!(!out.contains("Loading"));
    }

    #[tokio::test]
    async fn test_interrupt_detaches_pending_input() {
        let (mut session, log) = interactive(program::resolve("logistics"));
        let (tx, mut rx) = unbounded_channel();

        let typist = async {
            tokio::task::yield_now().await;
            send_keys(&tx, "1");
            tx.send(KeyInput::Interrupt).unwrap();
            // after teardown: must not be echoed
            send_keys(&tx, "2\r");
        };
        let (report, ()) = tokio::join!(session.run(&mut rx), typist);

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.lines_submitted, 0);
        let out = log.contents();
        assert!(out.ends_with("Enter your choice: 1"));
        assert!(log.is_closed());

        session.teardown();
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_session_runs_once() {
        let (mut session, log) = interactive(Box::new(Faulty));
        let (_tx, mut rx) = unbounded_channel();

        session.run(&mut rx).await;
        let writes = log.write_count();
        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Failed);
        assert_eq!(log.write_count(), writes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_playback_completes() {
        let steps = vec![
            TranscriptStep::output("=== Menu ===\n1. Fleet\n", 400),
            TranscriptStep::output("Enter your choice: ", 500),
            TranscriptStep::input("1\n", 300),
            TranscriptStep::output("Exiting...\n", 0),
        ];
        let (mut session, log) = scripted(steps);
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.steps_played, 4);
        assert_eq!(
            log.contents(),
            "Initializing environment...\r\n=== Menu ===\r\n1. Fleet\r\nEnter your choice: 1\r\nExiting...\r\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_transcript_plays_every_step() {
        let transcript = Transcript::demo().unwrap();
        let expected = transcript.len();
        let term = MemoryTerminal::default();
        let log = term.log();
        let mut session = Session::new(Box::new(term), LineSource::scripted(transcript))
            .with_clipboard(Box::new(NoClipboard));
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.steps_played, expected);
        assert!(log.contents().ends_with("Goodbye!\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_write_failure_writes_diagnostic() {
        let (term, log) = flaky();
        let transcript = Transcript::new(vec![
            TranscriptStep::output("ok\n", 10),
            TranscriptStep::output("boom\n", 0),
        ])
        .unwrap();
        let mut session = Session::new(term, LineSource::scripted(transcript))
            .with_clipboard(Box::new(NoClipboard));
        let (_tx, mut rx) = unbounded_channel();

        let report = session.run(&mut rx).await;

        assert_eq!(report.state, SessionState::Failed);
        assert_eq!(report.steps_played, 1);
        assert_eq!(
            log.contents(),
            "Initializing environment...\r\nok\r\n\r\nError: Terminal unavailable: write rejected\r\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_input_without_terminator_is_submitted() {
        let (mut session, log) = scripted(vec![TranscriptStep::input("q", 0)]);
        let (_tx, mut rx) = unbounded_channel();

        session.run(&mut rx).await;

        assert!(log.contents().ends_with("q\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_typing_stops_writes() {
        let (mut session, log) = scripted(vec![
            TranscriptStep::input("a long typed line\n", 100),
            TranscriptStep::output("never shown\n", 0),
        ]);
        let (tx, mut rx) = unbounded_channel();

        let interrupt = async {
            sleep(Duration::from_millis(500)).await;
            tx.send(KeyInput::Interrupt).unwrap();
        };
        let (report, ()) = tokio::join!(session.run(&mut rx), interrupt);

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.steps_played, 0);
        let out = log.contents();
        assert!(!out.contains("never shown"));
        assert!(!out.contains("a long typed line"));

        // no late writes once closed
        let writes = log.write_count();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(log.write_count(), writes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_during_playback_keeps_running() {
        let copied = Arc::new(Mutex::new(Vec::new()));
        let term = MemoryTerminal::default();
        let log = term.log();
        let transcript = Transcript::new(vec![
            TranscriptStep::output("first\n", 1000),
            TranscriptStep::output("second\n", 0),
        ])
        .unwrap();
        let mut session = Session::new(Box::new(term), LineSource::scripted(transcript))
            .with_clipboard(Box::new(Shared(copied.clone())));
        let (tx, mut rx) = unbounded_channel();

        let copy = async {
            sleep(Duration::from_millis(500)).await;
            tx.send(KeyInput::CopyTranscript).unwrap();
            tx.send(KeyInput::Data("x".into())).unwrap();
        };
        let (report, ()) = tokio::join!(session.run(&mut rx), copy);

        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.steps_played, 2);
        assert_eq!(
            *copied.lock().unwrap(),
            vec!["Initializing environment...\nfirst\n".to_string()]
        );
        assert_eq!(log.title().as_deref(), Some("lmsterm - transcript copied"));
        assert!(!log.contents().contains('x'));
    }
}
