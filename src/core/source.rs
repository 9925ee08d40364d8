//! Line sources
//!
//! A session is fed by exactly one source, chosen at startup:
//!
//! - **Interactive**: a hosted program whose `input()` calls go through the
//!   input bridge and whose output goes through the reassemblers
//! - **Scripted**: a fixed transcript of steps replayed with simulated typing

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bridge::InputBridge;
use crate::program::Program;

/// Transcript shipped with the binary
pub const DEMO_TRANSCRIPT: &str = include_str!("../../assets/demo_transcript.toml");

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Failed to read transcript: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse transcript: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Transcript has no steps")]
    Empty,

    #[error("Step {index} has wait_millis = 0 but is not the last step")]
    PrematureEnd { index: usize },
}

/// One scripted unit of the demo session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptStep {
    pub text: String,
    #[serde(default)]
    pub wait_millis: u64,
    #[serde(default)]
    pub is_input: bool,
}

impl TranscriptStep {
    pub fn output(text: &str, wait_millis: u64) -> Self {
        Self {
            text: text.to_string(),
            wait_millis,
            is_input: false,
        }
    }

    pub fn input(text: &str, wait_millis: u64) -> Self {
        Self {
            text: text.to_string(),
            wait_millis,
            is_input: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptFile {
    #[serde(default)]
    step: Vec<TranscriptStep>,
}

/// Validated, immutable step list
#[derive(Debug, Clone)]
pub struct Transcript {
    steps: Vec<TranscriptStep>,
}

impl Transcript {
    /// A zero wait ends playback, so it may only appear on the last step
    pub fn new(steps: Vec<TranscriptStep>) -> Result<Self, TranscriptError> {
        if steps.is_empty() {
            return Err(TranscriptError::Empty);
        }
        let last = steps.len() - 1;
        if let Some(index) = steps[..last].iter().position(|s| s.wait_millis == 0) {
            return Err(TranscriptError::PrematureEnd { index });
        }
        Ok(Self { steps })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TranscriptError> {
        let file: TranscriptFile = toml::from_str(content)?;
        Self::new(file.step)
    }

    pub fn load(path: &Path) -> Result<Self, TranscriptError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// The embedded demo transcript
    pub fn demo() -> Result<Self, TranscriptError> {
        Self::from_toml_str(DEMO_TRANSCRIPT)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Forward-only cursor over a transcript
#[derive(Debug)]
pub struct ScriptedSource {
    transcript: Transcript,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            cursor: 0,
        }
    }

    /// Next step, advancing the cursor. `None` once exhausted, forever.
    pub fn next_step(&mut self) -> Option<&TranscriptStep> {
        let step = self.transcript.steps.get(self.cursor)?;
        self.cursor += 1;
        Some(step)
    }

    /// Number of steps handed out so far
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.transcript.len() - self.cursor
    }
}

/// Program plus the bridge its `input()` calls suspend on
pub struct InteractiveSource {
    pub program: Box<dyn Program>,
    pub bridge: InputBridge,
}

impl std::fmt::Debug for InteractiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveSource")
            .field("program", &self.program.title())
            .field("bridge", &self.bridge)
            .finish()
    }
}

impl InteractiveSource {
    pub fn new(program: Box<dyn Program>) -> Self {
        Self {
            program,
            bridge: InputBridge::new(),
        }
    }
}

/// Which line source a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Interactive,
    Scripted,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::Scripted => write!(f, "scripted"),
        }
    }
}

#[derive(Debug)]
pub enum LineSource {
    Interactive(InteractiveSource),
    Scripted(ScriptedSource),
}

impl LineSource {
    pub fn interactive(program: Box<dyn Program>) -> Self {
        Self::Interactive(InteractiveSource::new(program))
    }

    pub fn scripted(transcript: Transcript) -> Self {
        Self::Scripted(ScriptedSource::new(transcript))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Interactive(_) => SourceKind::Interactive,
            Self::Scripted(_) => SourceKind::Scripted,
        }
    }
}
