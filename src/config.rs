//! Configuration management for lmsterm.
//!
//! Settings are loaded from `~/.lmsterm/config.toml`. Every field has a
//! default, so a partial (or missing) file is fine:
//!
//! ```toml
//! # interactive | scripted
//! mode = "interactive"
//!
//! # Built-in program for interactive mode: logistics, greeter
//! program = "logistics"
//!
//! # Transcript for scripted mode (embedded demo when unset)
//! # transcript = "~/demo.toml"
//!
//! [typing]
//! min_delay_ms = 80
//! max_delay_ms = 230
//!
//! [theme]
//! background = "#1e1e1e"
//! foreground = "#f0f0f0"
//! cursor_blink = true
//! ```

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::source::SourceKind;
use crate::core::typing::{MAX_DELAY_MS, MIN_DELAY_MS};
use crate::ui::Theme;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line source for the session
    pub mode: SourceKind,
    /// Built-in program name
    pub program: String,
    /// Transcript file for scripted mode
    pub transcript: Option<PathBuf>,
    pub typing: TypingConfig,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: SourceKind::Interactive,
            program: "logistics".to_string(),
            transcript: None,
            typing: TypingConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

/// Typing simulation bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: MIN_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
        }
    }
}

/// Console theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub background: String,
    pub foreground: String,
    pub cursor_blink: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: "#1e1e1e".to_string(),
            foreground: "#f0f0f0".to_string(),
            cursor_blink: true,
        }
    }
}

impl ThemeConfig {
    /// Resolve to console colors; invalid colors keep the defaults
    pub fn to_theme(&self) -> Theme {
        let fallback = Theme::default();
        let color = |value: &str, default: crossterm::style::Color| match Color::parse(value) {
            Some(color) => color.to_crossterm(),
            None => {
                warn!("Invalid color {:?}, using default", value);
                default
            }
        };
        Theme {
            background: color(&self.background, fallback.background),
            foreground: color(&self.foreground, fallback.foreground),
            cursor_blink: self.cursor_blink,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(content) => return Self::parse(&content),
                    Err(e) => warn!("Failed to read {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Parse configuration text; malformed input yields defaults
    pub fn parse(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Malformed config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        app_dir().map(|dir| dir.join("config.toml"))
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// `~/.lmsterm`, created on first use
pub fn app_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".lmsterm");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
