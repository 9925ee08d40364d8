//! Typing simulator
//!
//! Replays a line character by character with a random pause before each
//! character. The trailing line terminator is written as one unit after the
//! last character. Liveness is checked before every write.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

use super::terminal::{Result, TerminalHandle};

/// Default lower bound of the per-character delay
pub const MIN_DELAY_MS: u64 = 80;
/// Default upper bound of the per-character delay
pub const MAX_DELAY_MS: u64 = 230;

/// Split off a trailing `\r\n` or `\n`
pub fn split_terminator(text: &str) -> (&str, &str) {
    if let Some(body) = text.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = text.strip_suffix('\n') {
        (body, "\n")
    } else {
        (text, "")
    }
}

#[derive(Debug)]
pub struct TypingSimulator {
    min_delay: u64,
    max_delay: u64,
    rng: StdRng,
}

impl Default for TypingSimulator {
    fn default() -> Self {
        Self::new(MIN_DELAY_MS, MAX_DELAY_MS)
    }
}

impl TypingSimulator {
    /// Bounds are in milliseconds; reversed bounds are swapped
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self::with_rng(min_delay_ms, max_delay_ms, StdRng::from_entropy())
    }

    pub fn with_rng(min_delay_ms: u64, max_delay_ms: u64, rng: StdRng) -> Self {
        Self {
            min_delay: min_delay_ms.min(max_delay_ms),
            max_delay: min_delay_ms.max(max_delay_ms),
            rng,
        }
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay),
            Duration::from_millis(self.max_delay),
        )
    }

    /// Draw the next per-character delay
    pub fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(self.min_delay..=self.max_delay))
    }

    /// Type `text` into `term`.
    ///
    /// Returns the number of characters written, excluding the terminator.
    /// Stops early without error when the session closes mid-line.
    pub async fn play(&mut self, text: &str, term: &TerminalHandle) -> Result<usize> {
        let (body, terminator) = split_terminator(text);
        let mut written = 0;
        let mut utf8 = [0u8; 4];

        for ch in body.chars() {
            sleep(self.next_delay()).await;
            if !term.is_live() {
                return Ok(written);
            }
            term.write(ch.encode_utf8(&mut utf8))?;
            written += 1;
        }

        if !terminator.is_empty() && term.is_live() {
            term.write("\r\n")?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::terminal::MemoryTerminal;

    fn seeded(min: u64, max: u64) -> TypingSimulator {
        TypingSimulator::with_rng(min, max, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_split_terminator() {
        assert_eq!(split_terminator("1\r\n"), ("1", "\r\n"));
        assert_eq!(split_terminator("fleet\n"), ("fleet", "\n"));
        assert_eq!(split_terminator("fleet"), ("fleet", ""));
        assert_eq!(split_terminator(""), ("", ""));
    }

    #[test]
    fn test_delays_within_bounds() {
        let mut typing = seeded(MIN_DELAY_MS, MAX_DELAY_MS);
        let (min, max) = typing.bounds();
        for _ in 0..1000 {
            let delay = typing.next_delay();
            assert!(delay >= min && delay <= max, "delay {:?}", delay);
        }
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let typing = seeded(300, 100);
        assert_eq!(
            typing.bounds(),
            (Duration::from_millis(100), Duration::from_millis(300))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_writes_each_char_then_terminator() {
        let term = MemoryTerminal::default();
        let log = term.log();
        let handle = TerminalHandle::new(Box::new(term));
        let mut typing = seeded(MIN_DELAY_MS, MAX_DELAY_MS);

        let written = typing.play("VTRUCK1\n", &handle).await.unwrap();

        assert_eq!(written, 7);
        let writes = log.writes();
        assert_eq!(writes.len(), 8);
        assert_eq!(writes.last().map(String::as_str), Some("\r\n"));
        assert_eq!(log.contents(), "VTRUCK1\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_takes_bounded_time() {
        let handle = TerminalHandle::new(Box::new(MemoryTerminal::default()));
        let mut typing = seeded(MIN_DELAY_MS, MAX_DELAY_MS);

        let start = tokio::time::Instant::now();
        typing.play("abcd", &handle).await.unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(4 * MIN_DELAY_MS));
        assert!(elapsed <= Duration::from_millis(4 * MAX_DELAY_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_stops_when_closed() {
        let term = MemoryTerminal::default();
        let log = term.log();
        let handle = TerminalHandle::new(Box::new(term));
        let closer = handle.clone();
        let mut typing = seeded(100, 100);

        let play = typing.play("shipment\n", &handle);
        let close = async {
            sleep(Duration::from_millis(250)).await;
            closer.close().unwrap();
        };
        let (written, ()) = tokio::join!(play, close);

        assert_eq!(written.unwrap(), 2);
        assert_eq!(log.contents(), "sh");
    }
}
