//! Output reassembly
//!
//! Program output arrives as arbitrary fragments. Lines are only emitted once
//! their line feed has arrived, converted to CR+LF for the terminal. The
//! trailing partial line stays buffered until more output or `flush()`.

/// Convert lone line feeds to CR+LF, leaving existing CR+LF untouched
pub fn to_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = '\0';
    for ch in text.chars() {
        if ch == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(ch);
        prev = ch;
    }
    out
}

/// Per-channel line reassembly buffer
#[derive(Debug, Default)]
pub struct OutputReassembler {
    buffer: String,
}

impl OutputReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every line it completed, CR+LF terminated
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete
            .split_terminator('\n')
            .map(|line| format!("{}\r\n", line))
            .collect()
    }

    /// Take any retained partial line as-is
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Retained partial line
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_emitted_on_newline_boundary() {
        let mut out = OutputReassembler::new();

        assert!(out.feed("Load").is_empty());
        assert_eq!(out.feed("ing...\n"), vec!["Loading...\r\n".to_string()]);
        assert_eq!(out.feed("done\n"), vec!["done\r\n".to_string()]);
        assert_eq!(out.pending(), "");
        assert_eq!(out.flush(), None);
    }

    #[test]
    fn test_multiple_lines_and_blank_lines() {
        let mut out = OutputReassembler::new();
        assert_eq!(
            out.feed("\n=== Menu ===\n1. Fleet\n2."),
            vec!["\r\n", "=== Menu ===\r\n", "1. Fleet\r\n"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(out.pending(), "2.");
        assert_eq!(out.flush().as_deref(), Some("2."));
        assert_eq!(out.pending(), "");
    }

    #[test]
    fn test_fragments_round_trip() {
        let text = "Vehicle ID: 1\nType: Truck\n\nCapacity: 5000\nStatus: Avail";

        // every way of cutting the text into two or three fragments
        let cuts: Vec<usize> = (0..=text.len()).collect();
        for &a in &cuts {
            for &b in cuts.iter().filter(|&&b| b >= a).step_by(7) {
                let mut out = OutputReassembler::new();
                let mut emitted = String::new();
                for fragment in [&text[..a], &text[a..b], &text[b..]] {
                    for line in out.feed(fragment) {
                        emitted.push_str(&line.replace("\r\n", "\n"));
                    }
                }
                emitted.push_str(&out.flush().unwrap_or_default());
                assert_eq!(emitted, text, "cuts at {} and {}", a, b);
            }
        }
    }

    #[test]
    fn test_to_crlf() {
        assert_eq!(to_crlf("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(to_crlf("\n\n"), "\r\n\r\n");
        assert_eq!(to_crlf("no newline"), "no newline");
    }

    #[test]
    fn test_channels_do_not_mix() {
        let mut stdout = OutputReassembler::new();
        let mut stderr = OutputReassembler::new();

        assert!(stdout.feed("Enter wei").is_empty());
        assert_eq!(stderr.feed("Traceback\n"), vec!["Traceback\r\n".to_string()]);
        assert_eq!(stdout.feed("ght\n"), vec!["Enter weight\r\n".to_string()]);
    }
}
