//! Display-side accumulation of shell output.

use crate::escape::strip_escape_codes;

/// Transcript size kept by default, in bytes.
pub const DEFAULT_MAX_TRANSCRIPT_LEN: usize = 9314;

const CLEAR_SCREEN: &[u8] = b"\x1b[2J";

/// Result of adding one chunk of output to a [`Transcript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// The chunk asked for a cleared screen; earlier text was dropped
    pub cleared: bool,
    /// Sanitized text that was appended
    pub text: String,
}

/// Plain-text record of what the shell printed, as shown on the display.
///
/// Escape sequences and unprintable bytes are removed on the way in. A
/// clear-screen request empties the transcript. When the text grows past
/// `max_len` bytes, whole lines are dropped from the top.
#[derive(Debug)]
pub struct Transcript {
    content: String,
    max_len: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_TRANSCRIPT_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            content: String::new(),
            max_len,
        }
    }

    /// Add a chunk of raw shell output.
    pub fn append(&mut self, chunk: &[u8]) -> Appended {
        let cleared = chunk.windows(CLEAR_SCREEN.len()).any(|w| w == CLEAR_SCREEN);
        if cleared {
            self.content.clear();
        }

        let text = sanitize(chunk);
        self.content.push_str(&text);
        self.trim_to_max_len();

        Appended { cleared, text }
    }

    pub fn clear(&mut self) {
        self.content.clear();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// The last `rows` lines, for redrawing a screen of that height.
    pub fn visible_content(&self, rows: usize) -> String {
        if self.content.is_empty() || rows == 0 {
            return String::new();
        }

        let lines: Vec<&str> = self.content.lines().collect();
        let start = lines.len().saturating_sub(rows);
        lines[start..].join("\n")
    }

    fn trim_to_max_len(&mut self) {
        if self.content.len() <= self.max_len {
            return;
        }

        let excess = self.content.len() - self.max_len;
        // Cut at the first line break past the excess so no partial line is left
        let cut = match self.content[excess..].find('\n') {
            Some(offset) => excess + offset + 1,
            None => excess,
        };
        self.content.drain(..cut);
    }
}

/// Strip escape sequences and keep only printable ASCII and whitespace.
fn sanitize(chunk: &[u8]) -> String {
    let mut bytes = chunk.to_vec();
    strip_escape_codes(&mut bytes);
    bytes.retain(|b| b.is_ascii_graphic() || b.is_ascii_whitespace() || *b == 0x0b);
    // Only ASCII remains, so this never substitutes
    String::from_utf8_lossy(&bytes).into_owned()
}
