//! Transcript formatting and the scrollable message window.
//!
//! Pure string logic. Callers render the result however they draw the
//! terminal.

use crate::types::Message;

/// `[HH:MM:SS] name: text`, with the name already colored by the caller.
pub fn format_for_display(msg: &Message, colored_name: &str) -> String {
    format!(
        "[{}] {}: {}",
        msg.timestamp.format("%H:%M:%S"),
        colored_name,
        msg.text
    )
}

/// A fixed-height window over transcript lines.
///
/// `offset` is the index of the first visible line. While the window is
/// pinned to the bottom, new lines keep it pinned.
#[derive(Clone, Debug, Default)]
pub struct TranscriptWindow {
    height: usize,
    offset: usize,
    lines: Vec<String>,
}

impl TranscriptWindow {
    pub fn new(height: usize) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    /// Replace all lines and jump to the bottom.
    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
        self.offset = self.max_offset();
    }

    /// Append a line, following the bottom if already there.
    pub fn push(&mut self, line: impl Into<String>) {
        let pinned = self.at_bottom();
        self.lines.push(line.into());
        if pinned {
            self.offset = self.max_offset();
        }
    }

    /// Show older lines.
    pub fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    /// Show newer lines.
    pub fn scroll_down(&mut self) {
        self.offset = (self.offset + 1).min(self.max_offset());
    }

    /// Resize, keeping the offset in range and staying pinned if pinned.
    pub fn set_height(&mut self, height: usize) {
        let pinned = self.at_bottom();
        self.height = height;
        self.offset = if pinned {
            self.max_offset()
        } else {
            self.offset.min(self.max_offset())
        };
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the newest line is visible.
    pub fn at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }

    /// Visible lines, bottom-aligned: short transcripts are padded with
    /// leading newlines to fill the height.
    pub fn view(&self) -> String {
        let visible = self.lines.len().min(self.height);
        let padding = "\n".repeat(self.height - visible);
        let body = self.lines[self.offset..self.offset + visible].join("\n");
        padding + &body
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }
}
