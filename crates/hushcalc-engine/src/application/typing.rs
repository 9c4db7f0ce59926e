//! Character-by-character reveal of a message.

use chrono::{DateTime, Utc};

/// Default reveal speed.
pub const DEFAULT_MS_PER_CHAR: u64 = 45;

/// One frame for `PresentationPort::on_message_changed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingFrame {
    /// Visible prefix.
    pub text: String,
    /// Whether more characters are still to come.
    pub is_typing: bool,
}

impl TypingFrame {
    fn blank() -> Self {
        Self {
            text: String::new(),
            is_typing: false,
        }
    }
}

/// Reveal cursor over the current message, driven by elapsed clock time.
#[derive(Debug, Clone)]
pub struct TypingAnimation {
    ms_per_char: u64,
    text: Vec<char>,
    started_at: Option<DateTime<Utc>>,
    shown: usize,
}

impl Default for TypingAnimation {
    fn default() -> Self {
        Self::new(DEFAULT_MS_PER_CHAR)
    }
}

impl TypingAnimation {
    /// Creates an idle animation.
    #[must_use]
    pub fn new(ms_per_char: u64) -> Self {
        Self {
            ms_per_char: ms_per_char.max(1),
            text: Vec::new(),
            started_at: None,
            shown: 0,
        }
    }

    /// Starts revealing `text` from empty. Returns the first frame.
    pub fn start(&mut self, text: &str, now: DateTime<Utc>) -> TypingFrame {
        self.text = text.chars().collect();
        self.shown = 0;
        if self.text.is_empty() {
            self.started_at = None;
            return TypingFrame::blank();
        }
        self.started_at = Some(now);
        TypingFrame {
            text: String::new(),
            is_typing: true,
        }
    }

    /// Advances the cursor to `now`. Returns a frame only when more
    /// characters became visible.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<TypingFrame> {
        let started_at = self.started_at?;
        let elapsed = u64::try_from((now - started_at).num_milliseconds()).unwrap_or(0);
        let due = usize::try_from(elapsed / self.ms_per_char)
            .unwrap_or(usize::MAX)
            .min(self.text.len());
        if due <= self.shown {
            return None;
        }
        self.shown = due;
        let done = due == self.text.len();
        if done {
            self.started_at = None;
        }
        Some(TypingFrame {
            text: self.visible(),
            is_typing: !done,
        })
    }

    /// Stops revealing. Returns the blank frame if a message was typing.
    pub fn cancel(&mut self) -> Option<TypingFrame> {
        let was_typing = self.started_at.take().is_some();
        self.text.clear();
        self.shown = 0;
        was_typing.then(TypingFrame::blank)
    }

    /// Whether the whole message is visible (or nothing is typing).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.started_at.is_none()
    }

    /// Currently visible prefix.
    #[must_use]
    pub fn visible(&self) -> String {
        self.text[..self.shown].iter().collect()
    }
}
