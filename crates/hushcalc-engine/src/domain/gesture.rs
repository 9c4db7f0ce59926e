//! Double-press detection.
//!
//! Each of `+`, `-` and `=` has its own channel. Two presses of the same
//! symbol less than the window apart are one double press; presses of
//! different symbols never combine or reset each other.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Window in which a second press counts as a double press.
pub const DOUBLE_PRESS_WINDOW_MS: i64 = 600;

/// Symbols that carry gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GestureSymbol {
    /// `+`, agree.
    Plus,
    /// `-`, decline.
    Minus,
    /// `=`.
    Equals,
}

impl GestureSymbol {
    fn channel(self) -> usize {
        match self {
            Self::Plus => 0,
            Self::Minus => 1,
            Self::Equals => 2,
        }
    }
}

/// What a press resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// First press, or a press after the window ran out.
    SinglePress(GestureSymbol),
    /// Second press inside the window.
    DoublePress(GestureSymbol),
}

/// Per-symbol double-press tracker.
#[derive(Debug, Clone)]
pub struct GestureResolver {
    window: Duration,
    last_press: [Option<DateTime<Utc>>; 3],
}

impl Default for GestureResolver {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DOUBLE_PRESS_WINDOW_MS))
    }
}

impl GestureResolver {
    /// Creates a resolver with a custom window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_press: [None; 3],
        }
    }

    /// Resolves one press of `symbol` at `now`.
    pub fn press(&mut self, symbol: GestureSymbol, now: DateTime<Utc>) -> Gesture {
        let window = self.window;
        let slot = &mut self.last_press[symbol.channel()];
        let within = slot.is_some_and(|last| {
            let elapsed = now - last;
            elapsed >= Duration::zero() && elapsed < window
        });
        if within {
            *slot = None;
            Gesture::DoublePress(symbol)
        } else {
            *slot = Some(now);
            Gesture::SinglePress(symbol)
        }
    }

    /// Forgets every armed channel.
    pub fn reset(&mut self) {
        self.last_press = [None; 3];
    }
}
