//! Shared input and result types.

use hushcalc_story::step::MiniGameKind;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Still accepting input.
    Running,
    /// Won.
    Completed,
    /// Lost.
    Failed,
}

/// Raw input routed to the active game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MiniGameInput {
    /// A calculator button was clicked (whack-a-mole).
    ButtonClick {
        /// Button label, e.g. `"7"`.
        label: String,
    },
    /// Two floating letters were dragged together (keyboard chaos).
    ConnectTokens {
        /// First token id.
        from: usize,
        /// Second token id.
        to: usize,
    },
    /// A floating letter was tapped (keyboard chaos).
    TapToken {
        /// Token id.
        id: usize,
    },
    /// A grid cell was added to the selection (word game).
    SelectCell {
        /// Row, 0 at the top.
        row: usize,
        /// Column, 0 at the left.
        col: usize,
    },
    /// The current selection was submitted as a word (word game).
    SubmitWord,
    /// The current selection was dropped (word game).
    ClearSelection,
    /// A tile in the pool was picked up (scramble).
    SelectTile {
        /// Tile index.
        index: usize,
    },
    /// A slot was tapped (scramble).
    SelectSlot {
        /// Slot index.
        index: usize,
    },
}

/// Result reported to the engine when a game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGameOutcome {
    /// Which game ended.
    pub kind: MiniGameKind,
    /// Whether it was won.
    pub completed: bool,
    /// Round that was played.
    pub round: u8,
}

impl MiniGameOutcome {
    /// Builds an outcome from a terminal status. Returns `None` while running.
    #[must_use]
    pub fn from_status(kind: MiniGameKind, round: u8, status: GameStatus) -> Option<Self> {
        match status {
            GameStatus::Running => None,
            GameStatus::Completed => Some(Self {
                kind,
                completed: true,
                round,
            }),
            GameStatus::Failed => Some(Self {
                kind,
                completed: false,
                round,
            }),
        }
    }
}
