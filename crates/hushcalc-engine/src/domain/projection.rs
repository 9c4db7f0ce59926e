//! Presentation-only view of the engine state.

use hushcalc_story::step::MiniGameKind;
use serde::Serialize;

use super::state::EngineState;

/// What the screen should look like, derived from `EngineState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualProjection {
    /// Inverted colour scheme.
    pub inverted_colors: bool,
    /// Darkened button labels, sorted.
    pub dark_buttons: Vec<String>,
    /// Cracked minus button.
    pub minus_damaged: bool,
    /// Broken minus button.
    pub minus_broken: bool,
    /// Muted indicator.
    pub muted: bool,
    /// Mini-game overlay.
    pub mini_game: Option<MiniGameKind>,
}

impl From<&EngineState> for VisualProjection {
    fn from(state: &EngineState) -> Self {
        Self {
            inverted_colors: state.inverted_colors,
            dark_buttons: state.dark_buttons.iter().cloned().collect(),
            minus_damaged: state.minus_damaged,
            minus_broken: state.minus_broken,
            muted: state.is_muted,
            mini_game: state.active_mini_game,
        }
    }
}
