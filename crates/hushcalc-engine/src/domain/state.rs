//! Engine state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hushcalc_core::ports::PermissionKind;
use hushcalc_story::step::{MiniGameKind, StepConfig, StepId};
use serde::{Deserialize, Serialize};

/// Number of completed calculations that wakes the calculator up.
pub const AWAKENING_THRESHOLD: u32 = 13;

/// A transition queued with the scheduler but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransition {
    /// Step the transition leads to.
    pub to_step: StepId,
    /// Message the transition waits on.
    pub message: String,
}

/// Everything the narrative engine knows. Only `NarrativeEngine` mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Completed calculations since the last conversation ended.
    pub equals_count: u32,
    /// Completed calculations ever.
    pub total_calculations: u64,
    /// Time the calculator has been on screen and unmuted.
    pub total_screen_time_ms: u64,
    /// Whether the calculator is talking.
    pub in_conversation: bool,
    /// Current step of the conversation.
    pub current_step: StepId,
    /// Last message shown.
    pub last_message: String,
    /// The step waits for a numeric answer.
    pub awaiting_number: bool,
    /// Expected answer of the current trivia step.
    pub expected_number: String,
    /// The step waits for a numbered choice.
    pub awaiting_choice: bool,
    /// Accepted choices of the current step.
    pub valid_choices: Vec<u32>,
    /// Transition queued from the current step.
    pub pending_auto_step: Option<PendingTransition>,
    /// General punishment window.
    pub timeout_until: Option<DateTime<Utc>>,
    /// Silence after a decline.
    pub silent_until: Option<DateTime<Utc>>,
    /// Lockout after a failed mini-game.
    pub scramble_punishment_until: Option<DateTime<Utc>>,
    /// Mini-game failures that carried a punishment.
    pub scramble_timeout_count: u32,
    /// Whether the user muted the calculator.
    pub is_muted: bool,
    /// Step the conversation was on when it was muted.
    pub paused_at_step: Option<StepId>,
    /// Inverted colour scheme.
    pub inverted_colors: bool,
    /// Cracked minus button.
    pub minus_damaged: bool,
    /// Broken minus button; presses are swallowed.
    pub minus_broken: bool,
    /// The story waits for an app restart.
    pub needs_restart: bool,
    /// The terms step was accepted.
    pub terms_accepted: bool,
    /// Darkened button labels.
    pub dark_buttons: BTreeSet<String>,
    /// Mini-game holding the input.
    pub active_mini_game: Option<MiniGameKind>,
    /// Permission prompt awaiting the OS answer.
    pub pending_permission: Option<PermissionKind>,
}

impl EngineState {
    /// Moves onto `id`, taking the awaiting flags from its configuration and
    /// dropping anything tied to the previous step.
    pub fn enter(&mut self, id: StepId, step: &StepConfig) {
        self.current_step = id;
        self.awaiting_number = step.awaiting_number;
        self.expected_number.clone_from(&step.expected_number);
        self.awaiting_choice = step.awaiting_choice;
        self.valid_choices.clone_from(&step.valid_choices);
        self.pending_auto_step = None;
        self.pending_permission = None;
    }

    /// Clears the awaiting flags after an answer was accepted.
    pub fn clear_awaiting(&mut self) {
        self.awaiting_number = false;
        self.expected_number.clear();
        self.awaiting_choice = false;
        self.valid_choices.clear();
    }

    /// Whether a transition is queued from the current step.
    #[must_use]
    pub fn has_pending_transition(&self) -> bool {
        self.pending_auto_step.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_derives_flags_and_drops_pending() {
        // Arrange
        let mut state = EngineState {
            pending_auto_step: Some(PendingTransition {
                to_step: 4,
                message: "x".to_owned(),
            }),
            pending_permission: Some(PermissionKind::Camera),
            ..EngineState::default()
        };
        let step = StepConfig {
            awaiting_choice: true,
            valid_choices: vec![1, 2],
            ..StepConfig::default()
        };

        // Act
        state.enter(8, &step);

        // Assert
        assert_eq!(state.current_step, 8);
        assert!(state.awaiting_choice);
        assert_eq!(state.valid_choices, vec![1, 2]);
        assert!(!state.awaiting_number);
        assert!(!state.has_pending_transition());
        assert!(state.pending_permission.is_none());
    }
}
