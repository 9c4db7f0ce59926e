//! Intents accepted by the narrative engine.

use hushcalc_core::ports::PermissionKind;
use hushcalc_minigames::MiniGameOutcome;
use hushcalc_story::step::StepId;
use serde::{Deserialize, Serialize};

/// Everything that can ask the engine to change state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// `=` completed a calculation.
    CalculationCompleted,
    /// Double `+`, carrying the number being typed.
    Agree {
        /// Pending calculator input.
        input: String,
    },
    /// Double `-`, carrying the number being typed.
    Decline {
        /// Pending calculator input.
        input: String,
    },
    /// The scheduler says a queued transition is due.
    CommitScheduled {
        /// Step the transition was queued from.
        from_step: StepId,
        /// Step it leads to.
        to_step: StepId,
    },
    /// A step countdown ran out.
    CountdownElapsed {
        /// Step the countdown belongs to.
        step: StepId,
    },
    /// The OS answered a permission prompt.
    PermissionResolved {
        /// Permission that was asked for.
        kind: PermissionKind,
        /// Whether it was granted.
        granted: bool,
    },
    /// The active mini-game ended.
    MiniGameFinished(MiniGameOutcome),
    /// Periodic check of the suppression windows.
    Tick,
    /// Screen-time heartbeat.
    ScreenTimeElapsed {
        /// Time to add.
        millis: u64,
    },
    /// The user muted the calculator.
    Mute,
    /// The user unmuted the calculator.
    Unmute,
    /// The session (re)started and should re-present the current step.
    Resume,
}

impl Intent {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CalculationCompleted => "calculation_completed",
            Self::Agree { .. } => "agree",
            Self::Decline { .. } => "decline",
            Self::CommitScheduled { .. } => "commit_scheduled",
            Self::CountdownElapsed { .. } => "countdown_elapsed",
            Self::PermissionResolved { .. } => "permission_resolved",
            Self::MiniGameFinished(_) => "mini_game_finished",
            Self::Tick => "tick",
            Self::ScreenTimeElapsed { .. } => "screen_time_elapsed",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Resume => "resume",
        }
    }
}

/// Why an intent changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// A suppression window is active.
    Blocked,
    /// The calculator is muted.
    Muted,
    /// The intent refers to a step the conversation has left.
    Stale,
    /// The intent is not valid in the current state.
    InvalidTransition,
    /// A mini-game holds the input.
    MiniGameActive,
    /// The calculator is not talking.
    NotConversing,
}

/// Result of handling an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// State was replaced and effects were emitted.
    Accepted,
    /// Nothing to do; state untouched.
    Unchanged,
    /// The intent was rejected; state untouched.
    Discarded(DiscardReason),
}
