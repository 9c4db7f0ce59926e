//! Effects emitted by the narrative engine.
//!
//! The engine never performs I/O. Everything it wants done is described here
//! and carried out by the session, in order.

use hushcalc_core::ports::PermissionKind;
use hushcalc_story::step::{MiniGameSpec, StepId};
use serde::Serialize;

use super::projection::VisualProjection;

/// Who asked for a scheduled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOrigin {
    /// A step's own continuation.
    Engine,
    /// The content-keyed monologue table.
    Monologue,
}

/// A transition to commit later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRequest {
    /// Step the transition is queued from.
    pub from_step: StepId,
    /// Step it leads to, `TERMINAL` to end the conversation.
    pub to_step: StepId,
    /// Whether to wait for the current message to finish typing.
    pub wait_for_typing: bool,
    /// Extra delay after typing.
    pub delay_ms: u64,
    /// Who asked.
    pub origin: ScheduleOrigin,
}

/// One thing the session has to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Start typing a new message.
    ShowMessage {
        /// Full text.
        text: String,
    },
    /// Blank the message area.
    ClearMessage,
    /// Queue a transition.
    Schedule(ScheduleRequest),
    /// Drop every queued transition.
    CancelSchedules,
    /// Hand the input to a mini-game.
    StartMiniGame(MiniGameSpec),
    /// Take the input back from the mini-game.
    StopMiniGame,
    /// Start the one-second countdown of a step.
    StartCountdown {
        /// Step the countdown belongs to.
        step: StepId,
        /// Length.
        seconds: u32,
    },
    /// Freeze typing, schedules, countdowns and mini-game timers.
    HaltTickers,
    /// Unfreeze them.
    ResumeTickers,
    /// Ask the OS for a permission.
    RequestPermission {
        /// Permission to ask for.
        kind: PermissionKind,
    },
    /// Open a URL.
    OpenExternalLink {
        /// Target.
        url: String,
    },
    /// Write the disclosure letter.
    WriteDisclosureFile,
    /// Schedule an OS notification.
    ScheduleNotification {
        /// Delay.
        minutes: u32,
    },
    /// Vibrate.
    HapticPulse {
        /// Length.
        duration_ms: u32,
        /// Strength.
        amplitude: u8,
    },
    /// The visual projection changed.
    VisualChanged(VisualProjection),
    /// The conversation is over.
    ConversationEnded,
    /// The state should be saved.
    Persist,
}
