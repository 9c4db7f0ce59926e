//! Suppression windows.
//!
//! Three independent absolute deadlines block narrative input: the general
//! timeout after a wrong answer, the silence after a decline and the lockout
//! after a failed mini-game. Arithmetic is never blocked. Expiry is noticed
//! lazily, on the next intent, or eagerly by the periodic tick.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::EngineState;

/// Which window is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// Wrong answer timeout.
    Timeout,
    /// Decline silence.
    Silence,
    /// Mini-game failure lockout.
    Punishment,
}

/// Result of checking the windows at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// No window is set.
    Open,
    /// A window is still running. `until` is the latest active deadline.
    Blocked {
        /// The window that ends last.
        kind: WindowKind,
        /// When it ends.
        until: DateTime<Utc>,
    },
    /// Every window that was set has run out but has not been cleared yet.
    Expired,
}

/// Reads and clears the suppression windows of an `EngineState`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutController;

impl TimeoutController {
    fn windows(state: &EngineState) -> [(WindowKind, Option<DateTime<Utc>>); 3] {
        [
            (WindowKind::Timeout, state.timeout_until),
            (WindowKind::Silence, state.silent_until),
            (WindowKind::Punishment, state.scramble_punishment_until),
        ]
    }

    /// Checks the windows at `now`.
    #[must_use]
    pub fn gate(state: &EngineState, now: DateTime<Utc>) -> Gate {
        let windows = Self::windows(state);
        let active = windows
            .iter()
            .filter_map(|(kind, until)| until.filter(|u| now < *u).map(|u| (*kind, u)))
            .max_by_key(|(_, until)| *until);
        if let Some((kind, until)) = active {
            return Gate::Blocked { kind, until };
        }
        if windows.iter().any(|(_, until)| until.is_some()) {
            Gate::Expired
        } else {
            Gate::Open
        }
    }

    /// Whether narrative input is blocked at `now`.
    #[must_use]
    pub fn is_blocked(state: &EngineState, now: DateTime<Utc>) -> bool {
        matches!(Self::gate(state, now), Gate::Blocked { .. })
    }

    /// Drops every window that has run out. Returns the kinds cleared.
    pub fn clear_expired(state: &mut EngineState, now: DateTime<Utc>) -> Vec<WindowKind> {
        let mut cleared = Vec::new();
        for (kind, slot) in [
            (WindowKind::Timeout, &mut state.timeout_until),
            (WindowKind::Silence, &mut state.silent_until),
            (WindowKind::Punishment, &mut state.scramble_punishment_until),
        ] {
            if slot.is_some_and(|until| now >= until) {
                *slot = None;
                cleared.push(kind);
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hushcalc_test_support::test_epoch;

    #[test]
    fn test_no_windows_is_open() {
        assert_eq!(
            TimeoutController::gate(&EngineState::default(), test_epoch()),
            Gate::Open
        );
    }

    #[test]
    fn test_latest_active_window_wins() {
        let now = test_epoch();
        let state = EngineState {
            timeout_until: Some(now + Duration::minutes(1)),
            silent_until: Some(now + Duration::minutes(2)),
            scramble_punishment_until: Some(now - Duration::minutes(1)),
            ..EngineState::default()
        };

        let gate = TimeoutController::gate(&state, now);

        assert_eq!(
            gate,
            Gate::Blocked {
                kind: WindowKind::Silence,
                until: now + Duration::minutes(2)
            }
        );
    }

    #[test]
    fn test_deadline_is_exclusive() {
        let now = test_epoch();
        let state = EngineState {
            timeout_until: Some(now),
            ..EngineState::default()
        };

        assert_eq!(TimeoutController::gate(&state, now), Gate::Expired);
        assert!(!TimeoutController::is_blocked(&state, now));
    }

    #[test]
    fn test_clear_expired_keeps_running_windows() {
        // Arrange
        let now = test_epoch();
        let mut state = EngineState {
            timeout_until: Some(now - Duration::seconds(1)),
            scramble_punishment_until: Some(now + Duration::minutes(4)),
            ..EngineState::default()
        };

        // Act
        let cleared = TimeoutController::clear_expired(&mut state, now);

        // Assert
        assert_eq!(cleared, vec![WindowKind::Timeout]);
        assert!(state.timeout_until.is_none());
        assert!(state.scramble_punishment_until.is_some());
    }
}
