//! Deferred step transitions.
//!
//! Every delayed transition is an explicit `ScheduledTransition` record held
//! by one scheduler and drained by `poll`. A record becomes armed once the
//! message it waits on has finished typing; from then on its remaining delay
//! runs down. Muting suspends the countdown and keeps whatever was left.

use chrono::{DateTime, Duration, Utc};
use hushcalc_story::step::StepId;
use tracing::debug;
use uuid::Uuid;

use crate::domain::effects::{ScheduleOrigin, ScheduleRequest};

const MAX_DELAY_MS: i64 = 86_400_000;

/// A queued transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTransition {
    /// Record id.
    pub id: Uuid,
    /// Step the transition was captured against.
    pub from_step: StepId,
    /// Step it leads to.
    pub to_step: StepId,
    /// Whether the record arms only after typing completes.
    pub wait_for_typing: bool,
    /// Delay still to run once armed.
    pub remaining_delay: Duration,
    /// When the record fires. `None` until armed.
    pub ready_at: Option<DateTime<Utc>>,
    /// Who asked for it.
    pub origin: ScheduleOrigin,
}

/// Conditions the scheduler checks on every poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerGate {
    /// The current message has been fully revealed.
    pub typing_complete: bool,
    /// The calculator is muted.
    pub muted: bool,
    /// A mini-game holds the input.
    pub mini_game_active: bool,
}

/// Central scheduler of deferred transitions.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Vec<ScheduledTransition>,
    suspended: bool,
}

fn delay(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(MAX_DELAY_MS).min(MAX_DELAY_MS))
}

impl Scheduler {
    /// Queues `request`. Returns the record id, or `None` when a monologue
    /// request was dropped because the step already has a transition queued.
    pub fn schedule(&mut self, request: &ScheduleRequest, now: DateTime<Utc>) -> Option<Uuid> {
        match request.origin {
            ScheduleOrigin::Engine => {
                self.tasks.retain(|t| t.from_step != request.from_step);
            }
            ScheduleOrigin::Monologue => {
                if self.tasks.iter().any(|t| t.from_step == request.from_step) {
                    debug!(
                        from_step = request.from_step,
                        "monologue continuation already queued"
                    );
                    return None;
                }
            }
        }

        let remaining_delay = delay(request.delay_ms);
        let ready_at =
            (!request.wait_for_typing && !self.suspended).then(|| now + remaining_delay);
        let task = ScheduledTransition {
            id: Uuid::new_v4(),
            from_step: request.from_step,
            to_step: request.to_step,
            wait_for_typing: request.wait_for_typing,
            remaining_delay,
            ready_at,
            origin: request.origin,
        };
        debug!(
            id = %task.id,
            from_step = task.from_step,
            to_step = task.to_step,
            delay_ms = request.delay_ms,
            "transition scheduled"
        );
        let id = task.id;
        self.tasks.push(task);
        Some(id)
    }

    /// Arms whatever the gate allows and drains every record that is due.
    pub fn poll(&mut self, gate: SchedulerGate, now: DateTime<Utc>) -> Vec<ScheduledTransition> {
        if self.suspended || gate.muted || gate.mini_game_active {
            return Vec::new();
        }
        for task in &mut self.tasks {
            if task.ready_at.is_none() && (gate.typing_complete || !task.wait_for_typing) {
                task.ready_at = Some(now + task.remaining_delay);
            }
        }
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| t.ready_at.is_some_and(|ready| ready <= now));
        self.tasks = waiting;
        due
    }

    /// Stops every countdown, keeping the delay that was left.
    pub fn suspend(&mut self, now: DateTime<Utc>) {
        self.suspended = true;
        for task in &mut self.tasks {
            if let Some(ready) = task.ready_at.take() {
                task.remaining_delay = (ready - now).max(Duration::zero());
            }
        }
    }

    /// Lets records arm again. Records waiting on typing wait for the
    /// message to be retyped.
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Drops every record. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        dropped
    }

    /// Records still queued.
    #[must_use]
    pub fn pending(&self) -> &[ScheduledTransition] {
        &self.tasks
    }

    /// Whether the scheduler is suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushcalc_test_support::test_epoch;

    fn request(from_step: StepId, to_step: StepId, delay_ms: u64, origin: ScheduleOrigin) -> ScheduleRequest {
        ScheduleRequest {
            from_step,
            to_step,
            wait_for_typing: true,
            delay_ms,
            origin,
        }
    }

    fn typed() -> SchedulerGate {
        SchedulerGate {
            typing_complete: true,
            ..SchedulerGate::default()
        }
    }

    #[test]
    fn test_waits_for_typing_then_delay() {
        // Arrange
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(6, 7, 2500, ScheduleOrigin::Engine), now);

        // Act
        let while_typing = scheduler.poll(SchedulerGate::default(), now + Duration::seconds(10));
        let armed = scheduler.poll(typed(), now + Duration::seconds(10));
        let early = scheduler.poll(typed(), now + Duration::milliseconds(12_499));
        let due = scheduler.poll(typed(), now + Duration::milliseconds(12_500));

        // Assert
        assert!(while_typing.is_empty());
        assert!(armed.is_empty());
        assert!(early.is_empty());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].to_step, 7);
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_zero_delay_fires_on_the_poll_that_sees_typing_done() {
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(3, 4, 0, ScheduleOrigin::Engine), now);

        let due = scheduler.poll(typed(), now);

        assert_eq!(due.len(), 1);
    }

    #[test]
    fn test_engine_request_replaces_same_source() {
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(5, 6, 0, ScheduleOrigin::Engine), now);

        scheduler.schedule(&request(5, 7, 0, ScheduleOrigin::Engine), now);

        assert_eq!(scheduler.pending().len(), 1);
        assert_eq!(scheduler.pending()[0].to_step, 7);
    }

    #[test]
    fn test_monologue_never_doubles_a_queued_step() {
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(95, 96, 1500, ScheduleOrigin::Engine), now);

        let dropped = scheduler.schedule(&request(95, 96, 1500, ScheduleOrigin::Monologue), now);

        assert!(dropped.is_none());
        assert_eq!(scheduler.pending().len(), 1);
    }

    #[test]
    fn test_muted_or_mini_game_holds_everything() {
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(1, 2, 0, ScheduleOrigin::Engine), now);

        let muted = scheduler.poll(
            SchedulerGate {
                muted: true,
                ..typed()
            },
            now,
        );
        let playing = scheduler.poll(
            SchedulerGate {
                mini_game_active: true,
                ..typed()
            },
            now,
        );

        assert!(muted.is_empty());
        assert!(playing.is_empty());
        assert_eq!(scheduler.pending().len(), 1);
    }

    #[test]
    fn test_suspend_keeps_remaining_delay() {
        // Arrange
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(9, 12, 2000, ScheduleOrigin::Engine), now);
        scheduler.poll(typed(), now);

        // Act
        scheduler.suspend(now + Duration::milliseconds(500));
        let while_suspended = scheduler.poll(typed(), now + Duration::seconds(60));
        scheduler.resume();
        let rearmed_at = now + Duration::seconds(120);
        let armed = scheduler.poll(typed(), rearmed_at);
        let due = scheduler.poll(typed(), rearmed_at + Duration::milliseconds(1500));

        // Assert
        assert!(while_suspended.is_empty());
        assert!(armed.is_empty());
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn test_cancel_all_drops_everything() {
        let now = test_epoch();
        let mut scheduler = Scheduler::default();
        scheduler.schedule(&request(1, 2, 0, ScheduleOrigin::Engine), now);
        scheduler.schedule(&request(3, 4, 0, ScheduleOrigin::Engine), now);

        assert_eq!(scheduler.cancel_all(), 2);
        assert!(scheduler.pending().is_empty());
    }
}
