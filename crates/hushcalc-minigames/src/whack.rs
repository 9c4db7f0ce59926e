//! Whack-a-mole: hit the button that lights up before it moves on.

use chrono::{DateTime, Duration, Utc};
use hushcalc_core::rng::{DeterministicRng, pick_index};
use serde::Serialize;
use tracing::debug;

use crate::outcome::GameStatus;

/// Buttons that can light up as targets.
pub const TARGET_BUTTONS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Wrong clicks in a row that abort the round.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Errors of any kind that abort the round.
pub const MAX_TOTAL_ERRORS: u32 = 5;

/// Hits needed and target cadence for a round.
#[must_use]
pub fn round_parameters(round: u8) -> (u32, Duration) {
    if round >= 2 {
        (10, Duration::milliseconds(800))
    } else {
        (15, Duration::milliseconds(1200))
    }
}

/// One round of whack-a-mole.
#[derive(Debug, Clone, Serialize)]
pub struct WhackAMole {
    round: u8,
    required_hits: u32,
    #[serde(skip)]
    cadence: Duration,
    hits: u32,
    consecutive_errors: u32,
    total_errors: u32,
    target: Option<String>,
    target_until: DateTime<Utc>,
    #[serde(skip)]
    candidates: Vec<String>,
    status: GameStatus,
}

impl WhackAMole {
    /// Starts a round. `lit_buttons` are the buttons that are not darkened;
    /// targets are only drawn from those.
    pub fn start(
        round: u8,
        lit_buttons: &[String],
        now: DateTime<Utc>,
        rng: &mut dyn DeterministicRng,
    ) -> Self {
        let (required_hits, cadence) = round_parameters(round);
        let mut candidates: Vec<String> = TARGET_BUTTONS
            .iter()
            .map(|b| (*b).to_owned())
            .filter(|b| lit_buttons.contains(b))
            .collect();
        if candidates.is_empty() {
            candidates = TARGET_BUTTONS.iter().map(|b| (*b).to_owned()).collect();
        }

        let mut game = Self {
            round,
            required_hits,
            cadence,
            hits: 0,
            consecutive_errors: 0,
            total_errors: 0,
            target: None,
            target_until: now,
            candidates,
            status: GameStatus::Running,
        };
        game.next_target(now, rng);
        game
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Round being played.
    #[must_use]
    pub fn round(&self) -> u8 {
        self.round
    }

    /// Hits so far.
    #[must_use]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// The lit target, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Handles a button click.
    pub fn click(&mut self, label: &str, now: DateTime<Utc>, rng: &mut dyn DeterministicRng) {
        if self.status != GameStatus::Running {
            return;
        }
        if self.target.as_deref() == Some(label) {
            self.hits += 1;
            self.consecutive_errors = 0;
            if self.hits >= self.required_hits {
                debug!(round = self.round, "whack-a-mole round cleared");
                self.status = GameStatus::Completed;
                self.target = None;
            } else {
                self.next_target(now, rng);
            }
        } else {
            self.consecutive_errors += 1;
            self.total_errors += 1;
            self.check_abort();
        }
    }

    /// Advances the target timer; a target that expires counts as a miss.
    pub fn tick(&mut self, now: DateTime<Utc>, rng: &mut dyn DeterministicRng) {
        if self.status != GameStatus::Running || now < self.target_until {
            return;
        }
        self.total_errors += 1;
        self.check_abort();
        if self.status == GameStatus::Running {
            self.next_target(now, rng);
        }
    }

    /// Moves the target deadline by `by`, used after a pause.
    pub fn shift(&mut self, by: Duration) {
        self.target_until += by;
    }

    fn check_abort(&mut self) {
        if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS
            || self.total_errors >= MAX_TOTAL_ERRORS
        {
            debug!(
                round = self.round,
                consecutive = self.consecutive_errors,
                total = self.total_errors,
                "whack-a-mole round aborted"
            );
            self.status = GameStatus::Failed;
            self.target = None;
        }
    }

    fn next_target(&mut self, now: DateTime<Utc>, rng: &mut dyn DeterministicRng) {
        let pool: Vec<&String> = self
            .candidates
            .iter()
            .filter(|c| self.candidates.len() == 1 || Some(c.as_str()) != self.target.as_deref())
            .collect();
        let next = pool[pick_index(pool.len(), rng)].clone();
        self.target = Some(next);
        self.target_until = now + self.cadence;
    }
}
